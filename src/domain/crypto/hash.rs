//! Hash algorithm domain type.
//!
//! Only the SHA-2 family is representable: SHA-1 and weaker digests are refused
//! when parsed from configuration and map to "unknown" when found in a
//! signature.

use crate::domain::constants::{
    OID_SHA256, OID_SHA256_WITH_RSA, OID_SHA384, OID_SHA384_WITH_RSA, OID_SHA512,
    OID_SHA512_WITH_RSA,
};
use openssl::hash::MessageDigest;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 3] = [
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha512,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    #[must_use]
    pub fn digest_size(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// DER content octets of the digest algorithm OID.
    #[must_use]
    pub fn oid(&self) -> &'static [u8] {
        match self {
            HashAlgorithm::Sha256 => OID_SHA256,
            HashAlgorithm::Sha384 => OID_SHA384,
            HashAlgorithm::Sha512 => OID_SHA512,
        }
    }

    /// DER content octets of the matching sha*WithRSAEncryption OID.
    #[must_use]
    pub fn rsa_signature_oid(&self) -> &'static [u8] {
        match self {
            HashAlgorithm::Sha256 => OID_SHA256_WITH_RSA,
            HashAlgorithm::Sha384 => OID_SHA384_WITH_RSA,
            HashAlgorithm::Sha512 => OID_SHA512_WITH_RSA,
        }
    }

    /// Map a digest algorithm OID; anything outside SHA-256/384/512 is `None`.
    #[must_use]
    pub fn from_oid(oid: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.oid() == oid)
    }

    /// Map a sha*WithRSAEncryption OID to its digest.
    #[must_use]
    pub fn from_rsa_signature_oid(oid: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.rsa_signature_oid() == oid)
    }

    #[must_use]
    pub fn message_digest(&self) -> MessageDigest {
        match self {
            HashAlgorithm::Sha256 => MessageDigest::sha256(),
            HashAlgorithm::Sha384 => MessageDigest::sha384(),
            HashAlgorithm::Sha512 => MessageDigest::sha512(),
        }
    }

    #[must_use]
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
        })
    }
}

/// Error parsing a hash algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashAlgorithmParseError {
    #[error("{0} is not permitted for package signatures")]
    Forbidden(String),
    #[error("unknown hash algorithm: {0}")]
    Unknown(String),
}

impl FromStr for HashAlgorithm {
    type Err = HashAlgorithmParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "");
        match normalized.as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "sha1" | "md5" | "md2" | "md4" | "sha224" => {
                Err(HashAlgorithmParseError::Forbidden(s.trim().to_string()))
            }
            _ => Err(HashAlgorithmParseError::Unknown(s.trim().to_string())),
        }
    }
}
