//! Parsed package signatures.
//!
//! [`PrimarySignature`] and [`Timestamp`] are produced by
//! `services::signature_reader` and are immutable afterwards.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use openssl::x509::X509;

use crate::domain::asn1::parse_single;
use crate::domain::constants::{
    ASN1_OCTET_STRING_TAG, OID_COMMITMENT_AUTHOR, OID_COMMITMENT_REPOSITORY, OID_MESSAGE_DIGEST,
};
use crate::domain::crypto::HashAlgorithm;
use crate::domain::pkcs7::{Accuracy, MessageImprint, SignedData, SignerInfo, TstInfo};

/// Role the signer committed to through the commitment-type-indication attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureType {
    Unknown,
    Author,
    Repository,
}

impl SignatureType {
    /// Map a commitment type OID; unrecognized OIDs are `Unknown`.
    #[must_use]
    pub fn from_commitment_oid(oid: &[u8]) -> Self {
        match oid {
            OID_COMMITMENT_AUTHOR => SignatureType::Author,
            OID_COMMITMENT_REPOSITORY => SignatureType::Repository,
            _ => SignatureType::Unknown,
        }
    }

    /// Commitment type OID to emit; `Unknown` emits no attribute.
    #[must_use]
    pub fn commitment_oid(&self) -> Option<&'static [u8]> {
        match self {
            SignatureType::Author => Some(OID_COMMITMENT_AUTHOR),
            SignatureType::Repository => Some(OID_COMMITMENT_REPOSITORY),
            SignatureType::Unknown => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureType::Unknown => "unknown",
            SignatureType::Author => "author",
            SignatureType::Repository => "repository",
        }
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "author" => Ok(SignatureType::Author),
            "repository" => Ok(SignatureType::Repository),
            "unknown" => Ok(SignatureType::Unknown),
            other => Err(format!("unknown signature type: {other}")),
        }
    }
}

/// An RFC 3161 timestamp embedded as an unsigned attribute of the primary signer.
#[derive(Clone)]
pub struct Timestamp {
    token: Vec<u8>,
    signed_data: SignedData,
    tst_info: TstInfo,
    signer_certificate: Option<X509>,
    certificates: Vec<X509>,
}

impl Timestamp {
    pub(crate) fn new(
        token: Vec<u8>,
        signed_data: SignedData,
        tst_info: TstInfo,
        signer_certificate: Option<X509>,
        certificates: Vec<X509>,
    ) -> Self {
        Self {
            token,
            signed_data,
            tst_info,
            signer_certificate,
            certificates,
        }
    }

    #[must_use]
    pub fn gen_time(&self) -> SystemTime {
        self.tst_info.gen_time
    }

    /// TSA signing certificate, if the token carries it.
    #[must_use]
    pub fn signer_certificate(&self) -> Option<&X509> {
        self.signer_certificate.as_ref()
    }

    #[must_use]
    pub fn certificates(&self) -> &[X509] {
        &self.certificates
    }

    /// Algorithm of the message imprint; `None` outside SHA-256/384/512.
    #[must_use]
    pub fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        self.tst_info.message_imprint.hash_algorithm.hash_algorithm()
    }

    #[must_use]
    pub fn accuracy(&self) -> Option<Accuracy> {
        self.tst_info.accuracy
    }

    #[must_use]
    pub fn message_imprint(&self) -> &MessageImprint {
        &self.tst_info.message_imprint
    }

    #[must_use]
    pub fn nonce(&self) -> Option<&[u8]> {
        self.tst_info.nonce.as_deref()
    }

    #[must_use]
    pub fn serial_number(&self) -> &[u8] {
        &self.tst_info.serial_number
    }

    #[must_use]
    pub fn policy(&self) -> &[u8] {
        &self.tst_info.policy
    }

    #[must_use]
    pub fn tst_info(&self) -> &TstInfo {
        &self.tst_info
    }

    #[must_use]
    pub fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    /// The token's single signer.
    #[must_use]
    pub fn signer_info(&self) -> &SignerInfo {
        &self.signed_data.signer_infos[0]
    }

    /// Message-digest attribute of the token signer: the hash of the encoded TSTInfo.
    #[must_use]
    pub fn message_digest(&self) -> Option<&[u8]> {
        message_digest_attribute(self.signer_info())
    }

    /// DER of the encapsulated TSTInfo as carried in the token.
    #[must_use]
    pub fn tst_info_der(&self) -> &[u8] {
        self.signed_data
            .encap_content_info
            .content
            .as_deref()
            .unwrap_or_default()
    }

    /// DER of the token's `ContentInfo`.
    #[must_use]
    pub fn token(&self) -> &[u8] {
        &self.token
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timestamp")
            .field("gen_time", &self.tst_info.gen_time)
            .field("hash_algorithm", &self.hash_algorithm())
            .field("serial_number", &hex::encode(&self.tst_info.serial_number))
            .field("has_signer_certificate", &self.signer_certificate.is_some())
            .field("token_len", &self.token.len())
            .finish()
    }
}

/// The primary (author or repository) signature of a package.
#[derive(Clone)]
pub struct PrimarySignature {
    raw: Vec<u8>,
    signed_data: SignedData,
    signature_type: SignatureType,
    signer_certificate: X509,
    certificates: Vec<X509>,
    timestamps: Vec<Timestamp>,
    hash_algorithm: Option<HashAlgorithm>,
}

impl PrimarySignature {
    pub(crate) fn new(
        raw: Vec<u8>,
        signed_data: SignedData,
        signature_type: SignatureType,
        signer_certificate: X509,
        certificates: Vec<X509>,
        timestamps: Vec<Timestamp>,
        hash_algorithm: Option<HashAlgorithm>,
    ) -> Self {
        Self {
            raw,
            signed_data,
            signature_type,
            signer_certificate,
            certificates,
            timestamps,
            hash_algorithm,
        }
    }

    /// The DER bytes this signature was read from.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    #[must_use]
    pub fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    /// The single signer; the reader refuses anything else.
    #[must_use]
    pub fn signer_info(&self) -> &SignerInfo {
        &self.signed_data.signer_infos[0]
    }

    #[must_use]
    pub fn signature_type(&self) -> SignatureType {
        self.signature_type
    }

    #[must_use]
    pub fn signer_certificate(&self) -> &X509 {
        &self.signer_certificate
    }

    /// Every certificate carried in the signature, in wire order.
    #[must_use]
    pub fn certificates(&self) -> &[X509] {
        &self.certificates
    }

    #[must_use]
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// Digest algorithm of the signer; `None` outside SHA-256/384/512.
    #[must_use]
    pub fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        self.hash_algorithm
    }

    /// The RSA signature value.
    #[must_use]
    pub fn signature_value(&self) -> &[u8] {
        &self.signer_info().signature
    }

    /// Content of the message-digest signed attribute: the signed package content hash.
    #[must_use]
    pub fn message_digest(&self) -> Option<&[u8]> {
        message_digest_attribute(self.signer_info())
    }
}

/// The message-digest signed attribute of `signer_info`, if present and well formed.
pub(crate) fn message_digest_attribute(signer_info: &SignerInfo) -> Option<&[u8]> {
    let value = signer_info
        .signed_attributes
        .as_ref()?
        .get(OID_MESSAGE_DIGEST)?
        .first_value()?;
    parse_single(value, "messageDigest")
        .ok()
        .filter(|tlv| tlv.tag == ASN1_OCTET_STRING_TAG)
        .map(|tlv| tlv.content)
}

impl fmt::Debug for PrimarySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimarySignature")
            .field("signature_type", &self.signature_type)
            .field("hash_algorithm", &self.hash_algorithm)
            .field("certificates", &self.certificates.len())
            .field("timestamps", &self.timestamps)
            .field("len", &self.raw.len())
            .finish()
    }
}
