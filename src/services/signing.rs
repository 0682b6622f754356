//! Signing options and their up-front validation.
//!
//! Everything that can make a signature unusable is checked here, before any
//! attribute is built or any network request is made.

use std::time::Duration;

use openssl::pkey::{Id, PKey, Private};
use openssl::x509::X509;

use crate::domain::constants::MIN_RSA_KEY_BITS;
use crate::domain::crypto::HashAlgorithm;
use crate::domain::signature::SignatureType;
use crate::domain::types::TimestampUrl;
use crate::infra::error::{SignError, SignResult};
use crate::services::timestamp::DEFAULT_TIMESTAMP_TIMEOUT;

/// Inputs to [`sign_package_data`](crate::services::signature_builder::sign_package_data).
#[derive(Debug, Clone)]
pub struct SigningOptions {
    pub certificate: Option<X509>,
    pub private_key: Option<PKey<Private>>,
    /// Extra certificates embedded after the signer certificate.
    pub chain: Vec<X509>,
    pub signature_type: SignatureType,
    pub hash_algorithm: HashAlgorithm,
    /// Timestamping is opt-in; `None` means no timestamp and is not an error.
    pub timestamp_url: Option<TimestampUrl>,
    pub timestamp_timeout: Duration,
}

impl SigningOptions {
    /// Author signature, SHA-256, no timestamp.
    #[must_use]
    pub fn new(certificate: X509, private_key: PKey<Private>) -> Self {
        Self {
            certificate: Some(certificate),
            private_key: Some(private_key),
            chain: Vec::new(),
            signature_type: SignatureType::Author,
            hash_algorithm: HashAlgorithm::Sha256,
            timestamp_url: None,
            timestamp_timeout: DEFAULT_TIMESTAMP_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_chain(mut self, chain: Vec<X509>) -> Self {
        self.chain = chain;
        self
    }

    #[must_use]
    pub fn with_signature_type(mut self, signature_type: SignatureType) -> Self {
        self.signature_type = signature_type;
        self
    }

    #[must_use]
    pub fn with_hash_algorithm(mut self, hash_algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = hash_algorithm;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, url: TimestampUrl, timeout: Duration) -> Self {
        self.timestamp_url = Some(url);
        self.timestamp_timeout = timeout;
        self
    }

    /// Check certificate and key presence, key type, RSA strength and that the
    /// key belongs to the certificate. Returns the pair on success.
    pub fn validate(&self) -> SignResult<(&X509, &PKey<Private>)> {
        let certificate = self
            .certificate
            .as_ref()
            .ok_or(SignError::MissingCertificate)?;
        let private_key = self
            .private_key
            .as_ref()
            .ok_or(SignError::MissingPrivateKey)?;

        let public_key = certificate.public_key()?;
        if public_key.id() != Id::RSA {
            return Err(SignError::UnsupportedKeyType(key_type_name(public_key.id())));
        }
        if private_key.id() != Id::RSA {
            return Err(SignError::UnsupportedKeyType(key_type_name(private_key.id())));
        }
        let bits = public_key.bits();
        if bits < MIN_RSA_KEY_BITS {
            return Err(SignError::WeakKey {
                bits,
                minimum: MIN_RSA_KEY_BITS,
            });
        }
        if !private_key.public_eq(&public_key) {
            return Err(SignError::KeyMismatch);
        }
        if self.timestamp_url.is_some() && self.timestamp_timeout.is_zero() {
            return Err(SignError::InvalidInput(
                "timestamp timeout must be greater than zero".into(),
            ));
        }
        log::debug!(
            "signing options valid: RSA-{bits}, {}, {} signature",
            self.hash_algorithm,
            self.signature_type
        );
        Ok((certificate, private_key))
    }
}

pub(crate) fn key_type_name(id: Id) -> String {
    match id {
        Id::RSA => "RSA".into(),
        Id::EC => "EC".into(),
        Id::DSA => "DSA".into(),
        Id::ED25519 => "Ed25519".into(),
        Id::ED448 => "Ed448".into(),
        other => format!("key type {}", other.as_raw()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::asn1::Asn1Time;
    use openssl::bn::BigNum;
    use openssl::ec::{EcGroup, EcKey};
    use openssl::hash::MessageDigest;
    use openssl::nid::Nid;
    use openssl::rsa::Rsa;
    use openssl::x509::X509NameBuilder;

    fn self_signed(key: &PKey<Private>) -> X509 {
        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "options test").unwrap();
        let name = name.build();
        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        let serial = BigNum::from_u32(7).unwrap().to_asn1_integer().unwrap();
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(key).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(1).unwrap())
            .unwrap();
        builder.sign(key, MessageDigest::sha256()).unwrap();
        builder.build()
    }

    fn rsa_key(bits: u32) -> PKey<Private> {
        PKey::from_rsa(Rsa::generate(bits).unwrap()).unwrap()
    }

    #[test]
    fn missing_material_is_reported() {
        let key = rsa_key(2048);
        let cert = self_signed(&key);
        let mut options = SigningOptions::new(cert, key);
        options.private_key = None;
        assert!(matches!(options.validate(), Err(SignError::MissingPrivateKey)));
        options.certificate = None;
        assert!(matches!(options.validate(), Err(SignError::MissingCertificate)));
    }

    #[test]
    fn weak_rsa_key_is_rejected_with_stable_message() {
        let key = rsa_key(1024);
        let cert = self_signed(&key);
        let err = SigningOptions::new(cert, key).validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "RSA key length 1024 is less than minimum 2048 bits"
        );
    }

    #[test]
    fn mismatched_key_is_rejected() {
        let key = rsa_key(2048);
        let cert = self_signed(&key);
        let other = rsa_key(2048);
        assert!(matches!(
            SigningOptions::new(cert, other).validate(),
            Err(SignError::KeyMismatch)
        ));
    }

    #[test]
    fn ec_keys_are_unsupported() {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();
        let cert = self_signed(&key);
        match SigningOptions::new(cert, key).validate() {
            Err(SignError::UnsupportedKeyType(name)) => assert_eq!(name, "EC"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn valid_options_pass() {
        let key = rsa_key(2048);
        let cert = self_signed(&key);
        let options = SigningOptions::new(cert, key)
            .with_signature_type(SignatureType::Repository)
            .with_hash_algorithm(HashAlgorithm::Sha512);
        assert!(options.validate().is_ok());
    }
}
