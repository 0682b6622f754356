//! Verification engine for primary package signatures.
//!
//! Every check runs; each failure becomes an issue in the returned
//! [`VerificationResult`]. Nothing here returns early on a policy failure.

use std::sync::Arc;
use std::time::SystemTime;

use openssl::sign::Verifier;
use openssl::x509::X509;

use crate::domain::constants::{MIN_RSA_KEY_BITS, OID_RSA_ENCRYPTION};
use crate::domain::crypto::HashAlgorithm;
use crate::domain::pkcs7::SignerInfo;
use crate::domain::signature::{PrimarySignature, SignatureType, Timestamp};
use crate::domain::verification::{
    VerificationCode, VerificationResult, VerificationResultBuilder,
};
use crate::services::cert_validator::{
    CertificateValidator, ChainStatus, KeyStrength, ValidityStatus,
};
use crate::services::trust_store::{subject_line, TrustStore};

/// Verification policy.
#[derive(Debug, Clone)]
pub struct VerificationOptions {
    pub trust_store: Arc<TrustStore>,
    /// Report an untrusted root as a warning instead of an error.
    pub allow_untrusted_root: bool,
    /// Fail when the signature carries no timestamp at all.
    pub require_timestamp: bool,
    pub verify_timestamp: bool,
    pub allowed_signature_types: Vec<SignatureType>,
    pub allowed_hash_algorithms: Vec<HashAlgorithm>,
    /// Package content hash the message-digest attribute must equal.
    pub expected_content_hash: Option<Vec<u8>>,
}

impl VerificationOptions {
    #[must_use]
    pub fn new(trust_store: Arc<TrustStore>) -> Self {
        Self {
            trust_store,
            allow_untrusted_root: false,
            require_timestamp: false,
            verify_timestamp: true,
            allowed_signature_types: vec![SignatureType::Author, SignatureType::Repository],
            allowed_hash_algorithms: HashAlgorithm::ALL.to_vec(),
            expected_content_hash: None,
        }
    }

    #[must_use]
    pub fn allow_untrusted_root(mut self, allow: bool) -> Self {
        self.allow_untrusted_root = allow;
        self
    }

    #[must_use]
    pub fn require_timestamp(mut self, require: bool) -> Self {
        self.require_timestamp = require;
        self
    }

    #[must_use]
    pub fn verify_timestamp(mut self, verify: bool) -> Self {
        self.verify_timestamp = verify;
        self
    }

    #[must_use]
    pub fn with_allowed_signature_types(mut self, types: Vec<SignatureType>) -> Self {
        self.allowed_signature_types = types;
        self
    }

    #[must_use]
    pub fn with_allowed_hash_algorithms(mut self, algorithms: Vec<HashAlgorithm>) -> Self {
        self.allowed_hash_algorithms = algorithms;
        self
    }

    #[must_use]
    pub fn with_expected_content_hash(mut self, hash: Vec<u8>) -> Self {
        self.expected_content_hash = Some(hash);
        self
    }
}

/// Verify `signature` against `options`. Always returns a populated result.
#[must_use]
pub fn verify_signature(
    signature: &PrimarySignature,
    options: &VerificationOptions,
) -> VerificationResult {
    let certificate = signature.signer_certificate();
    log::info!(
        "verifying {} signature by {}",
        signature.signature_type(),
        subject_line(certificate)
    );
    let mut result = VerificationResultBuilder::new(signature.signature_type(), certificate.clone());

    check_policy(signature, options, &mut result);
    check_signer_certificate(certificate, &mut result);
    check_chain(certificate, signature.certificates(), options, &mut result);
    check_integrity(signature, options, &mut result);
    check_timestamps(signature, options, &mut result);

    let result = result.build();
    log::info!(
        "verification finished: valid={}, {} errors, {} warnings",
        result.is_valid(),
        result.errors.len(),
        result.warnings.len()
    );
    result
}

fn check_policy(
    signature: &PrimarySignature,
    options: &VerificationOptions,
    result: &mut VerificationResultBuilder,
) {
    let signature_type = signature.signature_type();
    if !options.allowed_signature_types.contains(&signature_type) {
        result.error(
            VerificationCode::SignatureTypeNotAllowed,
            format!("signature type {signature_type} is not allowed"),
        );
    }
    match signature.hash_algorithm() {
        Some(algorithm) if options.allowed_hash_algorithms.contains(&algorithm) => {}
        Some(algorithm) => {
            result.error(
                VerificationCode::HashAlgorithmNotAllowed,
                format!("hash algorithm {algorithm} is not allowed"),
            );
        }
        None => {
            result.error(
                VerificationCode::HashAlgorithmNotAllowed,
                format!(
                    "unsupported digest algorithm {}",
                    signature.signer_info().digest_algorithm.dotted()
                ),
            );
        }
    }
}

fn check_signer_certificate(certificate: &X509, result: &mut VerificationResultBuilder) {
    match CertificateValidator::check_key_strength(certificate) {
        KeyStrength::Acceptable { .. } => {}
        KeyStrength::Weak { bits } => {
            result.error(
                VerificationCode::WeakKey,
                format!("RSA key length {bits} is less than minimum {MIN_RSA_KEY_BITS} bits"),
            );
        }
        KeyStrength::Unsupported(kind) => {
            result.error(
                VerificationCode::UnsupportedKeyType,
                format!("unsupported signer key type: {kind}"),
            );
        }
    }

    match CertificateValidator::check_validity(certificate, SystemTime::now()) {
        Ok(ValidityStatus::Valid) => {}
        Ok(ValidityStatus::NotYetValid) => {
            result.error(
                VerificationCode::CertificateNotYetValid,
                format!("certificate is not valid before {}", certificate.not_before()),
            );
        }
        Ok(ValidityStatus::Expired) => {
            result.error(
                VerificationCode::CertificateExpired,
                format!("certificate expired at {}", certificate.not_after()),
            );
        }
        Err(e) => {
            result.error(
                VerificationCode::CertificateExpired,
                format!("certificate validity could not be evaluated: {e}"),
            );
        }
    }
}

fn check_chain(
    certificate: &X509,
    certificates: &[X509],
    options: &VerificationOptions,
    result: &mut VerificationResultBuilder,
) {
    match CertificateValidator::validate_chain(certificate, certificates, &options.trust_store) {
        Ok(ChainStatus::Trusted { root }) => {
            result.trusted_root(root);
        }
        Ok(ChainStatus::UntrustedRoot { root }) => {
            let message = format!(
                "certificate chain ends at untrusted root {}",
                subject_line(&root)
            );
            if options.allow_untrusted_root {
                result.warning(VerificationCode::UntrustedRoot, message);
                result.trusted_root(root);
            } else {
                result.error(VerificationCode::UntrustedRoot, message);
            }
        }
        Ok(ChainStatus::Invalid { reason }) => {
            result.error(
                VerificationCode::ChainInvalid,
                format!("certificate chain is invalid: {reason}"),
            );
        }
        Err(e) => {
            result.error(
                VerificationCode::ChainInvalid,
                format!("certificate chain could not be built: {e}"),
            );
        }
    }
}

fn check_integrity(
    signature: &PrimarySignature,
    options: &VerificationOptions,
    result: &mut VerificationResultBuilder,
) {
    match signature.message_digest() {
        None => {
            result.error(
                VerificationCode::MissingMessageDigest,
                "signed attributes carry no message-digest",
            );
        }
        Some(digest) => {
            if let Some(expected) = &options.expected_content_hash {
                if digest != expected.as_slice() {
                    result.error(
                        VerificationCode::ContentHashMismatch,
                        "signed content hash does not match the package content",
                    );
                }
            }
        }
    }

    if let Err(reason) = verify_signer_info(signature.signer_info(), signature.signer_certificate())
    {
        result.error(VerificationCode::SignatureInvalid, reason);
    }
}

/// Check the signer's signature value over its signed attributes (tag 0x31).
fn verify_signer_info(signer_info: &SignerInfo, certificate: &X509) -> Result<(), String> {
    let attributes = signer_info
        .signed_attributes
        .as_ref()
        .ok_or("signer carries no signed attributes")?;
    let algorithm = signer_info
        .hash_algorithm()
        .ok_or("signer digest algorithm is not supported")?;
    let signature_oid = signer_info.signature_algorithm.oid.as_slice();
    if signature_oid != OID_RSA_ENCRYPTION
        && HashAlgorithm::from_rsa_signature_oid(signature_oid) != Some(algorithm)
    {
        return Err(format!(
            "signature algorithm does not agree with digest algorithm {algorithm}"
        ));
    }
    let public_key = certificate
        .public_key()
        .map_err(|e| format!("unreadable public key: {e}"))?;
    let verified = Verifier::new(algorithm.message_digest(), &public_key)
        .and_then(|mut verifier| {
            verifier.update(&attributes.set_der())?;
            verifier.verify(&signer_info.signature)
        })
        .map_err(|e| format!("signature could not be checked: {e}"))?;
    if verified {
        Ok(())
    } else {
        Err("signature value does not match the signed attributes".into())
    }
}

fn check_timestamps(
    signature: &PrimarySignature,
    options: &VerificationOptions,
    result: &mut VerificationResultBuilder,
) {
    let timestamps = signature.timestamps();
    if timestamps.is_empty() {
        if options.require_timestamp {
            result.error(
                VerificationCode::TimestampRequired,
                "a timestamp is required but the signature has none",
            );
        }
        return;
    }
    if !options.verify_timestamp {
        log::debug!("skipping verification of {} timestamps", timestamps.len());
        return;
    }

    let mut all_valid = true;
    let mut signing_time = None;
    for (index, timestamp) in timestamps.iter().enumerate() {
        if verify_timestamp(index, timestamp, signature, options, result) {
            signing_time.get_or_insert(timestamp.gen_time());
        } else {
            all_valid = false;
        }
    }
    if let Some(time) = signing_time {
        result.signing_time(time);
    }
    result.timestamp_valid(all_valid);
}

fn verify_timestamp(
    index: usize,
    timestamp: &Timestamp,
    signature: &PrimarySignature,
    options: &VerificationOptions,
    result: &mut VerificationResultBuilder,
) -> bool {
    let Some(tsa_certificate) = timestamp.signer_certificate() else {
        result.error(
            VerificationCode::TimestampCertificateMissing,
            format!("timestamp {index} does not carry its signing certificate"),
        );
        return false;
    };
    let mut valid = true;

    match CertificateValidator::validate_chain(
        tsa_certificate,
        timestamp.certificates(),
        &options.trust_store,
    ) {
        Ok(ChainStatus::Trusted { .. }) => {}
        Ok(ChainStatus::UntrustedRoot { root }) => {
            let message = format!(
                "timestamp {index} chain ends at untrusted root {}",
                subject_line(&root)
            );
            if options.allow_untrusted_root {
                result.warning(VerificationCode::UntrustedRoot, message);
            } else {
                result.error(VerificationCode::TimestampChainInvalid, message);
                valid = false;
            }
        }
        Ok(ChainStatus::Invalid { reason }) => {
            result.error(
                VerificationCode::TimestampChainInvalid,
                format!("timestamp {index} chain is invalid: {reason}"),
            );
            valid = false;
        }
        Err(e) => {
            result.error(
                VerificationCode::TimestampChainInvalid,
                format!("timestamp {index} chain could not be built: {e}"),
            );
            valid = false;
        }
    }

    let signer_info = timestamp.signer_info();
    if let Err(reason) = verify_signer_info(signer_info, tsa_certificate) {
        result.error(
            VerificationCode::TimestampSignatureInvalid,
            format!("timestamp {index}: {reason}"),
        );
        valid = false;
    }
    let tst_digest_matches = match (timestamp.message_digest(), signer_info.hash_algorithm()) {
        (Some(digest), Some(algorithm)) => algorithm.digest(timestamp.tst_info_der()) == digest,
        _ => false,
    };
    if !tst_digest_matches {
        result.error(
            VerificationCode::TimestampSignatureInvalid,
            format!("timestamp {index}: message-digest does not match the TSTInfo"),
        );
        valid = false;
    }

    let imprint = timestamp.message_imprint();
    let imprint_matches = timestamp.hash_algorithm().is_some_and(|algorithm| {
        imprint.matches(algorithm, &algorithm.digest(signature.signature_value()))
    });
    if !imprint_matches {
        result.error(
            VerificationCode::TimestampImprintMismatch,
            format!("timestamp {index} does not cover this signature value"),
        );
        valid = false;
    }
    valid
}
