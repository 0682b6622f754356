//! Verification domain types for package signatures.
//!
//! A verification never fails as a whole: every policy and trust check
//! contributes zero or more [`VerificationIssue`]s to either the error or the
//! warning list, and validity is derived from the error list alone.

use std::fmt;
use std::time::SystemTime;

use openssl::x509::X509;

use crate::domain::signature::SignatureType;

/// Which check produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationCode {
    SignatureTypeNotAllowed,
    HashAlgorithmNotAllowed,
    UnsupportedKeyType,
    WeakKey,
    CertificateNotYetValid,
    CertificateExpired,
    UntrustedRoot,
    ChainInvalid,
    SignatureInvalid,
    MissingMessageDigest,
    ContentHashMismatch,
    TimestampRequired,
    TimestampCertificateMissing,
    TimestampChainInvalid,
    TimestampSignatureInvalid,
    TimestampImprintMismatch,
}

/// One entry in `errors` or `warnings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationIssue {
    pub code: VerificationCode,
    pub message: String,
}

impl fmt::Display for VerificationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of verifying one primary signature.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub signature_type: SignatureType,
    pub signer_certificate: X509,
    /// Root of the validated chain, trusted or (when policy allows) not.
    pub trusted_root: Option<X509>,
    /// Generation time of the first valid timestamp.
    pub signing_time: Option<SystemTime>,
    pub timestamp_valid: bool,
    pub errors: Vec<VerificationIssue>,
    pub warnings: Vec<VerificationIssue>,
}

impl VerificationResult {
    /// Valid exactly when no error was recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn has_error(&self, code: VerificationCode) -> bool {
        self.errors.iter().any(|issue| issue.code == code)
    }

    #[must_use]
    pub fn has_warning(&self, code: VerificationCode) -> bool {
        self.warnings.iter().any(|issue| issue.code == code)
    }
}

/// Collects issues in order; never short-circuits.
#[derive(Debug)]
pub struct VerificationResultBuilder {
    result: VerificationResult,
}

impl VerificationResultBuilder {
    #[must_use]
    pub fn new(signature_type: SignatureType, signer_certificate: X509) -> Self {
        Self {
            result: VerificationResult {
                signature_type,
                signer_certificate,
                trusted_root: None,
                signing_time: None,
                timestamp_valid: false,
                errors: Vec::new(),
                warnings: Vec::new(),
            },
        }
    }

    pub fn error(&mut self, code: VerificationCode, message: impl Into<String>) -> &mut Self {
        let message = message.into();
        log::warn!("verification error ({code:?}): {message}");
        self.result.errors.push(VerificationIssue { code, message });
        self
    }

    pub fn warning(&mut self, code: VerificationCode, message: impl Into<String>) -> &mut Self {
        let message = message.into();
        log::info!("verification warning ({code:?}): {message}");
        self.result.warnings.push(VerificationIssue { code, message });
        self
    }

    pub fn trusted_root(&mut self, root: X509) -> &mut Self {
        self.result.trusted_root = Some(root);
        self
    }

    pub fn signing_time(&mut self, time: SystemTime) -> &mut Self {
        self.result.signing_time = Some(time);
        self
    }

    pub fn timestamp_valid(&mut self, valid: bool) -> &mut Self {
        self.result.timestamp_valid = valid;
        self
    }

    #[must_use]
    pub fn build(self) -> VerificationResult {
        self.result
    }
}
