//! Error types for package signature operations.
//!
//! One enum per failure family: DER decoding, signature parsing, signing,
//! timestamping, archive hashing and configuration. Policy failures found while
//! verifying a signature are not errors; they are collected into a
//! `VerificationResult`.

use std::time::Duration;
use thiserror::Error;

pub type Asn1Result<T> = Result<T, Asn1Error>;
pub type ParseResult<T> = Result<T, ParseError>;
pub type SignResult<T> = Result<T, SignError>;
pub type TimestampResult<T> = Result<T, TimestampError>;
pub type HashResult<T> = Result<T, HashError>;
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Low-level DER decoding failures.
#[derive(Error, Debug, Clone, PartialEq, Eq, miette::Diagnostic)]
pub enum Asn1Error {
    #[error("unexpected end of data while reading {0}")]
    Truncated(&'static str),

    #[error("invalid length encoding while reading {0}")]
    InvalidLength(&'static str),

    #[error("indefinite length encoding is not permitted in DER ({0})")]
    IndefiniteLength(&'static str),

    #[error("unexpected tag 0x{actual:02x} for {what} (expected 0x{expected:02x})")]
    UnexpectedTag {
        what: &'static str,
        expected: u8,
        actual: u8,
    },

    #[error("{count} trailing bytes after {what}")]
    TrailingData { what: &'static str, count: usize },

    #[error("malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },
}

impl Asn1Error {
    pub(crate) fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        Asn1Error::Malformed {
            what,
            reason: reason.into(),
        }
    }
}

/// Failures while reading a signature blob. Always fatal.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum ParseError {
    #[error("signature data is empty")]
    Empty,

    #[error("ASN.1 decoding error: {0}")]
    Asn1(#[from] Asn1Error),

    #[error("unexpected content type {actual} (expected {expected})")]
    UnexpectedContentType { expected: String, actual: String },

    #[error("{0} bytes of trailing data after the signature")]
    TrailingData(usize),

    #[error("invalid certificate at index {index}: {reason}")]
    InvalidCertificate { index: usize, reason: String },

    #[error("signed data contains no signer information")]
    NoSignerInfo,

    #[error("signed data contains {0} signers; exactly one is required")]
    MultipleSigners(usize),

    #[error("the signer certificate was not found among the embedded certificates")]
    SignerCertificateNotFound,

    #[error("timestamp token carries no TSTInfo content")]
    MissingTstInfo,
}

/// Failures while producing a signature. No partial signature is ever returned.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SignError {
    #[error("a signing certificate is required")]
    MissingCertificate,

    #[error("a private key is required")]
    MissingPrivateKey,

    #[error("the private key does not match the certificate public key")]
    KeyMismatch,

    #[error("RSA key length {bits} is less than minimum {minimum} bits")]
    WeakKey { bits: u32, minimum: u32 },

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cryptographic error: {0}")]
    Cryptographic(String),

    #[error("timestamping failed: {0}")]
    Timestamp(#[from] TimestampError),

    #[error("encoding error: {0}")]
    Encoding(#[from] Asn1Error),
}

impl From<openssl::error::ErrorStack> for SignError {
    fn from(error: openssl::error::ErrorStack) -> Self {
        SignError::Cryptographic(error.to_string())
    }
}

/// Failures of the RFC 3161 exchange. Never retried inside this crate.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum TimestampError {
    #[error("invalid timestamp authority URL: {0}")]
    InvalidUrl(String),

    #[error("invalid timestamp request: {0}")]
    InvalidRequest(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("timestamp request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("timestamp authority rejected the request (status {status}{})", .text.as_deref().map(|t| format!(": {t}")).unwrap_or_default())]
    Rejected {
        status: i64,
        text: Option<String>,
        fail_info: Option<u32>,
    },

    #[error("timestamp response carries no token")]
    MissingToken,

    #[error("malformed timestamp response: {0}")]
    MalformedResponse(#[from] Asn1Error),

    #[error("malformed timestamp token: {0}")]
    MalformedToken(#[from] ParseError),

    #[error("nonce mismatch: the timestamp response does not answer this request")]
    NonceMismatch,

    #[error("message imprint mismatch: {0}")]
    ImprintMismatch(String),
}

/// Failures while hashing or inspecting a package archive.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum HashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    #[error("ZIP64 archives are not supported")]
    Zip64Unsupported,

    #[error("the package signature entry must be stored uncompressed (compression method {0})")]
    CompressedSignatureEntry(u16),
}

/// Failures reading the signature embedded in a package archive.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum PackageSignatureError {
    #[error(transparent)]
    Archive(#[from] HashError),

    #[error(transparent)]
    Signature(#[from] ParseError),
}

/// Configuration loading and conversion failures.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("failed to load trusted root {path}: {reason}")]
    TrustedRoot { path: String, reason: String },
}
