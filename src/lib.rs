//! NuGet Package Signing Library
//!
//! Reads, builds and verifies the primary signature of a signed NuGet
//! package: a detached CMS `SignedData` stored uncompressed as the
//! `.signature.p7s` archive entry. Signatures may carry RFC 3161
//! timestamp tokens, obtained here through a blocking HTTP client.
//!
//! The crate is split the usual way:
//!
//! * [`domain`]: DER codec, CMS and RFC 3161 grammar, ZIP records, value types
//! * [`services`]: signing, timestamping, verification and archive hashing
//! * [`adapters`]: the HTTP transport to timestamp authorities
//! * [`infra`]: error families and the TOML configuration layer

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

pub use adapters::{HttpTimestampTransport, TimestampTransport};
pub use domain::crypto::HashAlgorithm;
pub use domain::signature::{PrimarySignature, SignatureType, Timestamp};
pub use domain::types::TimestampUrl;
pub use domain::verification::{VerificationCode, VerificationIssue, VerificationResult};
pub use infra::config::{ConfigManager, SignatureConfiguration};
pub use infra::error::{
    Asn1Error, ConfigError, HashError, PackageSignatureError, ParseError, SignError,
    TimestampError,
};
pub use services::{
    content_hash, is_signed, read_package_signature, read_signature, sign_package_data,
    verify_signature, write_unsigned_content, PackageSignatureBuilder, SigningOptions,
    TimestampClient, TrustStore, VerificationOptions,
};
