//! Service layer module root.
//! Signature reading, building and verification, RFC 3161 timestamping and
//! signed-archive hashing.

pub mod archive_hasher;
pub mod archive_reader;
pub mod cert_validator;
pub mod package_signature;
pub mod signature_builder;
pub mod signature_reader;
pub mod signed_attributes_builder;
pub mod signing;
pub mod timestamp;
pub mod timestamp_parser;
pub mod timestamp_request_builder;
pub mod trust_store;
pub mod verification;

pub use archive_hasher::{content_hash, write_unsigned_content};
pub use archive_reader::read_archive_metadata;
pub use cert_validator::{CertificateValidator, ChainStatus, KeyStrength, ValidityStatus};
pub use package_signature::{is_signed, read_package_signature, read_signature_entry};
pub use signature_builder::{sign_package_data, PackageSignatureBuilder};
pub use signature_reader::{read_signature, read_timestamp_token};
pub use signed_attributes_builder::SignedAttributesBuilder;
pub use signing::SigningOptions;
pub use timestamp::{TimestampClient, DEFAULT_TIMESTAMP_TIMEOUT};
pub use timestamp_parser::TimestampParserService;
pub use timestamp_request_builder::{generate_nonce, TimestampRequest, TimestampRequestBuilder};
pub use trust_store::TrustStore;
pub use verification::{verify_signature, VerificationOptions};
