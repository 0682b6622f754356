//! Foundational cryptographic domain types.
//!
//! Provides the `HashAlgorithm` enumeration (SHA-256/384/512 only) and
//! length-checked digest values used for message imprints and attribute
//! digests.

mod digest_bytes;
mod hash;

pub use digest_bytes::{DigestBytes, DigestBytesError};
pub use hash::{HashAlgorithm, HashAlgorithmParseError};
