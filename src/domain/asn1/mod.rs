//! DER encode/decode primitives shared by the CMS, ESS and RFC 3161 codecs.

pub mod oid;
pub mod reader;
pub mod time;
pub mod writer;

pub use oid::oid_to_string;
pub use reader::{parse_single, DerReader, Tlv};
