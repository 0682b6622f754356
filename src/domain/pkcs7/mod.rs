//! CMS / PKCS#7 grammar (RFC 5652) and the RFC 3161 structures carried inside it.
//!
//! Every type decodes from borrowed DER and encodes back with `to_der`. Only
//! the subset used by package signatures is modelled; CRLs and other
//! certificate formats are skipped or kept as opaque bytes.

pub mod algorithm;
pub mod attributes;
pub mod signed_data;
pub mod signer_info;
pub mod timestamp; // RFC 3161 structures colocated with the CMS grammar

pub use algorithm::AlgorithmIdentifier;
pub use attributes::{parse_attributes, Attribute, AttributeSet};
pub use signed_data::{ContentInfo, EncapsulatedContentInfo, SignedData};
pub use signer_info::{SignerIdentifier, SignerInfo};
pub use timestamp::{Accuracy, MessageImprint, PkiStatusInfo, TimeStampReq, TimeStampResp, TstInfo};
