pub mod archive;
pub mod asn1;
pub mod constants;
pub mod crypto;
pub mod pkcs7;
pub mod signature;
pub mod types;
pub mod verification;
