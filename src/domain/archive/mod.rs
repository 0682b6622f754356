//! ZIP layout of package archives: fixed records and the derived metadata
//! used to hash or extract around the signature entry.

pub mod metadata;
pub mod records;

pub use metadata::{
    is_package_signature_file, CentralDirectoryHeaderMetadata, SignedPackageArchiveMetadata,
};
pub use records::{CentralDirectoryHeader, EndOfCentralDirectoryRecord, LocalFileHeader};
