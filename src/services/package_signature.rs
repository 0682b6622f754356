//! Locate and read the primary signature stored inside a package archive.

use std::io::{Read, Seek};

use crate::domain::constants::ZIP_COMPRESSION_STORED;
use crate::domain::signature::PrimarySignature;
use crate::infra::error::{HashError, HashResult, PackageSignatureError};
use crate::services::archive_reader::{read_archive_metadata, read_exact_at};
use crate::services::signature_reader::read_signature;

/// Read `.signature.p7s` from the archive, or `None` if the package is unsigned.
pub fn read_package_signature<R: Read + Seek>(
    reader: &mut R,
) -> Result<Option<PrimarySignature>, PackageSignatureError> {
    let Some(bytes) = read_signature_entry(reader)? else {
        return Ok(None);
    };
    Ok(Some(read_signature(&bytes)?))
}

/// Raw bytes of the signature entry. The entry must be stored, not compressed.
pub fn read_signature_entry<R: Read + Seek>(reader: &mut R) -> HashResult<Option<Vec<u8>>> {
    let metadata = read_archive_metadata(reader)?;
    let Some(entry) = metadata.signature_header() else {
        log::debug!("package is not signed");
        return Ok(None);
    };
    if entry.compression_method != ZIP_COMPRESSION_STORED {
        return Err(HashError::CompressedSignatureEntry(entry.compression_method));
    }
    let data_start = entry.offset_to_local_file_header + entry.local_file_header_size;
    let bytes = read_exact_at(reader, data_start, entry.compressed_size as usize)?;
    log::debug!("read package signature entry ({} bytes)", bytes.len());
    Ok(Some(bytes))
}

/// Whether the archive carries a signature entry.
pub fn is_signed<R: Read + Seek>(reader: &mut R) -> HashResult<bool> {
    Ok(read_archive_metadata(reader)?.is_signed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn archive(method: CompressionMethod, signature: &[u8]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file("content.txt", stored).unwrap();
        writer.write_all(b"content").unwrap();
        writer
            .start_file(
                ".signature.p7s",
                SimpleFileOptions::default().compression_method(method),
            )
            .unwrap();
        writer.write_all(signature).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn stored_entry_bytes_are_returned() {
        let bytes = archive(CompressionMethod::Stored, b"\x30\x00");
        let mut cursor = Cursor::new(&bytes);
        assert!(is_signed(&mut cursor).unwrap());
        assert_eq!(
            read_signature_entry(&mut cursor).unwrap(),
            Some(b"\x30\x00".to_vec())
        );
        assert!(matches!(
            read_package_signature(&mut cursor),
            Err(PackageSignatureError::Signature(_))
        ));
    }

    #[test]
    fn compressed_signature_entry_is_rejected() {
        let bytes = archive(CompressionMethod::Deflated, &[0x30; 256]);
        assert!(matches!(
            read_signature_entry(&mut Cursor::new(&bytes)),
            Err(HashError::CompressedSignatureEntry(8))
        ));
    }
}
