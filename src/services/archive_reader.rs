//! Walks the on-disk layout of a package archive.
//!
//! Reads the end of central directory record from the tail, then every
//! central directory header, then each entry's local header, producing a
//! [`SignedPackageArchiveMetadata`]. Only single-disk, non-ZIP64 archives whose
//! central directory ends exactly at the EOCDR are accepted.

use std::io::{Read, Seek, SeekFrom};

use crate::domain::archive::records::le_u32;
use crate::domain::archive::{
    CentralDirectoryHeader, EndOfCentralDirectoryRecord, LocalFileHeader,
    SignedPackageArchiveMetadata,
};
use crate::domain::constants::{
    ZIP64_END_OF_CENTRAL_DIRECTORY_LOCATOR_SIGNATURE, ZIP64_END_OF_CENTRAL_DIRECTORY_LOCATOR_SIZE,
    ZIP_END_OF_CENTRAL_DIRECTORY_FIXED_SIZE, ZIP_LOCAL_FILE_HEADER_FIXED_SIZE,
    ZIP_MAX_COMMENT_LENGTH,
};
use crate::infra::error::{HashError, HashResult};

/// Read the archive layout. The stream position afterwards is unspecified.
pub fn read_archive_metadata<R: Read + Seek>(
    reader: &mut R,
) -> HashResult<SignedPackageArchiveMetadata> {
    let length = reader.seek(SeekFrom::End(0))?;
    let (eocd_position, eocd) = locate_end_of_central_directory(reader, length)?;
    log::debug!(
        "EOCDR at {eocd_position}: {} entries, central directory {} bytes at {}",
        eocd.total_entries,
        eocd.central_directory_size,
        eocd.central_directory_offset
    );

    if eocd.is_zip64() || has_zip64_locator(reader, eocd_position)? {
        return Err(HashError::Zip64Unsupported);
    }
    if eocd.disk_number != 0
        || eocd.central_directory_disk != 0
        || eocd.entries_on_disk != eocd.total_entries
    {
        return Err(invalid("multi-disk archives are not supported"));
    }

    let cd_offset = u64::from(eocd.central_directory_offset);
    let cd_size = u64::from(eocd.central_directory_size);
    if cd_offset + cd_size != eocd_position {
        return Err(invalid(format!(
            "central directory ({cd_size} bytes at {cd_offset}) does not end at the EOCDR ({eocd_position})"
        )));
    }

    let central_directory = read_exact_at(reader, cd_offset, cd_size as usize)?;
    let mut headers = Vec::with_capacity(usize::from(eocd.total_entries));
    let mut cursor = 0usize;
    for _ in 0..eocd.total_entries {
        let header = CentralDirectoryHeader::parse(&central_directory[cursor..])?;
        if header.is_zip64() {
            return Err(HashError::Zip64Unsupported);
        }
        if header.disk_number_start != 0 {
            return Err(invalid("multi-disk archives are not supported"));
        }
        let size = header.header_size;
        headers.push((cd_offset + cursor as u64, header));
        cursor += size;
    }
    if cursor != central_directory.len() {
        return Err(invalid(format!(
            "central directory holds {} bytes beyond its {} headers",
            central_directory.len() - cursor,
            eocd.total_entries
        )));
    }

    let mut metadata =
        SignedPackageArchiveMetadata::from_headers(headers, cd_offset, eocd_position)?;

    for entry in &mut metadata.central_directory_headers {
        let bytes = read_exact_at(
            reader,
            entry.offset_to_local_file_header,
            ZIP_LOCAL_FILE_HEADER_FIXED_SIZE,
        )?;
        let local = LocalFileHeader::parse(&bytes)?;
        entry.local_file_header_size = local.header_size() as u64;
        if entry.local_file_header_size + entry.compressed_size > entry.file_entry_total_size {
            return Err(invalid(format!(
                "entry '{}' runs past the next record",
                entry.file_name
            )));
        }
    }

    log::debug!(
        "archive has {} entries, signed: {}",
        metadata.central_directory_headers.len(),
        metadata.is_signed()
    );
    Ok(metadata)
}

fn locate_end_of_central_directory<R: Read + Seek>(
    reader: &mut R,
    length: u64,
) -> HashResult<(u64, EndOfCentralDirectoryRecord)> {
    let max_tail = (ZIP_END_OF_CENTRAL_DIRECTORY_FIXED_SIZE + ZIP_MAX_COMMENT_LENGTH) as u64;
    let tail_length = length.min(max_tail);
    let tail_start = length - tail_length;
    let tail = read_exact_at(reader, tail_start, tail_length as usize)?;
    let position = EndOfCentralDirectoryRecord::find(&tail)
        .ok_or_else(|| invalid("end of central directory record not found"))?;
    let record = EndOfCentralDirectoryRecord::parse(&tail[position..])?;
    Ok((tail_start + position as u64, record))
}

fn has_zip64_locator<R: Read + Seek>(reader: &mut R, eocd_position: u64) -> HashResult<bool> {
    let locator_size = ZIP64_END_OF_CENTRAL_DIRECTORY_LOCATOR_SIZE as u64;
    if eocd_position < locator_size {
        return Ok(false);
    }
    let bytes = read_exact_at(reader, eocd_position - locator_size, 4)?;
    Ok(le_u32(&bytes, 0) == ZIP64_END_OF_CENTRAL_DIRECTORY_LOCATOR_SIGNATURE)
}

pub(crate) fn read_exact_at<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    length: usize,
) -> HashResult<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buffer = vec![0u8; length];
    reader.read_exact(&mut buffer).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            invalid(format!("truncated archive: {length} bytes expected at {offset}"))
        } else {
            HashError::Io(e)
        }
    })?;
    Ok(buffer)
}

fn invalid(message: impl Into<String>) -> HashError {
    HashError::InvalidArchive(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn archive(names: &[&str]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for name in names {
            writer.start_file(*name, options).unwrap();
            writer.write_all(name.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn metadata_for_signed_archive() {
        let bytes = archive(&["a.txt", ".signature.p7s", "lib/b.dll"]);
        let metadata = read_archive_metadata(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(metadata.central_directory_headers.len(), 3);
        assert_eq!(metadata.start_of_local_file_headers, 0);
        let signature = metadata.signature_header().unwrap();
        assert_eq!(signature.file_name, ".signature.p7s");
        assert!(signature.local_file_header_size >= 30 + 14);
        let last = &metadata.central_directory_headers[2];
        assert_eq!(last.change_in_offset, signature.file_entry_total_size);
    }

    #[test]
    fn unsigned_archive_has_no_signature_header() {
        let bytes = archive(&["a.txt"]);
        let metadata = read_archive_metadata(&mut Cursor::new(&bytes)).unwrap();
        assert!(!metadata.is_signed());
    }

    #[test]
    fn garbage_is_not_an_archive() {
        let err = read_archive_metadata(&mut Cursor::new(vec![0u8; 64])).unwrap_err();
        assert!(matches!(err, HashError::InvalidArchive(_)));
    }

    #[test]
    fn trailing_bytes_after_eocdr_are_rejected() {
        let mut bytes = archive(&["a.txt"]);
        bytes.extend_from_slice(b"junk");
        assert!(read_archive_metadata(&mut Cursor::new(&bytes)).is_err());
    }
}
