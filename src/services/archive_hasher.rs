//! Signed-archive content hasher.
//!
//! The content hash of a signed package is the SHA-512 of the archive as it
//! would have been written without its `.signature.p7s` entry. The archive is
//! never rewritten: the byte stream is produced on the fly, with the offsets
//! that removing the entry would change patched in copies of the records.

use std::io::{self, Read, Seek, SeekFrom, Write};

use base64::prelude::{Engine as _, BASE64_STANDARD};
use sha2::{Digest, Sha512};

use crate::domain::archive::{
    CentralDirectoryHeader, EndOfCentralDirectoryRecord, SignedPackageArchiveMetadata,
};
use crate::infra::error::{HashError, HashResult};
use crate::services::archive_reader::{read_archive_metadata, read_exact_at};

/// Base64 SHA-512 of the unsigned content, or `None` for an unsigned archive.
pub fn content_hash<R: Read + Seek>(reader: &mut R) -> HashResult<Option<String>> {
    let mut sink = DigestSink(Sha512::new());
    if !write_unsigned_content(reader, &mut sink)? {
        log::debug!("archive carries no package signature; no content hash");
        return Ok(None);
    }
    let hash = BASE64_STANDARD.encode(sink.0.finalize());
    log::debug!("package content hash: {hash}");
    Ok(Some(hash))
}

/// Write the bytes [`content_hash`] digests. Returns `false`, writing nothing,
/// when the archive has no signature entry.
pub fn write_unsigned_content<R: Read + Seek, W: Write>(
    reader: &mut R,
    sink: &mut W,
) -> HashResult<bool> {
    let metadata = read_archive_metadata(reader)?;
    let Some(signature) = metadata.signature_header() else {
        return Ok(false);
    };
    let removed_header_size = to_u32(signature.header_size, "signature header size")?;
    let removed_entry_size = to_u32(signature.file_entry_total_size, "signature entry size")?;

    copy_range(reader, sink, 0, metadata.start_of_local_file_headers)?;
    let mut written = metadata.start_of_local_file_headers;

    for entry in metadata.headers_by_offset() {
        if entry.is_package_signature_file {
            continue;
        }
        copy_range(
            reader,
            sink,
            entry.offset_to_local_file_header,
            entry.file_entry_total_size,
        )?;
        written += entry.file_entry_total_size;
    }

    write_central_directory(reader, sink, &metadata)?;

    let mut record = read_to_end_from(reader, metadata.end_of_central_directory)?;
    EndOfCentralDirectoryRecord::rewrite_without_entry(
        &mut record,
        removed_header_size,
        removed_entry_size,
    )?;
    sink.write_all(&record)?;

    log::debug!(
        "wrote unsigned content: {} entries, {written} bytes of local data",
        metadata.central_directory_headers.len() - 1
    );
    Ok(true)
}

fn write_central_directory<R: Read + Seek, W: Write>(
    reader: &mut R,
    sink: &mut W,
    metadata: &SignedPackageArchiveMetadata,
) -> HashResult<()> {
    for entry in &metadata.central_directory_headers {
        if entry.is_package_signature_file {
            continue;
        }
        let mut header = read_exact_at(reader, entry.position, entry.header_size as usize)?;
        let offset = entry
            .offset_to_local_file_header
            .checked_sub(entry.change_in_offset)
            .ok_or_else(|| {
                HashError::InvalidArchive(format!("offset underflow for '{}'", entry.file_name))
            })?;
        CentralDirectoryHeader::rewrite_local_header_offset(
            &mut header,
            to_u32(offset, "local header offset")?,
        );
        sink.write_all(&header)?;
    }
    Ok(())
}

fn copy_range<R: Read + Seek, W: Write>(
    reader: &mut R,
    sink: &mut W,
    start: u64,
    length: u64,
) -> HashResult<()> {
    reader.seek(SeekFrom::Start(start))?;
    let copied = io::copy(&mut reader.by_ref().take(length), sink)?;
    if copied != length {
        return Err(HashError::InvalidArchive(format!(
            "truncated archive: {length} bytes expected at {start}, {copied} available"
        )));
    }
    Ok(())
}

fn read_to_end_from<R: Read + Seek>(reader: &mut R, start: u64) -> HashResult<Vec<u8>> {
    reader.seek(SeekFrom::Start(start))?;
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;
    Ok(buffer)
}

fn to_u32(value: u64, what: &str) -> HashResult<u32> {
    u32::try_from(value)
        .map_err(|_| HashError::InvalidArchive(format!("{what} {value} exceeds 32 bits")))
}

struct DigestSink<D>(D);

impl<D: Digest> Write for DigestSink<D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
