//! Fixed-layout ZIP records (APPNOTE 4.3.7, 4.3.12, 4.3.16).
//!
//! All multi-byte fields are little-endian. Parsers take the record bytes
//! starting at the signature and never read past the slice.

use crate::domain::constants::{
    ZIP_CENTRAL_DIRECTORY_HEADER_FIXED_SIZE, ZIP_CENTRAL_DIRECTORY_HEADER_SIGNATURE,
    ZIP_CENTRAL_HEADER_LOCAL_OFFSET_FIELD, ZIP_END_OF_CENTRAL_DIRECTORY_FIXED_SIZE,
    ZIP_END_OF_CENTRAL_DIRECTORY_SIGNATURE, ZIP_EOCDR_CENTRAL_DIRECTORY_OFFSET_FIELD,
    ZIP_EOCDR_CENTRAL_DIRECTORY_SIZE_FIELD, ZIP_EOCDR_ENTRIES_ON_DISK_FIELD,
    ZIP_EOCDR_TOTAL_ENTRIES_FIELD, ZIP_LOCAL_FILE_HEADER_FIXED_SIZE,
    ZIP_LOCAL_FILE_HEADER_SIGNATURE,
};
use crate::infra::error::{HashError, HashResult};

pub(crate) fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

pub(crate) fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn put_u16(bytes: &mut [u8], at: usize, value: u16) {
    bytes[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(bytes: &mut [u8], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn invalid(message: impl Into<String>) -> HashError {
    HashError::InvalidArchive(message.into())
}

/// End of central directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfCentralDirectoryRecord {
    pub disk_number: u16,
    pub central_directory_disk: u16,
    pub entries_on_disk: u16,
    pub total_entries: u16,
    pub central_directory_size: u32,
    pub central_directory_offset: u32,
    pub comment_length: u16,
}

impl EndOfCentralDirectoryRecord {
    /// Locate the record inside the archive tail: the last signature whose
    /// comment length runs exactly to the end of `tail`.
    #[must_use]
    pub fn find(tail: &[u8]) -> Option<usize> {
        let last_start = tail.len().checked_sub(ZIP_END_OF_CENTRAL_DIRECTORY_FIXED_SIZE)?;
        (0..=last_start).rev().find(|&start| {
            le_u32(tail, start) == ZIP_END_OF_CENTRAL_DIRECTORY_SIGNATURE
                && start
                    + ZIP_END_OF_CENTRAL_DIRECTORY_FIXED_SIZE
                    + usize::from(le_u16(tail, start + 20))
                    == tail.len()
        })
    }

    pub fn parse(bytes: &[u8]) -> HashResult<Self> {
        if bytes.len() < ZIP_END_OF_CENTRAL_DIRECTORY_FIXED_SIZE
            || le_u32(bytes, 0) != ZIP_END_OF_CENTRAL_DIRECTORY_SIGNATURE
        {
            return Err(invalid("end of central directory record not found"));
        }
        Ok(Self {
            disk_number: le_u16(bytes, 4),
            central_directory_disk: le_u16(bytes, 6),
            entries_on_disk: le_u16(bytes, ZIP_EOCDR_ENTRIES_ON_DISK_FIELD),
            total_entries: le_u16(bytes, ZIP_EOCDR_TOTAL_ENTRIES_FIELD),
            central_directory_size: le_u32(bytes, ZIP_EOCDR_CENTRAL_DIRECTORY_SIZE_FIELD),
            central_directory_offset: le_u32(bytes, ZIP_EOCDR_CENTRAL_DIRECTORY_OFFSET_FIELD),
            comment_length: le_u16(bytes, 20),
        })
    }

    /// Saturated fields mean the real values live in a ZIP64 record.
    #[must_use]
    pub fn is_zip64(&self) -> bool {
        self.entries_on_disk == u16::MAX
            || self.total_entries == u16::MAX
            || self.central_directory_size == u32::MAX
            || self.central_directory_offset == u32::MAX
    }

    /// Rewrite a copy of the record as if one entry of the given sizes had
    /// never been written.
    pub fn rewrite_without_entry(
        record: &mut [u8],
        removed_header_size: u32,
        removed_entry_size: u32,
    ) -> HashResult<()> {
        let parsed = Self::parse(record)?;
        let entries_on_disk = parsed
            .entries_on_disk
            .checked_sub(1)
            .ok_or_else(|| invalid("entry count underflow"))?;
        let total_entries = parsed
            .total_entries
            .checked_sub(1)
            .ok_or_else(|| invalid("entry count underflow"))?;
        let cd_size = parsed
            .central_directory_size
            .checked_sub(removed_header_size)
            .ok_or_else(|| invalid("central directory size underflow"))?;
        let cd_offset = parsed
            .central_directory_offset
            .checked_sub(removed_entry_size)
            .ok_or_else(|| invalid("central directory offset underflow"))?;
        put_u16(record, ZIP_EOCDR_ENTRIES_ON_DISK_FIELD, entries_on_disk);
        put_u16(record, ZIP_EOCDR_TOTAL_ENTRIES_FIELD, total_entries);
        put_u32(record, ZIP_EOCDR_CENTRAL_DIRECTORY_SIZE_FIELD, cd_size);
        put_u32(record, ZIP_EOCDR_CENTRAL_DIRECTORY_OFFSET_FIELD, cd_offset);
        Ok(())
    }
}

/// Central directory file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    pub flags: u16,
    pub compression_method: u16,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name: Vec<u8>,
    pub disk_number_start: u16,
    pub local_header_offset: u32,
    /// Fixed part plus name, extra field and comment.
    pub header_size: usize,
}

impl CentralDirectoryHeader {
    /// Parse the header at the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> HashResult<Self> {
        if bytes.len() < ZIP_CENTRAL_DIRECTORY_HEADER_FIXED_SIZE {
            return Err(invalid("truncated central directory header"));
        }
        if le_u32(bytes, 0) != ZIP_CENTRAL_DIRECTORY_HEADER_SIGNATURE {
            return Err(invalid(format!(
                "bad central directory header signature 0x{:08x}",
                le_u32(bytes, 0)
            )));
        }
        let name_length = usize::from(le_u16(bytes, 28));
        let extra_length = usize::from(le_u16(bytes, 30));
        let comment_length = usize::from(le_u16(bytes, 32));
        let header_size =
            ZIP_CENTRAL_DIRECTORY_HEADER_FIXED_SIZE + name_length + extra_length + comment_length;
        if bytes.len() < header_size {
            return Err(invalid("truncated central directory header"));
        }
        let name_start = ZIP_CENTRAL_DIRECTORY_HEADER_FIXED_SIZE;
        Ok(Self {
            flags: le_u16(bytes, 8),
            compression_method: le_u16(bytes, 10),
            compressed_size: le_u32(bytes, 20),
            uncompressed_size: le_u32(bytes, 24),
            file_name: bytes[name_start..name_start + name_length].to_vec(),
            disk_number_start: le_u16(bytes, 34),
            local_header_offset: le_u32(bytes, ZIP_CENTRAL_HEADER_LOCAL_OFFSET_FIELD),
            header_size,
        })
    }

    #[must_use]
    pub fn is_zip64(&self) -> bool {
        self.compressed_size == u32::MAX
            || self.uncompressed_size == u32::MAX
            || self.local_header_offset == u32::MAX
            || self.disk_number_start == u16::MAX
    }

    #[must_use]
    pub fn file_name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.file_name).into_owned()
    }

    /// Overwrite the "relative offset of local header" field of a header copy.
    pub fn rewrite_local_header_offset(header: &mut [u8], offset: u32) {
        put_u32(header, ZIP_CENTRAL_HEADER_LOCAL_OFFSET_FIELD, offset);
    }
}

/// Local file header; only the fields needed to find the entry data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub compression_method: u16,
    pub name_length: u16,
    pub extra_length: u16,
}

impl LocalFileHeader {
    pub fn parse(bytes: &[u8]) -> HashResult<Self> {
        if bytes.len() < ZIP_LOCAL_FILE_HEADER_FIXED_SIZE {
            return Err(invalid("truncated local file header"));
        }
        if le_u32(bytes, 0) != ZIP_LOCAL_FILE_HEADER_SIGNATURE {
            return Err(invalid(format!(
                "bad local file header signature 0x{:08x}",
                le_u32(bytes, 0)
            )));
        }
        Ok(Self {
            compression_method: le_u16(bytes, 8),
            name_length: le_u16(bytes, 26),
            extra_length: le_u16(bytes, 28),
        })
    }

    /// Fixed part plus name and extra field.
    #[must_use]
    pub fn header_size(&self) -> usize {
        ZIP_LOCAL_FILE_HEADER_FIXED_SIZE + usize::from(self.name_length) + usize::from(self.extra_length)
    }
}
