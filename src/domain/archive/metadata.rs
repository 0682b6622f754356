//! Per-computation layout of a signed package archive.
//!
//! Built once per hash or extraction call and then dropped. The interesting
//! part is `change_in_offset`: the number of signature-entry bytes that sit
//! before a given entry, which is what that entry's offset must shrink by for
//! the archive to read as though the signature entry had never been written.

use crate::domain::constants::SIGNATURE_FILE_NAME;
use crate::infra::error::{HashError, HashResult};

use super::records::CentralDirectoryHeader;

/// One central directory header plus the derived layout of its entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryHeaderMetadata {
    /// Stream position of the central directory header.
    pub position: u64,
    /// Length of the central directory header.
    pub header_size: u64,
    pub offset_to_local_file_header: u64,
    /// Local header + data (+ data descriptor): distance to the next entry.
    pub file_entry_total_size: u64,
    /// Length of the local file header, filled in from the stream.
    pub local_file_header_size: u64,
    pub compression_method: u16,
    pub compressed_size: u64,
    pub file_name: String,
    pub is_package_signature_file: bool,
    /// Index of this header within the central directory.
    pub index_in_headers: usize,
    /// Signature-entry bytes located before this entry.
    pub change_in_offset: u64,
}

/// Layout of the whole archive as seen through its central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPackageArchiveMetadata {
    pub start_of_local_file_headers: u64,
    pub start_of_central_directory: u64,
    pub end_of_central_directory: u64,
    /// Headers in central directory order.
    pub central_directory_headers: Vec<CentralDirectoryHeaderMetadata>,
    pub signature_central_directory_header_index: Option<usize>,
}

/// Root-level, case-insensitive match on the signature entry name.
#[must_use]
pub fn is_package_signature_file(name: &[u8]) -> bool {
    name.eq_ignore_ascii_case(SIGNATURE_FILE_NAME.as_bytes())
}

impl SignedPackageArchiveMetadata {
    /// Derive entry sizes and offset corrections from parsed central directory
    /// headers and their stream positions.
    pub fn from_headers(
        headers: Vec<(u64, CentralDirectoryHeader)>,
        start_of_central_directory: u64,
        end_of_central_directory: u64,
    ) -> HashResult<Self> {
        let mut entries: Vec<CentralDirectoryHeaderMetadata> = headers
            .into_iter()
            .enumerate()
            .map(|(index, (position, header))| CentralDirectoryHeaderMetadata {
                position,
                header_size: header.header_size as u64,
                offset_to_local_file_header: u64::from(header.local_header_offset),
                file_entry_total_size: 0,
                local_file_header_size: 0,
                compression_method: header.compression_method,
                compressed_size: u64::from(header.compressed_size),
                file_name: header.file_name_lossy(),
                is_package_signature_file: is_package_signature_file(&header.file_name),
                index_in_headers: index,
                change_in_offset: 0,
            })
            .collect();

        let signature_indices: Vec<usize> = entries
            .iter()
            .filter(|e| e.is_package_signature_file)
            .map(|e| e.index_in_headers)
            .collect();
        if signature_indices.len() > 1 {
            return Err(HashError::InvalidArchive(format!(
                "{} package signature entries found; at most one is allowed",
                signature_indices.len()
            )));
        }

        let mut by_offset: Vec<usize> = (0..entries.len()).collect();
        by_offset.sort_by_key(|&i| entries[i].offset_to_local_file_header);

        for (rank, &index) in by_offset.iter().enumerate() {
            let start = entries[index].offset_to_local_file_header;
            let end = match by_offset.get(rank + 1) {
                Some(&next) => entries[next].offset_to_local_file_header,
                None => start_of_central_directory,
            };
            if end <= start {
                return Err(HashError::InvalidArchive(format!(
                    "entry '{}' at offset {start} overlaps the next record",
                    entries[index].file_name
                )));
            }
            entries[index].file_entry_total_size = end - start;
        }

        let mut removed = 0u64;
        for &index in &by_offset {
            entries[index].change_in_offset = removed;
            if entries[index].is_package_signature_file {
                removed += entries[index].file_entry_total_size;
            }
        }

        let start_of_local_file_headers = by_offset
            .first()
            .map_or(start_of_central_directory, |&i| {
                entries[i].offset_to_local_file_header
            });

        Ok(Self {
            start_of_local_file_headers,
            start_of_central_directory,
            end_of_central_directory,
            central_directory_headers: entries,
            signature_central_directory_header_index: signature_indices.first().copied(),
        })
    }

    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.signature_central_directory_header_index.is_some()
    }

    #[must_use]
    pub fn signature_header(&self) -> Option<&CentralDirectoryHeaderMetadata> {
        self.signature_central_directory_header_index
            .map(|i| &self.central_directory_headers[i])
    }

    /// Headers sorted by local header offset, the order entries appear on disk.
    #[must_use]
    pub fn headers_by_offset(&self) -> Vec<&CentralDirectoryHeaderMetadata> {
        let mut sorted: Vec<&CentralDirectoryHeaderMetadata> =
            self.central_directory_headers.iter().collect();
        sorted.sort_by_key(|h| h.offset_to_local_file_header);
        sorted
    }
}
