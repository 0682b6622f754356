//! Offset-rewrite properties of the signed-archive content hash.

mod common;

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use base64::prelude::{Engine as _, BASE64_STANDARD};
use proptest::prelude::*;
use sha2::{Digest, Sha512};
use zip::{CompressionMethod, ZipArchive};

use common::{zip_archive, zip_archive_with};
use nuget_package_signing::services::read_archive_metadata;
use nuget_package_signing::{content_hash, is_signed, write_unsigned_content, HashError};

const SIGNATURE_NAMES: [&str; 3] = [".signature.p7s", ".SIGNATURE.P7S", ".Signature.P7s"];

fn unsigned_stream(archive: &[u8]) -> Vec<u8> {
    let mut stream = Vec::new();
    assert!(write_unsigned_content(&mut Cursor::new(archive), &mut stream).unwrap());
    stream
}

fn eocdr_total_entries(stream: &[u8]) -> u16 {
    let eocdr = &stream[stream.len() - 22..];
    assert_eq!(&eocdr[..4], b"PK\x05\x06");
    u16::from_le_bytes([eocdr[10], eocdr[11]])
}

/// Entries with the signature inserted at `position`, plus the same entries without it.
fn with_signature<'a>(
    entries: &[(&'a str, &'a [u8])],
    position: usize,
    name: &'a str,
    signature: &'a [u8],
) -> Vec<(&'a str, &'a [u8])> {
    let mut signed = entries.to_vec();
    signed.insert(position.min(entries.len()), (name, signature));
    signed
}

fn check_exclusion(entries: &[(&str, &[u8])], position: usize, method: CompressionMethod) {
    let signature = vec![0x30; 1500];
    let signed = zip_archive_with(
        &with_signature(entries, position, SIGNATURE_NAMES[position % 3], &signature),
        method,
    );
    let unsigned = zip_archive_with(entries, method);

    let stream = unsigned_stream(&signed);
    assert_eq!(stream, unsigned);
    assert_eq!(usize::from(eocdr_total_entries(&stream)), entries.len());

    let reparsed = ZipArchive::new(Cursor::new(&stream)).unwrap();
    assert_eq!(reparsed.len(), entries.len());

    let expected = BASE64_STANDARD.encode(Sha512::digest(&unsigned));
    assert_eq!(content_hash(&mut Cursor::new(&signed)).unwrap(), Some(expected));
}

#[test]
fn signature_only_archive_hashes_as_an_empty_archive() {
    check_exclusion(&[], 0, CompressionMethod::Stored);
}

#[test]
fn two_entry_archive_with_signature_first_or_last() {
    let entries: Vec<(&str, &[u8])> = vec![("readme.txt", &b"hello"[..])];
    check_exclusion(&entries, 0, CompressionMethod::Stored);
    check_exclusion(&entries, 1, CompressionMethod::Stored);
}

#[test]
fn large_archive_with_signature_in_the_middle() {
    let names: Vec<String> = (0..60).map(|i| format!("content/file{i:03}.bin")).collect();
    let payloads: Vec<Vec<u8>> = (0..60u8).map(|i| vec![i; usize::from(i) * 7 + 1]).collect();
    let entries: Vec<(&str, &[u8])> = names
        .iter()
        .zip(&payloads)
        .map(|(name, data)| (name.as_str(), data.as_slice()))
        .collect();

    check_exclusion(&entries, 30, CompressionMethod::Stored);
    check_exclusion(&entries, 59, CompressionMethod::Deflated);

    let signed = zip_archive(&with_signature(&entries, 30, ".signature.p7s", b"sig"));
    let stream = unsigned_stream(&signed);
    let mut reparsed = ZipArchive::new(Cursor::new(stream)).unwrap();
    let mut data = Vec::new();
    reparsed
        .by_name("content/file045.bin")
        .unwrap()
        .read_to_end(&mut data)
        .unwrap();
    assert_eq!(data, payloads[45]);
}

#[test]
fn unsigned_archive_has_no_hash() {
    let archive = zip_archive(&common::package_entries());
    assert!(!is_signed(&mut Cursor::new(&archive)).unwrap());
    assert_eq!(content_hash(&mut Cursor::new(&archive)).unwrap(), None);
}

#[test]
fn second_signature_entry_is_an_invalid_archive() {
    let archive = zip_archive(&[
        (".signature.p7s", &b"one"[..]),
        ("a.txt", &b"a"[..]),
        (".SIGNATURE.p7s", &b"two"[..]),
    ]);
    assert!(matches!(
        read_archive_metadata(&mut Cursor::new(&archive)),
        Err(HashError::InvalidArchive(_))
    ));
}

#[test]
fn truncated_archive_is_an_error_not_a_hash() {
    let archive = zip_archive(&[("a.txt", &b"alpha"[..]), (".signature.p7s", &b"sig"[..])]);
    let truncated = &archive[..archive.len() - 5];
    assert!(content_hash(&mut Cursor::new(truncated)).is_err());
}

fn entries_strategy() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(
        "[a-z]{1,10}(/[a-z]{1,6})?\\.(txt|dll|xml)",
        prop::collection::vec(any::<u8>(), 0..300),
        0..12,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn hash_matches_archive_written_without_signature(
        entries in entries_strategy(),
        position in 0usize..12,
        deflate in any::<bool>(),
    ) {
        let entries: Vec<(&str, &[u8])> = entries
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
            .collect();
        let method = if deflate { CompressionMethod::Deflated } else { CompressionMethod::Stored };
        check_exclusion(&entries, position, method);
    }

    #[test]
    fn hash_is_deterministic_and_sensitive_to_one_byte(
        entries in entries_strategy().prop_filter("needs a payload byte", |e| e.values().any(|d| !d.is_empty())),
        position in 0usize..12,
    ) {
        let owned: Vec<(String, Vec<u8>)> = entries.into_iter().collect();
        let view: Vec<(&str, &[u8])> = owned
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
            .collect();
        let signed = zip_archive(&with_signature(&view, position, ".signature.p7s", b"signature"));

        let first = content_hash(&mut Cursor::new(&signed)).unwrap();
        let second = content_hash(&mut Cursor::new(&signed)).unwrap();
        prop_assert!(first.is_some());
        prop_assert_eq!(&first, &second);

        let mut changed = owned.clone();
        let target = changed.iter_mut().find(|(_, data)| !data.is_empty()).unwrap();
        target.1[0] ^= 0x01;
        let changed_view: Vec<(&str, &[u8])> = changed
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
            .collect();
        let changed_signed =
            zip_archive(&with_signature(&changed_view, position, ".signature.p7s", b"signature"));
        prop_assert_ne!(first, content_hash(&mut Cursor::new(&changed_signed)).unwrap());
    }
}
