//! DER encoding helpers.
//!
//! Structures are assembled bottom-up from already-encoded children, the same
//! way the SignedData and TimeStampReq layouts are written by hand elsewhere.

use crate::domain::constants::{
    ASN1_BOOLEAN_TAG, ASN1_INTEGER_TAG, ASN1_NULL, ASN1_OCTET_STRING_TAG, ASN1_OID_TAG,
    ASN1_SEQUENCE_TAG, ASN1_SET_TAG,
};

/// Encode a definite length in the shortest form.
#[must_use]
pub fn encode_length(length: usize) -> Vec<u8> {
    if length < 0x80 {
        return vec![length as u8];
    }
    let bytes = (length as u64).to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    let mut out = Vec::with_capacity(1 + bytes.len() - skip);
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
    out
}

#[must_use]
pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 6);
    out.push(tag);
    out.extend_from_slice(&encode_length(content.len()));
    out.extend_from_slice(content);
    out
}

/// Wrap already-encoded children with `tag`.
#[must_use]
pub fn constructed(tag: u8, parts: &[&[u8]]) -> Vec<u8> {
    tlv(tag, &parts.concat())
}

#[must_use]
pub fn sequence(parts: &[&[u8]]) -> Vec<u8> {
    constructed(ASN1_SEQUENCE_TAG, parts)
}

/// SET with members kept in the given order.
#[must_use]
pub fn set(parts: &[&[u8]]) -> Vec<u8> {
    constructed(ASN1_SET_TAG, parts)
}

/// SET OF with members sorted by their encodings (X.690 11.6).
#[must_use]
pub fn set_of_sorted(mut parts: Vec<Vec<u8>>) -> Vec<u8> {
    parts.sort();
    tlv(ASN1_SET_TAG, &parts.concat())
}

/// Minimal positive INTEGER content octets for an unsigned big-endian magnitude.
#[must_use]
pub fn integer_content_unsigned(magnitude: &[u8]) -> Vec<u8> {
    let skip = magnitude.iter().take_while(|&&b| b == 0).count();
    let trimmed = &magnitude[skip..];
    let mut content = Vec::with_capacity(trimmed.len() + 1);
    if trimmed.is_empty() || trimmed[0] & 0x80 != 0 {
        content.push(0x00);
    }
    content.extend_from_slice(trimmed);
    content
}

/// INTEGER from an unsigned big-endian magnitude.
#[must_use]
pub fn integer_unsigned(magnitude: &[u8]) -> Vec<u8> {
    tlv(ASN1_INTEGER_TAG, &integer_content_unsigned(magnitude))
}

#[must_use]
pub fn integer_u64(value: u64) -> Vec<u8> {
    integer_unsigned(&value.to_be_bytes())
}

#[must_use]
pub fn oid(content: &[u8]) -> Vec<u8> {
    tlv(ASN1_OID_TAG, content)
}

#[must_use]
pub fn octet_string(content: &[u8]) -> Vec<u8> {
    tlv(ASN1_OCTET_STRING_TAG, content)
}

#[must_use]
pub fn boolean(value: bool) -> Vec<u8> {
    tlv(ASN1_BOOLEAN_TAG, &[if value { 0xff } else { 0x00 }])
}

#[must_use]
pub fn null() -> Vec<u8> {
    ASN1_NULL.to_vec()
}
