//! Minimal DER reader.
//!
//! Reads one TLV at a time from a borrowed buffer. Only the single-byte tag form
//! and definite lengths are accepted, which covers every structure in the CMS,
//! ESS and RFC 3161 grammars this crate handles.

use crate::domain::constants::{
    ASN1_BOOLEAN_TAG, ASN1_INTEGER_TAG, ASN1_OCTET_STRING_TAG, ASN1_OID_TAG, ASN1_SEQUENCE_TAG,
    ASN1_SET_TAG,
};
use crate::infra::error::{Asn1Error, Asn1Result};

/// A decoded tag-length-value triple borrowing from the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tag: u8,
    /// Content octets only.
    pub content: &'a [u8],
    /// Complete encoding: tag, length and content.
    pub raw: &'a [u8],
}

impl<'a> Tlv<'a> {
    #[must_use]
    pub fn is_constructed(&self) -> bool {
        self.tag & 0x20 != 0
    }

    /// Reader over the content octets.
    #[must_use]
    pub fn reader(&self) -> DerReader<'a> {
        DerReader::new(self.content)
    }
}

/// Sequential DER reader.
#[derive(Clone, Debug)]
pub struct DerReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DerReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    #[must_use]
    pub fn peek_tag(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Read the next TLV, whatever its tag.
    pub fn read_tlv(&mut self, what: &'static str) -> Asn1Result<Tlv<'a>> {
        let start = self.pos;
        let tag = *self.data.get(start).ok_or(Asn1Error::Truncated(what))?;
        if tag & 0x1f == 0x1f {
            return Err(Asn1Error::malformed(what, "multi-byte tags are not supported"));
        }
        let (length, length_octets) = decode_length(&self.data[start + 1..], what)?;
        let content_start = start + 1 + length_octets;
        let end = content_start
            .checked_add(length)
            .ok_or(Asn1Error::InvalidLength(what))?;
        if end > self.data.len() {
            return Err(Asn1Error::Truncated(what));
        }
        self.pos = end;
        Ok(Tlv {
            tag,
            content: &self.data[content_start..end],
            raw: &self.data[start..end],
        })
    }

    /// Read the next TLV and require a specific tag.
    pub fn read_expected(&mut self, tag: u8, what: &'static str) -> Asn1Result<Tlv<'a>> {
        match self.peek_tag() {
            None => Err(Asn1Error::Truncated(what)),
            Some(actual) if actual != tag => Err(Asn1Error::UnexpectedTag {
                what,
                expected: tag,
                actual,
            }),
            Some(_) => self.read_tlv(what),
        }
    }

    /// Read the next TLV only if it carries `tag`.
    pub fn read_optional(&mut self, tag: u8, what: &'static str) -> Asn1Result<Option<Tlv<'a>>> {
        if self.peek_tag() == Some(tag) {
            self.read_tlv(what).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn read_sequence(&mut self, what: &'static str) -> Asn1Result<DerReader<'a>> {
        Ok(self.read_expected(ASN1_SEQUENCE_TAG, what)?.reader())
    }

    pub fn read_set(&mut self, what: &'static str) -> Asn1Result<DerReader<'a>> {
        Ok(self.read_expected(ASN1_SET_TAG, what)?.reader())
    }

    /// INTEGER content octets (two's complement, as encoded).
    pub fn read_integer(&mut self, what: &'static str) -> Asn1Result<&'a [u8]> {
        let tlv = self.read_expected(ASN1_INTEGER_TAG, what)?;
        if tlv.content.is_empty() {
            return Err(Asn1Error::malformed(what, "empty INTEGER"));
        }
        Ok(tlv.content)
    }

    /// INTEGER that must fit an `i64`.
    pub fn read_small_integer(&mut self, what: &'static str) -> Asn1Result<i64> {
        let content = self.read_integer(what)?;
        integer_to_i64(content).ok_or_else(|| Asn1Error::malformed(what, "INTEGER out of range"))
    }

    pub fn read_oid(&mut self, what: &'static str) -> Asn1Result<&'a [u8]> {
        let tlv = self.read_expected(ASN1_OID_TAG, what)?;
        if tlv.content.is_empty() {
            return Err(Asn1Error::malformed(what, "empty OBJECT IDENTIFIER"));
        }
        Ok(tlv.content)
    }

    pub fn read_octet_string(&mut self, what: &'static str) -> Asn1Result<&'a [u8]> {
        Ok(self.read_expected(ASN1_OCTET_STRING_TAG, what)?.content)
    }

    pub fn read_boolean(&mut self, what: &'static str) -> Asn1Result<bool> {
        let tlv = self.read_expected(ASN1_BOOLEAN_TAG, what)?;
        match tlv.content {
            [0x00] => Ok(false),
            [0xff] => Ok(true),
            _ => Err(Asn1Error::malformed(what, "BOOLEAN must be 0x00 or 0xff")),
        }
    }

    /// Require that the reader has been fully consumed.
    pub fn finish(&self, what: &'static str) -> Asn1Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Asn1Error::TrailingData {
                what,
                count: self.data.len() - self.pos,
            })
        }
    }
}

/// Decode a definite DER length. Returns `(length, octets consumed)`.
pub fn decode_length(data: &[u8], what: &'static str) -> Asn1Result<(usize, usize)> {
    let first = *data.first().ok_or(Asn1Error::Truncated(what))?;
    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }
    let count = (first & 0x7f) as usize;
    if count == 0 {
        return Err(Asn1Error::IndefiniteLength(what));
    }
    if count > 4 {
        return Err(Asn1Error::InvalidLength(what));
    }
    if data.len() < 1 + count {
        return Err(Asn1Error::Truncated(what));
    }
    let mut length = 0usize;
    for &byte in &data[1..=count] {
        length = (length << 8) | byte as usize;
    }
    Ok((length, 1 + count))
}

/// Interpret INTEGER content octets as a signed 64-bit value.
#[must_use]
pub fn integer_to_i64(content: &[u8]) -> Option<i64> {
    if content.is_empty() || content.len() > 8 {
        return None;
    }
    let negative = content[0] & 0x80 != 0;
    let mut value: i64 = if negative { -1 } else { 0 };
    for &byte in content {
        value = (value << 8) | i64::from(byte);
    }
    Some(value)
}

/// Strip sign-padding zero octets so magnitudes encoded differently compare equal.
#[must_use]
pub fn integer_magnitude(content: &[u8]) -> &[u8] {
    let leading = content.iter().take_while(|&&b| b == 0).count();
    if leading == content.len() {
        &content[content.len().saturating_sub(1)..]
    } else {
        &content[leading..]
    }
}

/// Parse a buffer that must contain exactly one TLV.
pub fn parse_single<'a>(data: &'a [u8], what: &'static str) -> Asn1Result<Tlv<'a>> {
    let mut reader = DerReader::new(data);
    let tlv = reader.read_tlv(what)?;
    reader.finish(what)?;
    Ok(tlv)
}
