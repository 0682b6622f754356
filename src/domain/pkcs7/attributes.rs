//! CMS `Attribute` and attribute sets.
//!
//! Signed and unsigned attributes travel as `[0]`/`[1] IMPLICIT SET OF
//! Attribute`, so the SET tag never appears on the wire. [`parse_attributes`]
//! is the one place that walks those contents; everything else works with the
//! decoded [`Attribute`] records.

use std::fmt;

use crate::domain::asn1::{oid_to_string, writer, DerReader};
use crate::domain::constants::ASN1_SET_TAG;
use crate::infra::error::Asn1Result;

/// One `Attribute ::= SEQUENCE { attrType OID, attrValues SET OF AttributeValue }`.
#[derive(Clone, PartialEq, Eq)]
pub struct Attribute {
    /// OID content octets.
    pub oid: Vec<u8>,
    /// Complete DER of each value, in wire order.
    pub values: Vec<Vec<u8>>,
}

impl Attribute {
    /// Attribute with a single value.
    #[must_use]
    pub fn single(oid: &[u8], value_der: Vec<u8>) -> Self {
        Self {
            oid: oid.to_vec(),
            values: vec![value_der],
        }
    }

    #[must_use]
    pub fn first_value(&self) -> Option<&[u8]> {
        self.values.first().map(Vec::as_slice)
    }

    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        writer::sequence(&[
            &writer::oid(&self.oid),
            &writer::set_of_sorted(self.values.clone()),
        ])
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Attribute(oid={}, values={})",
            oid_to_string(&self.oid),
            self.values.len()
        )
    }
}

/// Walk the contents of an attribute SET: read one Attribute, advance, repeat.
pub fn parse_attributes(content: &[u8]) -> Asn1Result<Vec<Attribute>> {
    let mut reader = DerReader::new(content);
    let mut attributes = Vec::new();
    while !reader.is_empty() {
        let mut seq = reader.read_sequence("Attribute")?;
        let oid = seq.read_oid("Attribute.attrType")?.to_vec();
        let mut values_reader = seq.read_set("Attribute.attrValues")?;
        let mut values = Vec::new();
        while !values_reader.is_empty() {
            values.push(values_reader.read_tlv("AttributeValue")?.raw.to_vec());
        }
        seq.finish("Attribute")?;
        attributes.push(Attribute { oid, values });
    }
    Ok(attributes)
}

/// An ordered attribute set together with the exact content octets it was
/// decoded from (or encoded to).
///
/// Keeping the bytes means the signature over signed attributes is always
/// checked against what was actually transmitted, not a re-encoding.
#[derive(Clone, PartialEq, Eq)]
pub struct AttributeSet {
    attributes: Vec<Attribute>,
    content: Vec<u8>,
}

impl AttributeSet {
    /// Encode attributes in the given order.
    #[must_use]
    pub fn from_attributes(attributes: Vec<Attribute>) -> Self {
        let content = attributes.iter().flat_map(Attribute::to_der).collect();
        Self {
            attributes,
            content,
        }
    }

    /// Decode from SET contents (the bytes inside the implicit tag).
    pub fn from_content(content: &[u8]) -> Asn1Result<Self> {
        Ok(Self {
            attributes: parse_attributes(content)?,
            content: content.to_vec(),
        })
    }

    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// First attribute of the given type.
    #[must_use]
    pub fn get(&self, oid: &[u8]) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.oid == oid)
    }

    /// All attributes of the given type.
    pub fn all<'a>(&'a self, oid: &'a [u8]) -> impl Iterator<Item = &'a Attribute> + 'a {
        self.attributes.iter().filter(move |attr| attr.oid == oid)
    }

    /// Encoding under an explicit SET tag; the input to the signature (RFC 5652 5.4).
    #[must_use]
    pub fn set_der(&self) -> Vec<u8> {
        writer::tlv(ASN1_SET_TAG, &self.content)
    }

    /// Encoding under an implicit context tag, as embedded in a SignerInfo.
    #[must_use]
    pub fn tagged_der(&self, tag: u8) -> Vec<u8> {
        writer::tlv(tag, &self.content)
    }
}

impl fmt::Debug for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AttributeSet(count={}, total_len={})",
            self.attributes.len(),
            self.content.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::{
        CONTEXT_0_CONSTRUCTED_TAG, OID_CONTENT_TYPE, OID_DATA, OID_MESSAGE_DIGEST,
    };

    fn sample() -> AttributeSet {
        AttributeSet::from_attributes(vec![
            Attribute::single(OID_CONTENT_TYPE, writer::oid(OID_DATA)),
            Attribute::single(OID_MESSAGE_DIGEST, writer::octet_string(&[0xab; 32])),
        ])
    }

    #[test]
    fn walks_encoded_attributes_in_order() {
        let set = sample();
        let parsed = parse_attributes(set.content()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].oid, OID_CONTENT_TYPE);
        assert_eq!(parsed[1].oid, OID_MESSAGE_DIGEST);
        assert_eq!(parsed[1].first_value().unwrap()[2..], [0xab; 32]);
    }

    #[test]
    fn set_and_tagged_encodings_share_content() {
        let set = sample();
        let as_set = set.set_der();
        let tagged = set.tagged_der(CONTEXT_0_CONSTRUCTED_TAG);
        assert_eq!(as_set[0], 0x31);
        assert_eq!(tagged[0], 0xa0);
        assert_eq!(as_set[1..], tagged[1..]);
    }

    #[test]
    fn decoded_set_keeps_original_bytes() {
        let set = sample();
        let decoded = AttributeSet::from_content(set.content()).unwrap();
        assert_eq!(decoded, set);
        assert!(decoded.get(OID_DATA).is_none());
        assert_eq!(decoded.all(OID_CONTENT_TYPE).count(), 1);
    }

    #[test]
    fn rejects_attribute_without_value_set() {
        let bad = writer::sequence(&[&writer::oid(OID_CONTENT_TYPE)]);
        assert!(parse_attributes(&bad).is_err());
    }
}
