//! `SignerInfo` and its `SignerIdentifier` CHOICE (RFC 5652 5.3).

use std::fmt;

use super::algorithm::AlgorithmIdentifier;
use super::attributes::AttributeSet;
use crate::domain::asn1::reader::integer_magnitude;
use crate::domain::asn1::{writer, DerReader, Tlv};
use crate::domain::constants::{
    ASN1_INTEGER_TAG, ASN1_SEQUENCE_TAG, CONTEXT_0_CONSTRUCTED_TAG, CONTEXT_0_PRIMITIVE_TAG,
    CONTEXT_1_CONSTRUCTED_TAG,
};
use crate::domain::crypto::HashAlgorithm;
use crate::infra::error::{Asn1Error, Asn1Result};

/// How a SignerInfo names its certificate.
#[derive(Clone, PartialEq, Eq)]
pub enum SignerIdentifier {
    IssuerAndSerialNumber {
        /// DER of the issuer `Name`.
        issuer: Vec<u8>,
        /// INTEGER content octets as encoded.
        serial_number: Vec<u8>,
    },
    /// `[0] IMPLICIT SubjectKeyIdentifier`
    SubjectKeyIdentifier(Vec<u8>),
}

impl SignerIdentifier {
    pub fn decode(tlv: Tlv<'_>) -> Asn1Result<Self> {
        match tlv.tag {
            ASN1_SEQUENCE_TAG => {
                let mut seq = tlv.reader();
                let issuer = seq.read_expected(ASN1_SEQUENCE_TAG, "issuer")?.raw.to_vec();
                let serial_number = seq.read_integer("serialNumber")?.to_vec();
                seq.finish("IssuerAndSerialNumber")?;
                Ok(SignerIdentifier::IssuerAndSerialNumber {
                    issuer,
                    serial_number,
                })
            }
            CONTEXT_0_PRIMITIVE_TAG => Ok(SignerIdentifier::SubjectKeyIdentifier(
                tlv.content.to_vec(),
            )),
            actual => Err(Asn1Error::UnexpectedTag {
                what: "SignerIdentifier",
                expected: ASN1_SEQUENCE_TAG,
                actual,
            }),
        }
    }

    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        match self {
            SignerIdentifier::IssuerAndSerialNumber {
                issuer,
                serial_number,
            } => writer::sequence(&[issuer, &writer::tlv(ASN1_INTEGER_TAG, serial_number)]),
            SignerIdentifier::SubjectKeyIdentifier(ski) => {
                writer::tlv(CONTEXT_0_PRIMITIVE_TAG, ski)
            }
        }
    }

    /// SignerInfo version implied by the identifier form.
    #[must_use]
    pub fn version(&self) -> u64 {
        match self {
            SignerIdentifier::IssuerAndSerialNumber { .. } => 1,
            SignerIdentifier::SubjectKeyIdentifier(_) => 3,
        }
    }

    /// Serial number magnitude, ignoring sign padding.
    #[must_use]
    pub fn serial_magnitude(&self) -> Option<&[u8]> {
        match self {
            SignerIdentifier::IssuerAndSerialNumber { serial_number, .. } => {
                Some(integer_magnitude(serial_number))
            }
            SignerIdentifier::SubjectKeyIdentifier(_) => None,
        }
    }
}

impl fmt::Debug for SignerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignerIdentifier::IssuerAndSerialNumber { serial_number, .. } => {
                write!(f, "IssuerAndSerialNumber(serial={})", hex::encode(serial_number))
            }
            SignerIdentifier::SubjectKeyIdentifier(ski) => {
                write!(f, "SubjectKeyIdentifier({})", hex::encode(ski))
            }
        }
    }
}

/// One signer of a `SignedData`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignerInfo {
    pub version: i64,
    pub sid: SignerIdentifier,
    pub digest_algorithm: AlgorithmIdentifier,
    pub signed_attributes: Option<AttributeSet>,
    pub signature_algorithm: AlgorithmIdentifier,
    pub signature: Vec<u8>,
    pub unsigned_attributes: Option<AttributeSet>,
}

impl SignerInfo {
    pub fn decode(tlv: Tlv<'_>) -> Asn1Result<Self> {
        if tlv.tag != ASN1_SEQUENCE_TAG {
            return Err(Asn1Error::UnexpectedTag {
                what: "SignerInfo",
                expected: ASN1_SEQUENCE_TAG,
                actual: tlv.tag,
            });
        }
        let mut seq: DerReader<'_> = tlv.reader();
        let version = seq.read_small_integer("SignerInfo.version")?;
        let sid = SignerIdentifier::decode(seq.read_tlv("SignerInfo.sid")?)?;
        let digest_algorithm = AlgorithmIdentifier::decode(&mut seq, "SignerInfo.digestAlgorithm")?;
        let signed_attributes = seq
            .read_optional(CONTEXT_0_CONSTRUCTED_TAG, "SignerInfo.signedAttrs")?
            .map(|attrs| AttributeSet::from_content(attrs.content))
            .transpose()?;
        let signature_algorithm =
            AlgorithmIdentifier::decode(&mut seq, "SignerInfo.signatureAlgorithm")?;
        let signature = seq.read_octet_string("SignerInfo.signature")?.to_vec();
        let unsigned_attributes = seq
            .read_optional(CONTEXT_1_CONSTRUCTED_TAG, "SignerInfo.unsignedAttrs")?
            .map(|attrs| AttributeSet::from_content(attrs.content))
            .transpose()?;
        seq.finish("SignerInfo")?;
        Ok(Self {
            version,
            sid,
            digest_algorithm,
            signed_attributes,
            signature_algorithm,
            signature,
            unsigned_attributes,
        })
    }

    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        let version = writer::integer_u64(self.version.unsigned_abs());
        let sid = self.sid.to_der();
        let digest_alg = self.digest_algorithm.to_der();
        let signed = self
            .signed_attributes
            .as_ref()
            .map(|attrs| attrs.tagged_der(CONTEXT_0_CONSTRUCTED_TAG))
            .unwrap_or_default();
        let sig_alg = self.signature_algorithm.to_der();
        let signature = writer::octet_string(&self.signature);
        let unsigned = self
            .unsigned_attributes
            .as_ref()
            .filter(|attrs| !attrs.is_empty())
            .map(|attrs| attrs.tagged_der(CONTEXT_1_CONSTRUCTED_TAG))
            .unwrap_or_default();
        writer::sequence(&[
            &version,
            &sid,
            &digest_alg,
            &signed,
            &sig_alg,
            &signature,
            &unsigned,
        ])
    }

    /// Digest algorithm, if it is one of SHA-256/384/512.
    #[must_use]
    pub fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        self.digest_algorithm.hash_algorithm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::{OID_SHA256, OID_SHA256_WITH_RSA};

    fn signer(sid: SignerIdentifier) -> SignerInfo {
        SignerInfo {
            version: sid.version() as i64,
            sid,
            digest_algorithm: AlgorithmIdentifier::with_null(OID_SHA256),
            signed_attributes: None,
            signature_algorithm: AlgorithmIdentifier::with_null(OID_SHA256_WITH_RSA),
            signature: vec![0x5a; 16],
            unsigned_attributes: None,
        }
    }

    #[test]
    fn subject_key_identifier_form_round_trips() {
        let info = signer(SignerIdentifier::SubjectKeyIdentifier(vec![0x11; 20]));
        let der = info.to_der();
        let decoded = SignerInfo::decode(crate::domain::asn1::parse_single(&der, "si").unwrap())
            .unwrap();
        assert_eq!(decoded.version, 3);
        assert_eq!(decoded, info);
    }

    #[test]
    fn issuer_serial_form_decodes_as_that_variant() {
        let issuer = writer::sequence(&[]);
        let info = signer(SignerIdentifier::IssuerAndSerialNumber {
            issuer,
            serial_number: vec![0x00, 0x9f, 0x01],
        });
        let der = info.to_der();
        let decoded = SignerInfo::decode(crate::domain::asn1::parse_single(&der, "si").unwrap())
            .unwrap();
        match &decoded.sid {
            SignerIdentifier::IssuerAndSerialNumber { serial_number, .. } => {
                assert_eq!(serial_number, &[0x00, 0x9f, 0x01]);
            }
            other => panic!("unexpected identifier {other:?}"),
        }
        assert_eq!(decoded.sid.serial_magnitude(), Some(&[0x9f, 0x01][..]));
        assert_eq!(decoded.hash_algorithm(), Some(HashAlgorithm::Sha256));
    }

    #[test]
    fn unknown_identifier_tag_is_rejected() {
        let tlv = Tlv {
            tag: 0x04,
            content: &[],
            raw: &[0x04, 0x00],
        };
        assert!(SignerIdentifier::decode(tlv).is_err());
    }
}
