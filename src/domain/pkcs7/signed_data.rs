//! `ContentInfo`, `SignedData` and `EncapsulatedContentInfo` (RFC 5652 3, 5.1, 5.2).

use super::algorithm::AlgorithmIdentifier;
use super::signer_info::SignerInfo;
use crate::domain::asn1::{oid_to_string, writer, DerReader, Tlv};
use crate::domain::constants::{
    ASN1_SEQUENCE_TAG, CONTEXT_0_CONSTRUCTED_TAG, SIGNED_DATA_CRLS_TAG,
};
use crate::infra::error::{Asn1Error, Asn1Result};

/// `ContentInfo ::= SEQUENCE { contentType OID, content [0] EXPLICIT ANY }`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentInfo {
    pub content_type: Vec<u8>,
    /// Complete DER of the explicitly tagged content.
    pub content: Vec<u8>,
}

impl ContentInfo {
    pub fn decode(tlv: Tlv<'_>) -> Asn1Result<Self> {
        if tlv.tag != ASN1_SEQUENCE_TAG {
            return Err(Asn1Error::UnexpectedTag {
                what: "ContentInfo",
                expected: ASN1_SEQUENCE_TAG,
                actual: tlv.tag,
            });
        }
        let mut seq = tlv.reader();
        let content_type = seq.read_oid("ContentInfo.contentType")?.to_vec();
        let explicit = seq.read_expected(CONTEXT_0_CONSTRUCTED_TAG, "ContentInfo.content")?;
        let mut inner = explicit.reader();
        let content = inner.read_tlv("ContentInfo.content")?.raw.to_vec();
        inner.finish("ContentInfo.content")?;
        seq.finish("ContentInfo")?;
        Ok(Self {
            content_type,
            content,
        })
    }

    #[must_use]
    pub fn new(content_type: &[u8], content: Vec<u8>) -> Self {
        Self {
            content_type: content_type.to_vec(),
            content,
        }
    }

    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        writer::sequence(&[
            &writer::oid(&self.content_type),
            &writer::tlv(CONTEXT_0_CONSTRUCTED_TAG, &self.content),
        ])
    }

    #[must_use]
    pub fn content_type_name(&self) -> String {
        oid_to_string(&self.content_type)
    }
}

/// `EncapsulatedContentInfo ::= SEQUENCE { eContentType, eContent [0] EXPLICIT OCTET STRING OPTIONAL }`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncapsulatedContentInfo {
    pub content_type: Vec<u8>,
    /// OCTET STRING contents; `None` for detached signatures.
    pub content: Option<Vec<u8>>,
}

impl EncapsulatedContentInfo {
    fn decode(reader: &mut DerReader<'_>) -> Asn1Result<Self> {
        let mut seq = reader.read_sequence("EncapsulatedContentInfo")?;
        let content_type = seq.read_oid("eContentType")?.to_vec();
        let content = match seq.read_optional(CONTEXT_0_CONSTRUCTED_TAG, "eContent")? {
            Some(explicit) => {
                let mut inner = explicit.reader();
                let octets = inner.read_octet_string("eContent")?.to_vec();
                inner.finish("eContent")?;
                Some(octets)
            }
            None => None,
        };
        seq.finish("EncapsulatedContentInfo")?;
        Ok(Self {
            content_type,
            content,
        })
    }

    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        let content_type = writer::oid(&self.content_type);
        match &self.content {
            Some(octets) => writer::sequence(&[
                &content_type,
                &writer::tlv(CONTEXT_0_CONSTRUCTED_TAG, &writer::octet_string(octets)),
            ]),
            None => writer::sequence(&[&content_type]),
        }
    }
}

/// `SignedData`. Certificates are kept as raw DER; CRLs are skipped on read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedData {
    pub version: i64,
    pub digest_algorithms: Vec<AlgorithmIdentifier>,
    pub encap_content_info: EncapsulatedContentInfo,
    pub certificates: Vec<Vec<u8>>,
    pub signer_infos: Vec<SignerInfo>,
}

impl SignedData {
    /// Decode from the complete SignedData SEQUENCE.
    pub fn decode(der: &[u8]) -> Asn1Result<Self> {
        let mut outer = DerReader::new(der);
        let mut seq = outer.read_sequence("SignedData")?;
        outer.finish("SignedData")?;

        let version = seq.read_small_integer("SignedData.version")?;

        let mut algorithms_reader = seq.read_set("SignedData.digestAlgorithms")?;
        let mut digest_algorithms = Vec::new();
        while !algorithms_reader.is_empty() {
            digest_algorithms.push(AlgorithmIdentifier::decode(
                &mut algorithms_reader,
                "DigestAlgorithmIdentifier",
            )?);
        }

        let encap_content_info = EncapsulatedContentInfo::decode(&mut seq)?;

        let mut certificates = Vec::new();
        if let Some(certs) = seq.read_optional(CONTEXT_0_CONSTRUCTED_TAG, "SignedData.certificates")? {
            let mut certs_reader = certs.reader();
            while !certs_reader.is_empty() {
                certificates.push(certs_reader.read_tlv("CertificateChoices")?.raw.to_vec());
            }
        }
        seq.read_optional(SIGNED_DATA_CRLS_TAG, "SignedData.crls")?;

        let mut signers_reader = seq.read_set("SignedData.signerInfos")?;
        let mut signer_infos = Vec::new();
        while !signers_reader.is_empty() {
            signer_infos.push(SignerInfo::decode(signers_reader.read_tlv("SignerInfo")?)?);
        }
        seq.finish("SignedData")?;

        Ok(Self {
            version,
            digest_algorithms,
            encap_content_info,
            certificates,
            signer_infos,
        })
    }

    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        let version = writer::integer_u64(self.version.unsigned_abs());
        let digest_algorithms = writer::set_of_sorted(
            self.digest_algorithms
                .iter()
                .map(AlgorithmIdentifier::to_der)
                .collect(),
        );
        let encap = self.encap_content_info.to_der();
        let certificates = if self.certificates.is_empty() {
            Vec::new()
        } else {
            let mut sorted = self.certificates.clone();
            sorted.sort();
            writer::tlv(CONTEXT_0_CONSTRUCTED_TAG, &sorted.concat())
        };
        let signer_infos = writer::set_of_sorted(
            self.signer_infos.iter().map(SignerInfo::to_der).collect(),
        );
        writer::sequence(&[
            &version,
            &digest_algorithms,
            &encap,
            &certificates,
            &signer_infos,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asn1::parse_single;
    use crate::domain::constants::{OID_DATA, OID_SHA256, OID_SIGNED_DATA};

    fn empty_signed_data() -> SignedData {
        SignedData {
            version: 1,
            digest_algorithms: vec![AlgorithmIdentifier::with_null(OID_SHA256)],
            encap_content_info: EncapsulatedContentInfo {
                content_type: OID_DATA.to_vec(),
                content: None,
            },
            certificates: vec![],
            signer_infos: vec![],
        }
    }

    #[test]
    fn signed_data_without_certificates_round_trips() {
        let sd = empty_signed_data();
        let der = sd.to_der();
        assert_eq!(SignedData::decode(&der).unwrap(), sd);
    }

    #[test]
    fn content_info_wraps_signed_data() {
        let sd = empty_signed_data().to_der();
        let ci = ContentInfo::new(OID_SIGNED_DATA, sd.clone()).to_der();
        let decoded = ContentInfo::decode(parse_single(&ci, "ContentInfo").unwrap()).unwrap();
        assert_eq!(decoded.content_type, OID_SIGNED_DATA);
        assert_eq!(decoded.content, sd);
        assert_eq!(decoded.content_type_name(), "1.2.840.113549.1.7.2");
    }

    #[test]
    fn encapsulated_content_is_unwrapped() {
        let mut sd = empty_signed_data();
        sd.encap_content_info.content = Some(b"tst".to_vec());
        let decoded = SignedData::decode(&sd.to_der()).unwrap();
        assert_eq!(decoded.encap_content_info.content.as_deref(), Some(&b"tst"[..]));
    }

    #[test]
    fn crls_are_skipped() {
        let sd = empty_signed_data();
        let version = writer::integer_u64(1);
        let algs = writer::set_of_sorted(vec![AlgorithmIdentifier::with_null(OID_SHA256).to_der()]);
        let encap = sd.encap_content_info.to_der();
        let crls = writer::tlv(SIGNED_DATA_CRLS_TAG, &[]);
        let signers = writer::set(&[]);
        let der = writer::sequence(&[&version, &algs, &encap, &crls, &signers]);
        assert_eq!(SignedData::decode(&der).unwrap(), sd);
    }

    #[test]
    fn truncated_signed_data_fails() {
        let der = empty_signed_data().to_der();
        assert!(SignedData::decode(&der[..der.len() - 1]).is_err());
    }
}
