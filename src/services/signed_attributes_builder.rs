//! Service for constructing the signed attributes of a package signature.
//!
//! Attributes are emitted in a fixed order and the resulting [`AttributeSet`]
//! keeps that exact encoding: the bytes signed (tag 0x31) and the bytes
//! embedded (tag 0xA0) differ only in their leading tag.

use std::time::SystemTime;

use openssl::x509::X509;

use crate::domain::asn1::time::encode_signing_time;
use crate::domain::asn1::writer;
use crate::domain::constants::{
    GENERAL_NAME_DIRECTORY_TAG, OID_COMMITMENT_TYPE_INDICATION, OID_CONTENT_TYPE, OID_DATA,
    OID_MESSAGE_DIGEST, OID_SIGNING_CERTIFICATE_V2, OID_SIGNING_TIME,
};
use crate::domain::crypto::{DigestBytes, HashAlgorithm};
use crate::domain::pkcs7::{AlgorithmIdentifier, Attribute, AttributeSet};
use crate::domain::signature::SignatureType;
use crate::infra::error::{SignError, SignResult};

pub struct SignedAttributesBuilder; // stateless

impl Default for SignedAttributesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SignedAttributesBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build content-type, signing-time, message-digest,
    /// commitment-type-indication (unless `Unknown`) and signing-certificate-v2.
    pub fn build(
        &self,
        content_hash: &DigestBytes,
        signature_type: SignatureType,
        certificate: &X509,
        signing_time: SystemTime,
    ) -> SignResult<AttributeSet> {
        let mut attributes = vec![
            Attribute::single(OID_CONTENT_TYPE, writer::oid(OID_DATA)),
            Attribute::single(OID_SIGNING_TIME, encode_signing_time(signing_time)),
            Attribute::single(
                OID_MESSAGE_DIGEST,
                writer::octet_string(content_hash.as_slice()),
            ),
        ];
        if let Some(commitment) = signature_type.commitment_oid() {
            attributes.push(Attribute::single(
                OID_COMMITMENT_TYPE_INDICATION,
                commitment_type_indication(commitment),
            ));
        }
        attributes.push(Attribute::single(
            OID_SIGNING_CERTIFICATE_V2,
            signing_certificate_v2(certificate, content_hash.algorithm())?,
        ));

        let set = AttributeSet::from_attributes(attributes);
        log::debug!(
            "built {} signed attributes ({} bytes)",
            set.len(),
            set.content().len()
        );
        Ok(set)
    }
}

/// `CommitmentTypeIndication ::= SEQUENCE { commitmentTypeId OID }`
fn commitment_type_indication(commitment: &[u8]) -> Vec<u8> {
    writer::sequence(&[&writer::oid(commitment)])
}

/// `SigningCertificateV2 ::= SEQUENCE { certs SEQUENCE OF ESSCertIDv2 }` with
/// one ESSCertIDv2 naming `certificate`.
pub fn signing_certificate_v2(certificate: &X509, algorithm: HashAlgorithm) -> SignResult<Vec<u8>> {
    let der = certificate.to_der()?;
    let cert_hash = algorithm.digest(&der);

    let issuer = certificate.issuer_name().to_der()?;
    let general_names = writer::sequence(&[&writer::tlv(GENERAL_NAME_DIRECTORY_TAG, &issuer)]);
    let serial = certificate.serial_number().to_bn()?.to_vec();
    let issuer_serial = writer::sequence(&[&general_names, &writer::integer_unsigned(&serial)]);

    let hash = writer::octet_string(&cert_hash);
    let ess_cert_id = match algorithm {
        HashAlgorithm::Sha256 => writer::sequence(&[&hash, &issuer_serial]),
        other => {
            let alg = AlgorithmIdentifier::without_parameters(other.oid()).to_der();
            writer::sequence(&[&alg, &hash, &issuer_serial])
        }
    };
    Ok(writer::sequence(&[&writer::sequence(&[&ess_cert_id])]))
}

/// Check a caller-supplied content hash against the configured algorithm.
pub fn content_digest(content_hash: &[u8], algorithm: HashAlgorithm) -> SignResult<DigestBytes> {
    DigestBytes::new(algorithm, content_hash.to_vec())
        .map_err(|e| SignError::InvalidInput(e.to_string()))
}
