//! Signature reader service.
//!
//! Decodes a DER `ContentInfo`/`SignedData` into a [`PrimarySignature`]. The
//! same decoding path is reused for the RFC 3161 tokens embedded as unsigned
//! attributes, so a timestamp is just a signed message whose content is a
//! `TSTInfo`.

use openssl::x509::X509;

use crate::domain::asn1::reader::integer_magnitude;
use crate::domain::asn1::{oid_to_string, parse_single, DerReader};
use crate::domain::constants::{
    ASN1_SEQUENCE_TAG, OID_COMMITMENT_TYPE_INDICATION, OID_SIGNED_DATA, OID_TIMESTAMP_TOKEN,
    OID_TST_INFO,
};
use crate::domain::pkcs7::{AttributeSet, ContentInfo, SignedData, SignerIdentifier, TstInfo};
use crate::domain::signature::{PrimarySignature, SignatureType, Timestamp};
use crate::infra::error::{ParseError, ParseResult};

/// A decoded CMS signed message with its certificates materialized.
struct SignedMessage {
    signed_data: SignedData,
    certificates: Vec<X509>,
    signer_certificate: Option<X509>,
}

/// Read a primary package signature.
pub fn read_signature(bytes: &[u8]) -> ParseResult<PrimarySignature> {
    log::debug!("reading package signature ({} bytes)", bytes.len());
    let message = decode_signed_message(bytes)?;
    let signer_certificate = message
        .signer_certificate
        .ok_or(ParseError::SignerCertificateNotFound)?;
    let signer_info = &message.signed_data.signer_infos[0];

    let signature_type = signer_info
        .signed_attributes
        .as_ref()
        .map_or(SignatureType::Unknown, read_signature_type);
    let hash_algorithm = signer_info.hash_algorithm();
    if hash_algorithm.is_none() {
        log::debug!(
            "signer digest algorithm {} is not recognized",
            signer_info.digest_algorithm.dotted()
        );
    }

    let timestamps = signer_info
        .unsigned_attributes
        .as_ref()
        .map(read_embedded_timestamps)
        .unwrap_or_default();

    log::debug!(
        "read {signature_type} signature: {} certificates, {} timestamps",
        message.certificates.len(),
        timestamps.len()
    );
    Ok(PrimarySignature::new(
        bytes.to_vec(),
        message.signed_data,
        signature_type,
        signer_certificate,
        message.certificates,
        timestamps,
        hash_algorithm,
    ))
}

/// Read an RFC 3161 timestamp token (a `ContentInfo` wrapping a TSTInfo signed message).
pub fn read_timestamp_token(token: &[u8]) -> ParseResult<Timestamp> {
    let message = decode_signed_message(token)?;
    let encap = &message.signed_data.encap_content_info;
    if encap.content_type != OID_TST_INFO {
        return Err(ParseError::UnexpectedContentType {
            expected: oid_to_string(OID_TST_INFO),
            actual: oid_to_string(&encap.content_type),
        });
    }
    let content = encap.content.as_deref().ok_or(ParseError::MissingTstInfo)?;
    let tst_info = TstInfo::decode(content)?;
    Ok(Timestamp::new(
        token.to_vec(),
        message.signed_data,
        tst_info,
        message.signer_certificate,
        message.certificates,
    ))
}

fn decode_signed_message(bytes: &[u8]) -> ParseResult<SignedMessage> {
    if bytes.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut reader = DerReader::new(bytes);
    let outer = reader.read_expected(ASN1_SEQUENCE_TAG, "ContentInfo")?;
    if !reader.is_empty() {
        return Err(ParseError::TrailingData(reader.remaining().len()));
    }
    let content_info = ContentInfo::decode(outer)?;
    if content_info.content_type != OID_SIGNED_DATA {
        return Err(ParseError::UnexpectedContentType {
            expected: oid_to_string(OID_SIGNED_DATA),
            actual: content_info.content_type_name(),
        });
    }
    let signed_data = SignedData::decode(&content_info.content)?;

    let certificates = signed_data
        .certificates
        .iter()
        .enumerate()
        .map(|(index, der)| {
            X509::from_der(der).map_err(|e| ParseError::InvalidCertificate {
                index,
                reason: e.to_string(),
            })
        })
        .collect::<ParseResult<Vec<_>>>()?;

    match signed_data.signer_infos.len() {
        0 => return Err(ParseError::NoSignerInfo),
        1 => {}
        n => return Err(ParseError::MultipleSigners(n)),
    }
    let signer_certificate = find_signer_certificate(&signed_data.signer_infos[0].sid, &certificates);

    Ok(SignedMessage {
        signed_data,
        certificates,
        signer_certificate,
    })
}

/// Match by subject key identifier, or by serial number alone for the
/// issuer-and-serial form. The issuer name is not compared.
fn find_signer_certificate(sid: &SignerIdentifier, certificates: &[X509]) -> Option<X509> {
    certificates
        .iter()
        .find(|cert| match sid {
            SignerIdentifier::SubjectKeyIdentifier(ski) => cert
                .subject_key_id()
                .is_some_and(|id| id.as_slice() == ski.as_slice()),
            SignerIdentifier::IssuerAndSerialNumber { serial_number, .. } => {
                certificate_serial(cert).is_some_and(|serial| {
                    integer_magnitude(&serial) == integer_magnitude(serial_number)
                })
            }
        })
        .cloned()
}

fn certificate_serial(cert: &X509) -> Option<Vec<u8>> {
    let serial = cert.serial_number().to_bn().ok()?.to_vec();
    Some(if serial.is_empty() { vec![0] } else { serial })
}

fn read_signature_type(signed_attributes: &AttributeSet) -> SignatureType {
    let Some(value) = signed_attributes
        .get(OID_COMMITMENT_TYPE_INDICATION)
        .and_then(|attr| attr.first_value())
    else {
        return SignatureType::Unknown;
    };
    let commitment_oid = parse_single(value, "CommitmentTypeIndication").and_then(|tlv| {
        let mut seq = tlv.reader();
        seq.read_oid("commitmentTypeId").map(<[u8]>::to_vec)
    });
    match commitment_oid {
        Ok(oid) => SignatureType::from_commitment_oid(&oid),
        Err(e) => {
            log::warn!("ignoring malformed commitment-type-indication: {e}");
            SignatureType::Unknown
        }
    }
}

fn read_embedded_timestamps(unsigned_attributes: &AttributeSet) -> Vec<Timestamp> {
    unsigned_attributes
        .all(OID_TIMESTAMP_TOKEN)
        .flat_map(|attr| attr.values.iter())
        .filter_map(|token| match read_timestamp_token(token) {
            Ok(timestamp) => Some(timestamp),
            Err(e) => {
                log::warn!("skipping unreadable timestamp token: {e}");
                None
            }
        })
        .collect()
}
