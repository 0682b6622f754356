//! RFC 3161 structures: `TimeStampReq`, `TimeStampResp`, `TSTInfo`.
//!
//! Located under `domain::pkcs7` because the timestamp token is a CMS
//! `SignedData` whose encapsulated content is a `TSTInfo`.

use std::time::{Duration, SystemTime};

use super::algorithm::AlgorithmIdentifier;
use crate::domain::asn1::reader::integer_to_i64;
use crate::domain::asn1::time::{encode_generalized_time, parse_generalized_time};
use crate::domain::asn1::{writer, DerReader, Tlv};
use crate::domain::constants::{
    ASN1_BIT_STRING_TAG, ASN1_BOOLEAN_TAG, ASN1_GENERALIZED_TIME_TAG, ASN1_INTEGER_TAG,
    ASN1_OID_TAG, ASN1_SEQUENCE_TAG, ASN1_UTF8_STRING_TAG, CONTEXT_0_CONSTRUCTED_TAG,
    CONTEXT_0_PRIMITIVE_TAG, CONTEXT_1_CONSTRUCTED_TAG, CONTEXT_1_PRIMITIVE_TAG,
};
use crate::domain::crypto::HashAlgorithm;
use crate::infra::error::{Asn1Error, Asn1Result};

/// `MessageImprint ::= SEQUENCE { hashAlgorithm, hashedMessage OCTET STRING }`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageImprint {
    pub hash_algorithm: AlgorithmIdentifier,
    pub hashed_message: Vec<u8>,
}

impl MessageImprint {
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, hashed_message: Vec<u8>) -> Self {
        Self {
            hash_algorithm: AlgorithmIdentifier::with_null(algorithm.oid()),
            hashed_message,
        }
    }

    fn decode(reader: &mut DerReader<'_>) -> Asn1Result<Self> {
        let mut seq = reader.read_sequence("MessageImprint")?;
        let hash_algorithm = AlgorithmIdentifier::decode(&mut seq, "MessageImprint.hashAlgorithm")?;
        let hashed_message = seq.read_octet_string("MessageImprint.hashedMessage")?.to_vec();
        seq.finish("MessageImprint")?;
        Ok(Self {
            hash_algorithm,
            hashed_message,
        })
    }

    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        writer::sequence(&[
            &self.hash_algorithm.to_der(),
            &writer::octet_string(&self.hashed_message),
        ])
    }

    /// Same algorithm and digest, ignoring how the algorithm parameters were encoded.
    #[must_use]
    pub fn matches(&self, algorithm: HashAlgorithm, digest: &[u8]) -> bool {
        self.hash_algorithm.oid == algorithm.oid() && self.hashed_message == digest
    }
}

/// `Accuracy ::= SEQUENCE { seconds INTEGER OPTIONAL, millis [0] OPTIONAL, micros [1] OPTIONAL }`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Accuracy {
    pub seconds: Option<u64>,
    pub millis: Option<u16>,
    pub micros: Option<u16>,
}

impl Accuracy {
    fn decode(tlv: Tlv<'_>) -> Asn1Result<Self> {
        let mut seq = tlv.reader();
        let mut accuracy = Accuracy::default();
        if let Some(seconds) = seq.read_optional(ASN1_INTEGER_TAG, "Accuracy.seconds")? {
            accuracy.seconds = Some(non_negative(seconds.content, "Accuracy.seconds")?);
        }
        if let Some(millis) = seq.read_optional(CONTEXT_0_PRIMITIVE_TAG, "Accuracy.millis")? {
            accuracy.millis = Some(bounded_fraction(millis.content, "Accuracy.millis")?);
        }
        if let Some(micros) = seq.read_optional(CONTEXT_1_PRIMITIVE_TAG, "Accuracy.micros")? {
            accuracy.micros = Some(bounded_fraction(micros.content, "Accuracy.micros")?);
        }
        seq.finish("Accuracy")?;
        Ok(accuracy)
    }

    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        let seconds = self.seconds.map(writer::integer_u64).unwrap_or_default();
        let millis = self
            .millis
            .map(|v| retag(writer::integer_u64(u64::from(v)), CONTEXT_0_PRIMITIVE_TAG))
            .unwrap_or_default();
        let micros = self
            .micros
            .map(|v| retag(writer::integer_u64(u64::from(v)), CONTEXT_1_PRIMITIVE_TAG))
            .unwrap_or_default();
        writer::sequence(&[&seconds, &millis, &micros])
    }

    /// Total accuracy as a duration.
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.seconds.unwrap_or(0))
            + Duration::from_millis(u64::from(self.millis.unwrap_or(0)))
            + Duration::from_micros(u64::from(self.micros.unwrap_or(0)))
    }
}

fn retag(mut der: Vec<u8>, tag: u8) -> Vec<u8> {
    der[0] = tag;
    der
}

fn non_negative(content: &[u8], what: &'static str) -> Asn1Result<u64> {
    integer_to_i64(content)
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| Asn1Error::malformed(what, "expected a non-negative INTEGER"))
}

fn bounded_fraction(content: &[u8], what: &'static str) -> Asn1Result<u16> {
    match integer_to_i64(content) {
        Some(v @ 1..=999) => Ok(v as u16),
        _ => Err(Asn1Error::malformed(what, "must be in 1..=999")),
    }
}

/// `TSTInfo` (RFC 3161 2.4.2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TstInfo {
    pub version: i64,
    /// TSA policy OID content octets.
    pub policy: Vec<u8>,
    pub message_imprint: MessageImprint,
    /// INTEGER content octets.
    pub serial_number: Vec<u8>,
    pub gen_time: SystemTime,
    pub accuracy: Option<Accuracy>,
    pub ordering: bool,
    /// INTEGER content octets.
    pub nonce: Option<Vec<u8>>,
    /// Complete DER of the `[0]` tsa GeneralName.
    pub tsa: Option<Vec<u8>>,
}

impl TstInfo {
    pub fn decode(der: &[u8]) -> Asn1Result<Self> {
        let mut outer = DerReader::new(der);
        let mut seq = outer.read_sequence("TSTInfo")?;
        outer.finish("TSTInfo")?;

        let version = seq.read_small_integer("TSTInfo.version")?;
        if version != 1 {
            return Err(Asn1Error::malformed(
                "TSTInfo.version",
                format!("unsupported version {version}"),
            ));
        }
        let policy = seq.read_oid("TSTInfo.policy")?.to_vec();
        let message_imprint = MessageImprint::decode(&mut seq)?;
        let serial_number = seq.read_integer("TSTInfo.serialNumber")?.to_vec();
        let gen_time = parse_generalized_time(
            seq.read_expected(ASN1_GENERALIZED_TIME_TAG, "TSTInfo.genTime")?
                .content,
        )?;
        let accuracy = seq
            .read_optional(ASN1_SEQUENCE_TAG, "TSTInfo.accuracy")?
            .map(Accuracy::decode)
            .transpose()?;
        let ordering = if seq.peek_tag() == Some(ASN1_BOOLEAN_TAG) {
            seq.read_boolean("TSTInfo.ordering")?
        } else {
            false
        };
        let nonce = seq
            .read_optional(ASN1_INTEGER_TAG, "TSTInfo.nonce")?
            .map(|tlv| tlv.content.to_vec());
        let tsa = seq
            .read_optional(CONTEXT_0_CONSTRUCTED_TAG, "TSTInfo.tsa")?
            .map(|tlv| tlv.raw.to_vec());
        seq.read_optional(CONTEXT_1_CONSTRUCTED_TAG, "TSTInfo.extensions")?;
        seq.finish("TSTInfo")?;

        Ok(Self {
            version,
            policy,
            message_imprint,
            serial_number,
            gen_time,
            accuracy,
            ordering,
            nonce,
            tsa,
        })
    }

    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        let version = writer::integer_u64(self.version.unsigned_abs());
        let policy = writer::oid(&self.policy);
        let imprint = self.message_imprint.to_der();
        let serial = writer::tlv(ASN1_INTEGER_TAG, &self.serial_number);
        let gen_time = encode_generalized_time(self.gen_time);
        let accuracy = self.accuracy.map(|a| a.to_der()).unwrap_or_default();
        let ordering = if self.ordering {
            writer::boolean(true)
        } else {
            Vec::new()
        };
        let nonce = self
            .nonce
            .as_ref()
            .map(|n| writer::tlv(ASN1_INTEGER_TAG, n))
            .unwrap_or_default();
        let tsa = self.tsa.clone().unwrap_or_default();
        writer::sequence(&[
            &version, &policy, &imprint, &serial, &gen_time, &accuracy, &ordering, &nonce, &tsa,
        ])
    }
}

/// `TimeStampReq` (RFC 3161 2.4.1). Extensions are never sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeStampReq {
    pub message_imprint: MessageImprint,
    /// OID content octets.
    pub req_policy: Option<Vec<u8>>,
    /// INTEGER content octets.
    pub nonce: Option<Vec<u8>>,
    pub cert_req: bool,
}

impl TimeStampReq {
    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        let version = writer::integer_u64(1);
        let imprint = self.message_imprint.to_der();
        let policy = self
            .req_policy
            .as_ref()
            .map(|p| writer::oid(p))
            .unwrap_or_default();
        let nonce = self
            .nonce
            .as_ref()
            .map(|n| writer::tlv(ASN1_INTEGER_TAG, n))
            .unwrap_or_default();
        let cert_req = if self.cert_req {
            writer::boolean(true)
        } else {
            Vec::new()
        };
        writer::sequence(&[&version, &imprint, &policy, &nonce, &cert_req])
    }

    pub fn decode(der: &[u8]) -> Asn1Result<Self> {
        let mut outer = DerReader::new(der);
        let mut seq = outer.read_sequence("TimeStampReq")?;
        outer.finish("TimeStampReq")?;
        let version = seq.read_small_integer("TimeStampReq.version")?;
        if version != 1 {
            return Err(Asn1Error::malformed(
                "TimeStampReq.version",
                format!("unsupported version {version}"),
            ));
        }
        let message_imprint = MessageImprint::decode(&mut seq)?;
        let req_policy = seq
            .read_optional(ASN1_OID_TAG, "TimeStampReq.reqPolicy")?
            .map(|tlv| tlv.content.to_vec());
        let nonce = seq
            .read_optional(ASN1_INTEGER_TAG, "TimeStampReq.nonce")?
            .map(|tlv| tlv.content.to_vec());
        let cert_req = if seq.peek_tag() == Some(ASN1_BOOLEAN_TAG) {
            seq.read_boolean("TimeStampReq.certReq")?
        } else {
            false
        };
        seq.read_optional(CONTEXT_0_CONSTRUCTED_TAG, "TimeStampReq.extensions")?;
        seq.finish("TimeStampReq")?;
        Ok(Self {
            message_imprint,
            req_policy,
            nonce,
            cert_req,
        })
    }
}

/// `PKIStatusInfo ::= SEQUENCE { status, statusString PKIFreeText OPTIONAL, failInfo OPTIONAL }`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PkiStatusInfo {
    pub status: i64,
    pub status_text: Vec<String>,
    /// PKIFailureInfo bits, bit 0 in the least significant position.
    pub fail_info: Option<u32>,
}

impl PkiStatusInfo {
    fn decode(reader: &mut DerReader<'_>) -> Asn1Result<Self> {
        let mut seq = reader.read_sequence("PKIStatusInfo")?;
        let status = seq.read_small_integer("PKIStatusInfo.status")?;
        let mut status_text = Vec::new();
        if let Some(free_text) = seq.read_optional(ASN1_SEQUENCE_TAG, "PKIStatusInfo.statusString")? {
            let mut texts = free_text.reader();
            while !texts.is_empty() {
                let text = texts.read_expected(ASN1_UTF8_STRING_TAG, "PKIFreeText")?;
                status_text.push(String::from_utf8_lossy(text.content).into_owned());
            }
        }
        let fail_info = seq
            .read_optional(ASN1_BIT_STRING_TAG, "PKIStatusInfo.failInfo")?
            .map(|tlv| decode_fail_info(tlv.content))
            .transpose()?;
        seq.finish("PKIStatusInfo")?;
        Ok(Self {
            status,
            status_text,
            fail_info,
        })
    }

    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        let status = writer::integer_u64(self.status.unsigned_abs());
        let text = if self.status_text.is_empty() {
            Vec::new()
        } else {
            let items: Vec<Vec<u8>> = self
                .status_text
                .iter()
                .map(|t| writer::tlv(ASN1_UTF8_STRING_TAG, t.as_bytes()))
                .collect();
            writer::sequence(&items.iter().map(Vec::as_slice).collect::<Vec<_>>())
        };
        let fail_info = self.fail_info.map(encode_fail_info).unwrap_or_default();
        writer::sequence(&[&status, &text, &fail_info])
    }

    /// Joined free text, if the TSA sent any.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        if self.status_text.is_empty() {
            None
        } else {
            Some(self.status_text.join("; "))
        }
    }
}

/// BIT STRING named bits: bit n is the n-th most significant bit of the first octet onward.
fn decode_fail_info(content: &[u8]) -> Asn1Result<u32> {
    let Some((&unused, bits)) = content.split_first() else {
        return Err(Asn1Error::malformed("PKIFailureInfo", "empty BIT STRING"));
    };
    if unused > 7 || bits.len() > 4 {
        return Err(Asn1Error::malformed("PKIFailureInfo", "unsupported BIT STRING"));
    }
    let mut value = 0u32;
    for (octet_index, &octet) in bits.iter().enumerate() {
        for bit in 0..8 {
            if octet & (0x80 >> bit) != 0 {
                value |= 1 << (octet_index * 8 + bit);
            }
        }
    }
    Ok(value)
}

fn encode_fail_info(value: u32) -> Vec<u8> {
    let highest = 32 - value.leading_zeros() as usize;
    let octets = highest.div_ceil(8).max(1);
    let mut bits = vec![0u8; octets];
    for bit in 0..highest {
        if value & (1 << bit) != 0 {
            bits[bit / 8] |= 0x80 >> (bit % 8);
        }
    }
    let unused = (octets * 8 - highest.max(1)) as u8;
    let mut content = vec![unused];
    content.extend_from_slice(&bits);
    writer::tlv(ASN1_BIT_STRING_TAG, &content)
}

/// `TimeStampResp ::= SEQUENCE { status PKIStatusInfo, timeStampToken OPTIONAL }`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeStampResp {
    pub status: PkiStatusInfo,
    /// Complete DER of the token's `ContentInfo`.
    pub time_stamp_token: Option<Vec<u8>>,
}

impl TimeStampResp {
    pub fn decode(der: &[u8]) -> Asn1Result<Self> {
        let mut outer = DerReader::new(der);
        let mut seq = outer.read_sequence("TimeStampResp")?;
        outer.finish("TimeStampResp")?;
        let status = PkiStatusInfo::decode(&mut seq)?;
        let time_stamp_token = seq
            .read_optional(ASN1_SEQUENCE_TAG, "TimeStampResp.timeStampToken")?
            .map(|tlv| tlv.raw.to_vec());
        seq.finish("TimeStampResp")?;
        Ok(Self {
            status,
            time_stamp_token,
        })
    }

    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        let status = self.status.to_der();
        let token = self.time_stamp_token.clone().unwrap_or_default();
        writer::sequence(&[&status, &token])
    }
}
