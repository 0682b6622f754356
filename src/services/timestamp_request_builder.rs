//! Timestamp request builder service.
//!
//! Builds RFC 3161 `TimeStampReq` messages over an already computed hash.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::domain::asn1::writer::integer_content_unsigned;
use crate::domain::constants::TS_REQ_NONCE_LENGTH;
use crate::domain::crypto::{DigestBytes, HashAlgorithm};
use crate::domain::pkcs7::{MessageImprint, TimeStampReq};
use crate::infra::error::{TimestampError, TimestampResult};

/// A request ready to send, remembering what the response must echo.
#[derive(Debug, Clone)]
pub struct TimestampRequest {
    request: TimeStampReq,
    imprint: DigestBytes,
    der: Vec<u8>,
}

impl TimestampRequest {
    /// DER of the `TimeStampReq`.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Nonce as INTEGER content octets.
    #[must_use]
    pub fn nonce(&self) -> &[u8] {
        self.request.nonce.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.imprint.algorithm()
    }

    #[must_use]
    pub fn message_hash(&self) -> &[u8] {
        self.imprint.as_slice()
    }
}

/// 32 random bytes with the sign bit of the first byte cleared.
#[must_use]
pub fn generate_nonce() -> [u8; TS_REQ_NONCE_LENGTH] {
    let mut nonce = [0u8; TS_REQ_NONCE_LENGTH];
    OsRng.fill_bytes(&mut nonce);
    nonce[0] &= 0x7f;
    nonce
}

/// Service for building RFC 3161 timestamp requests.
pub struct TimestampRequestBuilder;

impl TimestampRequestBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build a version 1 request with a fresh nonce and `certReq = TRUE`.
    pub fn build_request(
        &self,
        message_hash: &[u8],
        hash_algorithm: HashAlgorithm,
    ) -> TimestampResult<TimestampRequest> {
        self.build_request_with_nonce(message_hash, hash_algorithm, &generate_nonce())
    }

    /// Build a request with a caller-chosen nonce magnitude.
    pub fn build_request_with_nonce(
        &self,
        message_hash: &[u8],
        hash_algorithm: HashAlgorithm,
        nonce: &[u8],
    ) -> TimestampResult<TimestampRequest> {
        let imprint = DigestBytes::new(hash_algorithm, message_hash.to_vec())
            .map_err(|e| TimestampError::InvalidRequest(e.to_string()))?;
        if nonce.iter().all(|&b| b == 0) {
            return Err(TimestampError::InvalidRequest("nonce must not be zero".into()));
        }

        let request = TimeStampReq {
            message_imprint: MessageImprint::new(hash_algorithm, message_hash.to_vec()),
            req_policy: None,
            nonce: Some(integer_content_unsigned(nonce)),
            cert_req: true,
        };
        let der = request.to_der();
        log::debug!(
            "built RFC 3161 request: {} bytes, imprint {} ({} bytes)",
            der.len(),
            hash_algorithm,
            message_hash.len()
        );
        Ok(TimestampRequest {
            request,
            imprint,
            der,
        })
    }
}

impl Default for TimestampRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
