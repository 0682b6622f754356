//! Timestamp response parser & validator service.
//!
//! Turns a raw `TimeStampResp` into the token bytes to embed, refusing any
//! response that was not granted or does not answer this exact request.

use crate::domain::constants::{PKI_STATUS_GRANTED, PKI_STATUS_GRANTED_WITH_MODS};
use crate::domain::pkcs7::TimeStampResp;
use crate::domain::signature::Timestamp;
use crate::infra::error::{TimestampError, TimestampResult};
use crate::services::signature_reader::read_timestamp_token;
use crate::services::timestamp_request_builder::TimestampRequest;

/// Service responsible for parsing raw timestamp responses and binding the
/// embedded token to the request that produced it.
pub struct TimestampParserService;

impl TimestampParserService {
    /// Check the PKI status and extract the token `ContentInfo` DER.
    pub fn extract_token(response_der: &[u8]) -> TimestampResult<Vec<u8>> {
        let response = TimeStampResp::decode(response_der)?;
        let status = &response.status;
        if status.status != PKI_STATUS_GRANTED && status.status != PKI_STATUS_GRANTED_WITH_MODS {
            return Err(TimestampError::Rejected {
                status: status.status,
                text: status.text(),
                fail_info: status.fail_info,
            });
        }
        if status.status == PKI_STATUS_GRANTED_WITH_MODS {
            log::info!("timestamp granted with modifications");
        }
        response
            .time_stamp_token
            .ok_or(TimestampError::MissingToken)
    }

    /// Parse a token and confirm its nonce and message imprint match `request`.
    pub fn validate_token(token_der: &[u8], request: &TimestampRequest) -> TimestampResult<Timestamp> {
        let timestamp = read_timestamp_token(token_der)?;

        let nonce_matches = timestamp
            .nonce()
            .is_some_and(|nonce| nonce == request.nonce());
        if !nonce_matches {
            return Err(TimestampError::NonceMismatch);
        }

        let imprint = timestamp.message_imprint();
        if !imprint.matches(request.hash_algorithm(), request.message_hash()) {
            return Err(TimestampError::ImprintMismatch(format!(
                "token covers {} digest {}, request was {} digest {}",
                imprint.hash_algorithm.dotted(),
                hex::encode(&imprint.hashed_message),
                request.hash_algorithm(),
                hex::encode(request.message_hash())
            )));
        }
        Ok(timestamp)
    }

    /// Full response handling: status, token extraction, binding checks.
    pub fn parse_and_validate(
        response_der: &[u8],
        request: &TimestampRequest,
    ) -> TimestampResult<Vec<u8>> {
        let token = Self::extract_token(response_der)?;
        let timestamp = Self::validate_token(&token, request)?;
        log::debug!(
            "timestamp token accepted: {} bytes, serial {}",
            token.len(),
            hex::encode(timestamp.serial_number())
        );
        Ok(token)
    }
}
