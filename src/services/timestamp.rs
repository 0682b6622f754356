//! RFC 3161 timestamp client.
//!
//! One authority, one request per call. Every response is bound to the
//! request that produced it (nonce and message imprint) before its token is
//! handed back.

use std::sync::Arc;
use std::time::Duration;

use crate::adapters::timestamp_http_client::{HttpTimestampTransport, TimestampTransport};
use crate::domain::crypto::HashAlgorithm;
use crate::domain::types::TimestampUrl;
use crate::infra::error::{TimestampError, TimestampResult};
use crate::services::timestamp_parser::TimestampParserService;
use crate::services::timestamp_request_builder::{TimestampRequest, TimestampRequestBuilder};

/// Default request timeout for a timestamp exchange.
pub const DEFAULT_TIMESTAMP_TIMEOUT: Duration = Duration::from_secs(30);

/// RFC 3161 timestamp client for a single authority.
#[derive(Clone)]
pub struct TimestampClient {
    url: TimestampUrl,
    timeout: Duration,
    transport: Arc<dyn TimestampTransport>,
}

impl std::fmt::Debug for TimestampClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampClient")
            .field("url", &self.url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TimestampClient {
    /// Create a client that talks HTTP to `url`.
    pub fn new(url: TimestampUrl, timeout: Duration) -> TimestampResult<Self> {
        let transport = HttpTimestampTransport::new()?;
        Self::with_transport(url, timeout, Arc::new(transport))
    }

    /// Create a client over a caller-supplied transport.
    pub fn with_transport(
        url: TimestampUrl,
        timeout: Duration,
        transport: Arc<dyn TimestampTransport>,
    ) -> TimestampResult<Self> {
        if timeout.is_zero() {
            return Err(TimestampError::InvalidRequest(
                "timeout must be greater than zero".into(),
            ));
        }
        Ok(Self {
            url,
            timeout,
            transport,
        })
    }

    #[must_use]
    pub fn url(&self) -> &TimestampUrl {
        &self.url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Timestamp `message_hash` and return the DER token (`ContentInfo`).
    ///
    /// Fails on any transport error, non-granted status, or a token whose
    /// nonce or message imprint does not match what was sent. Never retries.
    pub fn request_timestamp(
        &self,
        message_hash: &[u8],
        hash_algorithm: HashAlgorithm,
    ) -> TimestampResult<Vec<u8>> {
        let request = TimestampRequestBuilder::new().build_request(message_hash, hash_algorithm)?;
        self.exchange(&request)
    }

    /// Send an already built request and validate the answer against it.
    pub fn exchange(&self, request: &TimestampRequest) -> TimestampResult<Vec<u8>> {
        log::info!(
            "requesting {} timestamp from {}",
            request.hash_algorithm(),
            self.url
        );
        let response = self
            .transport
            .post_timestamp_query(&self.url, request.der(), self.timeout)?;
        let token = TimestampParserService::parse_and_validate(&response, request)?;
        log::info!("received timestamp token ({} bytes)", token.len());
        Ok(token)
    }
}
