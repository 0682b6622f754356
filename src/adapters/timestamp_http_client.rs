//! Timestamp HTTP client adapter.
//! HTTP transport for RFC 3161 timestamp authority requests.
//!
//! One POST per call: no retries and no failover. A caller that wants either
//! wraps the client.

use std::time::Duration;

use crate::domain::constants::{TIMESTAMP_QUERY_CONTENT_TYPE, TIMESTAMP_REPLY_CONTENT_TYPE};
use crate::domain::types::TimestampUrl;
use crate::infra::error::{TimestampError, TimestampResult};

/// Moves a DER `TimeStampReq` to a TSA and returns the raw response body.
///
/// Implementations must honour `timeout` for the whole exchange and report
/// any status other than 200 as an error.
pub trait TimestampTransport: Send + Sync {
    fn post_timestamp_query(
        &self,
        url: &TimestampUrl,
        request_der: &[u8],
        timeout: Duration,
    ) -> TimestampResult<Vec<u8>>;
}

/// Blocking reqwest transport. Must not be driven from inside an async runtime.
pub struct HttpTimestampTransport {
    http: reqwest::blocking::Client,
}

impl HttpTimestampTransport {
    pub fn new() -> TimestampResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("nuget-package-signing/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TimestampError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

impl TimestampTransport for HttpTimestampTransport {
    fn post_timestamp_query(
        &self,
        url: &TimestampUrl,
        request_der: &[u8],
        timeout: Duration,
    ) -> TimestampResult<Vec<u8>> {
        log::info!("posting timestamp request ({} bytes) to {url}", request_der.len());
        let response = self
            .http
            .post(url.as_url().clone())
            .header(reqwest::header::CONTENT_TYPE, TIMESTAMP_QUERY_CONTENT_TYPE)
            .header(reqwest::header::ACCEPT, TIMESTAMP_REPLY_CONTENT_TYPE)
            .timeout(timeout)
            .body(request_der.to_vec())
            .send()
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TimestampError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        if let Some(content_type) = response.headers().get(reqwest::header::CONTENT_TYPE) {
            if content_type.as_bytes() != TIMESTAMP_REPLY_CONTENT_TYPE.as_bytes() {
                log::debug!("unexpected timestamp response content type {content_type:?}");
            }
        }
        let body = response.bytes().map_err(|e| classify(e, timeout))?;
        log::debug!("timestamp response: {} bytes", body.len());
        Ok(body.to_vec())
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> TimestampError {
    if error.is_timeout() {
        TimestampError::Timeout(timeout)
    } else {
        TimestampError::Http(error.to_string())
    }
}
