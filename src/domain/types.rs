//! Type-safe wrappers for caller-supplied inputs.

use std::fmt;
use std::str::FromStr;

use crate::infra::error::{TimestampError, TimestampResult};

/// Type-safe wrapper for timestamp authority URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampUrl(reqwest::Url);

impl TimestampUrl {
    /// Create a new `TimestampUrl` after validation
    pub fn new(url: impl AsRef<str>) -> TimestampResult<Self> {
        let raw = url.as_ref().trim();
        let parsed = reqwest::Url::parse(raw)
            .map_err(|e| TimestampError::InvalidUrl(format!("{raw}: {e}")))?;
        Self::validate_url(&parsed)?;
        Ok(TimestampUrl(parsed))
    }

    /// Get the URL as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn as_url(&self) -> &reqwest::Url {
        &self.0
    }

    /// RFC 3161 over HTTP(S) only; the URL must name a host.
    fn validate_url(url: &reqwest::Url) -> TimestampResult<()> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TimestampError::InvalidUrl(format!(
                "timestamp URL must use http or https, got: {url}"
            )));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(TimestampError::InvalidUrl(format!(
                "timestamp URL must name a host: {url}"
            )));
        }
        Ok(())
    }
}

impl FromStr for TimestampUrl {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TimestampUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_url_validation() {
        assert!(TimestampUrl::new("http://timestamp.digicert.com").is_ok());
        assert!(TimestampUrl::new("https://ts.example.org/tsa").is_ok());
        assert!(TimestampUrl::new("http://localhost:8080/tsa").is_ok());

        assert!(TimestampUrl::new("ftp://example.com").is_err());
        assert!(TimestampUrl::new("file:///etc/passwd").is_err());
        assert!(TimestampUrl::new("not a url").is_err());
        assert!(TimestampUrl::new("").is_err());
    }

    #[test]
    fn display_matches_normalized_url() {
        let url: TimestampUrl = "http://ts.example.org".parse().unwrap();
        assert_eq!(url.as_str(), "http://ts.example.org/");
        assert_eq!(url.to_string(), "http://ts.example.org/");
    }
}
