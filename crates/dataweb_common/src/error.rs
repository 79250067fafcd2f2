//! Error types for fetching instrument status.

use thiserror::Error;

/// Why a poll attempt failed to produce a `Reading`.
///
/// Pollers treat every variant the same way (the instrument becomes
/// unavailable and the backoff interval applies); the variants exist so the
/// throttled failure log says what actually went wrong.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("failed to parse response from {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("instrument response could not be reshaped: {0}")]
    Reshape(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = FetchError::Status {
            status: 503,
            url: "http://NDXLARMOR:4813/group?name=BLOCKS&format=json".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("503"));
        assert!(text.contains("NDXLARMOR"));
    }
}
