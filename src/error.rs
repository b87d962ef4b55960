//! Error types for the air-quality core.
//!
//! Two failure families exist. [`ValidationError`] is raised before any
//! network activity and is surfaced to the caller as-is. [`UpstreamError`]
//! covers everything that can go wrong talking to the upstream API and is
//! absorbed by the orchestrator, which substitutes synthetic stations.

use thiserror::Error;

// ---

/// Caller-supplied query arguments outside their accepted range.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    // ---
    #[error("latitude must be between -90 and 90 degrees, got {0}")]
    Latitude(f64),

    #[error("longitude must be between -180 and 180 degrees, got {0}")]
    Longitude(f64),

    #[error("radius must be greater than 0 and at most 1000 km, got {0}")]
    Radius(f64),

    #[error("max_stations must be at least 1, got {0}")]
    MaxStations(usize),
}

/// Failure while querying the upstream air-quality API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    // ---
    /// Upstream answered with a non-success HTTP status.
    #[error("upstream returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection failure, timeout, or an abandoned request.
    #[error("upstream request failed: {0}")]
    Transport(String),

    /// Payload did not have the expected shape.
    #[error("malformed upstream payload: {0}")]
    Malformed(String),
}

impl UpstreamError {
    // ---
    /// HTTP status carried by the error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for failures that never produced an HTTP response.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    #[must_use]
    pub fn malformed(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Malformed(format!("{context}: {err}"))
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        // ---
        if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_validation_messages_name_the_argument() {
        // ---
        assert!(ValidationError::Latitude(999.0).to_string().contains("latitude"));
        assert!(ValidationError::Longitude(-181.0).to_string().contains("-180"));
        assert!(ValidationError::Radius(0.0).to_string().contains("1000 km"));
    }

    #[test]
    fn test_upstream_status_and_classification() {
        // ---
        let http = UpstreamError::Status {
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(http.status(), Some(503));
        assert!(!http.is_network());

        let net = UpstreamError::Transport("connection refused".to_string());
        assert_eq!(net.status(), None);
        assert!(net.is_network());

        let bad = UpstreamError::malformed("results", "missing field");
        assert_eq!(bad.to_string(), "malformed upstream payload: results: missing field");
    }
}
