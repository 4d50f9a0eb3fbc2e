use thiserror::Error;

/// Top-level error type for the `meli-proxy` crate.
///
/// Covers every failure mode of the admin API surface: transport,
/// rejected configuration, and malformed responses. `meli-core` maps
/// these into its proxy synchronisation error.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Admin API ───────────────────────────────────────────────────
    /// The admin API answered with a non-success status.
    ///
    /// Caddy reports config validation failures as `400` with a JSON
    /// `{"error": "..."}` body; `message` carries that text when present.
    #[error("Admin API rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Rejected { status: 404, .. } => true,
            _ => false,
        }
    }

    /// HTTP status code, when the admin API produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_404_is_not_found() {
        let err = Error::Rejected {
            status: 404,
            message: "unknown object ID".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_transient());
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Rejected {
            status: 502,
            message: "bad gateway".into(),
        };
        assert!(err.is_transient());
        assert!(!err.is_not_found());
    }

    #[test]
    fn timeout_is_transient() {
        assert!(Error::Timeout { timeout_secs: 5 }.is_transient());
    }

    #[test]
    fn validation_rejection_is_permanent() {
        let err = Error::Rejected {
            status: 400,
            message: "loading new config: unknown module".into(),
        };
        assert!(!err.is_transient());
    }
}
