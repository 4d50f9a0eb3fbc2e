// ── Core error types ──
//
// `CoreError` is what mutation callers see: validation and not-found
// failures with no partial effect, plus store/config plumbing errors.
// Proxy and event failures have their own types and never flow into a
// mutation's result.

use thiserror::Error;

use crate::model::{BranchId, SiteId};

/// Unified error type for branch mutations.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Caller errors ────────────────────────────────────────────────
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Site not found: {site_id}")]
    SiteNotFound { site_id: SiteId },

    #[error("Branch not found: {branch_id} in site {site_id}")]
    BranchNotFound { site_id: SiteId, branch_id: BranchId },

    // ── Infrastructure errors ────────────────────────────────────────
    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SiteNotFound { .. } | Self::BranchNotFound { .. })
    }
}

// ── Proxy synchronisation ────────────────────────────────────────────

/// Failure pushing a routing config to the proxy.
///
/// Logged and broadcast to sync observers; never returned from a
/// mutation, because the store commit is already authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyConfigError {
    #[error("Proxy unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("Proxy rejected configuration (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Proxy sync timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Proxy synchronizer is shut down")]
    ShutDown,

    #[error("Proxy sync failed: {0}")]
    Internal(String),
}

impl From<meli_proxy::Error> for ProxyConfigError {
    fn from(err: meli_proxy::Error) -> Self {
        match err {
            meli_proxy::Error::Transport(ref e) => {
                if e.is_timeout() || e.is_connect() {
                    Self::Unreachable {
                        reason: e.to_string(),
                    }
                } else {
                    match e.status() {
                        Some(status) => Self::Rejected {
                            status: status.as_u16(),
                            message: e.to_string(),
                        },
                        None => Self::Unreachable {
                            reason: e.to_string(),
                        },
                    }
                }
            }
            meli_proxy::Error::Timeout { timeout_secs } => Self::Timeout {
                timeout_ms: timeout_secs.saturating_mul(1000),
            },
            meli_proxy::Error::Rejected { status, message } => Self::Rejected { status, message },
            meli_proxy::Error::InvalidUrl(e) => Self::Internal(format!("invalid admin URL: {e}")),
            meli_proxy::Error::Tls(msg) => Self::Unreachable {
                reason: format!("TLS error: {msg}"),
            },
            meli_proxy::Error::Deserialization { message, body: _ } => {
                Self::Internal(format!("unexpected admin response: {message}"))
            }
        }
    }
}

// ── Event publishing ─────────────────────────────────────────────────

/// Failure handing a domain event to the bus. Best-effort only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventPublishError {
    #[error("Event bus closed")]
    Closed,

    #[error("Event rejected: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_helpers() {
        let v = CoreError::validation("release", "not found");
        assert!(v.is_validation());
        assert!(!v.is_not_found());

        let nf = CoreError::BranchNotFound {
            site_id: "s".into(),
            branch_id: "b".into(),
        };
        assert!(nf.is_not_found());
    }

    #[test]
    fn proxy_rejection_maps_status() {
        let err: ProxyConfigError = meli_proxy::Error::Rejected {
            status: 400,
            message: "bad handler".into(),
        }
        .into();
        assert_eq!(
            err,
            ProxyConfigError::Rejected {
                status: 400,
                message: "bad handler".into()
            }
        );
    }

    #[test]
    fn proxy_timeout_maps_to_millis() {
        let err: ProxyConfigError = meli_proxy::Error::Timeout { timeout_secs: 3 }.into();
        assert_eq!(err, ProxyConfigError::Timeout { timeout_ms: 3000 });
    }
}
