// ── Core error types ──
//
// User-facing errors from vrc9xx-core. The `From<vrc9xx_api::Error>` impl
// translates transport-layer errors into domain variants; status codes
// survive only where the poller and callers act on them.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the multiMATIC API: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Session expired -- the next request logs in again")]
    SessionExpired,

    #[error("Gave up after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Gateway has not synchronized the resource yet: {message}")]
    Conflict { message: String },

    #[error("Resource not found: {message}")]
    NotFound { message: String },

    #[error("Facility not found: {serial}")]
    FacilityNotFound { serial: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Poller is not running")]
    PollerStopped,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for HTTP 409 (out-of-sync gateway), including after retries.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<vrc9xx_api::Error> for CoreError {
    fn from(err: vrc9xx_api::Error) -> Self {
        use vrc9xx_api::Error as Api;

        if err.is_conflict() {
            return CoreError::Conflict {
                message: err.to_string(),
            };
        }

        match err {
            Api::Authentication { message } => CoreError::AuthenticationFailed { message },
            Api::SessionExpired { .. } => CoreError::SessionExpired,
            Api::NotFound { .. } => CoreError::NotFound {
                message: err.to_string(),
            },
            Api::Transport(ref e) if e.is_connect() || e.is_timeout() => {
                CoreError::ConnectionFailed {
                    reason: e.to_string(),
                }
            }
            Api::TooManyRetries { attempts, .. } => CoreError::RetriesExhausted {
                attempts,
                message: err.to_string(),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::ClientBuild(message) => CoreError::Internal(message),
            other => CoreError::Api {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}
