use thiserror::Error;

/// Top-level error type for the `vrc9xx-api` crate.
///
/// Every terminal HTTP outcome carries the status text and a body snippet
/// so callers can decide whether a fresh login is warranted.
/// `vrc9xx-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The token exchange or the authorize call was rejected.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The API answered 401 -- the session cookie is no longer valid.
    #[error("Session expired (HTTP 401 {status_text}): {body}")]
    SessionExpired { status_text: String, body: String },

    // ── Application ─────────────────────────────────────────────────
    /// HTTP 404. Terminal.
    #[error("Resource not found (HTTP 404 {status_text}): {body}")]
    NotFound { status_text: String, body: String },

    /// HTTP 409: the gateway has not synchronized the resource yet. Terminal.
    #[error("Resource conflict (HTTP 409 {status_text}): {body}")]
    Conflict { status_text: String, body: String },

    /// Any other non-success status (5xx, 429, ...). Retryable.
    #[error("HTTP {status} {status_text}: {body}")]
    Status {
        status: u16,
        status_text: String,
        body: String,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, ...)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Retry budget spent on a retryable failure.
    #[error("Too many retries for '{description}' ({attempts} attempts): {last}")]
    TooManyRetries {
        description: String,
        attempts: u32,
        last: Box<Error>,
    },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The underlying `reqwest::Client` could not be built.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The query log could not be written.
    #[error("Query log error: {0}")]
    DebugLog(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if the session is gone and a forced login may resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Returns `true` if the transport should try again: retryable statuses
    /// and network failures. Builder or encoding errors never are.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { .. } => true,
            Self::Transport(e) => {
                e.is_connect() || e.is_timeout() || e.is_request() || e.is_body()
            }
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for HTTP 409 (out-of-sync gateway).
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Conflict { .. } => true,
            Self::TooManyRetries { last, .. } => last.is_conflict(),
            _ => false,
        }
    }

    /// HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SessionExpired { .. } => Some(401),
            Self::NotFound { .. } => Some(404),
            Self::Conflict { .. } => Some(409),
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::TooManyRetries { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Classify a non-success response into the matching variant.
    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let status_text = status.canonical_reason().unwrap_or("").to_owned();
        let body = snippet(body);
        match status.as_u16() {
            401 => Self::SessionExpired { status_text, body },
            404 => Self::NotFound { status_text, body },
            409 => Self::Conflict { status_text, body },
            code => Self::Status {
                status: code,
                status_text,
                body,
            },
        }
    }
}

/// First 200 characters of a response body.
pub(crate) fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}
