//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use vrc9xx_config::ConfigError;
use vrc9xx_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the multiMATIC API: {reason}")]
    #[diagnostic(
        code(vrc9xx::connection_failed),
        help("Check your network connection and api.base_url, then retry.")
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(vrc9xx::auth_failed),
        help(
            "Verify [api.user] device and name, and the password.\n\
             The password is read from password_env, VRC9XX_PASSWORD, the\n\
             system keyring (service 'vrc9xx', entry '<name>/password'),\n\
             then the config file."
        )
    )]
    AuthFailed { message: String },

    #[error("No password configured for user '{user}'")]
    #[diagnostic(
        code(vrc9xx::no_credentials),
        help("Set VRC9XX_PASSWORD or store it in the system keyring.")
    )]
    NoCredentials { user: String },

    #[error("Missing [api.user] {field}")]
    #[diagnostic(
        code(vrc9xx::no_config),
        help("Add it to {path}\nRun: vrc9xx config path")
    )]
    MissingUser { field: String, path: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(vrc9xx::not_found),
        help("Run: vrc9xx facilities to see available facilities")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    #[error("Gateway not synchronized: {message}")]
    #[diagnostic(
        code(vrc9xx::conflict),
        help("The gateway has not caught up with the cloud yet. Retry in a minute.")
    )]
    Conflict { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(vrc9xx::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vrc9xx::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    #[diagnostic(code(vrc9xx::config))]
    Config { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render JSON: {0}")]
    #[diagnostic(code(vrc9xx::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::MissingUser { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },

            CoreError::RetriesExhausted { message, .. } => {
                CliError::ConnectionFailed { reason: message }
            }

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::SessionExpired => CliError::AuthFailed {
                message: "session expired".into(),
            },

            CoreError::Conflict { message } => CliError::Conflict { message },

            CoreError::NotFound { message } => CliError::NotFound {
                resource_type: "Resource".into(),
                identifier: message,
            },

            CoreError::FacilityNotFound { serial } => CliError::NotFound {
                resource_type: "Facility".into(),
                identifier: serial,
            },

            CoreError::Api { message, .. } => CliError::ApiError { message },

            CoreError::Config { message } => CliError::Config { message },

            err @ (CoreError::PollerStopped | CoreError::Internal(_)) => CliError::ApiError {
                message: err.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::MissingUser { field } => CliError::MissingUser {
                field: field.into(),
                path: vrc9xx_config::config_path().display().to_string(),
            },
            ConfigError::NoCredentials { user } => CliError::NoCredentials { user },
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
