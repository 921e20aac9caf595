//! Configuration for the vrc9xx binary.
//!
//! `config.toml` layered with `VRC9XX_` environment variables, password
//! resolution (env + keyring + plaintext), and translation to
//! `vrc9xx_core::ControllerConfig`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use vrc9xx_core::{ControllerConfig, Credentials, DEFAULT_BASE_URL, SyncConfig};

/// Environment variable consulted for the account password.
pub const PASSWORD_ENV: &str = "VRC9XX_PASSWORD";

/// Keyring service name; entries are `<user name>/password`.
pub const KEYRING_SERVICE: &str = "vrc9xx";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("missing [api.user] {field} in configuration")]
    MissingUser { field: &'static str },

    #[error("no password configured for user '{user}'")]
    NoCredentials { user: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiSection {
    /// Polling interval in seconds. Floored at 30.
    #[serde(default = "default_polling")]
    pub polling: u64,

    /// Write every authenticated request and response to the query log.
    #[serde(default)]
    pub debug: bool,

    /// Directory for `vrc9xx-query.log`.
    #[serde(default = "default_debug_path")]
    pub debug_path: PathBuf,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub user: UserSection,

    #[serde(default)]
    pub rooms: RoomsSection,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            polling: default_polling(),
            debug: false,
            debug_path: default_debug_path(),
            base_url: default_base_url(),
            timeout: default_timeout(),
            user: UserSection::default(),
            rooms: RoomsSection::default(),
        }
    }
}

fn default_polling() -> u64 {
    300
}
fn default_debug_path() -> PathBuf {
    PathBuf::from(".")
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout() -> u64 {
    30
}

/// Account credentials.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct UserSection {
    /// Smartphone/device id registered with the account.
    pub device: Option<String>,

    /// Account user name.
    pub name: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,
}

impl fmt::Debug for UserSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserSection")
            .field("device", &self.device)
            .field("name", &self.name)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("password_env", &self.password_env)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoomsSection {
    /// Ignore room-by-room data even when the facility supports it.
    #[serde(default)]
    pub disabled: bool,

    /// Default quick-veto duration in minutes.
    #[serde(default = "default_veto_duration")]
    pub veto_duration: u32,
}

impl Default for RoomsSection {
    fn default() -> Self {
        Self {
            disabled: false,
            veto_duration: default_veto_duration(),
        }
    }
}

fn default_veto_duration() -> u32 {
    180
}

impl Config {
    /// Render as TOML with the plaintext password masked.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut redacted = self.clone();
        if redacted.api.user.password.is_some() {
            redacted.api.user.password = Some("***".into());
        }
        Ok(toml::to_string_pretty(&redacted)?)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "vrc9xx", "vrc9xx").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("vrc9xx");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the platform path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` + environment. A missing file yields the
/// defaults. Nested keys use `__`, e.g. `VRC9XX_API__POLLING=60`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VRC9XX_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the account password: `password_env`, then `VRC9XX_PASSWORD`,
/// then the system keyring, then the plaintext value.
pub fn resolve_password(user: &UserSection) -> Result<SecretString, ConfigError> {
    let name = user
        .name
        .as_deref()
        .ok_or(ConfigError::MissingUser { field: "name" })?;

    // 1. User's password_env → env var lookup
    if let Some(ref env_name) = user.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Well-known env var
    if let Ok(val) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(val));
    }

    // 3. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{name}/password")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 4. Plaintext in config
    if let Some(ref pw) = user.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials { user: name.into() })
}

/// Build a `ControllerConfig` from the loaded configuration.
pub fn to_controller_config(config: &Config) -> Result<ControllerConfig, ConfigError> {
    let api = &config.api;
    let base_url: url::Url = api.base_url.parse().map_err(|_| ConfigError::Validation {
        field: "api.base_url".into(),
        reason: format!("invalid URL: {}", api.base_url),
    })?;
    if api.timeout == 0 {
        return Err(ConfigError::Validation {
            field: "api.timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let device = api
        .user
        .device
        .clone()
        .ok_or(ConfigError::MissingUser { field: "device" })?;
    let name = api
        .user
        .name
        .clone()
        .ok_or(ConfigError::MissingUser { field: "name" })?;
    let password = resolve_password(&api.user)?;

    let mut controller = ControllerConfig::new(Credentials::new(device, name, password));
    controller.base_url = base_url;
    controller.timeout = Duration::from_secs(api.timeout);
    controller.query_log_dir = api.debug.then(|| api.debug_path.clone());
    controller.sync = SyncConfig::default().with_polling_interval(Duration::from_secs(api.polling));
    controller.sync.rooms_disabled = api.rooms.disabled;
    controller.sync.veto_duration = api.rooms.veto_duration;
    Ok(controller)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const FULL: &str = r#"
[api]
polling = 10
debug = true
debug_path = "/tmp/vrc"
timeout = 15

[api.user]
device = "phone-1"
name = "vrc9xx-test-user"
password = "hunter2"
password_env = "VRC9XX_TEST_UNSET_PASSWORD_VARIABLE"

[api.rooms]
disabled = true
veto_duration = 60
"#;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.api.polling, 300);
        assert!(!config.api.debug);
        assert_eq!(config.api.debug_path, PathBuf::from("."));
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.rooms.veto_duration, 180);
        assert!(config.api.user.name.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let file = write_config(FULL);
        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.api.polling, 10);
        assert_eq!(config.api.timeout, 15);
        assert_eq!(config.api.user.device.as_deref(), Some("phone-1"));
        assert!(config.api.rooms.disabled);
        assert_eq!(config.api.rooms.veto_duration, 60);
        // Unset sections keep their defaults.
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn translates_to_controller_config() {
        let file = write_config(FULL);
        let config = load_config_from(file.path()).unwrap();
        let controller = to_controller_config(&config).unwrap();

        assert_eq!(controller.credentials.device_id, "phone-1");
        assert_eq!(controller.credentials.password.expose_secret(), "hunter2");
        assert_eq!(controller.timeout, Duration::from_secs(15));
        assert_eq!(controller.query_log_dir, Some(PathBuf::from("/tmp/vrc")));
        // Floored at 30 seconds.
        assert_eq!(controller.sync.polling_interval(), Duration::from_secs(30));
        assert!(controller.sync.rooms_disabled);
        assert_eq!(controller.sync.veto_duration, 60);
    }

    #[test]
    fn missing_user_is_rejected() {
        let config = Config::default();
        assert!(matches!(
            to_controller_config(&config),
            Err(ConfigError::MissingUser { field: "device" })
        ));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let file = write_config("[api]\nbase_url = \"not a url\"\n");
        let config = load_config_from(file.path()).unwrap();
        assert!(matches!(
            to_controller_config(&config),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn redacted_toml_hides_password() {
        let file = write_config(FULL);
        let config = load_config_from(file.path()).unwrap();
        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
        assert!(rendered.contains("veto_duration = 60"));
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
