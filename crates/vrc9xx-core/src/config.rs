// ── Runtime configuration ──
//
// Connection and synchronization tuning handed in by the binary. Core never
// reads config files; `vrc9xx-config` builds these from TOML and env.

use std::path::PathBuf;
use std::time::Duration;

use vrc9xx_api::{Credentials, DEFAULT_BASE_URL, RetryPolicy};

/// Polling and command timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Delay between two refreshes of one facility. Never below
    /// [`SyncConfig::MIN_POLLING_INTERVAL`].
    polling_interval: Duration,
    /// Skip room-by-room data even on facilities that support it.
    pub rooms_disabled: bool,
    /// Default quick-veto duration in minutes.
    pub veto_duration: u32,
    /// A command group sends only after this long without a newer request.
    pub quiescence: Duration,
    /// Pause after each send before the group's next send.
    pub settle: Duration,
    /// Delay between a successful write and the forced refresh of every facility.
    pub post_command_refresh: Duration,
    /// Delay before retrying a failed facility discovery.
    pub discovery_retry: Duration,
}

impl SyncConfig {
    pub const MIN_POLLING_INTERVAL: Duration = Duration::from_secs(30);

    pub fn polling_interval(&self) -> Duration {
        self.polling_interval
    }

    /// Set the polling interval, flooring it at 30 seconds.
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval.max(Self::MIN_POLLING_INTERVAL);
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_secs(300),
            rooms_disabled: false,
            veto_duration: 180,
            quiescence: Duration::from_secs(2),
            settle: Duration::from_secs(1),
            post_command_refresh: Duration::from_secs(10),
            discovery_retry: Duration::from_secs(30),
        }
    }
}

/// Everything needed to run a [`Controller`](crate::Controller).
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub credentials: Credentials,
    /// API root, normally [`DEFAULT_BASE_URL`].
    pub base_url: url::Url,
    /// Per-request timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Directory for `vrc9xx-query.log`; `None` disables the query log.
    pub query_log_dir: Option<PathBuf>,
    pub sync: SyncConfig,
}

impl ControllerConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: url::Url::parse(DEFAULT_BASE_URL).unwrap_or_else(|_| unreachable!()),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            query_log_dir: None,
            sync: SyncConfig::default(),
        }
    }
}
