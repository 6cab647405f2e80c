use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Flattened runtime configuration; see `tables` for the on-disk layout.
#[derive(Debug, Clone, Deserialize, serde::Serialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
    /// `Accept` header sent with detail page requests.
    #[serde(default = "crate::config::defaults::default_accept")]
    pub accept: String,
    #[serde(default = "crate::config::defaults::default_user_agent")]
    pub user_agent: String,
    /// Keep cookies across requests, mirroring `credentials: include`.
    #[serde(default = "crate::config::defaults::default_include_credentials")]
    pub include_credentials: bool,
    /// Spacing of scheduled frame updates when no display refresh is available.
    #[serde(default = "crate::config::defaults::default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default = "crate::config::defaults::default_preferences_path")]
    pub preferences_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: crate::config::defaults::default_log_level(),
            accept: crate::config::defaults::default_accept(),
            user_agent: crate::config::defaults::default_user_agent(),
            include_credentials: crate::config::defaults::default_include_credentials(),
            frame_interval_ms: crate::config::defaults::default_frame_interval_ms(),
            preferences_path: crate::config::defaults::default_preferences_path(),
        }
    }
}

impl AppConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn preferences_path(&self) -> PathBuf {
        PathBuf::from(&self.preferences_path)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
