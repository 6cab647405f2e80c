use super::defaults;
use super::models::{AppConfig, LogLevel};
use serde::Deserialize;

/// On-disk layout of `config.toml`.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    fetch: FetchConfig,
    #[serde(default)]
    preview: PreviewConfig,
    #[serde(default)]
    storage: StorageConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            log_level: tables.logging.log_level,
            accept: tables.fetch.accept,
            user_agent: tables.fetch.user_agent,
            include_credentials: tables.fetch.include_credentials,
            frame_interval_ms: tables.preview.frame_interval_ms,
            preferences_path: tables.storage.preferences_path,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            fetch: FetchConfig {
                accept: config.accept.clone(),
                user_agent: config.user_agent.clone(),
                include_credentials: config.include_credentials,
            },
            preview: PreviewConfig {
                frame_interval_ms: config.frame_interval_ms,
            },
            storage: StorageConfig {
                preferences_path: config.preferences_path.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct FetchConfig {
    #[serde(default = "defaults::default_accept")]
    accept: String,
    #[serde(default = "defaults::default_user_agent")]
    user_agent: String,
    #[serde(default = "defaults::default_include_credentials")]
    include_credentials: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            accept: defaults::default_accept(),
            user_agent: defaults::default_user_agent(),
            include_credentials: defaults::default_include_credentials(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PreviewConfig {
    #[serde(default = "defaults::default_frame_interval_ms")]
    frame_interval_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        PreviewConfig {
            frame_interval_ms: defaults::default_frame_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_preferences_path")]
    preferences_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            preferences_path: defaults::default_preferences_path(),
        }
    }
}
