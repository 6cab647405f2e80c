pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}

pub(crate) fn default_accept() -> String {
    crate::fetch::ACCEPT_HTML.to_string()
}

pub(crate) fn default_user_agent() -> String {
    concat!("trickplay-hover/", env!("CARGO_PKG_VERSION")).to_string()
}

pub(crate) fn default_include_credentials() -> bool {
    true
}

pub(crate) fn default_frame_interval_ms() -> u64 {
    16
}

pub(crate) fn default_preferences_path() -> String {
    ".cache/preferences.toml".to_string()
}
