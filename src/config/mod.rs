//! Configuration loading for the trickplay preview tools.
//!
//! Settings are read from `conf/config.toml` if present. Any missing or
//! invalid entries fall back to defaults so the tools still run.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{DEFAULT_CONFIG_PATH, load_config, parse_config, serialize_config};
pub use models::{AppConfig, LogLevel};
