//! The one user preference, `maxFrames`, stored as a tiny TOML file.
//!
//! The hover preview does not read it yet; it is kept for tuning sprite
//! selection later.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use ts_rs::TS;

pub const DEFAULT_MAX_FRAMES: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Preferences {
    #[serde(default = "default_max_frames")]
    pub max_frames: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

fn default_max_frames() -> u32 {
    DEFAULT_MAX_FRAMES
}

impl Preferences {
    pub fn with_max_frames(max_frames: u32) -> Result<Self> {
        if max_frames == 0 {
            return Err(anyhow!("maxFrames must be at least 1"));
        }
        Ok(Self { max_frames })
    }
}

/// Load stored preferences, falling back to defaults when the file is missing
/// or unreadable.
pub fn load_preferences(path: &Path) -> Preferences {
    let Ok(data) = fs::read_to_string(path) else {
        debug!(path = %path.display(), "No stored preferences; using defaults");
        return Preferences::default();
    };
    match toml::from_str::<Preferences>(&data) {
        Ok(prefs) if prefs.max_frames > 0 => prefs,
        Ok(_) => {
            warn!(path = %path.display(), "Stored maxFrames is 0; using default");
            Preferences::default()
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid preferences TOML: {err}");
            Preferences::default()
        }
    }
}

pub fn save_preferences(path: &Path, prefs: &Preferences) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create_dir_all {}", parent.display()))?;
        }
    }
    let contents = toml::to_string(prefs).context("Failed to serialize preferences")?;
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), max_frames = prefs.max_frames, "Saved preferences");
    Ok(())
}
