use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

pub const SETTINGS_FILE: &str = "archiver.toml";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub archive: ArchiveSettings,
    #[serde(default)]
    pub pacing: PacingSettings,
    #[serde(default)]
    pub api: ApiSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSettings {
    #[serde(default = "default_archive_dir")]
    pub dir: String,
    #[serde(default = "default_true", rename = "include-threads")]
    pub include_threads: bool,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            dir: default_archive_dir(),
            include_threads: true,
        }
    }
}

/// Fixed delays used to stay under the workspace API rate limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingSettings {
    #[serde(default = "default_page_delay_ms", rename = "page-delay-ms")]
    pub page_delay_ms: u64,
    #[serde(default = "default_channel_delay_ms", rename = "channel-delay-ms")]
    pub channel_delay_ms: u64,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay_ms(),
            channel_delay_ms: default_channel_delay_ms(),
        }
    }
}

impl PacingSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn channel_delay(&self) -> Duration {
        Duration::from_millis(self.channel_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Page size for user and channel listings
    #[serde(default = "default_page_limit", rename = "page-limit")]
    pub page_limit: u16,
    /// Page size for history and thread replies
    #[serde(default = "default_history_limit", rename = "history-limit")]
    pub history_limit: u16,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_archive_dir() -> String {
    "archives".to_string()
}

fn default_true() -> bool {
    true
}

fn default_page_delay_ms() -> u64 {
    500
}

fn default_channel_delay_ms() -> u64 {
    1000
}

fn default_page_limit() -> u16 {
    200
}

fn default_history_limit() -> u16 {
    100
}

impl Settings {
    /// Load settings from the given file, falling back to defaults when it is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| AppError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| AppError::TomlParse(e.to_string()))
    }
}
