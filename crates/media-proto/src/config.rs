use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;
use crate::protocol::{
    MediaTitle, PlayerBackend, SourceMode, DEFAULT_PREFERRED_KEY, DEFAULT_TITLE,
    SLOW_DEVICE_PREFERRED_KEY,
};
use crate::selector::FallbackPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Thumbnails are requested at `thumb_size * device_pixel_ratio` pixels.
    #[serde(default = "default_device_pixel_ratio")]
    pub device_pixel_ratio: f64,
    #[serde(default = "default_thumb_size")]
    pub thumb_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Prefer the smallest transcode by default.
    #[serde(default)]
    pub slow_device: bool,
    /// What to do when the preferred source is missing.
    #[serde(default)]
    pub fallback_policy: FallbackPolicy,
    /// Played when the fragment does not name a file.
    #[serde(default = "default_title")]
    pub default_title: String,
    #[serde(default)]
    pub default_source: SourceMode,
    #[serde(default)]
    pub default_player: PlayerBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Quiet period after the last edit before the list is re-filtered.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Cap on entries shown from the recency catalog.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            device_pixel_ratio: default_device_pixel_ratio(),
            thumb_size: default_thumb_size(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            slow_device: false,
            fallback_policy: FallbackPolicy::default(),
            default_title: default_title(),
            default_source: SourceMode::default(),
            default_player: PlayerBackend::default(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            recent_limit: default_recent_limit(),
        }
    }
}

impl PlaybackConfig {
    pub fn default_title(&self) -> MediaTitle {
        MediaTitle::new(self.default_title.clone())
    }

    pub fn default_preferred_key(&self) -> &'static str {
        if self.slow_device {
            SLOW_DEVICE_PREFERRED_KEY
        } else {
            DEFAULT_PREFERRED_KEY
        }
    }
}

impl DisplayConfig {
    /// Requested thumbnail edge in device pixels.
    pub fn thumb_pixels(&self) -> u32 {
        (self.thumb_size as f64 * self.device_pixel_ratio).round() as u32
    }
}

fn default_endpoint() -> String {
    "https://commons.wikimedia.org/w/api.php".to_string()
}

fn default_user_agent() -> String {
    format!("media-picker/{}", env!("CARGO_PKG_VERSION"))
}

fn default_device_pixel_ratio() -> f64 {
    1.0
}

fn default_thumb_size() -> u32 {
    128
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_debounce_ms() -> u64 {
    250
}

fn default_recent_limit() -> usize {
    40
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Read `path`, writing defaults there first if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            display: DisplayConfig::default(),
            playback: PlaybackConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}
