//! Configuration management
//!
//! Settings live in `settings.json` inside the flashline directory:
//! ```json
//! {
//!   "app": { "demoMode": false },
//!   "limits": { "maxPages": 5, "maxActiveCards": 5, "graduationThreshold": 1.5 },
//!   "content": { "marker": "🧩" },
//!   "sync": { "refreshIntervalHours": 3 },
//!   "notion": { "baseUrl": "https://api.notion.com/v1", "apiVersion": "2022-06-28" }
//! }
//! ```
//! Missing sections fall back to defaults; unknown fields are preserved on save.

use std::collections::HashMap;
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

/// Default Notion REST endpoint
pub const NOTION_PRODUCTION_URL: &str = "https://api.notion.com/v1";

/// Notion API version sent with every request
pub const NOTION_API_VERSION: &str = "2022-06-28";

/// Reserved glyph that turns a bullet into a flashcard
pub const DEFAULT_MARKER: &str = "🧩";

/// Environment variable to force demo mode on or off (CI/testing)
pub const DEMO_MODE_ENV: &str = "FLASHLINE_DEMO_MODE";

/// Environment variable to point the Notion client at another host
pub const NOTION_BASE_URL_ENV: &str = "NOTION_BASE_URL";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    limits: Limits,
    #[serde(default)]
    content: ContentSettings,
    #[serde(default)]
    sync: SyncSettings,
    #[serde(default)]
    notion: NotionSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Capacity limits and the graduation threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    /// Pages a single user may subscribe to
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Size of the active study set
    #[serde(default = "default_max_active_cards")]
    pub max_active_cards: usize,
    /// Mastery at which a card leaves active study
    #[serde(default = "default_graduation_threshold")]
    pub graduation_threshold: f64,
}

fn default_max_pages() -> usize {
    5
}

fn default_max_active_cards() -> usize {
    5
}

fn default_graduation_threshold() -> f64 {
    1.5
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_active_cards: default_max_active_cards(),
            graduation_threshold: default_graduation_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSettings {
    #[serde(default = "default_marker")]
    pub marker: String,
}

fn default_marker() -> String {
    DEFAULT_MARKER.to_string()
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            marker: default_marker(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    #[serde(default = "default_refresh_interval_hours")]
    pub refresh_interval_hours: u32,
}

fn default_refresh_interval_hours() -> u32 {
    3
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            refresh_interval_hours: default_refresh_interval_hours(),
        }
    }
}

/// Notion endpoint and OAuth client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotionSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

fn default_base_url() -> String {
    NOTION_PRODUCTION_URL.to_string()
}

fn default_api_version() -> String {
    NOTION_API_VERSION.to_string()
}

impl Default for NotionSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            client_id: None,
            redirect_uri: None,
        }
    }
}

/// Flashline configuration (resolved view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub demo_mode: bool,
    pub limits: Limits,
    pub marker: String,
    pub refresh_interval_hours: u32,
    pub notion: NotionSettings,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            demo_mode: false,
            limits: Limits::default(),
            marker: default_marker(),
            refresh_interval_hours: default_refresh_interval_hours(),
            notion: NotionSettings::default(),
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the flashline directory
    ///
    /// Demo mode can be enabled via:
    /// 1. Settings file (`fl demo on`)
    /// 2. Environment variable FLASHLINE_DEMO_MODE (for CI/testing)
    pub fn load(flashline_dir: &Path) -> Result<Self> {
        let settings_path = flashline_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {}", settings_path.display(), e)))?
        } else {
            SettingsFile::default()
        };

        let demo_mode = match std::env::var(DEMO_MODE_ENV).ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.app.demo_mode,
        };

        let mut notion = raw.notion.clone();
        if let Ok(url) = std::env::var(NOTION_BASE_URL_ENV) {
            notion.base_url = url;
        }

        let config = Self {
            demo_mode,
            limits: raw.limits,
            marker: raw.content.marker.clone(),
            refresh_interval_hours: raw.sync.refresh_interval_hours,
            notion,
            _raw_settings: raw,
        };
        config.validate()?;
        Ok(config)
    }

    /// Save config to the flashline directory
    /// Preserves other settings that the CLI doesn't manage
    pub fn save(&self, flashline_dir: &Path) -> Result<()> {
        let settings_path = flashline_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            self._raw_settings.clone()
        };

        settings.app.demo_mode = self.demo_mode;
        settings.limits = self.limits;
        settings.content.marker = self.marker.clone();
        settings.sync.refresh_interval_hours = self.refresh_interval_hours;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Enable demo mode
    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    /// Disable demo mode
    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }

    /// Time after which a page becomes eligible for scheduled refresh
    pub fn refresh_interval(&self) -> Duration {
        Duration::hours(i64::from(self.refresh_interval_hours))
    }

    fn validate(&self) -> Result<()> {
        if self.marker.trim().is_empty() {
            return Err(Error::Config("content.marker must not be empty".to_string()));
        }
        if self.limits.max_active_cards == 0 {
            return Err(Error::Config("limits.maxActiveCards must be at least 1".to_string()));
        }
        if !(self.limits.graduation_threshold > 0.0) {
            return Err(Error::Config(
                "limits.graduationThreshold must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
