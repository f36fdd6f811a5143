//! Runtime settings loaded from an optional file and `MARKET_SCOUT_*` variables.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_CONFIG_FILE: &str = "config/market-scout";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the market backend, without a trailing path
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Quiet period before a burst of criteria edits triggers a fetch
    pub debounce_ms: u64,
    /// Anchor the view scrolls back to on page changes
    pub scroll_anchor: String,
    pub session_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 30,
            user_agent: format!("market-scout/{}", env!("CARGO_PKG_VERSION")),
            debounce_ms: 300,
            scroll_anchor: "top".to_string(),
            session_token: None,
        }
    }
}

impl Settings {
    /// Load settings. An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&str>) -> Result<Self> {
        // .env is a convenience for local runs
        let _ = dotenvy::dotenv();

        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("MARKET_SCOUT"))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        debug!(api_base_url = %settings.api_base_url, "Configuration loaded");
        Ok(settings)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_default_file_yields_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.request_timeout_secs, 30);
        assert_eq!(settings.scroll_anchor, "top");
        assert_eq!(settings.debounce(), Duration::from_millis(300));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        assert!(Settings::load(Some("does/not/exist.toml")).is_err());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = std::env::temp_dir().join(format!("market-scout-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.toml");
        std::fs::write(&path, "api_base_url = \"https://market.example\"\ndebounce_ms = 50\n").unwrap();

        let settings = Settings::load(path.to_str()).unwrap();
        assert_eq!(settings.api_base_url, "https://market.example");
        assert_eq!(settings.debounce_ms, 50);
        assert_eq!(settings.request_timeout_secs, 30);

        std::fs::remove_dir_all(&dir).ok();
    }
}
