use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Client settings, loaded from a TOML file. Every field has a default so a
/// missing config file still yields a runnable dashboard against localhost.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the analytics backend serving the JSON endpoints.
    pub base_url: String,
    /// Recipient identifier forwarded verbatim in notification dispatches.
    pub chat_id: String,
    /// Pairs shown on the board, one row each, in this order. Row identity is
    /// fixed for the lifetime of the process.
    pub pairs: Vec<String>,
    /// Price poll interval in seconds.
    pub price_poll_secs: u64,
    /// Indicator poll interval in seconds.
    pub indicator_poll_secs: u64,
    /// How long a price cell keeps its up/down color after a change.
    pub flash_millis: u64,
    /// Directory for the sled database holding the notified-pairs set.
    pub state_path: PathBuf,
    /// Log file used while the dashboard owns the terminal.
    pub log_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            chat_id: "1001423950701".to_string(),
            pairs: vec![
                "BTCUSDT".to_string(),
                "ETHUSDT".to_string(),
                "SOLUSDT".to_string(),
            ],
            price_poll_secs: 10,
            indicator_poll_secs: 300,
            flash_millis: 1000,
            state_path: PathBuf::from("trendwatch-state"),
            log_path: PathBuf::from("trendwatch.log"),
        }
    }
}

impl Settings {
    /// Reads settings from `path`, falling back to defaults when the file does
    /// not exist. A present-but-invalid file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let settings: Settings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse config file {}", path.display()))?;
            info!("Loaded configuration from {}", path.display());
            settings
        } else {
            info!("Config file {} not found, using defaults", path.display());
            Settings::default()
        };

        if let Err(errors) = settings.validate() {
            anyhow::bail!("invalid configuration: {}", errors.join(", "));
        }
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.base_url.trim().is_empty() {
            errors.push("base_url must not be empty".to_string());
        }
        if self.chat_id.trim().is_empty() {
            errors.push("chat_id must not be empty".to_string());
        }
        if self.pairs.is_empty() {
            errors.push("pairs must list at least one trading pair".to_string());
        }
        if self.price_poll_secs == 0 {
            errors.push("price_poll_secs must be > 0".to_string());
        }
        if self.indicator_poll_secs == 0 {
            errors.push("indicator_poll_secs must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.chat_id, "1001423950701");
        assert_eq!(settings.price_poll_secs, 10);
        assert_eq!(settings.indicator_poll_secs, 300);
        assert_eq!(settings.flash_millis, 1000);
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            base_url = "https://board.example.com"
            pairs = ["BTCUSDT", "XRPUSDT"]
            "#,
        )
        .unwrap();
        assert_eq!(settings.base_url, "https://board.example.com");
        assert_eq!(settings.pairs, vec!["BTCUSDT", "XRPUSDT"]);
        assert_eq!(settings.price_poll_secs, 10);
    }

    #[test]
    fn empty_pair_list_is_rejected() {
        let mut settings = Settings::default();
        settings.pairs.clear();
        let errors = settings.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("pairs")));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::load(Path::new("does-not-exist.toml")).unwrap();
        assert_eq!(settings.base_url, Settings::default().base_url);
    }
}
