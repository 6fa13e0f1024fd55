use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const ENDPOINT_ENV: &str = "TRAVELBOT_ENDPOINT";
const API_KEY_ENV: &str = "TRAVELBOT_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chat endpoint that accepts `{ messages }` and streams SSE back
    pub endpoint_url: Option<String>,

    /// Bearer credential for the endpoint
    pub api_key: Option<String>,

    /// Seconds allowed for establishing the connection
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// UI preferences
    #[serde(default)]
    pub ui: UiConfig,

    /// TravelBot home directory
    #[serde(skip)]
    pub home: PathBuf,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    pub show_quick_actions: bool,
    pub tick_millis: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_quick_actions: true,
            tick_millis: 300,
        }
    }
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".travelbot");

        Config {
            endpoint_url: None,
            api_key: None,
            connect_timeout_secs: default_connect_timeout(),
            ui: UiConfig::default(),
            home,
        }
    }
}

impl Config {
    /// Load `~/.travelbot/config.toml`, then apply environment overrides
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir()
            .context("Could not find home directory")?
            .join(".travelbot");

        let mut config = Self::load_from(&home)?;
        config.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(API_KEY_ENV).ok(),
        );
        Ok(config)
    }

    /// Load configuration rooted at `home`; a missing file yields defaults
    pub fn load_from(home: &Path) -> Result<Self> {
        fs::create_dir_all(home).context("Failed to create .travelbot directory")?;

        let config_path = home.join("config.toml");
        let mut config = if config_path.exists() {
            let content =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.home = home.to_path_buf();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.home).context("Failed to create .travelbot directory")?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(self.config_path(), content).context("Failed to write config file")?;
        Ok(())
    }

    /// Replace endpoint and credential with any values that are set
    pub fn apply_overrides(&mut self, endpoint: Option<String>, api_key: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            self.endpoint_url = Some(endpoint);
        }
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
    }

    /// The configured endpoint, or an error explaining how to set one
    pub fn endpoint(&self) -> Result<&str> {
        self.endpoint_url
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .with_context(|| {
                format!(
                    "No chat endpoint configured. Set {ENDPOINT_ENV}, pass --endpoint, or add endpoint_url to {}",
                    self.config_path().display()
                )
            })
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn log_path(&self) -> PathBuf {
        self.home.join("travelbot.log")
    }

    /// Credential with all but the last four characters hidden. Keys too
    /// short to keep a hidden part are masked entirely.
    pub fn masked_api_key(&self) -> Option<String> {
        self.api_key.as_ref().map(|key| {
            let chars: Vec<char> = key.chars().collect();
            if chars.len() <= 8 {
                return "*".repeat(8);
            }
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}{}", "*".repeat(8), tail)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path()).unwrap();
        assert!(config.endpoint_url.is_none());
        assert_eq!(config.connect_timeout_secs, 10);
        assert!(config.ui.show_quick_actions);
        assert_eq!(config.home, dir.path());
        assert!(config.endpoint().is_err());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::load_from(dir.path()).unwrap();
        config.endpoint_url = Some("https://example.test/functions/v1/travel-chat".into());
        config.api_key = Some("pk_live_123".into());
        config.ui.tick_millis = 150;
        config.save().unwrap();

        let loaded = Config::load_from(dir.path()).unwrap();
        assert_eq!(
            loaded.endpoint().unwrap(),
            "https://example.test/functions/v1/travel-chat"
        );
        assert_eq!(loaded.api_key.as_deref(), Some("pk_live_123"));
        assert_eq!(loaded.ui.tick_millis, 150);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "endpoint_url = \"http://localhost:8080/chat\"\n",
        )
        .unwrap();
        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.endpoint().unwrap(), "http://localhost:8080/chat");
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.ui.tick_millis, 300);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), "endpoint_url = [").unwrap();
        assert!(Config::load_from(dir.path()).is_err());
    }

    #[test]
    fn overrides_ignore_blank_values() {
        let mut config = Config {
            endpoint_url: Some("http://file".into()),
            ..Config::default()
        };
        config.apply_overrides(Some("  ".into()), Some("key".into()));
        assert_eq!(config.endpoint().unwrap(), "http://file");
        assert_eq!(config.api_key.as_deref(), Some("key"));

        config.apply_overrides(Some("http://env".into()), None);
        assert_eq!(config.endpoint().unwrap(), "http://env");
        assert_eq!(config.api_key.as_deref(), Some("key"));
    }

    #[test]
    fn api_key_is_masked() {
        let config = Config {
            api_key: Some("sk-abcdefghijkl".into()),
            ..Config::default()
        };
        assert_eq!(config.masked_api_key().as_deref(), Some("********ijkl"));

        let short = Config {
            api_key: Some("abc".into()),
            ..Config::default()
        };
        assert_eq!(short.masked_api_key().as_deref(), Some("********"));

        for key in ["abcd", "abcdefgh"] {
            let config = Config {
                api_key: Some(key.into()),
                ..Config::default()
            };
            let masked = config.masked_api_key().unwrap();
            assert!(!masked.contains(&key[key.len() - 1..]), "{key} leaked as {masked}");
        }
    }
}
