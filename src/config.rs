//! Service configuration.
//!
//! Loaded from a TOML file (every field has a default, so a partial or
//! missing file is valid) and then overridden from the environment. A
//! `.env` file in the working directory is honoured via `dotenv`.
//!
//! ```toml
//! site_url = "https://www.evardalen.com"
//! output_dir = "docs"
//! history_cap = 30
//!
//! [labels]
//! camera_heading = "KAMERA NÅ"
//! ```

use crate::logging::LogLevel;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "./config.toml";

// ---------------------------------------------------------------------------
// Configuration types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Station page, also the root that relative image references resolve against.
    pub site_url: String,
    pub output_dir: PathBuf,
    /// Subdirectory of `output_dir` holding downloaded camera images.
    pub images_dir: String,
    pub current_file: String,
    pub history_file: String,
    /// Maximum number of records kept in the history file.
    pub history_cap: usize,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub labels: Labels,
    pub logging: LoggingConfig,
}

/// Page labels and markers the extractor keys on. The page is Norwegian.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub camera_heading: String,
    /// Every token must appear in the weather region's heading.
    pub weather_heading_tokens: Vec<String>,
    /// Path segment that identifies camera-feed images.
    pub camera_path_segment: String,
    pub wind: String,
    pub temperature: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            site_url: "https://www.evardalen.com".to_string(),
            output_dir: PathBuf::from("evardalen_data"),
            images_dir: "images".to_string(),
            current_file: "current_data.json".to_string(),
            history_file: "history.json".to_string(),
            history_cap: 30,
            http_timeout_secs: 30,
            user_agent: concat!("evardalen_service/", env!("CARGO_PKG_VERSION")).to_string(),
            labels: Labels::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for Labels {
    fn default() -> Self {
        Labels {
            camera_heading: "KAMERA NÅ".to_string(),
            weather_heading_tokens: vec!["VÆR".to_string(), "VIND".to_string()],
            camera_path_segment: "Hikvision1".to_string(),
            wind: "Vind Nå".to_string(),
            temperature: "Ute Nå".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            file: None,
            console_timestamps: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Loads `path` if it exists (defaults otherwise), applies environment
    /// overrides, and validates the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Self::parse(&contents)?
        } else {
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `EVARDALEN_*` overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("EVARDALEN_SITE_URL") {
            self.site_url = url;
        }
        if let Some(dir) = lookup("EVARDALEN_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup("EVARDALEN_LOG_FILE") {
            self.logging.file = Some(file);
        }
        if let Some(level) = lookup("EVARDALEN_LOG_LEVEL") {
            self.logging.level = level
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", level)))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_cap == 0 {
            return Err(ConfigError::Invalid("history_cap must be at least 1".into()));
        }
        if !(self.site_url.starts_with("http://") || self.site_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "site_url must be an http(s) address, got '{}'",
                self.site_url
            )));
        }
        if self.labels.wind.trim().is_empty() || self.labels.temperature.trim().is_empty() {
            return Err(ConfigError::Invalid("weather labels must not be empty".into()));
        }
        Ok(())
    }

    pub fn site_root(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn images_path(&self) -> PathBuf {
        self.output_dir.join(&self.images_dir)
    }

    pub fn current_path(&self) -> PathBuf {
        self.output_dir.join(&self.current_file)
    }

    pub fn history_path(&self) -> PathBuf {
        self.output_dir.join(&self.history_file)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = Config::parse("").expect("empty config is valid");
        assert_eq!(config.site_url, "https://www.evardalen.com");
        assert_eq!(config.history_cap, 30);
        assert_eq!(config.labels.camera_heading, "KAMERA NÅ");
        assert_eq!(config.labels.weather_heading_tokens, vec!["VÆR", "VIND"]);
        assert_eq!(config.history_path(), PathBuf::from("evardalen_data/history.json"));
        assert_eq!(config.images_path(), PathBuf::from("evardalen_data/images"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            output_dir = "docs"
            history_cap = 10

            [labels]
            wind = "Wind now"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("docs"));
        assert_eq!(config.history_cap, 10);
        assert_eq!(config.labels.wind, "Wind now");
        assert_eq!(config.labels.temperature, "Ute Nå");
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.current_path(), PathBuf::from("docs/current_data.json"));
    }

    #[test]
    fn test_shipped_config_file_is_valid() {
        let config = Config::parse(include_str!("../config.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.output_dir, PathBuf::from("docs"));
        assert_eq!(config.labels.camera_path_segment, "Hikvision1");
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = Config::parse("history_cap = \"thirty\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "got {:?}", err);
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = [
            ("EVARDALEN_SITE_URL", "http://localhost:8080/"),
            ("EVARDALEN_OUTPUT_DIR", "/tmp/evardalen"),
            ("EVARDALEN_LOG_LEVEL", "warn"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.site_root(), "http://localhost:8080");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/evardalen"));
        assert_eq!(config.logging.level, LogLevel::Warning);
    }

    #[test]
    fn test_unknown_log_level_override_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_overrides(|k| {
            (k == "EVARDALEN_LOG_LEVEL").then(|| "loud".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validation_rejects_zero_cap_and_bad_url() {
        let mut config = Config::default();
        config.history_cap = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.site_url = "ftp://evardalen.com".into();
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }
}
