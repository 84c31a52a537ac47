//! Configuration for leitner trainer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const APP_NAME: &str = "leitner-trainer";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub study: StudyConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Read the config file. A missing file yields defaults; a malformed one is an error.
    pub fn load() -> Result<Self, toml::de::Error> {
        match Self::config_path().and_then(|p| std::fs::read_to_string(p).ok()) {
            Some(content) => Self::parse(&content),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(self)?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.config_dir().join("config.toml"))
    }

    /// Database location, honouring `storage.db_path`.
    pub fn db_path(&self) -> Option<PathBuf> {
        self.storage.db_path.clone().or_else(|| {
            directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.data_dir().join("decks.db"))
        })
    }

    pub fn log_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.data_dir().join("leitner-trainer.log"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Cap on cards per study session.
    #[serde(default)]
    pub review_limit: Option<usize>,
    /// Show every section at once instead of revealing them one by one.
    #[serde(default)]
    pub reveal_all: bool,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            review_limit: None,
            reveal_all: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub show_next_review: bool,
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_true() -> bool { true }
fn default_date_format() -> String { "%Y-%m-%d".to_string() }

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_next_review: true,
            date_format: default_date_format(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.study.review_limit, None);
        assert!(!config.study.reveal_all);
        assert!(config.display.show_next_review);
        assert_eq!(config.display.date_format, "%Y-%m-%d");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_config() {
        let config = Config::parse(
            r#"
            [study]
            review_limit = 25

            [storage]
            db_path = "/tmp/cards.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.study.review_limit, Some(25));
        assert!(config.display.show_next_review);
        assert_eq!(config.db_path(), Some(PathBuf::from("/tmp/cards.db")));
    }

    #[test]
    fn test_malformed_config_is_reported() {
        let err = Config::parse("[study\nreview_limit = ").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_round_trip() {
        let mut config = Config::default();
        config.display.show_next_review = false;
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::parse(&text).unwrap();
        assert!(!parsed.display.show_next_review);
    }
}
