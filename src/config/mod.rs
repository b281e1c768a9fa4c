//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::engine::{SortKey, StatColumn};
use crate::models::{default_seasons, Season};
use crate::storage::StorageConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Search defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub default_sort: SortKey,

    /// Third stat column: "max" or "std"
    #[serde(default)]
    pub stat_column: StatColumn,
}

/// Store refresh schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Human duration, e.g. "1h" or "30m"
    #[serde(default = "default_interval")]
    pub interval: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_interval() -> String {
    "1h".to_string()
}

fn default_enabled() -> bool {
    true
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            enabled: default_enabled(),
        }
    }
}

impl RefreshConfig {
    /// Parsed refresh interval. `None` if unparseable or zero.
    pub fn interval_duration(&self) -> Option<Duration> {
        crate::parse_duration(&self.interval).filter(|d| !d.is_zero())
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_season_id")]
    pub default_season: String,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,

    #[serde(default = "default_seasons")]
    pub seasons: Vec<Season>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_season_id() -> String {
    "SL1".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            default_season: default_season_id(),
            search: SearchConfig::default(),
            refresh: RefreshConfig::default(),
            seasons: default_seasons(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file if it exists, otherwise use the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            debug!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seasons.is_empty() {
            return Err(ConfigError::ValidationError(
                "At least one season must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for season in &self.seasons {
            if !seen.insert(season.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate season id: {}",
                    season.id
                )));
            }
            if let Some(end) = season.period_end {
                if end < season.period_start {
                    return Err(ConfigError::ValidationError(format!(
                        "Season {} ends ({}) before it starts ({})",
                        season.id, end, season.period_start
                    )));
                }
            }
        }

        if self.season(&self.default_season).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "Default season {} is not configured",
                self.default_season
            )));
        }

        if self.refresh.interval_duration().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "Invalid refresh interval: {:?}",
                self.refresh.interval
            )));
        }

        Ok(())
    }

    /// Look up a configured season by id.
    pub fn season(&self, id: &str) -> Option<&Season> {
        self.seasons.iter().find(|s| s.id == id)
    }

    pub fn storage(&self) -> StorageConfig {
        StorageConfig::new(self.data_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.default_season, "SL1");
        assert_eq!(config.search.default_sort, SortKey::Total);
        assert_eq!(config.search.stat_column, StatColumn::Max);
        assert_eq!(config.refresh.interval_duration(), Some(Duration::from_secs(3600)));
        assert_eq!(config.seasons.len(), 3);
    }

    #[test]
    fn test_config_validation_ok() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_no_seasons() {
        let mut config = AppConfig::default();
        config.seasons.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_duplicate_season() {
        let mut config = AppConfig::default();
        config.seasons.push(Season::new("SL1", "again", 900, None));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_inverted_range() {
        let mut config = AppConfig::default();
        config.seasons.push(Season::new("bad", "bad", 800, Some(790)));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_unknown_default_season() {
        let config = AppConfig {
            default_season: "SL9".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_interval() {
        for interval in ["soon", "0s", ""] {
            let mut config = AppConfig::default();
            config.refresh.interval = interval.to_string();
            assert!(config.validate().is_err(), "accepted {interval:?}");
        }
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            data_dir = "/srv/benched"
            default_season = "bfa4"

            [search]
            default_sort = "max_avg_total"
            stat_column = "std"

            [refresh]
            interval = "30m"
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.data_dir, PathBuf::from("/srv/benched"));
        assert_eq!(config.search.default_sort, SortKey::MaxAvgTotal);
        assert_eq!(config.search.stat_column, StatColumn::Std);
        assert!(config.refresh.enabled);
        assert_eq!(config.season("bfa4").unwrap().period_end, Some(771));
        assert_eq!(
            config.storage().season_dir("bfa4"),
            PathBuf::from("/srv/benched/exports/bfa4")
        );
    }

    #[test]
    fn test_parse_custom_seasons() {
        let config: AppConfig = toml::from_str(
            r#"
            default_season = "DF1"

            [[seasons]]
            id = "DF1"
            label = "DF Season 1"
            period_start = 885
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.seasons.len(), 1);
        assert_eq!(config.season("DF1").unwrap().period_end, None);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig::load_or_default(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config.default_season, "SL1");
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "default_season = \"nope\"\n").unwrap();
        assert!(matches!(
            AppConfig::from_file(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.data_dir, parsed.data_dir);
        assert_eq!(config.seasons, parsed.seasons);
    }
}
