//! Runtime configuration
//!
//! Read from `<config_dir>/chargeboard/config.toml` unless a path is given.
//! Every key is optional; a missing file yields the defaults.

use crate::date_range::{default_all_time_floor, DateRangeResolver};
use crate::error::CoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeboardConfig {
    /// SQLite KPI database
    pub database: PathBuf,

    pub refresh_interval_secs: u64,

    /// Start of the `all_time` window
    pub all_time_floor: NaiveDate,

    /// Number of sites in top-N rankings
    pub top_sites: usize,

    pub bind: String,
    pub port: u16,
}

impl Default for ChargeboardConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("chargeboard.db"),
            refresh_interval_secs: 3600,
            all_time_floor: default_all_time_floor(),
            top_sites: 10,
            bind: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ChargeboardConfig {
    /// `<config_dir>/chargeboard/config.toml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("chargeboard").join("config.toml"))
    }

    /// Load from `path`, or from [`default_path`](Self::default_path)
    ///
    /// A missing file is not an error. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| CoreError::ConfigRead {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&content, &path)?;
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    fn from_toml(content: &str, path: &Path) -> Result<Self, CoreError> {
        let config: Self = toml::from_str(content).map_err(|e| CoreError::ConfigParse {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.refresh_interval_secs == 0 {
            return Err(CoreError::InvalidConfig {
                message: "refresh_interval_secs must be greater than zero".to_string(),
            });
        }
        if self.top_sites == 0 {
            return Err(CoreError::InvalidConfig {
                message: "top_sites must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn resolver(&self) -> DateRangeResolver {
        DateRangeResolver::new(self.all_time_floor)
    }

    /// `bind:port` listen address
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = ChargeboardConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();

        assert_eq!(config, ChargeboardConfig::default());
        assert_eq!(config.refresh_interval(), Duration::from_secs(3600));
        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "database = \"/srv/kpi.db\"\nport = 9000\nall_time_floor = \"2022-03-01\"\n",
        )
        .unwrap();

        let config = ChargeboardConfig::load(Some(&path)).unwrap();

        assert_eq!(config.database, PathBuf::from("/srv/kpi.db"));
        assert_eq!(config.port, 9000);
        assert_eq!(config.top_sites, 10);
        assert_eq!(
            config.resolver().all_time_floor(),
            NaiveDate::from_ymd_opt(2022, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_zero_interval_is_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "refresh_interval_secs = 0\n").unwrap();

        let err = ChargeboardConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }

    #[test]
    fn test_zero_top_sites_is_invalid() {
        let config = ChargeboardConfig {
            top_sites: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig { .. })));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = \"not a number\"\n").unwrap();

        let err = ChargeboardConfig::load(Some(&path)).unwrap_err();
        match err {
            CoreError::ConfigParse { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {}", other),
        }
    }
}
