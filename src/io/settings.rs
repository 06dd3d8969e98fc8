// src/io/settings.rs

//! Engine settings loaded from TOML.
//!
//! ```toml
//! log_filter = "beer_game=debug,info"
//! benchmark_path = "benchmarks.json"
//!
//! [defaults]
//! total_rounds = 24
//! demand = [4, 4, 4, 4, 8]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::simulation::config::GameConfig;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings {path}: {detail}")]
    Parse { path: PathBuf, detail: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Where finished-game benchmarks are persisted. In memory when unset.
    pub benchmark_path: Option<PathBuf>,
    /// Configuration for games created without an explicit one.
    pub defaults: GameConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            benchmark_path: None,
            defaults: GameConfig::default(),
        }
    }
}

impl EngineSettings {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let settings = EngineSettings::from_toml_str("").unwrap();
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn partial_defaults_table_keeps_the_rest() {
        let settings = EngineSettings::from_toml_str(
            r#"
            log_filter = "debug"
            benchmark_path = "bench.json"

            [defaults]
            total_rounds = 20
            demand = [4, 4, 8]
            backlog_cost = 2.0
            "#,
        )
        .unwrap();
        assert_eq!(settings.log_filter, "debug");
        assert_eq!(settings.benchmark_path, Some(PathBuf::from("bench.json")));
        assert_eq!(settings.defaults.total_rounds, 20);
        assert_eq!(settings.defaults.demand, vec![4, 4, 8]);
        assert_eq!(settings.defaults.backlog_cost, 2.0);
        assert_eq!(settings.defaults.starting_inventory, 12);
    }

    #[test]
    fn load_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "total_rounds = [").unwrap();
        match EngineSettings::load(&path) {
            Err(SettingsError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            EngineSettings::load(&dir.path().join("absent.toml")),
            Err(SettingsError::Io { .. })
        ));
    }
}
