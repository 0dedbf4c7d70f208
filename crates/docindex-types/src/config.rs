//! Configuration loading for docindex.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `~/.config/docindex/config.toml`
//! (platform equivalent).

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::DocIndexError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the RocksDB document store directory
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Threads in the offload pool used for large documents
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Ingestion contexts allocated up front
    #[serde(default = "default_context_pool_floor")]
    pub context_pool_floor: usize,
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", "docindex")
        .map(|p| p.data_local_dir().join("documents"))
        .unwrap_or_else(|| PathBuf::from("./documents"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_worker_threads() -> usize {
    4
}

fn default_context_pool_floor() -> usize {
    16
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level(),
            worker_threads: default_worker_threads(),
            context_pool_floor: default_context_pool_floor(),
        }
    }
}

impl Settings {
    /// Load settings from all sources.
    ///
    /// `cli_config_path` names an explicit config file, which must exist.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, DocIndexError> {
        let config_dir = ProjectDirs::from("", "", "docindex")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())
            .map_err(|e| DocIndexError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| DocIndexError::Config(e.to_string()))?
            .set_default("worker_threads", default_worker_threads() as i64)
            .map_err(|e| DocIndexError::Config(e.to_string()))?
            .set_default("context_pool_floor", default_context_pool_floor() as i64)
            .map_err(|e| DocIndexError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // DOCINDEX_DB_PATH, DOCINDEX_WORKER_THREADS, ...
        builder = builder.add_source(
            Environment::with_prefix("DOCINDEX")
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| DocIndexError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| DocIndexError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), DocIndexError> {
        if self.worker_threads == 0 {
            return Err(DocIndexError::Config("worker_threads must be > 0".into()));
        }
        if self.db_path.is_empty() {
            return Err(DocIndexError::Config("db_path must not be empty".into()));
        }
        Ok(())
    }

    /// Get db_path with `~` expanded to the home directory.
    pub fn expanded_db_path(&self) -> PathBuf {
        if let Some(rest) = self.db_path.strip_prefix("~/") {
            if let Some(base) = directories::BaseDirs::new() {
                return base.home_dir().join(rest);
            }
        }
        PathBuf::from(&self.db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.worker_threads, 4);
        assert_eq!(settings.context_pool_floor, 16);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_with_defaults() {
        let settings = Settings::load(None).unwrap();
        assert!(!settings.db_path.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docindex.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "db_path = \"/tmp/docindex-test\"").unwrap();
        writeln!(file, "worker_threads = 2").unwrap();

        let settings = Settings::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(settings.db_path, "/tmp/docindex-test");
        assert_eq!(settings.worker_threads, 2);
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let settings = Settings {
            worker_threads: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_expanded_db_path() {
        let settings = Settings {
            db_path: "/var/lib/docindex".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.expanded_db_path(), PathBuf::from("/var/lib/docindex"));
    }
}
