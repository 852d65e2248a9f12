//! Configuration loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directories searched for `config.yaml`.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        // User dir: HIT_BATCH_USER_DIR or ~/.hit-batch
        let user_dir = std::env::var("HIT_BATCH_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".hit-batch")));

        // Project dir: HIT_BATCH_PROJECT_DIR or $CWD/hit-batch
        let project_dir = std::env::var("HIT_BATCH_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("hit-batch")));

        Self {
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }
}

/// Read one tier's `config.yaml`, if present.
///
/// An unreadable or invalid file is skipped with a warning so a broken
/// user file cannot block imports.
fn read_tier(dir: &Path) -> Option<(PathBuf, Value)> {
    let path = dir.join("config.yaml");
    if !path.exists() {
        return None;
    }
    let parsed = std::fs::read_to_string(&path)
        .map_err(anyhow::Error::from)
        .and_then(|content| Ok(serde_yaml::from_str::<Value>(&content)?));
    match parsed {
        Ok(value) => Some((path, value)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
            None
        }
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Highest-priority config file that contributed, if any
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from all tiers with proper merging.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        // Explicit config file bypasses the tiers
        if let Ok(explicit_path) = std::env::var("HIT_BATCH_CONFIG_PATH") {
            return Self::load_explicit_with_paths(PathBuf::from(explicit_path), paths);
        }

        let mut configs: Vec<Value> = vec![serde_json::to_value(Config::default())?];
        let mut config_path = None;

        for dir in [paths.project_dir.as_deref(), paths.user_dir.as_deref()]
            .into_iter()
            .flatten()
        {
            if let Some((path, value)) = read_tier(dir) {
                debug!(path = %path.display(), "Loaded config tier");
                configs.push(value);
                config_path = Some(path);
            }
        }

        let merged = deep_merge_all(configs);
        let mut config: Config = serde_json::from_value(merged)?;
        Self::apply_env_overrides(&mut config);

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    /// Load one explicit config file, skipping the tiers.
    pub fn load_explicit(path: impl Into<PathBuf>) -> Result<Self> {
        Self::load_explicit_with_paths(path.into(), ConfigPaths::discover())
    }

    fn load_explicit_with_paths(path: PathBuf, paths: ConfigPaths) -> Result<Self> {
        let mut config = Config::load(&path)?;
        Self::apply_env_overrides(&mut config);
        Ok(Self {
            paths,
            config,
            config_path: Some(path),
        })
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut Config) {
        if let Ok(db_path) = std::env::var("HIT_BATCH_DB_PATH") {
            config.storage.db_path = PathBuf::from(db_path);
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
