//! Configuration for the canary CLI
//!
//! Read from `~/.canary/config.toml` (or `--config`). Every field has a
//! default, so a missing default file simply means defaults.

use anyhow::{Context, Result};
use canary_contract::DriftConfig;
use canary_protocol::paths::{default_config_path, default_registry_path};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanaryConfig {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub drift: DriftConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// SQLite file holding approved contracts; `~/` is expanded
    #[serde(default)]
    pub path: Option<String>,
}

impl CanaryConfig {
    /// Load configuration. An explicit path must exist; the default path may not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (default_config_path(), false),
        };
        if !path.exists() {
            if required {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: CanaryConfig = toml::from_str(content)?;
        config.drift.validate()?;
        Ok(config)
    }

    /// Registry location: `--db` beats the config file beats the default.
    pub fn registry_path(&self, cli_override: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_override {
            return path.to_path_buf();
        }
        match &self.registry.path {
            Some(path) => expand_home(path),
            None => default_registry_path(),
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
