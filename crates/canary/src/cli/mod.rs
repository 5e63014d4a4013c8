//! CLI module for Data Canary
//!
//! Each command module exposes an `Args` struct (parsed by clap in
//! `main.rs`) and a `run` function taking the shared [`CliContext`].

pub mod approve;
pub mod config;
pub mod draft;
pub mod drift;
pub mod error;
pub mod history;
pub mod output;
pub mod show;

use anyhow::{Context, Result};
use canary_contract::ContractStorage;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::cli::config::CanaryConfig;
use crate::cli::error::HelpfulError;

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub config: CanaryConfig,
    pub registry_path: PathBuf,
}

impl CliContext {
    pub fn load(config_path: Option<&Path>, db_override: Option<&Path>) -> Result<Self> {
        let config = CanaryConfig::load(config_path)?;
        let registry_path = config.registry_path(db_override);
        Ok(Self {
            config,
            registry_path,
        })
    }

    pub async fn open_registry(&self) -> Result<ContractStorage> {
        ContractStorage::open(&self.registry_path)
            .await
            .with_context(|| format!("Failed to open registry: {}", self.registry_path.display()))
    }
}

/// Run async registry work on a single-threaded runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(rt.block_on(future))
}

/// Read and parse a JSON input file; `what` names it in error messages.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    if !path.exists() {
        return Err(HelpfulError::file_not_found(path).into());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}: {}", what, path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| HelpfulError::json_parse_error(path, what, &e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canary_protocol::ProfilingSnapshot;

    #[test]
    fn test_read_json_errors_are_helpful() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("missing.json");
        let err = read_json::<ProfilingSnapshot>(&missing, "snapshot").unwrap_err();
        assert!(err.to_string().contains("File not found"));

        let broken = temp.path().join("broken.json");
        std::fs::write(&broken, "{not json").unwrap();
        let err = read_json::<ProfilingSnapshot>(&broken, "snapshot").unwrap_err();
        assert!(err.to_string().contains("Invalid snapshot"));
    }
}
