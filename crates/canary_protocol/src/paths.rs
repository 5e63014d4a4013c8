use crate::defaults::{CONFIG_FILE_NAME, REGISTRY_FILE_NAME};
use std::path::PathBuf;

/// Resolve the Data Canary home directory.
///
/// Priority:
/// 1) CANARY_HOME
/// 2) HOME/USERPROFILE
/// 3) ./.canary
pub fn canary_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("CANARY_HOME") {
        return PathBuf::from(override_path);
    }
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        return PathBuf::from(home).join(".canary");
    }
    PathBuf::from(".").join(".canary")
}

/// Default contract registry: ~/.canary/contracts.sqlite3
pub fn default_registry_path() -> PathBuf {
    canary_home().join(REGISTRY_FILE_NAME)
}

/// Default config file: ~/.canary/config.toml
pub fn default_config_path() -> PathBuf {
    canary_home().join(CONFIG_FILE_NAME)
}

/// Default logs directory: ~/.canary/logs
pub fn default_logs_dir() -> PathBuf {
    canary_home().join("logs")
}
