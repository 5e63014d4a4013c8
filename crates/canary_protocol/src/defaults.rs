//! Canonical default values shared by the engine, the registry and the CLI.

/// Null fraction may move by this much before a column is flagged (5 percentage points).
pub const DEFAULT_NULL_FRACTION_TOLERANCE: f64 = 0.05;
/// Value band = baseline spread times this multiple (Tukey fence).
pub const DEFAULT_VALUE_BAND_MULTIPLIER: f64 = 1.5;
/// Minimum share of baseline top-k values that must still appear in a CATEGORY column.
pub const DEFAULT_CATEGORY_MIN_OVERLAP: f64 = 0.5;
/// Maximum factor by which a CATEGORY column's distinct count may grow or shrink.
pub const DEFAULT_CATEGORY_DISTINCT_RATIO: f64 = 2.0;

pub const DEFAULT_LOG_FILTER: &str = "canary=info,canary_contract=info";
pub const REGISTRY_FILE_NAME: &str = "contracts.sqlite3";
pub const CONFIG_FILE_NAME: &str = "config.toml";
