//! Drift detection thresholds (the `[drift]` section of `config.toml`).

use canary_protocol::defaults::{
    DEFAULT_CATEGORY_DISTINCT_RATIO, DEFAULT_CATEGORY_MIN_OVERLAP, DEFAULT_NULL_FRACTION_TOLERANCE,
    DEFAULT_VALUE_BAND_MULTIPLIER,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid drift setting {field} = {value}: {reason}")]
pub struct DriftConfigError {
    pub field: &'static str,
    pub value: f64,
    pub reason: &'static str,
}

/// Thresholds used by the drift detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Largest tolerated absolute change in null fraction
    #[serde(default = "default_null_fraction_tolerance")]
    pub null_fraction_tolerance: f64,

    /// Width of the value band, in multiples of the baseline spread
    #[serde(default = "default_value_band_multiplier")]
    pub value_band_multiplier: f64,

    /// Share of baseline top values that must still appear (CATEGORY columns)
    #[serde(default = "default_category_min_overlap")]
    pub category_min_overlap: f64,

    /// Largest tolerated factor between old and new distinct counts (CATEGORY columns)
    #[serde(default = "default_category_distinct_ratio")]
    pub category_distinct_ratio: f64,

    /// Same-family widening (Int32 -> Int64) is a warning instead of an error
    #[serde(default = "default_allow_widening")]
    pub allow_widening: bool,
}

fn default_null_fraction_tolerance() -> f64 {
    DEFAULT_NULL_FRACTION_TOLERANCE
}

fn default_value_band_multiplier() -> f64 {
    DEFAULT_VALUE_BAND_MULTIPLIER
}

fn default_category_min_overlap() -> f64 {
    DEFAULT_CATEGORY_MIN_OVERLAP
}

fn default_category_distinct_ratio() -> f64 {
    DEFAULT_CATEGORY_DISTINCT_RATIO
}

fn default_allow_widening() -> bool {
    true
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            null_fraction_tolerance: default_null_fraction_tolerance(),
            value_band_multiplier: default_value_band_multiplier(),
            category_min_overlap: default_category_min_overlap(),
            category_distinct_ratio: default_category_distinct_ratio(),
            allow_widening: default_allow_widening(),
        }
    }
}

impl DriftConfig {
    pub fn validate(&self) -> Result<(), DriftConfigError> {
        let fraction = |field, value: f64| {
            if value.is_finite() && (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(DriftConfigError {
                    field,
                    value,
                    reason: "must be between 0.0 and 1.0",
                })
            }
        };
        fraction("null_fraction_tolerance", self.null_fraction_tolerance)?;
        fraction("category_min_overlap", self.category_min_overlap)?;

        if !self.value_band_multiplier.is_finite() || self.value_band_multiplier < 0.0 {
            return Err(DriftConfigError {
                field: "value_band_multiplier",
                value: self.value_band_multiplier,
                reason: "must be a non-negative number",
            });
        }
        if !self.category_distinct_ratio.is_finite() || self.category_distinct_ratio < 1.0 {
            return Err(DriftConfigError {
                field: "category_distinct_ratio",
                value: self.category_distinct_ratio,
                reason: "must be at least 1.0",
            });
        }
        Ok(())
    }
}
