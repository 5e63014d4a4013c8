//! Profiling Snapshot - the statistical fingerprint of one ingested batch.
//!
//! Produced by the profiler (outside this workspace) and consumed as JSON.
//! Snapshots are never mutated once read.

use serde::{Deserialize, Serialize};

/// Per-batch statistics: row count plus one [`ColumnStat`] per column, in file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilingSnapshot {
    pub row_count: u64,
    pub columns: Vec<ColumnStat>,
}

impl ProfilingSnapshot {
    pub fn new(row_count: u64, columns: Vec<ColumnStat>) -> Self {
        Self { row_count, columns }
    }

    /// Look up a column by its name in the source file.
    pub fn column(&self, source_name: &str) -> Option<&ColumnStat> {
        self.columns.iter().find(|c| c.source_name == source_name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.source_name.as_str())
    }
}

/// Statistics computed for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStat {
    /// Column name as it appears in the source file
    #[serde(alias = "name")]
    pub source_name: String,

    /// Physical type inferred by the profiler (e.g. "Int64")
    #[serde(alias = "dtype")]
    pub physical_type: String,

    /// Fraction of null values, 0.0 - 1.0
    #[serde(alias = "null_ratio")]
    pub null_fraction: f64,

    pub distinct_count: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantiles: Option<Quantiles>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,

    /// Most frequent values (low-cardinality columns only), most frequent first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_values: Vec<TopValue>,
}

impl ColumnStat {
    pub fn new(
        source_name: impl Into<String>,
        physical_type: impl Into<String>,
        null_fraction: f64,
        distinct_count: u64,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            physical_type: physical_type.into(),
            null_fraction,
            distinct_count,
            quantiles: None,
            min: None,
            max: None,
            mean: None,
            top_values: Vec::new(),
        }
    }

    pub fn with_quantiles(mut self, p25: f64, p50: f64, p75: f64) -> Self {
        self.quantiles = Some(Quantiles { p25, p50, p75 });
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_mean(mut self, mean: f64) -> Self {
        self.mean = Some(mean);
        self
    }

    pub fn with_top_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        self.top_values = values
            .into_iter()
            .map(|(value, count)| TopValue { value: value.into(), count })
            .collect();
        self
    }

    /// Spread used to scale value tolerances: the inter-quartile range when
    /// quantiles are known, otherwise `max - min`.
    pub fn spread(&self) -> Option<f64> {
        if let Some(q) = &self.quantiles {
            return Some((q.p75 - q.p25).abs());
        }
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some((max - min).abs()),
            _ => None,
        }
    }

    /// True when any numeric summary is present.
    pub fn has_numeric_summary(&self) -> bool {
        self.quantiles.is_some() || self.min.is_some() || self.max.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantiles {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopValue {
    pub value: String,
    pub count: u64,
}
