//! Drift Detector
//!
//! Compares a new profiling snapshot with the baseline frozen in the latest
//! approved contract. Each baseline column gets exactly one verdict, chosen
//! by the first rule that fires:
//!
//! 1. column missing from the snapshot -> `SchemaDropped` (error)
//! 2. inferred type changed -> `TypeChanged` (error, or warning for widening)
//! 3. null fraction moved past tolerance -> `NullDriftExceeded` (warning)
//! 4. range or median left the value band -> `ValueDriftExceeded` (warning)
//! 5. category top values or distinct count shifted -> `CardinalityShift` (warning)
//! 6. otherwise `Unchanged` (info)
//!
//! Snapshot columns no baseline column claims are `SchemaAdded` (warning).

use crate::config::DriftConfig;
use crate::contract::{ColumnBaseline, Contract};
use canary_protocol::{ColumnRole, ColumnStat, DataType, ProfilingSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Report types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// The numeric values the value band is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueSummary {
    pub min: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<f64>,
}

impl ValueSummary {
    fn of(stat: &ColumnStat) -> Self {
        Self {
            min: stat.min,
            median: stat.quantiles.map(|q| q.p50),
            max: stat.max,
        }
    }
}

/// What changed for one column, with the before/after values behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnDrift {
    Unchanged,
    SchemaAdded {
        physical_type: String,
        null_fraction: f64,
    },
    SchemaDropped {
        source_name: String,
        physical_type: String,
    },
    TypeChanged {
        before: String,
        after: String,
        widening: bool,
    },
    NullDriftExceeded {
        before: f64,
        after: f64,
        tolerance: f64,
    },
    ValueDriftExceeded {
        before: ValueSummary,
        after: ValueSummary,
        /// Half-width of the tolerated band around the baseline
        band: f64,
    },
    CardinalityShift {
        before_distinct: u64,
        after_distinct: u64,
        /// Share of baseline top values still present, when top values were profiled
        top_value_overlap: Option<f64>,
    },
}

impl ColumnDrift {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnDrift::Unchanged => "unchanged",
            ColumnDrift::SchemaAdded { .. } => "schema_added",
            ColumnDrift::SchemaDropped { .. } => "schema_dropped",
            ColumnDrift::TypeChanged { .. } => "type_changed",
            ColumnDrift::NullDriftExceeded { .. } => "null_drift_exceeded",
            ColumnDrift::ValueDriftExceeded { .. } => "value_drift_exceeded",
            ColumnDrift::CardinalityShift { .. } => "cardinality_shift",
        }
    }

    /// One-line explanation for humans.
    pub fn describe(&self) -> String {
        match self {
            ColumnDrift::Unchanged => "within baseline".to_string(),
            ColumnDrift::SchemaAdded { physical_type, .. } => {
                format!("new column ({})", physical_type)
            }
            ColumnDrift::SchemaDropped { source_name, .. } => {
                format!("source column '{}' is missing", source_name)
            }
            ColumnDrift::TypeChanged { before, after, widening } => {
                let kind = if *widening { "widened" } else { "changed" };
                format!("type {} {} -> {}", kind, before, after)
            }
            ColumnDrift::NullDriftExceeded { before, after, tolerance } => format!(
                "null fraction {:.3} -> {:.3} (tolerance {:.3})",
                before, after, tolerance
            ),
            ColumnDrift::ValueDriftExceeded { before, after, band } => format!(
                "values [{} .. {}] -> [{} .. {}] (band ±{:.3})",
                fmt_opt(before.min),
                fmt_opt(before.max),
                fmt_opt(after.min),
                fmt_opt(after.max),
                band
            ),
            ColumnDrift::CardinalityShift {
                before_distinct,
                after_distinct,
                top_value_overlap,
            } => match top_value_overlap {
                Some(overlap) => format!(
                    "distinct {} -> {}, top-value overlap {:.0}%",
                    before_distinct,
                    after_distinct,
                    overlap * 100.0
                ),
                None => format!("distinct {} -> {}", before_distinct, after_distinct),
            },
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string())
}

/// Verdict for one column. `column` is the target name for baseline columns
/// and the source name for added ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnHealth {
    pub column: String,
    pub severity: Severity,
    pub drift: ColumnDrift,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub table_name: String,
    pub baseline_version: u32,
    pub baseline_row_count: u64,
    pub row_count: u64,
    pub row_count_delta: i64,
    /// Highest column severity, `Info` when there are no columns
    pub severity: Severity,
    pub columns: Vec<ColumnHealth>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    /// Errors stop automatic appends until a human accepts the drift.
    pub fn blocks_append(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn column(&self, name: &str) -> Option<&ColumnHealth> {
        self.columns.iter().find(|c| c.column == name)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.columns.iter().filter(|c| c.severity == severity).count()
    }

    /// Columns that are not `Unchanged`.
    pub fn changes(&self) -> impl Iterator<Item = &ColumnHealth> {
        self.columns
            .iter()
            .filter(|c| !matches!(c.drift, ColumnDrift::Unchanged))
    }
}

// ============================================================================
// Detection
// ============================================================================

/// Build a health report for `snapshot` against the approved `baseline`.
pub fn detect_drift(baseline: &Contract, snapshot: &ProfilingSnapshot, config: &DriftConfig) -> HealthReport {
    let profile = &baseline.statistical_profile;
    let mut claimed = vec![false; snapshot.columns.len()];
    let mut columns = Vec::with_capacity(profile.columns.len() + snapshot.columns.len());

    // Source names claim first so a target-name fallback never takes a
    // column that another baseline entry still matches by source.
    let mut matches: Vec<Option<usize>> = Vec::with_capacity(profile.columns.len());
    for entry in &profile.columns {
        let idx = find_column(snapshot, &claimed, entry.source_name());
        if let Some(idx) = idx {
            claimed[idx] = true;
        }
        matches.push(idx);
    }
    for (entry, slot) in profile.columns.iter().zip(matches.iter_mut()) {
        if slot.is_none() {
            *slot = find_column(snapshot, &claimed, &entry.target_name);
            if let Some(idx) = *slot {
                claimed[idx] = true;
            }
        }
    }

    for (entry, matched) in profile.columns.iter().zip(matches) {
        let (severity, drift) = match matched {
            None => (
                Severity::Error,
                ColumnDrift::SchemaDropped {
                    source_name: entry.source_name().to_string(),
                    physical_type: entry.stats.physical_type.clone(),
                },
            ),
            Some(idx) => {
                let role = baseline
                    .column(&entry.target_name)
                    .map(|c| c.role)
                    .unwrap_or_default();
                compare_column(entry, &snapshot.columns[idx], role, config)
            }
        };
        debug!(column = %entry.target_name, %severity, drift = drift.label(), "Drift verdict");
        columns.push(ColumnHealth {
            column: entry.target_name.clone(),
            severity,
            drift,
        });
    }

    for (stat, _) in snapshot.columns.iter().zip(&claimed).filter(|(_, taken)| !**taken) {
        debug!(column = %stat.source_name, "New column in snapshot");
        columns.push(ColumnHealth {
            column: stat.source_name.clone(),
            severity: Severity::Warning,
            drift: ColumnDrift::SchemaAdded {
                physical_type: stat.physical_type.clone(),
                null_fraction: stat.null_fraction,
            },
        });
    }

    let severity = columns
        .iter()
        .map(|c| c.severity)
        .max()
        .unwrap_or(Severity::Info);

    let report = HealthReport {
        table_name: baseline.table_name().to_string(),
        baseline_version: baseline.version(),
        baseline_row_count: profile.row_count,
        row_count: snapshot.row_count,
        row_count_delta: row_delta(profile.row_count, snapshot.row_count),
        severity,
        columns,
        checked_at: Utc::now(),
    };

    if report.blocks_append() {
        warn!(
            table = %report.table_name,
            baseline_version = report.baseline_version,
            errors = report.count(Severity::Error),
            "Drift blocks append"
        );
    } else {
        info!(
            table = %report.table_name,
            baseline_version = report.baseline_version,
            %severity,
            "Drift check complete"
        );
    }
    report
}

/// Signed change in row count, saturating at the `i64` bounds.
fn row_delta(before: u64, after: u64) -> i64 {
    let before = i64::try_from(before).unwrap_or(i64::MAX);
    let after = i64::try_from(after).unwrap_or(i64::MAX);
    after.saturating_sub(before)
}

/// Slack for float comparisons so a move of exactly the tolerance never fires.
const TOLERANCE_EPSILON: f64 = 1e-9;

fn exceeds(amount: f64, limit: f64) -> bool {
    amount - limit > TOLERANCE_EPSILON
}

fn find_column(snapshot: &ProfilingSnapshot, claimed: &[bool], name: &str) -> Option<usize> {
    snapshot
        .columns
        .iter()
        .enumerate()
        .find(|(idx, c)| !claimed[*idx] && c.source_name == name)
        .map(|(idx, _)| idx)
}

fn compare_column(
    entry: &ColumnBaseline,
    current: &ColumnStat,
    role: ColumnRole,
    config: &DriftConfig,
) -> (Severity, ColumnDrift) {
    let before = &entry.stats;

    if let Some(change) = type_change(&before.physical_type, &current.physical_type) {
        let severity = if change.widening && config.allow_widening {
            Severity::Warning
        } else {
            Severity::Error
        };
        return (severity, change.into_drift(before, current));
    }

    if exceeds(
        (current.null_fraction - before.null_fraction).abs(),
        config.null_fraction_tolerance,
    ) {
        return (
            Severity::Warning,
            ColumnDrift::NullDriftExceeded {
                before: before.null_fraction,
                after: current.null_fraction,
                tolerance: config.null_fraction_tolerance,
            },
        );
    }

    if let Some(band) = value_band_exceeded(before, current, config.value_band_multiplier) {
        return (
            Severity::Warning,
            ColumnDrift::ValueDriftExceeded {
                before: ValueSummary::of(before),
                after: ValueSummary::of(current),
                band,
            },
        );
    }

    if role == ColumnRole::Category {
        if let Some(drift) = cardinality_shift(before, current, config) {
            return (Severity::Warning, drift);
        }
    }

    (Severity::Info, ColumnDrift::Unchanged)
}

struct TypeChange {
    widening: bool,
}

impl TypeChange {
    fn into_drift(self, before: &ColumnStat, after: &ColumnStat) -> ColumnDrift {
        ColumnDrift::TypeChanged {
            before: before.physical_type.clone(),
            after: after.physical_type.clone(),
            widening: self.widening,
        }
    }
}

/// `None` when the types are the same. A name outside the vocabulary on
/// either side is a cross-family change.
fn type_change(before: &str, after: &str) -> Option<TypeChange> {
    match (before.parse::<DataType>(), after.parse::<DataType>()) {
        (Ok(b), Ok(a)) if b == a => None,
        (Ok(b), Ok(a)) => Some(TypeChange {
            widening: b.is_widening_to(&a),
        }),
        _ => Some(TypeChange { widening: false }),
    }
}

/// Returns the band half-width when the new range or median escapes it.
fn value_band_exceeded(before: &ColumnStat, current: &ColumnStat, multiplier: f64) -> Option<f64> {
    if !before.has_numeric_summary() || !current.has_numeric_summary() {
        return None;
    }
    let band = before.spread()? * multiplier;

    let below = matches!((before.min, current.min), (Some(b), Some(c)) if exceeds(b - c, band));
    let above = matches!((before.max, current.max), (Some(b), Some(c)) if exceeds(c - b, band));
    let median_out = match (before.quantiles, current.quantiles) {
        (Some(b), Some(c)) => exceeds(b.p25 - c.p50, band) || exceeds(c.p50 - b.p75, band),
        _ => false,
    };

    (below || above || median_out).then_some(band)
}

fn cardinality_shift(before: &ColumnStat, current: &ColumnStat, config: &DriftConfig) -> Option<ColumnDrift> {
    let overlap = if before.top_values.is_empty() {
        None
    } else {
        let now: HashSet<&str> = current.top_values.iter().map(|t| t.value.as_str()).collect();
        let kept = before
            .top_values
            .iter()
            .filter(|t| now.contains(t.value.as_str()))
            .count();
        Some(kept as f64 / before.top_values.len() as f64)
    };
    let overlap_low = overlap.is_some_and(|o| o < config.category_min_overlap);

    let (b, c) = (before.distinct_count, current.distinct_count);
    let ratio_exceeded = match (b, c) {
        (0, 0) => false,
        (0, _) | (_, 0) => true,
        _ => (b.max(c) as f64 / b.min(c) as f64) > config.category_distinct_ratio,
    };

    (overlap_low || ratio_exceeded).then_some(ColumnDrift::CardinalityShift {
        before_distinct: b,
        after_distinct: c,
        top_value_overlap: overlap,
    })
}

// ============================================================================
// Append gate
// ============================================================================

/// A human decision to append despite blocking drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftAcceptance {
    pub table_name: String,
    /// The contract version the accepted report was computed against
    pub baseline_version: u32,
    pub accepted_by: String,
    pub note: String,
    pub accepted_at: DateTime<Utc>,
}

impl DriftAcceptance {
    /// Accept the drift described by `report`.
    pub fn for_report(report: &HealthReport, accepted_by: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            table_name: report.table_name.clone(),
            baseline_version: report.baseline_version,
            accepted_by: accepted_by.into(),
            note: note.into(),
            accepted_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendDecision {
    /// Nothing above warning
    Clear,
    /// Blocking drift, explicitly accepted
    Accepted,
}

#[derive(Debug, Clone, Error)]
#[error(
    "Append to '{table_name}' blocked by drift against v{baseline_version}: {}",
    .columns.join(", ")
)]
pub struct AppendBlocked {
    pub table_name: String,
    pub baseline_version: u32,
    /// Columns at error severity
    pub columns: Vec<String>,
}

/// Decide whether the batch behind `report` may be appended.
pub fn gate_append(
    report: &HealthReport,
    acceptance: Option<&DriftAcceptance>,
) -> Result<AppendDecision, AppendBlocked> {
    if !report.blocks_append() {
        return Ok(AppendDecision::Clear);
    }

    match acceptance {
        Some(a)
            if a.table_name == report.table_name
                && a.baseline_version == report.baseline_version
                && !a.accepted_by.trim().is_empty() =>
        {
            info!(
                table = %report.table_name,
                baseline_version = report.baseline_version,
                accepted_by = %a.accepted_by,
                "Blocking drift accepted"
            );
            Ok(AppendDecision::Accepted)
        }
        _ => Err(AppendBlocked {
            table_name: report.table_name.clone(),
            baseline_version: report.baseline_version,
            columns: report
                .columns
                .iter()
                .filter(|c| c.severity == Severity::Error)
                .map(|c| c.column.clone())
                .collect(),
        }),
    }
}
