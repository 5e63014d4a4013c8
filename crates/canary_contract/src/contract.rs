//! Contract types
//!
//! A contract binds one target table to an approved physical schema and the
//! statistical baseline observed when it was approved. Approved contracts are
//! immutable; changing a table means approving a new version.

use canary_protocol::{ColumnRole, ColumnStat, DataType, LogicalType, UnsupportedTypeError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Provenance
// ============================================================================

/// Which authority supplied a resolved value.
///
/// Ordered by precedence: a user override beats an AI suggestion, which beats
/// the profiler's inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authority {
    User,
    Ai,
    Original,
}

impl Authority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Authority::User => "user",
            Authority::Ai => "ai",
            Authority::Original => "original",
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Physical schema
// ============================================================================

/// One column of the physical schema after precedence resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedColumn {
    /// Name in the source file. Never renamed once resolved.
    source_name: String,

    /// Name in the target table
    pub target_name: String,

    /// Canonical physical type name (e.g. "Int64", "Decimal(10,2)")
    pub physical_type: String,

    pub is_nullable: bool,

    pub role: ColumnRole,

    pub name_source: Authority,
    pub type_source: Authority,
    pub role_source: Authority,

    /// Position in the source file, 0-based
    pub column_index: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_type: Option<LogicalType>,

    /// What the AI proposed, kept for review even when overridden
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_suggested_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_suggested_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl ResolvedColumn {
    /// A column exactly as the profiler saw it: source name, inferred type,
    /// no role.
    pub fn from_stat(column_index: usize, stat: &ColumnStat) -> Self {
        Self {
            source_name: stat.source_name.clone(),
            target_name: stat.source_name.clone(),
            physical_type: stat.physical_type.clone(),
            is_nullable: stat.null_fraction > 0.0,
            role: ColumnRole::Unassigned,
            name_source: Authority::Original,
            type_source: Authority::Original,
            role_source: Authority::Original,
            column_index,
            logical_type: None,
            ai_suggested_name: None,
            ai_suggested_type: None,
            rationale: None,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Reviewer rename.
    pub fn with_target_name(mut self, target_name: impl Into<String>) -> Self {
        self.target_name = target_name.into();
        self.name_source = Authority::User;
        self
    }

    /// Reviewer type choice.
    pub fn with_physical_type(mut self, physical_type: impl Into<String>) -> Self {
        self.physical_type = physical_type.into();
        self.type_source = Authority::User;
        self
    }

    /// Reviewer role choice.
    pub fn with_role(mut self, role: ColumnRole) -> Self {
        self.role = role;
        self.role_source = Authority::User;
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.role == ColumnRole::PrimaryKey
    }

    /// Parse the physical type against the supported vocabulary.
    pub fn data_type(&self) -> Result<DataType, UnsupportedTypeError> {
        self.physical_type.parse()
    }

    /// True when any of name, type or role differs from the profiler's view.
    pub fn is_amended(&self) -> bool {
        self.name_source != Authority::Original
            || self.type_source != Authority::Original
            || self.role_source != Authority::Original
    }
}

// ============================================================================
// Identity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractIdentity {
    pub table_name: String,

    /// Starts at 1, strictly increasing per table
    pub version: u32,

    pub source_paths: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

impl ContractIdentity {
    pub fn new(table_name: impl Into<String>, version: u32, created_by: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            table_name: table_name.into(),
            version,
            source_paths: Vec::new(),
            target_path: None,
            created_at: now,
            updated_at: now,
            created_by: created_by.into(),
            approved_by: None,
            approved_at: None,
        }
    }

    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_paths.push(path.into());
        self
    }

    pub fn with_target_path(mut self, path: impl Into<String>) -> Self {
        self.target_path = Some(path.into());
        self
    }
}

// ============================================================================
// Statistical profile
// ============================================================================

/// Baseline statistics for one contract column, keyed by target name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnBaseline {
    pub target_name: String,
    pub stats: ColumnStat,
}

impl ColumnBaseline {
    pub fn source_name(&self) -> &str {
        &self.stats.source_name
    }
}

/// The snapshot frozen at approval time, re-keyed by target name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalProfile {
    pub row_count: u64,
    pub columns: Vec<ColumnBaseline>,
}

impl StatisticalProfile {
    pub fn get(&self, target_name: &str) -> Option<&ColumnBaseline> {
        self.columns.iter().find(|c| c.target_name == target_name)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ============================================================================
// Contract
// ============================================================================

/// Lifecycle: `Draft -> Validated -> Approved`. A stored contract is reported
/// as `Superseded` once a later version of its table has been approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Validated,
    Approved,
    Superseded,
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContractStatus::Draft => "draft",
            ContractStatus::Validated => "validated",
            ContractStatus::Approved => "approved",
            ContractStatus::Superseded => "superseded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub identity: ContractIdentity,
    pub physical_schema: Vec<ResolvedColumn>,
    pub statistical_profile: StatisticalProfile,
    status: ContractStatus,
}

impl Contract {
    pub(crate) fn draft(
        identity: ContractIdentity,
        physical_schema: Vec<ResolvedColumn>,
        statistical_profile: StatisticalProfile,
    ) -> Self {
        Self {
            identity,
            physical_schema,
            statistical_profile,
            status: ContractStatus::Draft,
        }
    }

    pub fn status(&self) -> ContractStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: ContractStatus) {
        self.status = status;
    }

    pub fn table_name(&self) -> &str {
        &self.identity.table_name
    }

    pub fn version(&self) -> u32 {
        self.identity.version
    }

    /// Look up a schema column by target name.
    pub fn column(&self, target_name: &str) -> Option<&ResolvedColumn> {
        self.physical_schema.iter().find(|c| c.target_name == target_name)
    }

    pub fn primary_key(&self) -> Option<&ResolvedColumn> {
        self.physical_schema.iter().find(|c| c.is_primary_key())
    }

    pub fn target_names(&self) -> Vec<&str> {
        self.physical_schema.iter().map(|c| c.target_name.as_str()).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_stat_uses_profiler_view() {
        let stat = ColumnStat::new("usr_id", "Int64", 0.0, 10);
        let col = ResolvedColumn::from_stat(0, &stat);
        assert_eq!(col.source_name(), "usr_id");
        assert_eq!(col.target_name, "usr_id");
        assert!(!col.is_nullable);
        assert_eq!(col.role, ColumnRole::Unassigned);
        assert!(!col.is_amended());

        let nullable = ResolvedColumn::from_stat(1, &ColumnStat::new("x", "Float64", 0.01, 3));
        assert!(nullable.is_nullable);
    }

    #[test]
    fn test_reviewer_edits_record_user_provenance() {
        let stat = ColumnStat::new("usr_id", "Int64", 0.0, 10);
        let col = ResolvedColumn::from_stat(0, &stat)
            .with_target_name("user_id")
            .with_role(ColumnRole::PrimaryKey);
        assert_eq!(col.name_source, Authority::User);
        assert_eq!(col.role_source, Authority::User);
        assert_eq!(col.type_source, Authority::Original);
        assert!(col.is_primary_key());
    }

    #[test]
    fn test_contract_json_keeps_status_and_source_name() {
        let stat = ColumnStat::new("amt", "Float64", 0.0, 5);
        let contract = Contract::draft(
            ContractIdentity::new("orders", 1, "tester").with_source_path("orders.csv"),
            vec![ResolvedColumn::from_stat(0, &stat).with_target_name("amount")],
            StatisticalProfile {
                row_count: 5,
                columns: vec![ColumnBaseline {
                    target_name: "amount".to_string(),
                    stats: stat,
                }],
            },
        );

        let json = contract.to_json().unwrap();
        assert!(json.contains("\"status\": \"draft\""));
        assert!(json.contains("\"name_source\": \"user\""));

        let back = Contract::from_json(&json).unwrap();
        assert_eq!(back, contract);
        assert_eq!(back.column("amount").unwrap().source_name(), "amt");
        assert_eq!(back.statistical_profile.get("amount").unwrap().source_name(), "amt");
    }
}
