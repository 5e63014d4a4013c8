//! Engine errors. Every rejection is recoverable; nothing here is fatal.

use crate::contract::ContractStatus;
use crate::storage::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The builder was handed input it cannot turn into a contract.
#[derive(Debug, Clone, Error)]
#[error("Incomplete input: {message}")]
pub struct IncompleteInputError {
    /// Offending column, when one is to blame
    pub column: Option<String>,
    pub message: String,
}

impl IncompleteInputError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            column: None,
            message: message.into(),
        }
    }

    pub fn for_column(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            column: Some(column.into()),
            message: message.into(),
        }
    }
}

/// Overrides name columns that are not in the snapshot.
#[derive(Debug, Clone, Error)]
#[error("Overrides reference columns absent from the snapshot: {}", .columns.join(", "))]
pub struct StaleOverrideError {
    /// Sorted
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    EmptySchema,
    MissingIdentity,
    NonSequentialIndex,
    DuplicateTargetName,
    InvalidTargetName,
    MultiplePrimaryKeys,
    PrimaryKeyNullable,
    PrimaryKeyNotUnique,
    UnsupportedType,
    MissingBaseline,
    VersionNotMonotonic,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::EmptySchema => "empty_schema",
            ViolationKind::MissingIdentity => "missing_identity",
            ViolationKind::NonSequentialIndex => "non_sequential_index",
            ViolationKind::DuplicateTargetName => "duplicate_target_name",
            ViolationKind::InvalidTargetName => "invalid_target_name",
            ViolationKind::MultiplePrimaryKeys => "multiple_primary_keys",
            ViolationKind::PrimaryKeyNullable => "primary_key_nullable",
            ViolationKind::PrimaryKeyNotUnique => "primary_key_not_unique",
            ViolationKind::UnsupportedType => "unsupported_type",
            ViolationKind::MissingBaseline => "missing_baseline",
            ViolationKind::VersionNotMonotonic => "version_not_monotonic",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One broken contract invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            column: None,
            message: message.into(),
        }
    }

    pub fn on_column(kind: ViolationKind, column: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            column: Some(column.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "[{}] {}: {}", self.kind, column, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Validation found one or more violations. Never empty.
#[derive(Debug, Clone, Error)]
#[error("Contract validation failed with {} violation(s)", .violations.len())]
pub struct ValidationFailure {
    pub violations: Vec<Violation>,
}

impl ValidationFailure {
    pub fn has(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }
}

/// The registry moved on between reading the latest version and recording a new one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Concurrent modification of '{table_name}': expected latest version {}, found {}",
    describe_version(.expected),
    describe_version(.found)
)]
pub struct ConcurrentModificationError {
    pub table_name: String,
    pub expected: Option<u32>,
    pub found: Option<u32>,
}

fn describe_version(version: &Option<u32>) -> String {
    match version {
        Some(v) => format!("v{}", v),
        None => "none".to_string(),
    }
}

/// A lifecycle step was applied to a contract in the wrong state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Contract is {found}, expected {expected}")]
pub struct InvalidStateError {
    pub expected: ContractStatus,
    pub found: ContractStatus,
}

/// Umbrella error for callers that drive the whole pipeline.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error(transparent)]
    IncompleteInput(#[from] IncompleteInputError),

    #[error(transparent)]
    StaleOverride(#[from] StaleOverrideError),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error(transparent)]
    ConcurrentModification(#[from] ConcurrentModificationError),

    #[error(transparent)]
    InvalidState(#[from] InvalidStateError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
