//! Contract Validator
//!
//! Checks a Draft against every structural and semantic invariant and
//! reports all violations at once, so a reviewer can fix them in one pass.

use crate::contract::{Contract, ContractStatus};
use crate::error::{ContractError, InvalidStateError, ValidationFailure, Violation, ViolationKind};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, info};

const TARGET_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

fn target_name_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(TARGET_NAME_PATTERN).expect("target name pattern compiles"))
}

/// True when `name` is usable as a column name in the target table.
pub fn is_valid_target_name(name: &str) -> bool {
    target_name_regex().is_match(name)
}

/// Validate a Draft. On success the contract comes back `Validated`.
///
/// `latest_approved_version` is the newest approved version of the same
/// table in the registry, or `None` for a new table.
pub fn validate_contract(
    mut contract: Contract,
    latest_approved_version: Option<u32>,
) -> Result<Contract, ContractError> {
    if contract.status() != ContractStatus::Draft {
        return Err(InvalidStateError {
            expected: ContractStatus::Draft,
            found: contract.status(),
        }
        .into());
    }

    let violations = check_contract(&contract, latest_approved_version);
    if !violations.is_empty() {
        info!(
            table = %contract.table_name(),
            version = contract.version(),
            violations = violations.len(),
            "Contract failed validation"
        );
        return Err(ValidationFailure { violations }.into());
    }

    contract.set_status(ContractStatus::Validated);
    info!(table = %contract.table_name(), version = contract.version(), "Contract validated");
    Ok(contract)
}

/// Every violation in `contract`, in check order. Empty means valid.
pub fn check_contract(contract: &Contract, latest_approved_version: Option<u32>) -> Vec<Violation> {
    let mut violations = Vec::new();
    check_identity(contract, &mut violations);
    check_version(contract, latest_approved_version, &mut violations);
    check_structure(contract, &mut violations);
    check_target_names(contract, &mut violations);
    check_primary_key(contract, &mut violations);
    check_types(contract, &mut violations);
    check_baselines(contract, &mut violations);
    debug!(table = %contract.table_name(), violations = violations.len(), "Checked contract");
    violations
}

fn check_identity(contract: &Contract, out: &mut Vec<Violation>) {
    let identity = &contract.identity;
    if identity.table_name.trim().is_empty() {
        out.push(Violation::new(
            ViolationKind::MissingIdentity,
            "Identity has no table name",
        ));
    }
    if !identity.source_paths.iter().any(|p| !p.trim().is_empty()) {
        out.push(Violation::new(
            ViolationKind::MissingIdentity,
            "Identity has no source path",
        ));
    }
}

fn check_version(contract: &Contract, latest: Option<u32>, out: &mut Vec<Violation>) {
    let version = contract.version();
    match latest {
        None if version != 1 => out.push(Violation::new(
            ViolationKind::VersionNotMonotonic,
            format!("First contract for a table must be version 1, got {}", version),
        )),
        Some(latest) if version <= latest => out.push(Violation::new(
            ViolationKind::VersionNotMonotonic,
            format!(
                "Version {} is not greater than the latest approved version {}",
                version, latest
            ),
        )),
        _ => {}
    }
}

fn check_structure(contract: &Contract, out: &mut Vec<Violation>) {
    if contract.physical_schema.is_empty() {
        out.push(Violation::new(
            ViolationKind::EmptySchema,
            "Physical schema has no columns",
        ));
        return;
    }
    for (expected, column) in contract.physical_schema.iter().enumerate() {
        if column.column_index != expected {
            out.push(Violation::on_column(
                ViolationKind::NonSequentialIndex,
                &column.target_name,
                format!(
                    "Column index {} found at position {}",
                    column.column_index, expected
                ),
            ));
        }
    }
}

fn check_target_names(contract: &Contract, out: &mut Vec<Violation>) {
    // Collision groups in first-seen order.
    let mut groups: Vec<Vec<&str>> = Vec::new();
    let mut group_of: HashMap<String, usize> = HashMap::new();
    for column in &contract.physical_schema {
        let key = column.target_name.to_lowercase();
        match group_of.get(&key) {
            Some(&idx) => groups[idx].push(column.target_name.as_str()),
            None => {
                group_of.insert(key, groups.len());
                groups.push(vec![column.target_name.as_str()]);
            }
        }
    }
    for group in groups.into_iter().filter(|g| g.len() > 1) {
        out.push(Violation::on_column(
            ViolationKind::DuplicateTargetName,
            group[0],
            format!("Target names collide (case-insensitive): {}", group.join(", ")),
        ));
    }

    for column in &contract.physical_schema {
        if !is_valid_target_name(&column.target_name) {
            out.push(Violation::on_column(
                ViolationKind::InvalidTargetName,
                &column.target_name,
                format!(
                    "Target name '{}' must match {}",
                    column.target_name, TARGET_NAME_PATTERN
                ),
            ));
        }
    }
}

fn check_primary_key(contract: &Contract, out: &mut Vec<Violation>) {
    let keys: Vec<&str> = contract
        .physical_schema
        .iter()
        .filter(|c| c.is_primary_key())
        .map(|c| c.target_name.as_str())
        .collect();

    match keys.as_slice() {
        [] => {}
        [key] => {
            // A missing baseline is reported by check_baselines.
            let Some(baseline) = contract.statistical_profile.get(key) else {
                return;
            };
            let row_count = contract.statistical_profile.row_count;
            if baseline.stats.null_fraction != 0.0 {
                out.push(Violation::on_column(
                    ViolationKind::PrimaryKeyNullable,
                    *key,
                    format!(
                        "Primary key has null fraction {} (must be 0)",
                        baseline.stats.null_fraction
                    ),
                ));
            }
            if baseline.stats.distinct_count != row_count {
                out.push(Violation::on_column(
                    ViolationKind::PrimaryKeyNotUnique,
                    *key,
                    format!(
                        "Primary key has {} distinct values for {} rows",
                        baseline.stats.distinct_count, row_count
                    ),
                ));
            }
        }
        many => out.push(Violation::new(
            ViolationKind::MultiplePrimaryKeys,
            format!("At most one primary key allowed, found {}: {}", many.len(), many.join(", ")),
        )),
    }
}

fn check_types(contract: &Contract, out: &mut Vec<Violation>) {
    for column in &contract.physical_schema {
        if let Err(err) = column.data_type() {
            out.push(Violation::on_column(
                ViolationKind::UnsupportedType,
                &column.target_name,
                err.to_string(),
            ));
        }
    }
}

fn check_baselines(contract: &Contract, out: &mut Vec<Violation>) {
    for column in &contract.physical_schema {
        if contract.statistical_profile.get(&column.target_name).is_none() {
            out.push(Violation::on_column(
                ViolationKind::MissingBaseline,
                &column.target_name,
                "No baseline statistics in the profile",
            ));
        }
    }
}
