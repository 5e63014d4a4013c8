//! Approval lifecycle
//!
//! The draft workflow runs resolver, builder and validator in one call so
//! callers hand a reviewer either a `Validated` contract or the complete list
//! of violations. Approval itself is the explicit human step on top.

use crate::builder::build_contract;
use crate::contract::{Contract, ContractIdentity, ContractStatus};
use crate::error::{ContractError, IncompleteInputError, InvalidStateError};
use crate::resolver::resolve_columns;
use crate::validator::validate_contract;
use canary_protocol::{OverrideMap, ProfilingSnapshot, SuggestionReport};
use chrono::Utc;
use tracing::info;

/// Version number for the next contract of a table.
pub fn next_version(latest: Option<&Contract>) -> u32 {
    latest.map(|c| c.version() + 1).unwrap_or(1)
}

/// Everything a reviewer submits for one table.
#[derive(Debug, Clone)]
pub struct DraftRequest<'a> {
    pub snapshot: &'a ProfilingSnapshot,
    pub suggestions: Option<&'a SuggestionReport>,
    pub overrides: &'a OverrideMap,
    /// Version is overwritten with [`next_version`] of `latest_approved`
    pub identity: ContractIdentity,
    pub latest_approved: Option<&'a Contract>,
}

/// Resolve, build and validate. Returns a `Validated` contract.
pub fn prepare_contract(request: DraftRequest<'_>) -> Result<Contract, ContractError> {
    let DraftRequest {
        snapshot,
        suggestions,
        overrides,
        mut identity,
        latest_approved,
    } = request;

    identity.version = next_version(latest_approved);
    let columns = resolve_columns(snapshot, suggestions, overrides)?;
    let draft = build_contract(columns, snapshot, identity)?;
    validate_contract(draft, latest_approved.map(Contract::version))
}

/// Approve a validated contract on behalf of `approved_by`.
pub fn approve(mut contract: Contract, approved_by: impl Into<String>) -> Result<Contract, ContractError> {
    if contract.status() != ContractStatus::Validated {
        return Err(InvalidStateError {
            expected: ContractStatus::Validated,
            found: contract.status(),
        }
        .into());
    }
    let approved_by = approved_by.into();
    if approved_by.trim().is_empty() {
        return Err(IncompleteInputError::new("Approval requires a principal").into());
    }

    let now = Utc::now();
    contract.identity.approved_by = Some(approved_by);
    contract.identity.approved_at = Some(now);
    contract.identity.updated_at = now;
    contract.set_status(ContractStatus::Approved);

    info!(
        table = %contract.table_name(),
        version = contract.version(),
        approved_by = contract.identity.approved_by.as_deref().unwrap_or_default(),
        "Contract approved"
    );
    Ok(contract)
}
