//! Contract Builder: resolved columns + snapshot + identity -> Draft contract.

use crate::contract::{ColumnBaseline, Contract, ContractIdentity, ResolvedColumn, StatisticalProfile};
use crate::error::IncompleteInputError;
use canary_protocol::ProfilingSnapshot;
use tracing::info;

/// Assemble a Draft contract. The statistical profile is the snapshot
/// re-keyed by target name, in schema order.
pub fn build_contract(
    columns: Vec<ResolvedColumn>,
    snapshot: &ProfilingSnapshot,
    identity: ContractIdentity,
) -> Result<Contract, IncompleteInputError> {
    if columns.is_empty() {
        return Err(IncompleteInputError::new("Columns list cannot be empty"));
    }

    let mut baselines = Vec::with_capacity(columns.len());
    for column in &columns {
        if column.target_name.trim().is_empty() {
            return Err(IncompleteInputError::for_column(
                column.source_name(),
                format!(
                    "Column {} ('{}') has no target name",
                    column.column_index,
                    column.source_name()
                ),
            ));
        }
        let stats = snapshot.column(column.source_name()).ok_or_else(|| {
            IncompleteInputError::for_column(
                column.source_name(),
                format!("No statistics for source column '{}'", column.source_name()),
            )
        })?;
        baselines.push(ColumnBaseline {
            target_name: column.target_name.clone(),
            stats: stats.clone(),
        });
    }

    info!(
        table = %identity.table_name,
        version = identity.version,
        columns = columns.len(),
        "Built draft contract"
    );

    Ok(Contract::draft(
        identity,
        columns,
        StatisticalProfile {
            row_count: snapshot.row_count,
            columns: baselines,
        },
    ))
}
