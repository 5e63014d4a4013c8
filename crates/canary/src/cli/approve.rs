//! Approve command - sign off a validated contract and record it

use anyhow::Result;
use canary_contract::{approve, check_contract, Contract, StorageError, ValidationFailure};
use clap::Args;
use std::path::PathBuf;

use crate::cli::error::HelpfulError;
use crate::cli::{block_on, read_json, CliContext};

/// Arguments for the `approve` command
#[derive(Debug, Args)]
pub struct ApproveArgs {
    /// Validated contract written by `canary draft`
    #[arg(long)]
    pub contract: PathBuf,

    /// Principal approving the contract
    #[arg(long)]
    pub approved_by: String,
}

pub fn run(ctx: &CliContext, args: ApproveArgs) -> Result<Contract> {
    let contract: Contract = read_json(&args.contract, "contract")?;
    let table = contract.table_name().to_string();

    block_on(async {
        let storage = ctx.open_registry().await?;

        // The registry may have moved on since the draft was validated.
        let latest = storage.latest_version(&table).await?;
        let violations = check_contract(&contract, latest);
        if !violations.is_empty() {
            return Err(HelpfulError::validation_failed(&table, &ValidationFailure { violations }).into());
        }

        let approved = approve(contract, &args.approved_by)?;
        match storage.record_approved(&approved).await {
            Ok(()) => {}
            Err(StorageError::ConcurrentModification(conflict)) => {
                return Err(HelpfulError::concurrent_approval(&conflict).into());
            }
            Err(err) => return Err(anyhow::Error::new(err).context("Failed to record contract")),
        }

        println!(
            "Approved '{}' v{} by {}",
            approved.table_name(),
            approved.version(),
            args.approved_by
        );
        Ok::<_, anyhow::Error>(approved)
    })?
}
