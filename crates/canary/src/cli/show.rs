//! Show command - one contract in full

use anyhow::Result;
use canary_contract::Contract;
use clap::Args;

use crate::cli::draft::print_columns;
use crate::cli::error::HelpfulError;
use crate::cli::output::{format_timestamp, print_json};
use crate::cli::{block_on, CliContext};

/// Arguments for the `show` command
#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(long)]
    pub table: String,

    /// Version to show (default: latest)
    #[arg(long)]
    pub version: Option<u32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(ctx: &CliContext, args: ShowArgs) -> Result<Contract> {
    let contract = block_on(async {
        let storage = ctx.open_registry().await?;
        let contract = match args.version {
            Some(version) => storage.get(&args.table, version).await?,
            None => storage.latest_approved(&args.table).await?,
        };
        Ok::<_, anyhow::Error>(contract)
    })??;

    let Some(contract) = contract else {
        let what = match args.version {
            Some(v) => format!("'{}' v{}", args.table, v),
            None => format!("'{}'", args.table),
        };
        return Err(HelpfulError::new(format!("No contract found for {}", what))
            .with_suggestion(format!("TRY: canary history --table {}", args.table))
            .into());
    };

    if args.json {
        print_json(&contract)?;
        return Ok(contract);
    }

    let identity = &contract.identity;
    println!("Table:       {}", identity.table_name);
    println!("Version:     v{} ({})", identity.version, contract.status());
    println!("Sources:     {}", identity.source_paths.join(", "));
    if let Some(target) = &identity.target_path {
        println!("Target:      {}", target);
    }
    println!(
        "Created:     {} by {}",
        format_timestamp(&identity.created_at),
        identity.created_by
    );
    if let (Some(by), Some(at)) = (&identity.approved_by, &identity.approved_at) {
        println!("Approved:    {} by {}", format_timestamp(at), by);
    }
    println!("Baseline:    {} rows", contract.statistical_profile.row_count);
    print_columns(&contract);
    Ok(contract)
}
