//! History command - every approved version of a table

use anyhow::Result;
use canary_contract::Contract;
use clap::Args;

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_timestamp, print_json, print_table};
use crate::cli::{block_on, CliContext};

/// Arguments for the `history` command
#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[arg(long)]
    pub table: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(ctx: &CliContext, args: HistoryArgs) -> Result<Vec<Contract>> {
    let (history, tables) = block_on(async {
        let storage = ctx.open_registry().await?;
        let history = storage.history(&args.table).await?;
        let tables = if history.is_empty() {
            storage.tables().await?
        } else {
            Vec::new()
        };
        Ok::<_, anyhow::Error>((history, tables))
    })??;

    if history.is_empty() {
        let mut err = HelpfulError::new(format!("No contracts recorded for '{}'", args.table));
        if !tables.is_empty() {
            err = err.with_context(format!("Known tables: {}", tables.join(", ")));
        }
        return Err(err.into());
    }

    if args.json {
        print_json(&history)?;
        return Ok(history);
    }

    let rows = history
        .iter()
        .map(|c| {
            vec![
                format!("v{}", c.version()),
                c.status().to_string(),
                c.identity.approved_by.clone().unwrap_or_default(),
                c.identity
                    .approved_at
                    .as_ref()
                    .map(format_timestamp)
                    .unwrap_or_default(),
                c.physical_schema.len().to_string(),
                c.statistical_profile.row_count.to_string(),
            ]
        })
        .collect();
    print_table(
        &["Version", "Status", "Approved by", "Approved at", "Columns", "Baseline rows"],
        rows,
    );
    Ok(history)
}
