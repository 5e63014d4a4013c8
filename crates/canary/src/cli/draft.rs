//! Draft command - resolve, build and validate a contract from a snapshot

use anyhow::{Context, Result};
use canary_contract::{prepare_contract, Contract, ContractError, ContractIdentity, DraftRequest};
use canary_protocol::{OverrideMap, ProfilingSnapshot, SuggestionReport};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::cli::error::HelpfulError;
use crate::cli::output::{print_json, print_table, with_source};
use crate::cli::{block_on, read_json, CliContext};

/// Arguments for the `draft` command
#[derive(Debug, Args)]
pub struct DraftArgs {
    /// Target table name
    #[arg(long)]
    pub table: String,

    /// Profiling snapshot (JSON)
    #[arg(long)]
    pub snapshot: PathBuf,

    /// AI suggestion report (JSON); repeat to merge a naming and a type review
    #[arg(long)]
    pub suggestions: Vec<PathBuf>,

    /// Reviewer overrides keyed by source column (JSON)
    #[arg(long)]
    pub overrides: Option<PathBuf>,

    /// Source file the snapshot was computed from (defaults to the snapshot path)
    #[arg(long = "source")]
    pub sources: Vec<String>,

    /// Where the curated table is written
    #[arg(long)]
    pub target_path: Option<String>,

    /// Principal drafting the contract
    #[arg(long, env = "USER", default_value = "canary")]
    pub created_by: String,

    /// Output file for the validated contract (default: <table>.v<version>.contract.json)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Draft, validate and write a contract. Returns the path written.
pub fn run(ctx: &CliContext, args: DraftArgs) -> Result<PathBuf> {
    let snapshot: ProfilingSnapshot = read_json(&args.snapshot, "snapshot")?;

    let mut suggestions: Option<SuggestionReport> = None;
    for path in &args.suggestions {
        let report: SuggestionReport = read_json(path, "suggestion report")?;
        suggestions = Some(match suggestions {
            Some(existing) => existing.merge(report),
            None => report,
        });
    }

    let overrides: OverrideMap = match &args.overrides {
        Some(path) => read_json(path, "override map")?,
        None => OverrideMap::new(),
    };

    let latest = block_on(async {
        let storage = ctx.open_registry().await?;
        storage
            .latest_approved(&args.table)
            .await
            .context("Failed to read latest approved contract")
    })??;

    let mut identity = ContractIdentity::new(&args.table, 0, &args.created_by);
    if args.sources.is_empty() {
        identity = identity.with_source_path(args.snapshot.display().to_string());
    }
    for source in &args.sources {
        identity = identity.with_source_path(source);
    }
    if let Some(target) = &args.target_path {
        identity = identity.with_target_path(target);
    }

    let contract = match prepare_contract(DraftRequest {
        snapshot: &snapshot,
        suggestions: suggestions.as_ref(),
        overrides: &overrides,
        identity,
        latest_approved: latest.as_ref(),
    }) {
        Ok(contract) => contract,
        Err(ContractError::Validation(failure)) => {
            if args.json {
                print_json(&failure.violations)?;
            }
            return Err(HelpfulError::validation_failed(&args.table, &failure).into());
        }
        Err(ContractError::StaleOverride(stale)) => {
            return Err(HelpfulError::new(stale.to_string())
                .with_context("The override file names columns this snapshot does not have")
                .with_suggestion("TRY: Remove or rename those entries in the override file")
                .into());
        }
        Err(err) => return Err(err.into()),
    };

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.v{}.contract.json", args.table, contract.version())));
    std::fs::write(&out, contract.to_json()?)
        .with_context(|| format!("Failed to write contract: {}", out.display()))?;
    info!(table = %args.table, version = contract.version(), path = %out.display(), "Wrote validated contract");

    if args.json {
        print_json(&contract)?;
    } else {
        print_columns(&contract);
        println!(
            "Validated '{}' v{} -> {}",
            contract.table_name(),
            contract.version(),
            out.display()
        );
        println!(
            "Next: canary approve --contract {} --approved-by <you>",
            out.display()
        );
    }
    Ok(out)
}

pub(crate) fn print_columns(contract: &Contract) {
    let rows = contract
        .physical_schema
        .iter()
        .map(|c| {
            vec![
                c.column_index.to_string(),
                c.source_name().to_string(),
                with_source(&c.target_name, c.name_source),
                with_source(&c.physical_type, c.type_source),
                with_source(c.role.as_str(), c.role_source),
                if c.is_nullable { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    print_table(&["#", "Source", "Target", "Type", "Role", "Nullable"], rows);
}
