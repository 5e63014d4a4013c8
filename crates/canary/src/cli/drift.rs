//! Drift command - compare a new batch with the approved baseline

use anyhow::Result;
use canary_contract::{
    detect_drift, gate_append, AppendDecision, DriftAcceptance, HealthReport, Severity,
};
use canary_protocol::ProfilingSnapshot;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::error::HelpfulError;
use crate::cli::output::{print_json, print_table_colored, severity_color};
use crate::cli::{block_on, read_json, CliContext};

/// Arguments for the `drift` command
#[derive(Debug, Args)]
pub struct DriftArgs {
    #[arg(long)]
    pub table: String,

    /// Profiling snapshot of the new batch (JSON)
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Accept blocking drift and allow the append
    #[arg(long, requires = "accepted_by")]
    pub accept: bool,

    /// Principal accepting the drift
    #[arg(long)]
    pub accepted_by: Option<String>,

    /// Why the drift is acceptable
    #[arg(long, default_value = "")]
    pub note: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct DriftOutput<'a> {
    report: &'a HealthReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    acceptance: Option<&'a DriftAcceptance>,
}

/// Build the health report. Fails when the append is blocked and not accepted.
pub fn run(ctx: &CliContext, args: DriftArgs) -> Result<HealthReport> {
    let snapshot: ProfilingSnapshot = read_json(&args.snapshot, "snapshot")?;

    let baseline = block_on(async {
        let storage = ctx.open_registry().await?;
        Ok::<_, anyhow::Error>(storage.latest_approved(&args.table).await?)
    })??
    .ok_or_else(|| HelpfulError::no_contract(&args.table))?;

    let report = detect_drift(&baseline, &snapshot, &ctx.config.drift);

    let acceptance = match (&args.accepted_by, args.accept) {
        (Some(by), true) => Some(DriftAcceptance::for_report(&report, by, &args.note)),
        _ => None,
    };

    if args.json {
        print_json(&DriftOutput {
            report: &report,
            acceptance: acceptance.as_ref(),
        })?;
    } else {
        print_report(&report);
    }

    match gate_append(&report, acceptance.as_ref()) {
        Ok(AppendDecision::Clear) => {
            if !args.json {
                println!("Append allowed ({})", report.severity);
            }
            Ok(report)
        }
        Ok(AppendDecision::Accepted) => {
            if !args.json {
                println!("Blocking drift accepted; append allowed");
            }
            Ok(report)
        }
        Err(blocked) => Err(HelpfulError::new(blocked.to_string())
            .with_context("Error-level drift needs an explicit human decision")
            .with_suggestions([
                format!(
                    "TRY: canary drift --table {} --snapshot {} --accept --accepted-by <you> --note \"...\"",
                    args.table,
                    args.snapshot.display()
                ),
                format!(
                    "TRY: Draft a new contract version: canary draft --table {} --snapshot {}",
                    args.table,
                    args.snapshot.display()
                ),
            ])
            .into()),
    }
}

fn print_report(report: &HealthReport) {
    println!(
        "Table '{}' against v{}: {} rows (baseline {}, delta {:+})",
        report.table_name,
        report.baseline_version,
        report.row_count,
        report.baseline_row_count,
        report.row_count_delta
    );

    let rows = report
        .columns
        .iter()
        .map(|c| {
            let color = Some(severity_color(c.severity));
            vec![
                (c.column.clone(), None),
                (c.severity.to_string(), color),
                (c.drift.label().to_string(), None),
                (c.drift.describe(), None),
            ]
        })
        .collect();
    print_table_colored(&["Column", "Severity", "Drift", "Details"], rows);

    println!(
        "Overall: {} ({} error, {} warning)",
        report.severity,
        report.count(Severity::Error),
        report.count(Severity::Warning)
    );
}
