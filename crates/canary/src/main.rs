//! Data Canary launcher
//!
//! `canary draft` -> `canary approve` -> `canary drift` for every new batch.

use anyhow::Result;
use canary::cli::{self, approve::ApproveArgs, draft::DraftArgs, drift::DriftArgs};
use canary::cli::{history::HistoryArgs, show::ShowArgs, CliContext};
use canary_logging::{init_logging, LogConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "canary", version, about = "Data contracts and drift detection for tabular batches")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.canary/config.toml)
    #[arg(long, global = true, env = "CANARY_CONFIG")]
    config: Option<PathBuf>,

    /// Contract registry database (overrides the config file)
    #[arg(long, global = true, env = "CANARY_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve, build and validate a contract from a profiling snapshot
    Draft(DraftArgs),

    /// Approve a validated contract and record it in the registry
    Approve(ApproveArgs),

    /// Compare a new batch with the latest approved contract
    Drift(DriftArgs),

    /// List every recorded version of a table
    History(HistoryArgs),

    /// Show one contract
    Show(ShowArgs),
}

impl Commands {
    fn wants_json(&self) -> bool {
        match self {
            Commands::Draft(args) => args.json,
            Commands::Drift(args) => args.json,
            Commands::History(args) => args.json,
            Commands::Show(args) => args.json,
            Commands::Approve(_) => false,
        }
    }
}

fn run_command(cli: Cli) -> Result<()> {
    let ctx = CliContext::load(cli.config.as_deref(), cli.db.as_deref())?;
    debug!(registry = %ctx.registry_path.display(), "Loaded configuration");

    match cli.command {
        Commands::Draft(args) => cli::draft::run(&ctx, args).map(drop),
        Commands::Approve(args) => cli::approve::run(&ctx, args).map(drop),
        Commands::Drift(args) => cli::drift::run(&ctx, args).map(drop),
        Commands::History(args) => cli::history::run(&ctx, args).map(drop),
        Commands::Show(args) => cli::show::run(&ctx, args).map(drop),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = cli.command.wants_json();

    let _log_guard = match init_logging(LogConfig {
        app_name: "canary",
        verbose: cli.verbose,
        log_dir: None,
    }) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Warning: logging disabled: {:#}", err);
            None
        }
    };

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                let payload = serde_json::json!({ "error": format!("{:#}", err) });
                eprintln!("{}", payload);
            } else {
                eprintln!("{:?}", err);
            }
            ExitCode::from(1)
        }
    }
}
