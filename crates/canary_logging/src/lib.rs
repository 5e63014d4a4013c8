//! Shared logging setup for Data Canary binaries.
//!
//! Two sinks: a daily rolling file under `~/.canary/logs` that receives
//! everything the `RUST_LOG` filter lets through, and stderr, which stays
//! quiet (warnings only) unless `--verbose` is passed so that `--json` output
//! on stdout is never interleaved with log lines.

use anyhow::{Context, Result};
use canary_protocol::defaults::DEFAULT_LOG_FILTER;
use canary_protocol::paths::default_logs_dir;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const VERBOSE_LOG_FILTER: &str = "canary=debug,canary_contract=debug";

/// Logging configuration shared by Data Canary binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
    /// Overrides `~/.canary/logs`
    pub log_dir: Option<PathBuf>,
}

/// Keeps the background file writer alive. Drop it last, at process exit.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file_writer: Option<WorkerGuard>,
}

/// Initialize tracing with a rolling file writer and stderr output.
///
/// A log directory that cannot be created disables the file sink with a
/// warning instead of failing the command.
pub fn init_logging(config: LogConfig<'_>) -> Result<LogGuard> {
    let file_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config.verbose {
            EnvFilter::new(VERBOSE_LOG_FILTER)
        } else {
            EnvFilter::new(DEFAULT_LOG_FILTER)
        }
    });
    let console_filter = if config.verbose {
        file_filter.clone()
    } else {
        EnvFilter::new("warn")
    };

    let log_dir = config.log_dir.unwrap_or_else(default_logs_dir);
    let mut file_guard = None;
    let file_layer = match ensure_log_dir(&log_dir) {
        Ok(dir) => {
            let appender =
                tracing_appender::rolling::daily(dir, format!("{}.log", sanitize_name(config.app_name)));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            file_guard = Some(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(file_filter),
            )
        }
        Err(err) => {
            eprintln!("Warning: file logging disabled: {:#}", err);
            None
        }
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuard {
        _file_writer: file_guard,
    })
}

/// Ensure the logs directory exists.
pub fn ensure_log_dir(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    Ok(dir.to_path_buf())
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}
