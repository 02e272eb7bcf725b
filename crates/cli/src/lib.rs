//! # RegioDedupe CLI
//!
//! Thin command-line wrapper around the engine (§6 CLI surface): ingest
//! files and run the full pipeline, or apply a manual review operation.
//! All business logic lives in `regiodedupe-core`/`regiodedupe-infra`;
//! this crate only parses arguments, wires the [`context::AppContext`],
//! and maps results onto a process exit code.

#![forbid(unsafe_code)]

pub mod commands;
pub mod context;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use context::AppContext;

#[derive(Parser, Debug)]
#[command(name = "regiodedupe", version, about = "German regional event deduplication and canonicalization engine")]
pub struct Cli {
    /// Path to the SQLite database file (falls back to `REGIODEDUPE_DB_PATH`, then `regiodedupe.db`).
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// SQLite connection pool size (falls back to `REGIODEDUPE_DB_POOL_SIZE`, then 8).
    #[arg(long)]
    pub pool_size: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest one JSON file of records, then re-run the full pipeline.
    ProcessNewFile {
        /// Path to a JSON array of records.
        path: PathBuf,
        /// Ingestion identifier for idempotent re-runs (defaults to the file path).
        #[arg(long)]
        file_id: Option<String>,
    },
    /// Re-run the full pipeline over every record currently stored.
    ProcessAll,
    /// Detach one source event from a canonical, optionally re-linking it to another (§4.11).
    Split {
        canonical_id: String,
        source_id: String,
        #[arg(long)]
        target_canonical_id: Option<String>,
        #[arg(long, default_value = "cli")]
        operator: String,
    },
    /// Merge one canonical into another (§4.11).
    Merge {
        source_canonical_id: String,
        target_canonical_id: String,
        #[arg(long, default_value = "cli")]
        operator: String,
    },
    /// Clear `needs_review` on a canonical without merging or splitting it (§4.11).
    Dismiss {
        canonical_id: String,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long, default_value = "cli")]
        operator: String,
    },
    /// Compute precision/recall/F1 against the stored ground-truth set (§4.13).
    Evaluate {
        /// Restrict to pairs where either event carries this category.
        #[arg(long)]
        category: Option<String>,
    },
}

/// Parse arguments, build the application context, dispatch the
/// subcommand, and return a process exit code — 0 on success, non-zero
/// on an unhandled error (§6 CLI surface).
#[must_use]
pub fn run() -> i32 {
    init_logging();

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
        Err(err) => tracing::debug!(error = %err, "no .env file loaded"),
    }

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "failed to start async runtime");
            return 1;
        }
    };

    runtime.block_on(run_async(cli))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn run_async(cli: Cli) -> i32 {
    let context = match AppContext::new(cli.db_path, cli.pool_size) {
        Ok(context) => context,
        Err(err) => {
            tracing::error!(error = %err, "failed to initialize application context");
            return 1;
        }
    };

    match commands::dispatch(&context, cli.command).await {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(error = %err, error_type = regiodedupe_infra::error_label(&err), "command failed");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_process_new_file() {
        let cli = Cli::try_parse_from(["regiodedupe", "process-new-file", "events.json"]).unwrap();
        assert!(matches!(cli.command, Commands::ProcessNewFile { path, file_id: None } if path == PathBuf::from("events.json")));
    }

    #[test]
    fn parses_split_with_target() {
        let cli = Cli::try_parse_from(["regiodedupe", "split", "canon-1", "src-2", "--target-canonical-id", "canon-3", "--operator", "alice"]).unwrap();
        match cli.command {
            Commands::Split { canonical_id, source_id, target_canonical_id, operator } => {
                assert_eq!(canonical_id, "canon-1");
                assert_eq!(source_id, "src-2");
                assert_eq!(target_canonical_id.as_deref(), Some("canon-3"));
                assert_eq!(operator, "alice");
            }
            other => panic!("expected Split, got {other:?}"),
        }
    }

    #[test]
    fn dismiss_defaults_operator_to_cli() {
        let cli = Cli::try_parse_from(["regiodedupe", "dismiss", "canon-1"]).unwrap();
        match cli.command {
            Commands::Dismiss { operator, .. } => assert_eq!(operator, "cli"),
            other => panic!("expected Dismiss, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["regiodedupe", "not-a-command"]).is_err());
    }
}
