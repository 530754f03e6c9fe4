//! # artcat CLI entry point
//!
//! Parses command-line arguments, installs logging, opens the catalog and
//! dispatches to subcommand handlers.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use artcat_cli::add::{run_add, AddArgs};
use artcat_cli::audit::{run_audit, AuditArgs};
use artcat_cli::hash::{run_hash, HashArgs};
use artcat_cli::ingest::{run_ingest, IngestArgs};
use artcat_cli::query::{run_get, run_list, run_lookup, GetArgs, ListArgs, LookupArgs};
use artcat_cli::{open_catalog, EXIT_FAILURE};

/// Content-addressable artifact catalog.
///
/// Records artifacts by BLAKE3 digest and keeps SHA-1, SHA-256 and MD5
/// digests as secondary keys that may never be shared between records.
#[derive(Parser, Debug)]
#[command(name = "artcat", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Database URL or path. Overrides ARTCAT_DATABASE_URL.
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hash a file, verify expected checksums, and catalogue it.
    Add(AddArgs),

    /// Catalogue precomputed digests.
    Ingest(IngestArgs),

    /// Fetch a record by canonical digest.
    Get(GetArgs),

    /// Fetch a record by legacy digest.
    Lookup(LookupArgs),

    /// List every record with a given name.
    List(ListArgs),

    /// Report legacy digests shared between records.
    Audit(AuditArgs),

    /// Print every digest of a file.
    Hash(HashArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // stdout carries results; logs go to stderr.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!("artcat v{} starting", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    if let Commands::Hash(args) = &cli.command {
        return run_hash(args);
    }

    let catalog = open_catalog(cli.database.as_deref()).await?;
    let result = match &cli.command {
        Commands::Add(args) => run_add(args, &catalog).await,
        Commands::Ingest(args) => run_ingest(args, &catalog).await,
        Commands::Get(args) => run_get(args, &catalog).await,
        Commands::Lookup(args) => run_lookup(args, &catalog).await,
        Commands::List(args) => run_list(args, &catalog).await,
        Commands::Audit(args) => run_audit(args, &catalog).await,
        Commands::Hash(args) => run_hash(args),
    };
    catalog.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_add_with_expectations() {
        let cli = Cli::try_parse_from([
            "artcat",
            "add",
            "dist/a.bin",
            "--source",
            "ci",
            "--expect",
            "md5:900150983cd24fb0d6963f7d28e17f72",
            "--expect",
            "SHA-1:a9993e364706816aba3e25717850c26c9cd0d89d",
        ])
        .unwrap();
        let Commands::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(args.expected.len(), 2);
        assert!(args.name.is_none());
        assert_eq!(args.source, "ci");
    }

    #[test]
    fn parse_ingest_with_global_flags() {
        let blake3 = "6437b3ac38465133ffb63b75273a8db548c558465d79db03fd359c6cd5bd9d85";
        let cli = Cli::try_parse_from([
            "artcat",
            "-vv",
            "--database",
            "/tmp/x.db",
            "ingest",
            "--blake3",
            blake3,
            "--length",
            "3",
            "--name",
            "abc",
            "--source",
            "mirror",
            "--legacy",
            "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.database.as_deref(), Some("/tmp/x.db"));
        let Commands::Ingest(args) = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(args.blake3.to_hex(), blake3);
        assert_eq!(args.legacy.len(), 1);
    }

    #[test]
    fn malformed_digests_are_rejected_at_parse_time() {
        assert!(Cli::try_parse_from(["artcat", "get", "not-hex"]).is_err());
        assert!(Cli::try_parse_from(["artcat", "lookup", "crc32:00"]).is_err());
        assert!(Cli::try_parse_from(["artcat", "lookup", "md5:00"]).is_err());
    }

    #[test]
    fn parse_list_and_audit() {
        let cli = Cli::try_parse_from(["artcat", "list", "lib.so", "--page-size", "5"]).unwrap();
        assert!(matches!(cli.command, Commands::List(ListArgs { page_size: Some(5), .. })));
        let cli = Cli::try_parse_from(["artcat", "audit"]).unwrap();
        assert!(matches!(cli.command, Commands::Audit(_)));
    }
}
