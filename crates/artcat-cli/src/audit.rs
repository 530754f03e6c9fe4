//! # Audit Subcommand
//!
//! Report legacy digests carried by more than one record. A clean catalog
//! prints an empty array.

use anyhow::Result;
use clap::Args;

use artcat_store::ArtifactCatalog;

use crate::{print_json, EXIT_INTEGRITY, EXIT_OK};

/// Arguments for `artcat audit`.
#[derive(Args, Debug)]
pub struct AuditArgs {}

/// Execute `artcat audit`. Exits with the integrity code if anything is found.
pub async fn run_audit(_args: &AuditArgs, catalog: &impl ArtifactCatalog) -> Result<u8> {
    let reports = catalog.audit_collisions().await?;
    print_json(&reports)?;
    if reports.is_empty() {
        return Ok(EXIT_OK);
    }
    for report in &reports {
        tracing::error!(
            digest = %report.digest,
            records = report.canonicals.len(),
            "legacy digest shared by several records"
        );
    }
    Ok(EXIT_INTEGRITY)
}
