//! # Ingest Subcommand
//!
//! Ingest digests computed elsewhere, e.g. by a mirror that only publishes
//! checksums.

use anyhow::Result;
use clap::Args;

use artcat_core::{ArtifactDescriptor, CanonicalDigest, LegacyDigest};
use artcat_store::ArtifactCatalog;

use crate::finish_ingest;

/// Arguments for `artcat ingest`.
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Canonical BLAKE3 digest, hex.
    #[arg(long)]
    pub blake3: CanonicalDigest,

    /// Content length in bytes.
    #[arg(long)]
    pub length: u64,

    /// Name to record.
    #[arg(long)]
    pub name: String,

    /// Provenance label.
    #[arg(long)]
    pub source: String,

    /// Legacy digest to attach, as `<algorithm>:<hex>`. Repeatable.
    #[arg(long = "legacy", value_name = "ALG:HEX")]
    pub legacy: Vec<LegacyDigest>,
}

impl IngestArgs {
    fn descriptor(&self) -> ArtifactDescriptor {
        ArtifactDescriptor {
            canonical: self.blake3,
            name: self.name.clone(),
            source: self.source.clone(),
            length: self.length,
            legacy: self.legacy.clone(),
        }
    }
}

/// Execute `artcat ingest`.
pub async fn run_ingest(args: &IngestArgs, catalog: &impl ArtifactCatalog) -> Result<u8> {
    finish_ingest(catalog.ingest(&args.descriptor()).await)
}
