//! # Add Subcommand
//!
//! Hash a file, verify any expected checksums, and ingest it with every
//! computed digest attached.
//!
//! ```bash
//! artcat add dist/libfoo.so --source ci-4711 \
//!     --expect sha256:9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use artcat_core::{ArtifactDescriptor, Checksum, DigestSet};
use artcat_store::ArtifactCatalog;

use crate::{finish_ingest, EXIT_INTEGRITY};

/// Arguments for `artcat add`.
#[derive(Args, Debug)]
pub struct AddArgs {
    /// File to catalogue.
    pub file: PathBuf,

    /// Name to record. Defaults to the file name.
    #[arg(long)]
    pub name: Option<String>,

    /// Provenance label, e.g. a build or mirror identifier.
    #[arg(long)]
    pub source: String,

    /// Checksum the file must match, as `<algorithm>:<hex>`. Repeatable.
    #[arg(long = "expect", value_name = "ALG:HEX")]
    pub expected: Vec<Checksum>,
}

/// Execute `artcat add`.
pub async fn run_add(args: &AddArgs, catalog: &impl ArtifactCatalog) -> Result<u8> {
    let digests = DigestSet::from_file(&args.file)
        .with_context(|| format!("failed to hash {}", args.file.display()))?;

    if let Some(expected) = args.expected.iter().find(|c| !digests.matches(c)) {
        tracing::error!(
            file = %args.file.display(),
            %expected,
            "broken file: content does not match the expected checksum"
        );
        return Ok(EXIT_INTEGRITY);
    }

    let name = match &args.name {
        Some(name) => name.clone(),
        None => args
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("cannot derive a name from {}", args.file.display()))?,
    };

    let descriptor = ArtifactDescriptor::from_digests(&digests, name, args.source.as_str());
    finish_ingest(catalog.ingest(&descriptor).await)
}
