//! # Hash Subcommand
//!
//! Print every digest of a file. Never touches the catalog.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use artcat_core::{Checksum, DigestSet};

use crate::{print_json, EXIT_OK};

/// Arguments for `artcat hash`.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// File to hash.
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
struct HashReport {
    path: String,
    length: u64,
    checksums: Vec<String>,
}

impl HashReport {
    fn new(path: &std::path::Path, digests: &DigestSet) -> Self {
        let checksums = std::iter::once(Checksum::Canonical(digests.canonical))
            .chain(digests.legacy().cloned().map(Checksum::Legacy))
            .map(|c| c.to_string())
            .collect();
        Self {
            path: path.display().to_string(),
            length: digests.length,
            checksums,
        }
    }
}

/// Execute `artcat hash`.
pub fn run_hash(args: &HashArgs) -> Result<u8> {
    let digests = DigestSet::from_file(&args.file)
        .with_context(|| format!("failed to hash {}", args.file.display()))?;
    print_json(&HashReport::new(&args.file, &digests))?;
    Ok(EXIT_OK)
}
