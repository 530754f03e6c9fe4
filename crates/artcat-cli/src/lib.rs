//! # artcat-cli: Command-Line Access to the Artifact Catalog
//!
//! Provides the `artcat` binary.
//!
//! ## Subcommands
//!
//! - `artcat add`: hash a file, verify expected checksums, ingest it.
//! - `artcat ingest`: ingest precomputed digests.
//! - `artcat get` / `artcat lookup`: find a record by canonical or legacy digest.
//! - `artcat list`: every record sharing a name.
//! - `artcat audit`: report legacy digests claimed by several records.
//! - `artcat hash`: print every digest of a file without touching the catalog.
//!
//! Results are JSON on stdout; diagnostics go to stderr.
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |---|---|
//! | 0 | success |
//! | 1 | operational error (I/O, storage, bad input) |
//! | 2 | integrity violation or checksum mismatch |
//! | 3 | not found |

pub mod add;
pub mod audit;
pub mod hash;
pub mod ingest;
pub mod query;

use anyhow::{Context, Result};
use serde::Serialize;

use artcat_core::{ArtifactRecord, CatalogError};
use artcat_store::{CatalogConfig, SqliteCatalog};

/// Success.
pub const EXIT_OK: u8 = 0;
/// Operational failure.
pub const EXIT_FAILURE: u8 = 1;
/// A catalog invariant or an expected checksum was violated.
pub const EXIT_INTEGRITY: u8 = 2;
/// The requested record does not exist.
pub const EXIT_NOT_FOUND: u8 = 3;

/// Open the durable catalog, with `database` overriding the configured URL.
pub async fn open_catalog(database: Option<&str>) -> Result<SqliteCatalog> {
    let mut config = CatalogConfig::from_env().context("invalid catalog configuration")?;
    if let Some(database) = database {
        config.database_url = database.to_string();
    }
    SqliteCatalog::open(&config)
        .await
        .with_context(|| format!("failed to open catalog at {}", config.database_url))
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report the result of an ingest and choose the exit code.
///
/// Integrity violations are reported, not propagated, so they get their own
/// exit code. Everything else is an operational failure.
pub fn finish_ingest(result: Result<ArtifactRecord, CatalogError>) -> Result<u8> {
    match result {
        Ok(record) => {
            print_json(&record)?;
            Ok(EXIT_OK)
        }
        Err(err) if err.is_integrity_violation() => {
            tracing::error!("{err}");
            Ok(EXIT_INTEGRITY)
        }
        Err(err) => Err(err).context("ingest failed"),
    }
}

/// Print a lookup result, or report a miss.
pub fn finish_lookup(found: Option<ArtifactRecord>, what: &str) -> Result<u8> {
    match found {
        Some(record) => {
            print_json(&record)?;
            Ok(EXIT_OK)
        }
        None => {
            tracing::warn!("no artifact with {what}");
            Ok(EXIT_NOT_FOUND)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artcat_core::{CanonicalDigest, LegacyAlgorithm, LegacyDigest};

    #[test]
    fn integrity_violations_exit_with_two() {
        let err = CatalogError::LegacyDigestMismatch {
            canonical: CanonicalDigest::of(b"x"),
            recorded: LegacyDigest::new(LegacyAlgorithm::Md5, vec![1; 16]).unwrap(),
            supplied: LegacyDigest::new(LegacyAlgorithm::Md5, vec![2; 16]).unwrap(),
        };
        assert_eq!(finish_ingest(Err(err)).unwrap(), EXIT_INTEGRITY);
    }

    #[test]
    fn storage_failures_propagate() {
        let err = CatalogError::StorageUnavailable("database is locked".into());
        let report = finish_ingest(Err(err)).unwrap_err();
        assert!(format!("{report:#}").contains("database is locked"));
    }

    #[test]
    fn misses_exit_with_three() {
        assert_eq!(finish_lookup(None, "blake3 00").unwrap(), EXIT_NOT_FOUND);
        let record = ArtifactRecord::new(CanonicalDigest::of(b"x"), "x", "s", 1);
        assert_eq!(finish_lookup(Some(record), "blake3 00").unwrap(), EXIT_OK);
    }
}
