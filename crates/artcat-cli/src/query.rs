//! # Lookup Subcommands
//!
//! `get` by canonical digest, `lookup` by legacy digest, and `list` by name.

use anyhow::Result;
use clap::Args;

use artcat_core::{CanonicalDigest, LegacyDigest};
use artcat_store::{ArtifactCatalog, NameListing};

use crate::{finish_lookup, EXIT_NOT_FOUND, EXIT_OK};

/// Arguments for `artcat get`.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Canonical BLAKE3 digest, hex.
    pub blake3: CanonicalDigest,
}

/// Arguments for `artcat lookup`.
#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Legacy digest as `<algorithm>:<hex>`.
    #[arg(value_name = "ALG:HEX")]
    pub digest: LegacyDigest,
}

/// Arguments for `artcat list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Artifact name.
    pub name: String,

    /// Records fetched per round trip. Defaults to the configured page size.
    #[arg(long)]
    pub page_size: Option<usize>,
}

/// Execute `artcat get`.
pub async fn run_get(args: &GetArgs, catalog: &impl ArtifactCatalog) -> Result<u8> {
    let found = catalog.get_by_canonical(&args.blake3).await?;
    finish_lookup(found, &format!("blake3 {}", args.blake3))
}

/// Execute `artcat lookup`.
pub async fn run_lookup(args: &LookupArgs, catalog: &impl ArtifactCatalog) -> Result<u8> {
    let found = catalog.get_by_legacy(&args.digest).await?;
    finish_lookup(found, &args.digest.to_string())
}

/// Execute `artcat list`. Prints one JSON record per line.
pub async fn run_list(args: &ListArgs, catalog: &impl ArtifactCatalog) -> Result<u8> {
    let page_size = args.page_size.unwrap_or_else(|| catalog.page_size());
    let mut listing = NameListing::new(catalog, args.name.as_str()).with_page_size(page_size);
    let mut count = 0usize;
    while let Some(record) = listing.next_record().await? {
        println!("{}", serde_json::to_string(&record)?);
        count += 1;
    }
    tracing::info!(name = %args.name, count, "listed records");
    Ok(if count == 0 { EXIT_NOT_FOUND } else { EXIT_OK })
}

#[cfg(test)]
mod tests {
    use super::*;
    use artcat_core::{ArtifactDescriptor, LegacyAlgorithm};
    use artcat_store::MemoryCatalog;

    #[tokio::test]
    async fn get_and_lookup_report_misses() {
        let catalog = MemoryCatalog::new();
        let canonical = CanonicalDigest::of(b"x");
        let sha1 = LegacyDigest::new(LegacyAlgorithm::Sha1, vec![1; 20]).unwrap();

        let get = GetArgs { blake3: canonical };
        let lookup = LookupArgs {
            digest: sha1.clone(),
        };
        assert_eq!(run_get(&get, &catalog).await.unwrap(), EXIT_NOT_FOUND);
        assert_eq!(run_lookup(&lookup, &catalog).await.unwrap(), EXIT_NOT_FOUND);

        catalog
            .ingest(&ArtifactDescriptor::new(canonical, "x", "s", 1).with_legacy(sha1))
            .await
            .unwrap();
        assert_eq!(run_get(&get, &catalog).await.unwrap(), EXIT_OK);
        assert_eq!(run_lookup(&lookup, &catalog).await.unwrap(), EXIT_OK);
    }

    #[tokio::test]
    async fn list_counts_records() {
        let catalog = MemoryCatalog::new();
        let args = ListArgs {
            name: "n".into(),
            page_size: Some(1),
        };
        assert_eq!(run_list(&args, &catalog).await.unwrap(), EXIT_NOT_FOUND);
        for seed in [b"a", b"b"] {
            catalog
                .ingest(&ArtifactDescriptor::new(CanonicalDigest::of(seed), "n", "s", 1))
                .await
                .unwrap();
        }
        assert_eq!(run_list(&args, &catalog).await.unwrap(), EXIT_OK);
    }
}
