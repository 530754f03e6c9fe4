//! # The Catalog Contract
//!
//! [`ArtifactCatalog`] is the only way callers reach catalog state. Every
//! operation takes the catalog handle explicitly, so tests can run any
//! number of isolated catalogs side by side.
//!
//! ## Results
//!
//! - A lookup miss is `Ok(None)` (or an empty page), never an error.
//! - `ingest` failures are typed [`CatalogError`]s; integrity violations are
//!   never retried or healed here.

use std::collections::VecDeque;
use std::future::Future;

use artcat_core::{
    ArtifactDescriptor, ArtifactRecord, CanonicalDigest, CatalogError, CollisionReport,
    IngestOutcome, IngestPlan, LegacyDigest,
};
use metrics::counter;
use tracing::{debug, warn};

use crate::config::DEFAULT_PAGE_SIZE;

/// Operations every catalog backend provides.
pub trait ArtifactCatalog: Send + Sync {
    /// Insert a new artifact or reconcile a re-ingested one, atomically.
    fn ingest(
        &self,
        descriptor: &ArtifactDescriptor,
    ) -> impl Future<Output = Result<ArtifactRecord, CatalogError>> + Send;

    /// Look up by canonical digest.
    fn get_by_canonical(
        &self,
        digest: &CanonicalDigest,
    ) -> impl Future<Output = Result<Option<ArtifactRecord>, CatalogError>> + Send;

    /// Look up by legacy digest. A miss does not mean the content is unknown,
    /// only that nobody attached this digest.
    fn get_by_legacy(
        &self,
        digest: &LegacyDigest,
    ) -> impl Future<Output = Result<Option<ArtifactRecord>, CatalogError>> + Send;

    /// One page of records named `name`, ordered by canonical digest,
    /// strictly after `after`.
    fn list_by_name_page(
        &self,
        name: &str,
        after: Option<&CanonicalDigest>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ArtifactRecord>, CatalogError>> + Send;

    /// Every legacy digest value carried by more than one record.
    fn audit_collisions(
        &self,
    ) -> impl Future<Output = Result<Vec<CollisionReport>, CatalogError>> + Send;

    /// Default page size for [`ArtifactCatalog::list_by_name`].
    fn page_size(&self) -> usize {
        DEFAULT_PAGE_SIZE
    }

    /// Lazily list every record named `name`.
    fn list_by_name(&self, name: &str) -> NameListing<'_, Self>
    where
        Self: Sized,
    {
        NameListing::new(self, name).with_page_size(self.page_size())
    }
}

// ---------------------------------------------------------------------------
// NameListing
// ---------------------------------------------------------------------------

/// A finite, restartable cursor over the records sharing a name.
///
/// Pages are fetched on demand with keyset pagination on the canonical
/// digest, so the cursor never revisits or skips a record that existed for
/// the whole iteration, and always terminates.
pub struct NameListing<'a, C> {
    catalog: &'a C,
    name: String,
    page_size: usize,
    buffer: VecDeque<ArtifactRecord>,
    after: Option<CanonicalDigest>,
    exhausted: bool,
}

impl<'a, C: ArtifactCatalog> NameListing<'a, C> {
    /// Start listing `name` from the beginning.
    pub fn new(catalog: &'a C, name: impl Into<String>) -> Self {
        Self {
            catalog,
            name: name.into(),
            page_size: DEFAULT_PAGE_SIZE,
            buffer: VecDeque::new(),
            after: None,
            exhausted: false,
        }
    }

    /// Records fetched per round trip. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The name being listed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The next record, or `None` once the listing is exhausted.
    pub async fn next_record(&mut self) -> Result<Option<ArtifactRecord>, CatalogError> {
        if self.buffer.is_empty() && !self.exhausted {
            let page = self
                .catalog
                .list_by_name_page(&self.name, self.after.as_ref(), self.page_size)
                .await?;
            if page.len() < self.page_size {
                self.exhausted = true;
            }
            if let Some(last) = page.last() {
                self.after = Some(last.canonical);
            }
            self.buffer.extend(page);
        }
        Ok(self.buffer.pop_front())
    }

    /// Rewind to the first record.
    pub fn restart(&mut self) {
        self.buffer.clear();
        self.after = None;
        self.exhausted = false;
    }

    /// Drain the remaining records.
    pub async fn collect_all(mut self) -> Result<Vec<ArtifactRecord>, CatalogError> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record().await? {
            records.push(record);
        }
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Shared ingest observation
// ---------------------------------------------------------------------------

/// Log and count the result of an ingest.
pub(crate) fn observe_ingest(
    descriptor: &ArtifactDescriptor,
    result: &Result<IngestPlan, CatalogError>,
) {
    match result {
        Ok(plan) => {
            counter!("artcat_ingest_total", "outcome" => plan.outcome.as_str()).increment(1);
            if plan.outcome != IngestOutcome::Created
                && (plan.record.name != descriptor.name || plan.record.source != descriptor.source)
            {
                warn!(
                    canonical = %plan.record.canonical,
                    recorded_name = %plan.record.name,
                    supplied_name = %descriptor.name,
                    recorded_source = %plan.record.source,
                    supplied_source = %descriptor.source,
                    "re-ingest with different provenance; keeping recorded values"
                );
            }
            if let IngestOutcome::Enriched { attached } = &plan.outcome {
                debug!(canonical = %plan.record.canonical, ?attached, "attached legacy digests");
            }
        }
        Err(err) => {
            counter!("artcat_ingest_rejected_total", "kind" => err.kind()).increment(1);
            if err.is_integrity_violation() {
                warn!(canonical = %descriptor.canonical, error = %err, "ingest rejected");
            } else {
                debug!(canonical = %descriptor.canonical, error = %err, "ingest failed");
            }
        }
    }
}
