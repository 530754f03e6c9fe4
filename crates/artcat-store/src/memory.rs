//! # In-Process Catalog
//!
//! All tables live behind one `parking_lot::RwLock`. An ingest plans and
//! applies under the write lock without any await point, so it is atomic
//! and cannot be abandoned half way. Lookups take the read lock only.
//!
//! The record map is authoritative; the name and legacy indexes are derived
//! from it and only contain entries for set slots. The legacy index keeps
//! every record carrying a value, not just one, so a value stays owned for
//! as long as any record still carries it. Through `ingest` alone a value
//! never has more than one carrier; more only appear via
//! [`MemoryCatalog::load_unchecked`].

use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;

use artcat_core::{
    plan_ingest, scan_collisions, ArtifactDescriptor, ArtifactRecord, CanonicalDigest,
    CatalogError, CollisionReport, IngestOutcome, IngestPlan, LegacyDigest, LegacyOwners,
};
use parking_lot::RwLock;
use tracing::{instrument, warn};

use crate::catalog::{observe_ingest, ArtifactCatalog};
use crate::config::DEFAULT_PAGE_SIZE;

#[derive(Debug, Default)]
struct Tables {
    artifacts: HashMap<CanonicalDigest, ArtifactRecord>,
    by_name: HashMap<String, BTreeSet<CanonicalDigest>>,
    by_legacy: HashMap<LegacyDigest, BTreeSet<CanonicalDigest>>,
}

impl Tables {
    fn owners_of(&self, descriptor: &ArtifactDescriptor) -> LegacyOwners {
        let mut owners = LegacyOwners::new();
        for digest in &descriptor.legacy {
            // Any carrier other than the descriptor's own record is a
            // foreign owner, whatever else carries the value.
            let Some(carriers) = self.by_legacy.get(digest) else {
                continue;
            };
            let owner = carriers
                .iter()
                .find(|carrier| **carrier != descriptor.canonical)
                .or_else(|| carriers.first());
            if let Some(owner) = owner {
                owners.insert(digest.clone(), *owner);
            }
        }
        owners
    }

    fn apply(&mut self, plan: &IngestPlan) {
        let record = &plan.record;
        match &plan.outcome {
            IngestOutcome::Created => {
                self.index(record);
                self.artifacts.insert(record.canonical, record.clone());
            }
            IngestOutcome::Enriched { .. } => {
                for digest in plan.attached() {
                    self.by_legacy
                        .entry(digest.clone())
                        .or_default()
                        .insert(record.canonical);
                }
                self.artifacts.insert(record.canonical, record.clone());
            }
            IngestOutcome::Unchanged => {}
        }
    }

    fn index(&mut self, record: &ArtifactRecord) {
        self.by_name
            .entry(record.name.clone())
            .or_default()
            .insert(record.canonical);
        for digest in record.legacy.iter() {
            self.by_legacy
                .entry(digest.clone())
                .or_default()
                .insert(record.canonical);
        }
    }

    fn unindex(&mut self, record: &ArtifactRecord) {
        if let Some(names) = self.by_name.get_mut(&record.name) {
            names.remove(&record.canonical);
            if names.is_empty() {
                self.by_name.remove(&record.name);
            }
        }
        for digest in record.legacy.iter() {
            if let Some(carriers) = self.by_legacy.get_mut(digest) {
                carriers.remove(&record.canonical);
                if carriers.is_empty() {
                    self.by_legacy.remove(digest);
                }
            }
        }
    }
}

/// A catalog held entirely in memory.
#[derive(Debug)]
pub struct MemoryCatalog {
    tables: RwLock<Tables>,
    page_size: usize,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Records per name-listing page. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.tables.read().artifacts.len()
    }

    /// Whether the catalog holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every record, in canonical digest order.
    pub fn records(&self) -> Vec<ArtifactRecord> {
        let tables = self.tables.read();
        let mut records: Vec<_> = tables.artifacts.values().cloned().collect();
        records.sort_by_key(|record| record.canonical);
        records
    }

    /// Trusted bulk load that bypasses reconciliation.
    ///
    /// Records replace any record with the same canonical digest. Legacy
    /// uniqueness is NOT checked; run
    /// [`audit_collisions`](ArtifactCatalog::audit_collisions) afterwards.
    /// Returns the number of records loaded.
    pub fn load_unchecked(&self, records: impl IntoIterator<Item = ArtifactRecord>) -> usize {
        let mut tables = self.tables.write();
        let mut loaded = 0;
        for record in records {
            if let Some(previous) = tables.artifacts.remove(&record.canonical) {
                tables.unindex(&previous);
            }
            tables.index(&record);
            tables.artifacts.insert(record.canonical, record);
            loaded += 1;
        }
        warn!(loaded, "bulk-loaded records without reconciliation");
        loaded
    }

    fn ingest_atomic(&self, descriptor: &ArtifactDescriptor) -> Result<IngestPlan, CatalogError> {
        let mut tables = self.tables.write();
        let plan = plan_ingest(
            descriptor,
            tables.artifacts.get(&descriptor.canonical),
            &tables.owners_of(descriptor),
        )?;
        tables.apply(&plan);
        Ok(plan)
    }

    /// When unchecked loads left several carriers, the lowest canonical
    /// digest wins.
    fn legacy_lookup(&self, digest: &LegacyDigest) -> Option<ArtifactRecord> {
        let tables = self.tables.read();
        tables
            .by_legacy
            .get(digest)?
            .iter()
            .filter_map(|canonical| tables.artifacts.get(canonical))
            .find(|record| record.legacy.get(digest.algorithm()) == Some(digest))
            .cloned()
    }

    fn name_page(
        &self,
        name: &str,
        after: Option<&CanonicalDigest>,
        limit: usize,
    ) -> Vec<ArtifactRecord> {
        let tables = self.tables.read();
        let Some(canonicals) = tables.by_name.get(name) else {
            return Vec::new();
        };
        let lower = match after {
            Some(after) => Bound::Excluded(*after),
            None => Bound::Unbounded,
        };
        canonicals
            .range((lower, Bound::Unbounded))
            .filter_map(|canonical| tables.artifacts.get(canonical))
            .take(limit)
            .cloned()
            .collect()
    }
}

impl ArtifactCatalog for MemoryCatalog {
    #[instrument(skip(self, descriptor), fields(canonical = %descriptor.canonical))]
    async fn ingest(&self, descriptor: &ArtifactDescriptor) -> Result<ArtifactRecord, CatalogError> {
        let result = self.ingest_atomic(descriptor);
        observe_ingest(descriptor, &result);
        result.map(|plan| plan.record)
    }

    async fn get_by_canonical(
        &self,
        digest: &CanonicalDigest,
    ) -> Result<Option<ArtifactRecord>, CatalogError> {
        Ok(self.tables.read().artifacts.get(digest).cloned())
    }

    async fn get_by_legacy(
        &self,
        digest: &LegacyDigest,
    ) -> Result<Option<ArtifactRecord>, CatalogError> {
        Ok(self.legacy_lookup(digest))
    }

    async fn list_by_name_page(
        &self,
        name: &str,
        after: Option<&CanonicalDigest>,
        limit: usize,
    ) -> Result<Vec<ArtifactRecord>, CatalogError> {
        Ok(self.name_page(name, after, limit))
    }

    async fn audit_collisions(&self) -> Result<Vec<CollisionReport>, CatalogError> {
        let tables = self.tables.read();
        Ok(scan_collisions(tables.artifacts.values()))
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}
