//! # Ingest Reconciliation
//!
//! Decides what an `ingest` call does to the catalog. The decision is a pure
//! function of three inputs, all read inside the caller's transaction:
//!
//! 1. the descriptor being ingested,
//! 2. the record currently stored under its canonical digest, if any,
//! 3. the current owner of each supplied legacy digest, if any.
//!
//! ## Invariants Enforced
//!
//! - A legacy value owned by one canonical record is never attached to
//!   another (`DigestCollision`).
//! - The length recorded for a canonical digest never changes
//!   (`IdentityMismatch`).
//! - A set legacy slot never changes value (`LegacyDigestMismatch`), and an
//!   absent slot in the descriptor never clears a set one.
//!
//! Checks run in a fixed order (length, then legacy slots in schema order)
//! and the first violation is returned. A rejected plan has no side effects
//! because nothing has been written yet.

use std::collections::HashMap;

use crate::artifact::{ArtifactDescriptor, ArtifactRecord};
use crate::digest::{CanonicalDigest, LegacyAlgorithm, LegacyDigest};
use crate::error::CatalogError;

/// Current owners of the legacy digests named in a descriptor.
#[derive(Debug, Clone, Default)]
pub struct LegacyOwners {
    owners: HashMap<LegacyDigest, CanonicalDigest>,
}

impl LegacyOwners {
    /// No owners known.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `digest` is attached to `owner`.
    pub fn insert(&mut self, digest: LegacyDigest, owner: CanonicalDigest) {
        self.owners.insert(digest, owner);
    }

    /// The canonical record that owns `digest`.
    pub fn owner(&self, digest: &LegacyDigest) -> Option<&CanonicalDigest> {
        self.owners.get(digest)
    }
}

/// What an accepted ingest does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new record is inserted.
    Created,
    /// Previously unset legacy slots are filled on an existing record.
    Enriched {
        /// Slots that become set, in schema order.
        attached: Vec<LegacyAlgorithm>,
    },
    /// The stored record already says everything the descriptor says.
    Unchanged,
}

impl IngestOutcome {
    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Enriched { .. } => "enriched",
            Self::Unchanged => "unchanged",
        }
    }
}

/// An accepted ingest: the record as it will be after the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestPlan {
    /// The resulting record.
    pub record: ArtifactRecord,
    /// The kind of write required.
    pub outcome: IngestOutcome,
}

impl IngestPlan {
    /// Legacy digests newly attached by an enrichment.
    pub fn attached(&self) -> impl Iterator<Item = &LegacyDigest> {
        let attached: &[LegacyAlgorithm] = match &self.outcome {
            IngestOutcome::Enriched { attached } => attached,
            _ => &[],
        };
        attached.iter().filter_map(|alg| self.record.legacy.get(*alg))
    }
}

/// Plan an ingest.
///
/// `existing` must be the record stored under `descriptor.canonical`, or
/// `None` if there is none. `owners` must contain the current owner of every
/// legacy digest in the descriptor that is attached anywhere in the catalog.
pub fn plan_ingest(
    descriptor: &ArtifactDescriptor,
    existing: Option<&ArtifactRecord>,
    owners: &LegacyOwners,
) -> Result<IngestPlan, CatalogError> {
    let supplied = descriptor.validate()?;

    let Some(stored) = existing else {
        // A fresh canonical digest cannot own anything yet, so any owner is
        // a different record.
        if let Some((digest, owner)) = supplied
            .iter()
            .find_map(|d| owners.owner(d).map(|owner| (d, owner)))
        {
            return Err(CatalogError::DigestCollision {
                digest: digest.clone(),
                owner: *owner,
                attempted: descriptor.canonical,
            });
        }
        return Ok(IngestPlan {
            record: ArtifactRecord {
                canonical: descriptor.canonical,
                name: descriptor.name.clone(),
                source: descriptor.source.clone(),
                length: descriptor.length,
                legacy: supplied,
            },
            outcome: IngestOutcome::Created,
        });
    };

    debug_assert_eq!(stored.canonical, descriptor.canonical);

    if stored.length != descriptor.length {
        return Err(CatalogError::IdentityMismatch {
            canonical: stored.canonical,
            recorded_length: stored.length,
            supplied_length: descriptor.length,
        });
    }

    let mut record = stored.clone();
    let mut attached = Vec::new();
    for digest in supplied.iter() {
        match stored.legacy.get(digest.algorithm()) {
            Some(recorded) if recorded == digest => {}
            Some(recorded) => {
                return Err(CatalogError::LegacyDigestMismatch {
                    canonical: stored.canonical,
                    recorded: recorded.clone(),
                    supplied: digest.clone(),
                });
            }
            None => {
                if let Some(owner) = owners.owner(digest) {
                    if *owner != stored.canonical {
                        return Err(CatalogError::DigestCollision {
                            digest: digest.clone(),
                            owner: *owner,
                            attempted: stored.canonical,
                        });
                    }
                }
                record.legacy.insert(digest.clone());
                attached.push(digest.algorithm());
            }
        }
    }

    let outcome = if attached.is_empty() {
        IngestOutcome::Unchanged
    } else {
        IngestOutcome::Enriched { attached }
    };
    Ok(IngestPlan { record, outcome })
}
