//! # Artifact Records and Ingest Descriptors
//!
//! [`ArtifactRecord`] is one row of the catalog: a canonical digest plus the
//! descriptive fields fixed at creation and the legacy digests attached so
//! far. [`ArtifactDescriptor`] is what a caller presents to `ingest`.

use serde::{Deserialize, Serialize};

use crate::digest::{CanonicalDigest, Checksum, LegacyAlgorithm, LegacyDigest};
use crate::error::{CatalogError, DigestError};
use crate::hash::DigestSet;

// ---------------------------------------------------------------------------
// LegacyDigests
// ---------------------------------------------------------------------------

/// The legacy digest slots of one artifact, at most one per algorithm.
///
/// An unset slot means "not known", never "known to be absent".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LegacyDigestsRepr", into = "LegacyDigestsRepr")]
pub struct LegacyDigests {
    slots: [Option<LegacyDigest>; 3],
}

impl LegacyDigests {
    /// No slot set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The digest recorded for `algorithm`, if any.
    pub fn get(&self, algorithm: LegacyAlgorithm) -> Option<&LegacyDigest> {
        self.slots[algorithm.index()].as_ref()
    }

    /// Set the slot for the digest's algorithm, returning the previous value.
    pub fn insert(&mut self, digest: LegacyDigest) -> Option<LegacyDigest> {
        self.slots[digest.algorithm().index()].replace(digest)
    }

    /// Set digests in schema slot order.
    pub fn iter(&self) -> impl Iterator<Item = &LegacyDigest> {
        self.slots.iter().flatten()
    }

    /// Whether no slot is set.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl FromIterator<LegacyDigest> for LegacyDigests {
    fn from_iter<T: IntoIterator<Item = LegacyDigest>>(iter: T) -> Self {
        let mut digests = Self::new();
        for d in iter {
            digests.insert(d);
        }
        digests
    }
}

/// Serialized shape: one optional hex string per slot, keyed by column name.
#[derive(Serialize, Deserialize)]
struct LegacyDigestsRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    md5: Option<String>,
}

impl From<LegacyDigests> for LegacyDigestsRepr {
    fn from(d: LegacyDigests) -> Self {
        let hex = |alg| d.get(alg).map(LegacyDigest::to_hex);
        Self {
            sha1: hex(LegacyAlgorithm::Sha1),
            sha256: hex(LegacyAlgorithm::Sha256),
            md5: hex(LegacyAlgorithm::Md5),
        }
    }
}

impl TryFrom<LegacyDigestsRepr> for LegacyDigests {
    type Error = DigestError;

    fn try_from(r: LegacyDigestsRepr) -> Result<Self, Self::Error> {
        let mut digests = Self::new();
        for (alg, hex) in [
            (LegacyAlgorithm::Sha1, r.sha1),
            (LegacyAlgorithm::Sha256, r.sha256),
            (LegacyAlgorithm::Md5, r.md5),
        ] {
            if let Some(hex) = hex {
                digests.insert(LegacyDigest::from_hex(alg, &hex)?);
            }
        }
        Ok(digests)
    }
}

// ---------------------------------------------------------------------------
// ArtifactRecord
// ---------------------------------------------------------------------------

/// One catalogued artifact.
///
/// `name`, `source` and `length` are fixed when the record is created. Only
/// unset legacy slots may change afterwards, and only from unset to set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Canonical BLAKE3 digest, the record's identity.
    pub canonical: CanonicalDigest,
    /// Declared name. Descriptive only; many records may share it.
    pub name: String,
    /// Free-form provenance label.
    pub source: String,
    /// Byte length of the content.
    pub length: u64,
    /// Legacy digests attached so far.
    #[serde(default)]
    pub legacy: LegacyDigests,
}

impl ArtifactRecord {
    /// A record with no legacy digests.
    pub fn new(
        canonical: CanonicalDigest,
        name: impl Into<String>,
        source: impl Into<String>,
        length: u64,
    ) -> Self {
        Self {
            canonical,
            name: name.into(),
            source: source.into(),
            length,
            legacy: LegacyDigests::new(),
        }
    }

    /// Every digest known for this artifact, canonical first.
    pub fn checksums(&self) -> impl Iterator<Item = Checksum> + '_ {
        std::iter::once(Checksum::Canonical(self.canonical))
            .chain(self.legacy.iter().cloned().map(Checksum::Legacy))
    }
}

// ---------------------------------------------------------------------------
// ArtifactDescriptor
// ---------------------------------------------------------------------------

/// Largest byte length the catalog accepts.
///
/// Lengths are `u64` in the API but persist as signed 64-bit integers, so
/// every backend caps them at `i64::MAX`.
pub const MAX_ARTIFACT_LENGTH: u64 = i64::MAX as u64;

/// The input to `ingest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Canonical digest of the content. Mandatory.
    pub canonical: CanonicalDigest,
    /// Declared name.
    pub name: String,
    /// Provenance label.
    pub source: String,
    /// Byte length of the content.
    pub length: u64,
    /// Zero or more legacy digests, each tagged with its algorithm.
    #[serde(default)]
    pub legacy: Vec<LegacyDigest>,
}

impl ArtifactDescriptor {
    /// A descriptor without legacy digests.
    pub fn new(
        canonical: CanonicalDigest,
        name: impl Into<String>,
        source: impl Into<String>,
        length: u64,
    ) -> Self {
        Self {
            canonical,
            name: name.into(),
            source: source.into(),
            length,
            legacy: Vec::new(),
        }
    }

    /// Describe hashed content, attaching every computed legacy digest.
    pub fn from_digests(
        digests: &DigestSet,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            legacy: digests.legacy().cloned().collect(),
            ..Self::new(digests.canonical, name, source, digests.length)
        }
    }

    /// Add a legacy digest.
    pub fn with_legacy(mut self, digest: LegacyDigest) -> Self {
        self.legacy.push(digest);
        self
    }

    /// Check the descriptor's own consistency and fold its legacy digests
    /// into slots.
    pub fn validate(&self) -> Result<LegacyDigests, CatalogError> {
        if self.length > MAX_ARTIFACT_LENGTH {
            return Err(CatalogError::InvalidDescriptor(format!(
                "length {} exceeds the maximum of {MAX_ARTIFACT_LENGTH}",
                self.length
            )));
        }
        self.legacy_slots()
    }

    /// Fold the supplied legacy digests into slots.
    ///
    /// Repeating an algorithm with the same value is harmless; repeating it
    /// with a different value is rejected.
    pub fn legacy_slots(&self) -> Result<LegacyDigests, CatalogError> {
        let mut slots = LegacyDigests::new();
        for digest in &self.legacy {
            match slots.get(digest.algorithm()) {
                Some(prev) if prev != digest => {
                    return Err(CatalogError::InvalidDescriptor(format!(
                        "conflicting {} digests supplied: {prev} and {digest}",
                        digest.algorithm()
                    )));
                }
                Some(_) => {}
                None => {
                    slots.insert(digest.clone());
                }
            }
        }
        Ok(slots)
    }
}
