//! # Collision Audit
//!
//! Scans authoritative records for legacy digest values carried by more than
//! one canonical record. Under normal operation `ingest` makes this
//! impossible; the scan exists to catch what trusted bulk-load paths or
//! external writers may have let through.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::artifact::ArtifactRecord;
use crate::digest::{CanonicalDigest, LegacyAlgorithm, LegacyDigest};

/// One legacy digest value claimed by several canonical records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollisionReport {
    /// The shared legacy digest.
    pub digest: LegacyDigest,
    /// Every canonical record carrying it, ascending.
    pub canonicals: Vec<CanonicalDigest>,
}

impl CollisionReport {
    /// The legacy slot the collision is in.
    pub fn algorithm(&self) -> LegacyAlgorithm {
        self.digest.algorithm()
    }
}

/// Find every legacy digest value shared between records.
///
/// Reports are ordered by algorithm, then digest bytes.
pub fn scan_collisions<'a>(
    records: impl IntoIterator<Item = &'a ArtifactRecord>,
) -> Vec<CollisionReport> {
    let mut claims: BTreeMap<&'a LegacyDigest, Vec<CanonicalDigest>> = BTreeMap::new();
    for record in records {
        for digest in record.legacy.iter() {
            claims.entry(digest).or_default().push(record.canonical);
        }
    }

    claims
        .into_iter()
        .filter_map(|(digest, mut canonicals)| {
            canonicals.sort();
            canonicals.dedup();
            (canonicals.len() > 1).then(|| CollisionReport {
                digest: digest.clone(),
                canonicals,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(byte: u8, legacy: &[LegacyDigest]) -> ArtifactRecord {
        let mut r = ArtifactRecord::new(CanonicalDigest::from_bytes([byte; 32]), "n", "s", 1);
        for d in legacy {
            r.legacy.insert(d.clone());
        }
        r
    }

    fn digest(alg: LegacyAlgorithm, byte: u8) -> LegacyDigest {
        LegacyDigest::new(alg, vec![byte; alg.digest_len()]).unwrap()
    }

    #[test]
    fn clean_catalog_has_no_reports() {
        let records = vec![
            record(1, &[digest(LegacyAlgorithm::Sha1, 1)]),
            record(2, &[digest(LegacyAlgorithm::Sha1, 2)]),
            record(3, &[]),
            record(4, &[]),
        ];
        assert!(scan_collisions(&records).is_empty());
    }

    #[test]
    fn shared_value_is_reported_once_with_all_owners() {
        let shared = digest(LegacyAlgorithm::Md5, 9);
        let records = vec![
            record(3, &[shared.clone()]),
            record(1, &[shared.clone()]),
            record(2, &[digest(LegacyAlgorithm::Md5, 8)]),
        ];
        let reports = scan_collisions(&records);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].digest, shared);
        assert_eq!(reports[0].algorithm(), LegacyAlgorithm::Md5);
        assert_eq!(
            reports[0].canonicals,
            vec![
                CanonicalDigest::from_bytes([1; 32]),
                CanonicalDigest::from_bytes([3; 32])
            ]
        );
    }

    #[test]
    fn reports_are_ordered_by_slot() {
        let records = vec![
            record(1, &[digest(LegacyAlgorithm::Md5, 1), digest(LegacyAlgorithm::Sha1, 1)]),
            record(2, &[digest(LegacyAlgorithm::Md5, 1), digest(LegacyAlgorithm::Sha1, 1)]),
        ];
        let algs: Vec<_> = scan_collisions(&records)
            .iter()
            .map(CollisionReport::algorithm)
            .collect();
        assert_eq!(algs, vec![LegacyAlgorithm::Sha1, LegacyAlgorithm::Md5]);
    }
}
