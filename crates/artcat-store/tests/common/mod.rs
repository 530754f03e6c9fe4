//! Behaviour every `ArtifactCatalog` backend must share.
//!
//! Each backend's test file opens a fresh catalog and runs these checks
//! against it.

#![allow(dead_code)]

use artcat_core::{
    ArtifactDescriptor, CanonicalDigest, CatalogError, LegacyAlgorithm, LegacyDigest,
    MAX_ARTIFACT_LENGTH,
};
use artcat_store::ArtifactCatalog;

pub fn canonical(tag: &str) -> CanonicalDigest {
    CanonicalDigest::of(tag.as_bytes())
}

pub fn legacy(algorithm: LegacyAlgorithm, byte: u8) -> LegacyDigest {
    LegacyDigest::new(algorithm, vec![byte; algorithm.digest_len()]).unwrap()
}

pub fn sha1(byte: u8) -> LegacyDigest {
    legacy(LegacyAlgorithm::Sha1, byte)
}

pub fn a_bin() -> ArtifactDescriptor {
    ArtifactDescriptor::new(canonical("C1"), "a.bin", "build1", 100)
}

/// Scenarios A through E, in order, on one catalog.
pub async fn collision_scenarios<C: ArtifactCatalog>(catalog: &C) {
    // A: fresh record, no legacy digests.
    let record = catalog.ingest(&a_bin()).await.unwrap();
    assert_eq!(record.canonical, canonical("C1"));
    assert_eq!(record.length, 100);
    assert!(record.legacy.is_empty());

    // B: same content, now with a SHA-1.
    let record = catalog
        .ingest(&a_bin().with_legacy(sha1(0x11)))
        .await
        .unwrap();
    assert_eq!(record.legacy.get(LegacyAlgorithm::Sha1), Some(&sha1(0x11)));

    // C: different content claiming the same SHA-1.
    let err = catalog
        .ingest(
            &ArtifactDescriptor::new(canonical("C2"), "b.bin", "build2", 50)
                .with_legacy(sha1(0x11)),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CatalogError::DigestCollision {
            digest: sha1(0x11),
            owner: canonical("C1"),
            attempted: canonical("C2"),
        }
    );
    assert_eq!(catalog.get_by_canonical(&canonical("C2")).await.unwrap(), None);

    // D: same content, different length.
    let err = catalog
        .ingest(&ArtifactDescriptor::new(canonical("C1"), "a.bin", "build1", 999))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::IdentityMismatch {
            recorded_length: 100,
            supplied_length: 999,
            ..
        }
    ));

    // E: legacy lookups.
    let found = catalog.get_by_legacy(&sha1(0x11)).await.unwrap().unwrap();
    assert_eq!(found.canonical, canonical("C1"));
    assert_eq!(found.length, 100);
    assert_eq!(catalog.get_by_legacy(&sha1(0x99)).await.unwrap(), None);
    // Same bytes, other slot.
    let as_sha256 = legacy(LegacyAlgorithm::Sha256, 0x11);
    assert_eq!(catalog.get_by_legacy(&as_sha256).await.unwrap(), None);
}

/// Ingesting the same descriptor twice is a no-op the second time.
pub async fn reingest_is_idempotent<C: ArtifactCatalog>(catalog: &C) {
    let descriptor = a_bin()
        .with_legacy(sha1(1))
        .with_legacy(legacy(LegacyAlgorithm::Md5, 2));
    let first = catalog.ingest(&descriptor).await.unwrap();
    let second = catalog.ingest(&descriptor).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        catalog.list_by_name("a.bin").collect_all().await.unwrap(),
        vec![first]
    );
}

/// Slots fill once and are never cleared by a later ingest that omits them.
pub async fn enrichment_is_monotonic<C: ArtifactCatalog>(catalog: &C) {
    catalog.ingest(&a_bin()).await.unwrap();
    catalog
        .ingest(&a_bin().with_legacy(sha1(1)))
        .await
        .unwrap();
    let record = catalog.ingest(&a_bin()).await.unwrap();
    assert_eq!(record.legacy.get(LegacyAlgorithm::Sha1), Some(&sha1(1)));

    let stored = catalog
        .get_by_canonical(&canonical("C1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.legacy.get(LegacyAlgorithm::Sha1), Some(&sha1(1)));

    // A different value for a set slot is refused.
    let err = catalog
        .ingest(&a_bin().with_legacy(sha1(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::LegacyDigestMismatch { .. }));
}

/// A rejected ingest writes nothing, not even the slots that were valid.
pub async fn rejected_ingest_is_atomic<C: ArtifactCatalog>(catalog: &C) {
    let md5 = legacy(LegacyAlgorithm::Md5, 7);
    catalog
        .ingest(&ArtifactDescriptor::new(canonical("owner"), "o", "s", 1).with_legacy(md5.clone()))
        .await
        .unwrap();
    catalog.ingest(&a_bin()).await.unwrap();

    // SHA-1 would be fine on its own, MD5 is owned elsewhere.
    let err = catalog
        .ingest(&a_bin().with_legacy(sha1(3)).with_legacy(md5))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::DigestCollision { .. }));

    let stored = catalog
        .get_by_canonical(&canonical("C1"))
        .await
        .unwrap()
        .unwrap();
    assert!(stored.legacy.is_empty());
    assert_eq!(catalog.get_by_legacy(&sha1(3)).await.unwrap(), None);
}

/// Name and source are kept from the first ingest.
pub async fn provenance_is_first_writer_wins<C: ArtifactCatalog>(catalog: &C) {
    catalog.ingest(&a_bin()).await.unwrap();
    let record = catalog
        .ingest(&ArtifactDescriptor::new(canonical("C1"), "renamed.bin", "build9", 100))
        .await
        .unwrap();
    assert_eq!(record.name, "a.bin");
    assert_eq!(record.source, "build1");
    assert!(catalog
        .list_by_name("renamed.bin")
        .collect_all()
        .await
        .unwrap()
        .is_empty());
}

/// Listing crosses page boundaries, stays ordered, and can restart.
pub async fn listing_pages_through_a_name<C: ArtifactCatalog>(catalog: &C) {
    let mut expected = Vec::new();
    for i in 0..7u64 {
        let tag = format!("lib-{i}");
        expected.push(
            catalog
                .ingest(&ArtifactDescriptor::new(canonical(&tag), "lib.so", "ci", i))
                .await
                .unwrap(),
        );
    }
    catalog
        .ingest(&ArtifactDescriptor::new(canonical("other"), "other.so", "ci", 1))
        .await
        .unwrap();
    expected.sort_by_key(|record| record.canonical);

    let mut listing = artcat_store::NameListing::new(catalog, "lib.so").with_page_size(3);
    let mut seen = Vec::new();
    while let Some(record) = listing.next_record().await.unwrap() {
        seen.push(record);
    }
    assert_eq!(seen, expected);
    assert_eq!(listing.next_record().await.unwrap(), None);

    listing.restart();
    assert_eq!(listing.next_record().await.unwrap().as_ref(), expected.first());

    assert!(catalog
        .list_by_name("missing.so")
        .collect_all()
        .await
        .unwrap()
        .is_empty());
}

/// An exact multiple of the page size still terminates.
pub async fn listing_terminates_on_full_last_page<C: ArtifactCatalog>(catalog: &C) {
    for i in 0..4u64 {
        catalog
            .ingest(&ArtifactDescriptor::new(canonical(&format!("x{i}")), "x", "ci", i))
            .await
            .unwrap();
    }
    let records = artcat_store::NameListing::new(catalog, "x")
        .with_page_size(2)
        .collect_all()
        .await
        .unwrap();
    assert_eq!(records.len(), 4);
}

/// A catalog built only through `ingest` never reports collisions.
pub async fn ingest_only_catalog_audits_clean<C: ArtifactCatalog>(catalog: &C) {
    collision_scenarios(catalog).await;
    assert!(catalog.audit_collisions().await.unwrap().is_empty());
}

/// Malformed descriptors fail before touching the catalog.
pub async fn conflicting_duplicates_are_invalid<C: ArtifactCatalog>(catalog: &C) {
    let err = catalog
        .ingest(&a_bin().with_legacy(sha1(1)).with_legacy(sha1(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidDescriptor(_)));
    assert_eq!(catalog.get_by_canonical(&canonical("C1")).await.unwrap(), None);

    // Repeating the same digest is harmless.
    let record = catalog
        .ingest(&a_bin().with_legacy(sha1(1)).with_legacy(sha1(1)))
        .await
        .unwrap();
    assert_eq!(record.legacy.iter().count(), 1);
}

pub async fn length_limit_is_shared<C: ArtifactCatalog>(catalog: &C) {
    let at_limit = ArtifactDescriptor::new(canonical("big"), "big.img", "s", MAX_ARTIFACT_LENGTH);
    let record = catalog.ingest(&at_limit).await.unwrap();
    assert_eq!(record.length, MAX_ARTIFACT_LENGTH);
    assert_eq!(
        catalog.get_by_canonical(&canonical("big")).await.unwrap(),
        Some(record)
    );

    for length in [MAX_ARTIFACT_LENGTH + 1, u64::MAX] {
        let over = ArtifactDescriptor::new(canonical("huge"), "huge.img", "s", length)
            .with_legacy(sha1(9));
        let err = catalog.ingest(&over).await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidDescriptor(_)), "{err:?}");
    }
    assert_eq!(catalog.get_by_canonical(&canonical("huge")).await.unwrap(), None);
    assert_eq!(catalog.get_by_legacy(&sha1(9)).await.unwrap(), None);
}
