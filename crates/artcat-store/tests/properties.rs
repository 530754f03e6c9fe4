//! Randomised ingest sequences against the in-process catalog.

mod common;

use std::collections::HashMap;

use artcat_core::{ArtifactDescriptor, ArtifactRecord, CanonicalDigest, LegacyAlgorithm};
use artcat_store::{ArtifactCatalog, MemoryCatalog};
use proptest::prelude::*;

/// A small pool of contents and digest values so that collisions,
/// mismatches and enrichments all happen often.
#[derive(Debug, Clone)]
struct Step {
    content: u8,
    length: u64,
    slots: [Option<u8>; 3],
}

impl Step {
    fn descriptor(&self) -> ArtifactDescriptor {
        let mut descriptor = ArtifactDescriptor::new(
            common::canonical(&format!("content-{}", self.content)),
            format!("name-{}", self.content % 2),
            "prop",
            self.length,
        );
        for (algorithm, value) in LegacyAlgorithm::ALL.into_iter().zip(self.slots) {
            if let Some(value) = value {
                descriptor = descriptor.with_legacy(common::legacy(algorithm, value));
            }
        }
        descriptor
    }
}

fn arb_step() -> impl Strategy<Value = Step> {
    (
        0u8..5,
        1u64..3,
        proptest::array::uniform3(proptest::option::of(0u8..4)),
    )
        .prop_map(|(content, length, slots)| Step {
            content,
            length,
            slots,
        })
}

fn run(steps: &[Step]) -> (MemoryCatalog, Vec<Vec<ArtifactRecord>>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let catalog = MemoryCatalog::new();
    let mut snapshots = Vec::new();
    runtime.block_on(async {
        for step in steps {
            let _ = catalog.ingest(&step.descriptor()).await;
            snapshots.push(catalog.records());
        }
    });
    (catalog, snapshots)
}

proptest! {
    #[test]
    fn canonical_digests_stay_unique(steps in proptest::collection::vec(arb_step(), 1..40)) {
        let (catalog, _) = run(&steps);
        let records = catalog.records();
        let mut canonicals: Vec<CanonicalDigest> = records.iter().map(|r| r.canonical).collect();
        canonicals.dedup();
        prop_assert_eq!(canonicals.len(), records.len());
    }

    #[test]
    fn legacy_values_never_shared(steps in proptest::collection::vec(arb_step(), 1..40)) {
        let (catalog, _) = run(&steps);
        let records = catalog.records();
        prop_assert!(artcat_core::scan_collisions(&records).is_empty());
    }

    #[test]
    fn recorded_facts_never_change(steps in proptest::collection::vec(arb_step(), 1..40)) {
        let (_, snapshots) = run(&steps);
        let mut first_seen: HashMap<CanonicalDigest, ArtifactRecord> = HashMap::new();
        for snapshot in &snapshots {
            for record in snapshot {
                let Some(earlier) = first_seen.get(&record.canonical) else {
                    first_seen.insert(record.canonical, record.clone());
                    continue;
                };
                prop_assert_eq!(record.length, earlier.length);
                prop_assert_eq!(&record.name, &earlier.name);
                for digest in earlier.legacy.iter() {
                    prop_assert_eq!(record.legacy.get(digest.algorithm()), Some(digest));
                }
            }
        }
    }
}
