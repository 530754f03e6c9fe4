//! # artcat-core: Foundational Types for the Artifact Catalog
//!
//! This crate defines the identity model of the catalog and the rules that
//! keep an artifact's hash identities mutually consistent. Every other crate
//! in the workspace depends on `artcat-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Fixed-width digest newtypes.** `CanonicalDigest` is exactly 32 bytes
//!    of BLAKE3. `LegacyDigest` carries its algorithm tag and a byte width
//!    validated at construction. Hex is a presentation format only.
//!
//! 2. **One reconciliation planner.** [`plan_ingest()`] is a pure function
//!    that decides whether an ingest creates, enriches or leaves a record
//!    unchanged, or which invariant it would violate. Storage backends gather
//!    the inputs inside their transaction and apply the returned plan; none of
//!    them re-implements the decision.
//!
//! 3. **Closed legacy algorithm set.** `LegacyAlgorithm` has exactly the three
//!    slots of the persisted schema (`sha1`, `sha256`, `md5`). Adding one is a
//!    schema change and forces every `match` to handle it.
//!
//! 4. **Integrity failures are typed.** `CatalogError` names the violated
//!    invariant and the conflicting record; nothing is auto-healed.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `artcat-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod artifact;
pub mod audit;
pub mod digest;
pub mod error;
pub mod hash;
pub mod reconcile;

// Re-export primary types for ergonomic imports.
pub use artifact::{ArtifactDescriptor, ArtifactRecord, LegacyDigests, MAX_ARTIFACT_LENGTH};
pub use audit::{scan_collisions, CollisionReport};
pub use digest::{CanonicalDigest, Checksum, HashAlgorithm, LegacyAlgorithm, LegacyDigest};
pub use error::{CatalogError, DigestError};
pub use hash::DigestSet;
pub use reconcile::{plan_ingest, IngestOutcome, IngestPlan, LegacyOwners};
