//! # Error Types: Catalog Failure Taxonomy
//!
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - Integrity violations (`DigestCollision`, `IdentityMismatch`,
//!   `LegacyDigestMismatch`) carry the conflicting record so the caller can
//!   investigate. They are never retried or auto-corrected.
//! - Storage failures are split into transient (`StorageUnavailable`,
//!   `WriteConflict`) and permanent (`Storage`) classes. The catalog itself
//!   performs no retries.
//! - A lookup miss is `Ok(None)`, not an error.

use thiserror::Error;

use crate::digest::{CanonicalDigest, LegacyDigest};

/// Top-level error type for catalog operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A supplied legacy digest is already attached to a different canonical
    /// record. Either two contents collide under the legacy algorithm or the
    /// caller mis-tagged its input.
    #[error("digest collision: {digest} already belongs to {owner}, refusing to attach it to {attempted}")]
    DigestCollision {
        /// The contested legacy digest.
        digest: LegacyDigest,
        /// The canonical record that already owns it.
        owner: CanonicalDigest,
        /// The canonical record the caller tried to attach it to.
        attempted: CanonicalDigest,
    },

    /// Re-ingestion of a known canonical digest declared a different length.
    #[error("identity mismatch: {canonical} is recorded with length {recorded_length}, ingest declared {supplied_length}")]
    IdentityMismatch {
        /// The canonical digest being re-ingested.
        canonical: CanonicalDigest,
        /// Length already on record.
        recorded_length: u64,
        /// Length supplied by the caller.
        supplied_length: u64,
    },

    /// Re-ingestion supplied a legacy digest that differs from the one
    /// already recorded for the same algorithm.
    #[error("legacy digest mismatch for {canonical}: recorded {recorded}, supplied {supplied}")]
    LegacyDigestMismatch {
        /// The canonical digest being re-ingested.
        canonical: CanonicalDigest,
        /// Legacy digest already on record.
        recorded: LegacyDigest,
        /// Legacy digest supplied by the caller.
        supplied: LegacyDigest,
    },

    /// The descriptor is malformed before any catalog state is consulted.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// A concurrent writer outside this handle committed a conflicting value
    /// first. Retrying reports the precise integrity violation, if any.
    #[error("write conflict: {0}")]
    WriteConflict(String),

    /// The durable store cannot be reached. Safe to retry with backoff.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Non-transient backend failure (corrupt row, failed migration).
    #[error("storage error: {0}")]
    Storage(String),
}

impl CatalogError {
    /// Whether this error reports a violated catalog invariant.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Self::DigestCollision { .. }
                | Self::IdentityMismatch { .. }
                | Self::LegacyDigestMismatch { .. }
        )
    }

    /// Whether the same call may succeed if retried later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_) | Self::WriteConflict(_))
    }

    /// Stable snake_case label, used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DigestCollision { .. } => "digest_collision",
            Self::IdentityMismatch { .. } => "identity_mismatch",
            Self::LegacyDigestMismatch { .. } => "legacy_digest_mismatch",
            Self::InvalidDescriptor(_) => "invalid_descriptor",
            Self::WriteConflict(_) => "write_conflict",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::Storage(_) => "storage",
        }
    }
}

/// Error while constructing or parsing a digest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// The byte width does not match the algorithm.
    #[error("{algorithm} digest must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Algorithm name.
        algorithm: &'static str,
        /// Required width in bytes.
        expected: usize,
        /// Supplied width in bytes.
        actual: usize,
    },

    /// The input is not valid hexadecimal.
    #[error("invalid hex digest: {0}")]
    InvalidHex(String),

    /// The algorithm tag is not one this catalog knows.
    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),

    /// A tagged digest was not of the form `<algorithm>:<hex>`.
    #[error("malformed tagged digest {0:?}: expected <algorithm>:<hex>")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::LegacyAlgorithm;

    fn canonical(byte: u8) -> CanonicalDigest {
        CanonicalDigest::from_bytes([byte; 32])
    }

    fn sha1(byte: u8) -> LegacyDigest {
        LegacyDigest::new(LegacyAlgorithm::Sha1, vec![byte; 20]).unwrap()
    }

    #[test]
    fn collision_display_names_both_records() {
        let err = CatalogError::DigestCollision {
            digest: sha1(0xaa),
            owner: canonical(1),
            attempted: canonical(2),
        };
        let msg = err.to_string();
        assert!(msg.contains(&canonical(1).to_hex()));
        assert!(msg.contains(&canonical(2).to_hex()));
        assert!(msg.contains("sha1:aaaa"));
    }

    #[test]
    fn identity_mismatch_display_has_both_lengths() {
        let err = CatalogError::IdentityMismatch {
            canonical: canonical(1),
            recorded_length: 100,
            supplied_length: 999,
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("999"));
    }

    #[test]
    fn classification() {
        let mismatch = CatalogError::LegacyDigestMismatch {
            canonical: canonical(1),
            recorded: sha1(1),
            supplied: sha1(2),
        };
        assert!(mismatch.is_integrity_violation());
        assert!(!mismatch.is_transient());

        let busy = CatalogError::StorageUnavailable("database is locked".into());
        assert!(busy.is_transient());
        assert!(!busy.is_integrity_violation());

        assert!(CatalogError::WriteConflict("x".into()).is_transient());
        assert!(!CatalogError::Storage("corrupt".into()).is_transient());
        assert!(!CatalogError::InvalidDescriptor("x".into()).is_integrity_violation());
    }

    #[test]
    fn digest_error_display() {
        let err = DigestError::InvalidLength {
            algorithm: "md5",
            expected: 16,
            actual: 3,
        };
        assert_eq!(err.to_string(), "md5 digest must be 16 bytes, got 3");
        assert!(DigestError::UnknownAlgorithm("crc32".into())
            .to_string()
            .contains("crc32"));
    }
}
