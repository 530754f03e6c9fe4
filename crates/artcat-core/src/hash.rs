//! # Content Hashing
//!
//! Computes the canonical digest and every legacy digest of a piece of
//! content in a single pass. The catalog itself never sees payload bytes;
//! this module exists for callers (the CLI, ingestion pipelines) that hold
//! the content and want to describe it.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::digest::{CanonicalDigest, Checksum, LegacyAlgorithm, LegacyDigest};

const READ_BUF_LEN: usize = 64 * 1024;

/// All digests of one piece of content, plus its length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestSet {
    /// BLAKE3 digest.
    pub canonical: CanonicalDigest,
    /// Byte length of the content.
    pub length: u64,
    legacy: [LegacyDigest; 3],
}

impl DigestSet {
    /// Hash in-memory content.
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = MultiHasher::new();
        hasher.update(data);
        hasher.finish()
    }

    /// Hash everything readable from `reader`.
    pub fn from_reader(mut reader: impl Read) -> io::Result<Self> {
        let mut hasher = MultiHasher::new();
        let mut buf = vec![0u8; READ_BUF_LEN];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finish())
    }

    /// Hash a file's contents.
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// The computed digest for one legacy algorithm.
    pub fn get(&self, algorithm: LegacyAlgorithm) -> &LegacyDigest {
        &self.legacy[algorithm.index()]
    }

    /// All legacy digests in schema slot order.
    pub fn legacy(&self) -> impl Iterator<Item = &LegacyDigest> {
        self.legacy.iter()
    }

    /// Whether the content matches an expected checksum.
    ///
    /// Compares in constant time over the full digest width.
    pub fn matches(&self, expected: &Checksum) -> bool {
        let (actual, wanted): (&[u8], &[u8]) = match expected {
            Checksum::Canonical(d) => (self.canonical.as_bytes(), d.as_bytes()),
            Checksum::Legacy(d) => (self.get(d.algorithm()).as_bytes(), d.as_bytes()),
        };
        actual.len() == wanted.len() && bool::from(actual.ct_eq(wanted))
    }
}

/// Feeds the same bytes to every supported hasher.
struct MultiHasher {
    blake3: blake3::Hasher,
    sha1: Sha1,
    sha256: Sha256,
    md5: Md5,
    length: u64,
}

impl MultiHasher {
    fn new() -> Self {
        Self {
            blake3: blake3::Hasher::new(),
            sha1: Sha1::new(),
            sha256: Sha256::new(),
            md5: Md5::new(),
            length: 0,
        }
    }

    fn update(&mut self, data: &[u8]) {
        self.blake3.update(data);
        self.sha1.update(data);
        self.sha256.update(data);
        self.md5.update(data);
        self.length += data.len() as u64;
    }

    fn finish(self) -> DigestSet {
        DigestSet {
            canonical: CanonicalDigest::from_bytes(*self.blake3.finalize().as_bytes()),
            length: self.length,
            legacy: [
                LegacyDigest::from_hasher_output(LegacyAlgorithm::Sha1, &self.sha1.finalize()),
                LegacyDigest::from_hasher_output(LegacyAlgorithm::Sha256, &self.sha256.finalize()),
                LegacyDigest::from_hasher_output(LegacyAlgorithm::Md5, &self.md5.finalize()),
            ],
        }
    }
}
