//! # Digests: Canonical and Legacy Content Identities
//!
//! Every artifact is identified by one [`CanonicalDigest`] (BLAKE3, 32 bytes)
//! and may additionally carry up to one [`LegacyDigest`] per
//! [`LegacyAlgorithm`].
//!
//! ## Security Invariant
//!
//! Digest values are fixed-width byte arrays whose width is checked at
//! construction. Equality is always over the full width; there is no prefix
//! or truncated comparison anywhere in the catalog.
//!
//! ## Text Forms
//!
//! - Canonical: 64 hex characters.
//! - Legacy / tagged: `<algorithm>:<hex>`, e.g. `sha1:a9993e36...`.
//!   `<algorithm>=<hex>` is accepted on input as well.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DigestError;

/// Width of a canonical (BLAKE3) digest in bytes.
pub const CANONICAL_DIGEST_LEN: usize = 32;

fn decode_hex(s: &str) -> Result<Vec<u8>, DigestError> {
    hex::decode(s.trim()).map_err(|e| DigestError::InvalidHex(format!("{s:?}: {e}")))
}

/// Split `alg:hex` (or `alg=hex`) into its parts.
fn split_tagged(s: &str) -> Result<(&str, &str), DigestError> {
    s.split_once(':')
        .or_else(|| s.split_once('='))
        .ok_or_else(|| DigestError::Malformed(s.to_string()))
}

// ---------------------------------------------------------------------------
// CanonicalDigest
// ---------------------------------------------------------------------------

/// The BLAKE3 digest that anchors an artifact's identity.
///
/// Ordered bytewise, which is also the order used for name listings and
/// audit reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalDigest([u8; CANONICAL_DIGEST_LEN]);

impl CanonicalDigest {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; CANONICAL_DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, rejecting anything that is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DigestError> {
        let arr: [u8; CANONICAL_DIGEST_LEN] =
            bytes.try_into().map_err(|_| DigestError::InvalidLength {
                algorithm: HashAlgorithm::Blake3.as_str(),
                expected: CANONICAL_DIGEST_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Parse 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, DigestError> {
        Self::from_slice(&decode_hex(s)?)
    }

    /// Compute the canonical digest of in-memory content.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; CANONICAL_DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for CanonicalDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for CanonicalDigest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for CanonicalDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CanonicalDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Algorithms
// ---------------------------------------------------------------------------

/// The legacy digest slots of the catalog.
///
/// The set is closed: each variant is one column of the persisted `artifact`
/// table and one unique index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegacyAlgorithm {
    /// SHA-1, 20 bytes.
    Sha1,
    /// SHA-256, 32 bytes.
    Sha256,
    /// MD5, 16 bytes.
    Md5,
}

impl LegacyAlgorithm {
    /// All legacy slots in schema order.
    pub const ALL: [Self; 3] = [Self::Sha1, Self::Sha256, Self::Md5];

    /// Algorithm name, identical to the column name of its slot.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Md5 => "md5",
        }
    }

    /// Digest width in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Md5 => 16,
        }
    }

    /// Position of this slot in [`LegacyAlgorithm::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Self::Sha1 => 0,
            Self::Sha256 => 1,
            Self::Md5 => 2,
        }
    }
}

impl fmt::Display for LegacyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LegacyAlgorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match HashAlgorithm::from_str(s)? {
            HashAlgorithm::Legacy(alg) => Ok(alg),
            HashAlgorithm::Blake3 => Err(DigestError::UnknownAlgorithm(format!(
                "{s} is the canonical algorithm, not a legacy one"
            ))),
        }
    }
}

/// Any algorithm the catalog records a digest under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// The canonical algorithm.
    Blake3,
    /// One of the legacy slots.
    Legacy(LegacyAlgorithm),
}

impl HashAlgorithm {
    /// Algorithm name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Legacy(alg) => alg.as_str(),
        }
    }
}

impl From<LegacyAlgorithm> for HashAlgorithm {
    fn from(alg: LegacyAlgorithm) -> Self {
        Self::Legacy(alg)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blake3" => Ok(Self::Blake3),
            "sha1" | "sha-1" => Ok(Self::Legacy(LegacyAlgorithm::Sha1)),
            "sha256" | "sha-256" => Ok(Self::Legacy(LegacyAlgorithm::Sha256)),
            "md5" => Ok(Self::Legacy(LegacyAlgorithm::Md5)),
            _ => Err(DigestError::UnknownAlgorithm(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// LegacyDigest
// ---------------------------------------------------------------------------

/// A digest under one of the legacy algorithms.
///
/// The algorithm tag is part of the value: `sha256:X` and a hypothetical
/// other 32-byte digest `X` under another algorithm are distinct.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LegacyDigest {
    algorithm: LegacyAlgorithm,
    bytes: Box<[u8]>,
}

impl LegacyDigest {
    /// Build a legacy digest, checking the byte width against the algorithm.
    pub fn new(algorithm: LegacyAlgorithm, bytes: impl Into<Vec<u8>>) -> Result<Self, DigestError> {
        let bytes = bytes.into();
        if bytes.len() != algorithm.digest_len() {
            return Err(DigestError::InvalidLength {
                algorithm: algorithm.as_str(),
                expected: algorithm.digest_len(),
                actual: bytes.len(),
            });
        }
        Ok(Self {
            algorithm,
            bytes: bytes.into_boxed_slice(),
        })
    }

    /// Parse the hex form of a digest under a known algorithm.
    pub fn from_hex(algorithm: LegacyAlgorithm, s: &str) -> Result<Self, DigestError> {
        Self::new(algorithm, decode_hex(s)?)
    }

    /// Only for hasher outputs whose width is fixed by the type system.
    pub(crate) fn from_hasher_output(algorithm: LegacyAlgorithm, bytes: &[u8]) -> Self {
        debug_assert_eq!(bytes.len(), algorithm.digest_len());
        Self {
            algorithm,
            bytes: bytes.into(),
        }
    }

    /// The slot this digest belongs to.
    pub fn algorithm(&self) -> LegacyAlgorithm {
        self.algorithm
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex rendering of the bytes, without the algorithm tag.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Display for LegacyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl FromStr for LegacyDigest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (alg, hex) = split_tagged(s)?;
        Self::from_hex(alg.parse()?, hex)
    }
}

impl Serialize for LegacyDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LegacyDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Checksum
// ---------------------------------------------------------------------------

/// An expected digest under any algorithm, as supplied by a caller that
/// wants content verified before it is catalogued.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Checksum {
    /// Expected canonical digest.
    Canonical(CanonicalDigest),
    /// Expected legacy digest.
    Legacy(LegacyDigest),
}

impl Checksum {
    /// The algorithm of the expected digest.
    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            Self::Canonical(_) => HashAlgorithm::Blake3,
            Self::Legacy(d) => HashAlgorithm::Legacy(d.algorithm()),
        }
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canonical(d) => write!(f, "blake3:{d}"),
            Self::Legacy(d) => d.fmt(f),
        }
    }
}

impl FromStr for Checksum {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (alg, hex) = split_tagged(s)?;
        match alg.parse()? {
            HashAlgorithm::Blake3 => Ok(Self::Canonical(CanonicalDigest::from_hex(hex)?)),
            HashAlgorithm::Legacy(alg) => Ok(Self::Legacy(LegacyDigest::from_hex(alg, hex)?)),
        }
    }
}

impl From<CanonicalDigest> for Checksum {
    fn from(d: CanonicalDigest) -> Self {
        Self::Canonical(d)
    }
}

impl From<LegacyDigest> for Checksum {
    fn from(d: LegacyDigest) -> Self {
        Self::Legacy(d)
    }
}
