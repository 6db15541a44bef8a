//! Identifier types for weft.
//!
//! [`CorrelationId`] and [`BuildId`] are UUID-based. Correlation ids
//! travel inside wire envelopes, so they serialize as plain hex strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::{uuid, Uuid};

/// Namespace UUID for [`BuildId`] fingerprints (UUID v5).
const WEFT_NAMESPACE: Uuid = uuid!("5b0c3e8e-6f2a-4d37-9a41-0f7d2c8e91b4");

/// Error returned when parsing an identifier from text fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError(String);

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid identifier: {}", self.0)
    }
}

impl std::error::Error for ParseIdError {}

/// Identifier pairing one RPC request with its response.
///
/// A fresh random 128-bit value is generated per call. The text form is
/// 32 lowercase hex characters, which is also the wire form.
///
/// Collisions are not detected; the id space makes them negligible.
///
/// # Example
///
/// ```
/// use weft_types::CorrelationId;
///
/// let id = CorrelationId::new();
/// let again: CorrelationId = id.to_string().parse().unwrap();
/// assert_eq!(id, again);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CorrelationId(Uuid);

// Ids are minted per call; no Default.
#[allow(clippy::new_without_default)]
impl CorrelationId {
    /// Creates a new random [`CorrelationId`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for CorrelationId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ParseIdError(s.to_string()))
    }
}

impl TryFrom<String> for CorrelationId {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CorrelationId> for String {
    fn from(id: CorrelationId) -> Self {
        id.to_string()
    }
}

/// Identity of one worker inside a pool generation.
///
/// Worker ids restart at zero every time a pool is recreated, so an id
/// is only meaningful together with the pool that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerId(usize);

impl WorkerId {
    /// Creates a worker id from its index in the pool.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the index in the pool.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker:{}", self.0)
    }
}

/// Fingerprint of one build session.
///
/// Derived from the entry paths, the wall-clock time and a random
/// component, so two sessions with identical inputs still get different
/// ids. This is a cache-generation marker, not a content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildId(Uuid);

impl BuildId {
    /// Generates a fresh fingerprint for the given entry paths.
    #[must_use]
    pub fn generate(entries: &[String]) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let seed = format!("{}-{}-{}", entries.join(","), millis, Uuid::new_v4());
        Self(Uuid::new_v5(&WEFT_NAMESPACE, seed.as_bytes()))
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "build:{}", self.0.simple())
    }
}
