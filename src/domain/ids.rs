//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that flow through the submission
//! pipeline. Keeping them distinct stops a FHIR id from being handed to the
//! ledger as an idempotency key, and vice versa.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator used when an idempotency key is built from several parts
pub const KEY_PART_SEPARATOR: char = '|';

/// Surrogate key of a row in the job ledger
///
/// # Examples
///
/// ```
/// use mera::domain::ids::JobId;
///
/// let id = JobId::new(42);
/// assert_eq!(id.value(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(i64);

impl JobId {
    /// Wraps a raw ledger id
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw id
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: i64 = s
            .trim()
            .parse()
            .map_err(|e| format!("Invalid job id '{s}': {e}"))?;
        if id <= 0 {
            return Err(format!("Job id must be positive, got {id}"));
        }
        Ok(Self(id))
    }
}

/// Caller-chosen key identifying one logical clinical event within a
/// resource type
///
/// The key must be stable across retries of the same record; the ledger's
/// unique index on `(resource_type, idempotency_key)` is what turns a
/// second submission into a skip.
///
/// # Examples
///
/// ```
/// use mera::domain::ids::IdempotencyKey;
///
/// let key = IdempotencyKey::from_parts(&["2024/01/05/000123", "A09", "1"]).unwrap();
/// assert_eq!(key.as_str(), "2024/01/05/000123|A09|1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Maximum length accepted by the ledger column
    pub const MAX_LEN: usize = 200;

    /// Creates a new key
    ///
    /// # Returns
    ///
    /// Returns `Err` if the key is blank or longer than [`Self::MAX_LEN`]
    pub fn new(key: impl Into<String>) -> Result<Self, String> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err("Idempotency key cannot be empty".to_string());
        }
        if key.chars().count() > Self::MAX_LEN {
            return Err(format!(
                "Idempotency key exceeds {} characters",
                Self::MAX_LEN
            ));
        }
        Ok(Self(key))
    }

    /// Builds a composite key by joining `parts` with `|`
    ///
    /// Empty parts are kept so that positional meaning is preserved.
    pub fn from_parts<S: AsRef<str>>(parts: &[S]) -> Result<Self, String> {
        let joined = parts
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(&KEY_PART_SEPARATOR.to_string());
        Self::new(joined)
    }

    /// Returns the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IdempotencyKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier assigned by the remote FHIR server on successful creation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FhirId(String);

impl FhirId {
    /// Creates a new FhirId
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("FHIR id cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for FhirId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FhirId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for FhirId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
