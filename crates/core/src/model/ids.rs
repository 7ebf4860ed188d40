use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a Question, as carried in the catalog data.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    /// Creates a new `QuestionId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the stratum this question id belongs to.
    #[must_use]
    pub fn stratum(&self) -> StratumKey {
        StratumKey::of_id(&self.0)
    }
}

/// Subject/dataset group a question belongs to.
///
/// Derived from the structural prefix of a question id: everything before
/// the last `-` or `_` separator. An id without a separator is its own
/// stratum, so every question maps to exactly one key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StratumKey(String);

impl StratumKey {
    /// Creates a `StratumKey` from an already-derived value
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives the stratum key for a question id.
    #[must_use]
    pub fn of_id(id: &str) -> Self {
        match id.rfind(['-', '_']) {
            Some(pos) => Self(id[..pos].to_string()),
            None => Self(id.to_string()),
        }
    }

    /// Returns the underlying string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Debug for StratumKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StratumKey({})", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StratumKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for QuestionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
