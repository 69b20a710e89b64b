use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::TrellisError;

/// Opaque node identity.
///
/// Identities are GUID-like strings. [`NodeId::new`] normalizes the common
/// spellings (`{AB12...}`, upper case, surrounding whitespace) so that two
/// spellings of the same GUID compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Build a normalized id.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(normalize(raw.as_ref()))
    }

    /// Wrap `raw` as-is, skipping normalization.
    pub fn new_unchecked(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The null identity.
    #[must_use]
    pub const fn null() -> Self {
        Self(String::new())
    }

    /// `true` for the empty id and for the all-zero GUID.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0
            .chars()
            .filter(|c| !matches!(c, '{' | '}' | '-') && !c.is_whitespace())
            .all(|c| c == '0')
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

fn normalize(input: &str) -> String {
    input
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .to_ascii_lowercase()
}

/// Content language (culture name such as `en` or `da-DK`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    /// Validate and wrap a culture name.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::InvalidIdentifier`] for empty names or names
    /// containing whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self, TrellisError> {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(TrellisError::InvalidIdentifier {
                kind: "language",
                value: name,
            });
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Language {
    fn default() -> Self {
        Self("en".to_string())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Language {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Language {
    type Error = TrellisError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Language> for String {
    fn from(value: Language) -> Self {
        value.0
    }
}

/// Per-language version number. Versions start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub u32);

impl Version {
    pub const FIRST: Self = Self(1);

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
