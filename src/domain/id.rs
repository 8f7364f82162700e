use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    str::FromStr,
};

use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a stored document.
///
/// Ids are opaque, non-empty strings. Because each document is stored in a
/// file named after its id, ids may not contain path separators or start
/// with a dot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(NonEmptyString);

impl DocumentId {
    /// Creates a new `DocumentId` from a string.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdError`] if the string is empty, blank, starts with a
    /// `.` or contains a path separator.
    pub fn new(s: String) -> Result<Self, InvalidIdError> {
        if s.trim().is_empty() || s.starts_with('.') || s.contains(['/', '\\']) {
            return Err(InvalidIdError(s));
        }
        let non_empty = NonEmptyString::new(s.clone()).map_err(|_| InvalidIdError(s))?;
        Ok(Self(non_empty))
    }

    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self(NonEmptyString::new(id).expect("uuid strings are never empty"))
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The last `n` characters of the id, or the whole id if it is shorter.
    ///
    /// Used to build human-readable placeholders for unresolved references.
    #[must_use]
    pub fn tail(&self, n: usize) -> &str {
        let s = self.as_str();
        let count = s.chars().count();
        if count <= n {
            return s;
        }
        let start = s
            .char_indices()
            .nth(count - n)
            .map_or(0, |(offset, _)| offset);
        &s[start..]
    }
}

impl Hash for DocumentId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl TryFrom<String> for DocumentId {
    type Error = InvalidIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for DocumentId {
    type Error = InvalidIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.as_str().to_string()
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Deref for DocumentId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentId {
    type Err = InvalidIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Error returned when a string is not a usable document id.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid document id '{0}': must be non-empty, without path separators or a leading '.'")]
pub struct InvalidIdError(String);
