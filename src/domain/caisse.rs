use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// The Caisse Spéciale product a demand or contract belongs to.
///
/// Each standard product has a charitable variant, whose contributions may be
/// made in kind and may be subscribed by a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaisseType {
    /// Fixed monthly contributions.
    Standard,
    /// Daily collection.
    Journaliere,
    /// Free amounts.
    Libre,
    /// Charitable variant of [`CaisseType::Standard`].
    StandardCharitable,
    /// Charitable variant of [`CaisseType::Journaliere`].
    JournaliereCharitable,
    /// Charitable variant of [`CaisseType::Libre`].
    LibreCharitable,
}

impl CaisseType {
    /// All product types, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Standard,
        Self::Journaliere,
        Self::Libre,
        Self::StandardCharitable,
        Self::JournaliereCharitable,
        Self::LibreCharitable,
    ];

    /// The stored representation, e.g. `STANDARD_CHARITABLE`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Journaliere => "JOURNALIERE",
            Self::Libre => "LIBRE",
            Self::StandardCharitable => "STANDARD_CHARITABLE",
            Self::JournaliereCharitable => "JOURNALIERE_CHARITABLE",
            Self::LibreCharitable => "LIBRE_CHARITABLE",
        }
    }

    /// Whether this is one of the charitable variants.
    #[must_use]
    pub const fn is_charitable(self) -> bool {
        matches!(
            self,
            Self::StandardCharitable | Self::JournaliereCharitable | Self::LibreCharitable
        )
    }
}

impl fmt::Display for CaisseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaisseType {
    type Err = ParseCaisseTypeError;

    /// Parses a caisse type, ignoring case and accepting `-` for `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseCaisseTypeError(s.to_string()))
    }
}

/// Error returned when a string does not name a caisse type.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown caisse type '{0}'")]
pub struct ParseCaisseTypeError(String);
