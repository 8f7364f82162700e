use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DocumentId;

/// A member ("adhérent") of the cooperative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Document id.
    pub id: DocumentId,
    /// Registration number, e.g. `0042.MK.190126`.
    pub matricule: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Phone numbers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contacts: Vec<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Group the member belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<DocumentId>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl Member {
    /// Display name, `"{first} {last}"`.
    #[must_use]
    pub fn full_name(&self) -> String {
        match (self.first_name.trim(), self.last_name.trim()) {
            ("", last) => last.to_string(),
            (first, "") => first.to_string(),
            (first, last) => format!("{first} {last}"),
        }
    }
}

/// A group of members subscribing together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Document id.
    pub id: DocumentId,
    /// Group name.
    pub name: String,
    /// Short label shown next to the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}
