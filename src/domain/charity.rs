use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ContributionKind, DocumentId, Subscriber};

/// A member or group taking part in a charity event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Document id.
    pub id: DocumentId,
    /// The charity event.
    pub event_id: DocumentId,
    /// Who takes part.
    pub subscriber: Subscriber,
    /// When they joined the event.
    pub joined_at: DateTime<Utc>,
}

/// Whether a charity contribution has been received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContributionStatus {
    /// Promised, not yet received.
    Pending,
    /// Received by a collection agent.
    Confirmed,
}

impl ContributionStatus {
    /// The stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
        }
    }
}

/// A contribution to a charity event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    /// Document id.
    pub id: DocumentId,
    /// The charity event.
    pub event_id: DocumentId,
    /// Who contributed.
    pub subscriber: Subscriber,
    /// Money or goods given.
    pub kind: ContributionKind,
    /// Contribution date.
    pub date: NaiveDate,
    /// Reception status.
    pub status: ContributionStatus,
}
