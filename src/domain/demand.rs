use std::{fmt, num::NonZeroU32, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CaisseType, ContributionKind, DocumentId};

/// Where a demand stands in its lifecycle.
///
/// `Rejected` and `Converted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DemandStatus {
    /// Awaiting an admin decision.
    Pending,
    /// Accepted by an admin, ready for conversion.
    Approved,
    /// Refused by an admin.
    Rejected,
    /// Turned into a contract.
    Converted,
}

impl DemandStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Approved, Self::Rejected, Self::Converted];

    /// The stored representation, e.g. `APPROVED`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Converted => "CONVERTED",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Converted)
    }
}

impl fmt::Display for DemandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DemandStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown demand status '{s}'"))
    }
}

/// Who a demand, contract or charity record is for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Subscriber {
    /// An individual member.
    Member(DocumentId),
    /// A group of members.
    Group(DocumentId),
}

impl Subscriber {
    /// The referenced member or group id.
    #[must_use]
    pub const fn id(&self) -> &DocumentId {
        match self {
            Self::Member(id) | Self::Group(id) => id,
        }
    }

    /// `MEMBER` or `GROUP`.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Member(_) => "MEMBER",
            Self::Group(_) => "GROUP",
        }
    }
}

/// The terms requested by a demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandTerms {
    /// The product requested.
    pub caisse_type: CaisseType,
    /// Who the contract is for.
    pub subscriber: Subscriber,
    /// What is contributed each month.
    pub contribution: ContributionKind,
    /// Planned duration in months.
    pub months_planned: NonZeroU32,
    /// Requested start date.
    pub desired_date: NaiveDate,
}

impl DemandTerms {
    /// Checks the terms are consistent with the product type.
    ///
    /// # Errors
    ///
    /// Group subscriptions and in-kind contributions are only accepted for
    /// charitable products, and in-kind contributions need a description.
    pub fn validate(&self) -> Result<(), TermsError> {
        if let Subscriber::Group(_) = self.subscriber {
            if !self.caisse_type.is_charitable() {
                return Err(TermsError::GroupNotAllowed(self.caisse_type));
            }
        }

        match &self.contribution {
            ContributionKind::Money(_) => Ok(()),
            ContributionKind::InKind(_) if !self.caisse_type.is_charitable() => {
                Err(TermsError::InKindNotAllowed(self.caisse_type))
            }
            ContributionKind::InKind(goods) if goods.description.trim().is_empty() => {
                Err(TermsError::MissingDescription)
            }
            ContributionKind::InKind(_) => Ok(()),
        }
    }
}

/// Errors in the terms of a demand.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TermsError {
    /// A group subscribed to a non-charitable product.
    #[error("les groupes ne peuvent souscrire qu'à une caisse caritative (type {0})")]
    GroupNotAllowed(CaisseType),
    /// An in-kind contribution for a non-charitable product.
    #[error("les contributions en nature sont réservées aux caisses caritatives (type {0})")]
    InKindNotAllowed(CaisseType),
    /// An in-kind contribution with a blank description.
    #[error("une contribution en nature doit être décrite")]
    MissingDescription,
    /// A monthly amount below the product minimum.
    #[error("montant mensuel {amount} FCFA inférieur au minimum de {minimum} FCFA")]
    BelowMinimum {
        /// Requested amount.
        amount: u64,
        /// Minimum set by the active settings.
        minimum: u64,
    },
}

/// A request to open a Caisse Spéciale contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demand {
    /// Document id.
    pub id: DocumentId,
    /// Lifecycle status.
    pub status: DemandStatus,
    /// Requested terms.
    pub terms: DemandTerms,
    /// Admin or agent who recorded the demand.
    pub created_by: DocumentId,
    /// When the demand was recorded.
    pub created_at: DateTime<Utc>,

    /// Admin who approved or rejected the demand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<DocumentId>,
    /// When the demand was approved or rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    /// Why the demand was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,

    /// Contract created by the conversion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<DocumentId>,
    /// Admin who performed the conversion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_by: Option<DocumentId>,
    /// When the conversion happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_at: Option<DateTime<Utc>>,
}

impl Demand {
    /// Records a new pending demand.
    ///
    /// # Errors
    ///
    /// Returns an error if the terms are inconsistent with the product type.
    pub fn new(
        id: DocumentId,
        terms: DemandTerms,
        created_by: DocumentId,
    ) -> Result<Self, TermsError> {
        terms.validate()?;
        Ok(Self {
            id,
            status: DemandStatus::Pending,
            terms,
            created_by,
            created_at: Utc::now(),
            decided_by: None,
            decided_at: None,
            rejection_reason: None,
            contract_id: None,
            converted_by: None,
            converted_at: None,
        })
    }

    /// Applies a partial update. Fields left as `None` are kept.
    pub fn apply(&mut self, update: DemandUpdate) {
        let DemandUpdate {
            status,
            decided_by,
            decided_at,
            rejection_reason,
            contract_id,
            converted_by,
            converted_at,
        } = update;

        if let Some(status) = status {
            self.status = status;
        }
        if decided_by.is_some() {
            self.decided_by = decided_by;
        }
        if decided_at.is_some() {
            self.decided_at = decided_at;
        }
        if rejection_reason.is_some() {
            self.rejection_reason = rejection_reason;
        }
        if contract_id.is_some() {
            self.contract_id = contract_id;
        }
        if converted_by.is_some() {
            self.converted_by = converted_by;
        }
        if converted_at.is_some() {
            self.converted_at = converted_at;
        }
    }
}

/// A partial update of a [`Demand`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemandUpdate {
    /// New status.
    pub status: Option<DemandStatus>,
    /// Deciding admin.
    pub decided_by: Option<DocumentId>,
    /// Decision time.
    pub decided_at: Option<DateTime<Utc>>,
    /// Rejection reason.
    pub rejection_reason: Option<String>,
    /// Created contract.
    pub contract_id: Option<DocumentId>,
    /// Converting admin.
    pub converted_by: Option<DocumentId>,
    /// Conversion time.
    pub converted_at: Option<DateTime<Utc>>,
}
