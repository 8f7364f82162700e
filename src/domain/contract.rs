use std::num::NonZeroU32;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    CaisseType, ContributionKind, Demand, DocumentId, Settings, Subscriber,
    demand::TermsError,
};

/// The payload handed to the subscription engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    /// Product subscribed to.
    pub caisse_type: CaisseType,
    /// Who the contract is for.
    pub subscriber: Subscriber,
    /// Monthly contribution.
    pub contribution: ContributionKind,
    /// Planned duration in months.
    pub months_planned: NonZeroU32,
    /// Requested start date.
    pub desired_date: NaiveDate,
    /// Id of the settings record the contract is created under.
    pub settings_version: DocumentId,
    /// The demand being converted.
    pub demand_id: DocumentId,
}

impl SubscriptionRequest {
    /// Builds the request for converting `demand` under `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the demand's terms are not acceptable for its
    /// product type, or if a money contribution is below the minimum set by
    /// the settings.
    pub fn for_demand(demand: &Demand, settings: &Settings) -> Result<Self, TermsError> {
        demand.terms.validate()?;
        let terms = &demand.terms;

        let contribution = match &terms.contribution {
            ContributionKind::Money(money) => {
                let amount = money.amount.get();
                match settings.minimum_monthly_amount {
                    Some(minimum) if amount < minimum => {
                        return Err(TermsError::BelowMinimum { amount, minimum });
                    }
                    _ => ContributionKind::Money(*money),
                }
            }
            ContributionKind::InKind(goods) => ContributionKind::in_kind(
                goods.description.trim(),
                goods.estimated_value,
            ),
        };

        Ok(Self {
            caisse_type: terms.caisse_type,
            subscriber: terms.subscriber.clone(),
            contribution,
            months_planned: terms.months_planned,
            desired_date: terms.desired_date,
            settings_version: settings.id.clone(),
            demand_id: demand.id.clone(),
        })
    }
}

/// Status of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    /// Contributions are being collected.
    Active,
    /// All planned months have been paid.
    Completed,
    /// Closed before term.
    Closed,
}

impl ContractStatus {
    /// The stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Closed => "CLOSED",
        }
    }
}

/// A Caisse Spéciale contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    /// Document id.
    pub id: DocumentId,
    /// Contract status.
    pub status: ContractStatus,
    /// Product subscribed to.
    pub caisse_type: CaisseType,
    /// Who the contract is for.
    pub subscriber: Subscriber,
    /// Monthly contribution.
    pub contribution: ContributionKind,
    /// Planned duration in months.
    pub months_planned: NonZeroU32,
    /// First contribution date.
    pub first_payment_date: NaiveDate,
    /// Settings version the contract was created under.
    pub settings_version: DocumentId,
    /// The demand this contract was converted from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demand_id: Option<DocumentId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Contract {
    /// Opens an active contract from a subscription request.
    #[must_use]
    pub fn open(id: DocumentId, request: SubscriptionRequest) -> Self {
        Self {
            id,
            status: ContractStatus::Active,
            caisse_type: request.caisse_type,
            subscriber: request.subscriber,
            contribution: request.contribution,
            months_planned: request.months_planned,
            first_payment_date: request.desired_date,
            settings_version: request.settings_version,
            demand_id: Some(request.demand_id),
            created_at: Utc::now(),
        }
    }

    /// Total value expected over the planned duration, in FCFA.
    #[must_use]
    pub fn planned_total(&self) -> u64 {
        self.contribution
            .value()
            .saturating_mul(u64::from(self.months_planned.get()))
    }
}
