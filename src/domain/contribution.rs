use std::{fmt, num::NonZeroU64};

use serde::{Deserialize, Serialize};

/// What a subscriber commits to contribute.
///
/// Standard products only take money; the charitable variants also accept
/// contributions in kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContributionKind {
    /// A cash amount, in FCFA.
    Money(MoneyContribution),
    /// Goods or services.
    InKind(InKindContribution),
}

/// A cash contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyContribution {
    /// Amount per period, in FCFA.
    pub amount: NonZeroU64,
}

/// A contribution of goods or services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InKindContribution {
    /// What is given.
    pub description: String,
    /// Estimated value in FCFA, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_value: Option<u64>,
}

impl ContributionKind {
    /// A money contribution of `amount` FCFA.
    #[must_use]
    pub const fn money(amount: NonZeroU64) -> Self {
        Self::Money(MoneyContribution { amount })
    }

    /// An in-kind contribution.
    #[must_use]
    pub fn in_kind(description: impl Into<String>, estimated_value: Option<u64>) -> Self {
        Self::InKind(InKindContribution {
            description: description.into(),
            estimated_value,
        })
    }

    /// The value of the contribution in FCFA.
    ///
    /// In-kind contributions without an estimate count as zero.
    #[must_use]
    pub fn value(&self) -> u64 {
        match self {
            Self::Money(money) => money.amount.get(),
            Self::InKind(goods) => goods.estimated_value.unwrap_or(0),
        }
    }

    /// Short label used for filtering and display.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Money(_) => "MONEY",
            Self::InKind(_) => "IN_KIND",
        }
    }
}

impl fmt::Display for ContributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Money(money) => write!(f, "{} FCFA", money.amount),
            Self::InKind(goods) => match goods.estimated_value {
                Some(value) => write!(f, "En nature: {} (~{value} FCFA)", goods.description),
                None => write!(f, "En nature: {}", goods.description),
            },
        }
    }
}
