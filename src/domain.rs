//! Domain models for the cooperative administration.
//!
//! This module contains the core document types (members, demands, settings,
//! contracts, charity records), their identifiers and the tool
//! configuration.

/// Opaque document identifiers.
pub mod id;
pub use id::{DocumentId, InvalidIdError};

/// Caisse Spéciale product types.
pub mod caisse;
pub use caisse::{CaisseType, ParseCaisseTypeError};

/// Money and in-kind contribution terms.
pub mod contribution;
pub use contribution::{ContributionKind, InKindContribution, MoneyContribution};

/// Savings-contract demands and their lifecycle.
pub mod demand;
pub use demand::{Demand, DemandStatus, DemandTerms, DemandUpdate, Subscriber, TermsError};

/// Versioned product settings.
pub mod settings;
pub use settings::{Settings, resolve_active};

/// Contracts produced by the subscription engine.
pub mod contract;
pub use contract::{Contract, ContractStatus, SubscriptionRequest};

/// Members and groups.
pub mod member;
pub use member::{Group, Member};

/// Charity event participants and contributions.
pub mod charity;
pub use charity::{Contribution, ContributionStatus, Participant};

mod config;
pub use config::{Config, ConfigError};
