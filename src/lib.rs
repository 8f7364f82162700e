//! Administration core for the KARA cooperative
//!
//! Members, groups, Caisse Spéciale demands and contracts, product settings
//! and charity records are stored as YAML documents in a directory.

pub mod domain;
pub use domain::{
    CaisseType, Config, Contract, ContributionKind, Demand, DemandStatus, DocumentId, Group,
    Member, Settings, Subscriber,
};

/// Document storage, store traits and the subscription engine seam.
pub mod storage;
pub use storage::{Collection, Directory};

/// Admin workflows over demands: review and conversion into contracts.
pub mod workflow;
pub use workflow::{DemandConversion, DemandReview, WorkflowError};

/// Filtering, sorting and pagination of record collections.
pub mod listing;
pub use listing::{ListQuery, NameLookup, Page};
