//! Document storage.
//!
//! Documents are grouped in [`Collection`]s, one per document type. A
//! collection either lives purely in memory or mirrors a directory of YAML
//! files. The [`Directory`] ties the collections of a data directory
//! together.
//!
//! The workflows only see the narrow traits defined here, so they can run
//! against any store.

use std::path::PathBuf;

use crate::domain::{
    CaisseType, Demand, DemandUpdate, DocumentId, Settings, SubscriptionRequest,
};

/// Typed document collections.
pub mod collection;
pub use collection::{Collection, Document};

/// A filesystem backed set of collections.
pub mod directory;
pub use directory::{Directory, DirectoryLoadError, Loaded, Stored, Unloaded};

/// Read and partially update demands.
pub trait DemandStore {
    /// Fetches a demand by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read. A missing demand is
    /// `Ok(None)`.
    fn demand(&self, id: &DocumentId) -> Result<Option<Demand>, StoreError>;

    /// Applies a partial update to a demand and returns the updated record.
    ///
    /// # Errors
    ///
    /// Returns an error if the demand does not exist or cannot be written.
    /// On error the stored demand is unchanged.
    fn update_demand(&mut self, id: &DocumentId, update: DemandUpdate)
    -> Result<Demand, StoreError>;
}

/// Look up product settings.
pub trait SettingsStore {
    /// The active settings for a caisse type, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn active_settings(&self, caisse_type: CaisseType) -> Result<Option<Settings>, StoreError>;
}

/// Turns validated terms into a persisted contract.
pub trait SubscriptionEngine {
    /// Creates a contract and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is refused or the contract cannot be
    /// persisted.
    fn subscribe(&mut self, request: &SubscriptionRequest) -> Result<DocumentId, SubscriptionError>;
}

/// Errors reading or writing stored documents.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The document does not exist.
    #[error("{collection} document {id} not found")]
    NotFound {
        /// Collection searched.
        collection: &'static str,
        /// Missing id.
        id: DocumentId,
    },
    /// The document file could not be written.
    #[error("failed to write {}", path.display())]
    Write {
        /// File being written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The document could not be serialized.
    #[error("failed to serialize document {id}")]
    Serialize {
        /// Document id.
        id: DocumentId,
        /// Underlying error.
        #[source]
        source: serde_yaml::Error,
    },
}

/// Errors raised by a subscription engine.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    /// The engine refused the request.
    #[error("souscription refusée: {0}")]
    Rejected(String),
    /// The contract could not be persisted.
    #[error("failed to persist contract")]
    Store(#[from] StoreError),
}
