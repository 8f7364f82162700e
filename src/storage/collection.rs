//! A typed set of documents, optionally mirrored to a directory of YAML
//! files.
//!
//! Each document is stored as `<collection dir>/<id>.yaml`. Collections are
//! loaded wholesale; reads are served from memory and every write goes to
//! disk before the in-memory copy changes, so a failed write leaves the
//! collection untouched.

use std::{
    collections::BTreeMap,
    ffi::OsStr,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Serialize, de::DeserializeOwned};
use walkdir::WalkDir;

use crate::{
    domain::{
        CaisseType, Contract, Contribution, Demand, DemandUpdate, DocumentId, Group, Member,
        Participant, Settings, SubscriptionRequest, resolve_active,
    },
    storage::{DemandStore, SettingsStore, StoreError, SubscriptionEngine, SubscriptionError},
};

/// A document type stored in its own collection.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Name of the collection, also the directory name on disk.
    const COLLECTION: &'static str;

    /// The document id.
    fn id(&self) -> &DocumentId;
}

macro_rules! document {
    ($ty:ty, $name:literal) => {
        impl Document for $ty {
            const COLLECTION: &'static str = $name;

            fn id(&self) -> &DocumentId {
                &self.id
            }
        }
    };
}

document!(Member, "members");
document!(Group, "groups");
document!(Demand, "demands");
document!(Settings, "settings");
document!(Contract, "contracts");
document!(Participant, "participants");
document!(Contribution, "contributions");

const EXTENSION: &str = "yaml";

/// The documents of one type, ordered by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    /// Directory mirrored by this collection. `None` for in-memory
    /// collections.
    dir: Option<PathBuf>,
    documents: BTreeMap<DocumentId, T>,
}

impl<T: Document> Default for Collection<T> {
    fn default() -> Self {
        Self {
            dir: None,
            documents: BTreeMap::new(),
        }
    }
}

impl<T: Document> Collection<T> {
    /// An in-memory collection holding `documents`.
    ///
    /// Later documents replace earlier ones with the same id.
    #[must_use]
    pub fn in_memory(documents: impl IntoIterator<Item = T>) -> Self {
        Self {
            dir: None,
            documents: documents
                .into_iter()
                .map(|document| (document.id().clone(), document))
                .collect(),
        }
    }

    /// Loads the collection stored under `root`.
    ///
    /// A missing collection directory is an empty collection. Files are
    /// parsed in parallel. Files that are not `.yaml`, cannot be parsed, or
    /// whose name does not match the id they contain are returned in the
    /// error list rather than loaded.
    pub(crate) fn load(root: &Path) -> (Self, Vec<PathBuf>) {
        let dir = root.join(T::COLLECTION);
        let paths = collect_document_paths(&dir);

        let (documents, unrecognised): (Vec<_>, Vec<_>) = paths
            .par_iter()
            .map(|path| try_load_document::<T>(path))
            .partition(Result::is_ok);

        let documents = documents
            .into_iter()
            .filter_map(Result::ok)
            .map(|document| (document.id().clone(), document))
            .collect();
        let unrecognised = unrecognised.into_iter().filter_map(Result::err).collect();

        tracing::debug!("Loaded {} from {}", T::COLLECTION, dir.display());

        (
            Self {
                dir: Some(dir),
                documents,
            },
            unrecognised,
        )
    }

    /// Fetches a document by id.
    #[must_use]
    pub fn get(&self, id: &DocumentId) -> Option<&T> {
        self.documents.get(id)
    }

    /// Iterates over the documents in id order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.documents.values()
    }

    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the collection holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The file a document with this id is stored in, if the collection is
    /// backed by a directory.
    #[must_use]
    pub fn path_for(&self, id: &DocumentId) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{id}.{EXTENSION}")))
    }

    /// Inserts or replaces a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written. The collection is
    /// unchanged in that case.
    pub fn save(&mut self, document: T) -> Result<(), StoreError> {
        if let Some(path) = self.path_for(document.id()) {
            write_document(&path, &document)?;
        }
        self.documents.insert(document.id().clone(), document);
        Ok(())
    }

    /// Removes a document.
    ///
    /// Returns the removed document, or `None` if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the document file cannot be deleted.
    pub fn remove(&mut self, id: &DocumentId) -> Result<Option<T>, StoreError> {
        if !self.documents.contains_key(id) {
            return Ok(None);
        }
        if let Some(path) = self.path_for(id) {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(StoreError::Write { path, source }),
            }
        }
        Ok(self.documents.remove(id))
    }
}

impl<'a, T: Document> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::collections::btree_map::Values<'a, DocumentId, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.values()
    }
}

impl DemandStore for Collection<Demand> {
    fn demand(&self, id: &DocumentId) -> Result<Option<Demand>, StoreError> {
        Ok(self.get(id).cloned())
    }

    fn update_demand(
        &mut self,
        id: &DocumentId,
        update: DemandUpdate,
    ) -> Result<Demand, StoreError> {
        let mut demand = self.get(id).cloned().ok_or_else(|| StoreError::NotFound {
            collection: Demand::COLLECTION,
            id: id.clone(),
        })?;
        demand.apply(update);
        self.save(demand.clone())?;
        Ok(demand)
    }
}

impl SettingsStore for Collection<Settings> {
    fn active_settings(&self, caisse_type: CaisseType) -> Result<Option<Settings>, StoreError> {
        Ok(resolve_active(self.iter(), caisse_type).cloned())
    }
}

/// Contracts are opened by storing them in the contracts collection.
///
/// A demand can only ever produce one contract. A second request for the
/// same demand returns the contract already opened for it, so a conversion
/// whose demand update failed can be retried.
impl SubscriptionEngine for Collection<Contract> {
    fn subscribe(&mut self, request: &SubscriptionRequest) -> Result<DocumentId, SubscriptionError> {
        if let Some(existing) = self
            .iter()
            .find(|contract| contract.demand_id.as_ref() == Some(&request.demand_id))
        {
            tracing::info!(
                "Demand {} already has contract {}, reusing it",
                request.demand_id,
                existing.id
            );
            return Ok(existing.id.clone());
        }

        let contract = Contract::open(DocumentId::generate(), request.clone());
        let id = contract.id.clone();
        self.save(contract)?;
        tracing::info!("Opened contract {id} for demand {}", request.demand_id);
        Ok(id)
    }
}

fn collect_document_paths(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            // Skip hidden files (editor swap files and the like)
            !entry.file_name().to_string_lossy().starts_with('.')
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn try_load_document<T: Document>(path: &Path) -> Result<T, PathBuf> {
    if path.extension() != Some(OsStr::new(EXTENSION)) {
        tracing::debug!("Skipping non-document file {}", path.display());
        return Err(path.to_path_buf());
    }

    let document: T = match read_document(path) {
        Ok(document) => document,
        Err(e) => {
            tracing::debug!("Failed to load document from {}: {e}", path.display());
            return Err(path.to_path_buf());
        }
    };

    let stem = path.file_stem().and_then(OsStr::to_str);
    if stem != Some(document.id().as_str()) {
        tracing::debug!(
            "Document {} is stored under a different name at {}",
            document.id(),
            path.display()
        );
        return Err(path.to_path_buf());
    }

    Ok(document)
}

fn read_document<T: Document>(path: &Path) -> Result<T, ReadError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_yaml::from_reader(reader)?)
}

#[derive(Debug, thiserror::Error)]
enum ReadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

fn write_document<T: Document>(path: &Path, document: &T) -> Result<(), StoreError> {
    let yaml = serde_yaml::to_string(document).map_err(|source| StoreError::Serialize {
        id: document.id().clone(),
        source,
    })?;

    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(yaml.as_bytes())?;
        writer.flush()
    };

    write().map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::domain::{
        DemandStatus,
        demand::tests::{id, standard_terms},
    };

    fn demand(name: &str) -> Demand {
        Demand::new(id(name), standard_terms("MEM_1"), id("AGENT_1")).unwrap()
    }

    fn on_disk(tmp: &TempDir) -> Collection<Demand> {
        let (collection, unrecognised) = Collection::<Demand>::load(tmp.path());
        assert!(unrecognised.is_empty());
        collection
    }

    #[test]
    fn missing_directory_is_empty_collection() {
        let tmp = TempDir::new().unwrap();
        assert!(on_disk(&tmp).is_empty());
    }

    #[test]
    fn saved_documents_are_reloaded() {
        let tmp = TempDir::new().unwrap();
        let mut demands = on_disk(&tmp);
        demands.save(demand("DEM_1")).unwrap();
        demands.save(demand("DEM_2")).unwrap();

        let reloaded = on_disk(&tmp);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get(&id("DEM_1")), demands.get(&id("DEM_1")));
        assert!(tmp.path().join("demands").join("DEM_2.yaml").is_file());
    }

    #[test]
    fn mismatched_file_name_is_unrecognised() {
        let tmp = TempDir::new().unwrap();
        let mut demands = on_disk(&tmp);
        demands.save(demand("DEM_1")).unwrap();
        let dir = tmp.path().join("demands");
        std::fs::rename(dir.join("DEM_1.yaml"), dir.join("DEM_9.yaml")).unwrap();

        let (collection, unrecognised) = Collection::<Demand>::load(tmp.path());
        assert!(collection.is_empty());
        assert_eq!(unrecognised, vec![dir.join("DEM_9.yaml")]);
    }

    #[test]
    fn garbage_and_foreign_files_are_unrecognised() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("demands");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("DEM_1.yaml"), "not: [a, demand").unwrap();
        std::fs::write(dir.join("notes.txt"), "hello").unwrap();
        std::fs::write(dir.join(".DEM_1.yaml.swp"), "").unwrap();

        let (collection, mut unrecognised) = Collection::<Demand>::load(tmp.path());
        unrecognised.sort();
        assert!(collection.is_empty());
        assert_eq!(
            unrecognised,
            vec![dir.join("DEM_1.yaml"), dir.join("notes.txt")]
        );
    }

    #[test]
    fn update_demand_persists_changes() {
        let tmp = TempDir::new().unwrap();
        let mut demands = on_disk(&tmp);
        demands.save(demand("DEM_1")).unwrap();

        let updated = demands
            .update_demand(
                &id("DEM_1"),
                DemandUpdate {
                    status: Some(DemandStatus::Approved),
                    decided_by: Some(id("ADMIN_1")),
                    decided_at: Some(Utc::now()),
                    ..DemandUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.status, DemandStatus::Approved);
        let reloaded = on_disk(&tmp);
        assert_eq!(reloaded.get(&id("DEM_1")), Some(&updated));
    }

    #[test]
    fn update_of_missing_demand_is_not_found() {
        let mut demands = Collection::<Demand>::default();
        let error = demands
            .update_demand(&id("DEM_404"), DemandUpdate::default())
            .unwrap_err();
        assert!(matches!(error, StoreError::NotFound { .. }));
    }

    #[test]
    fn remove_deletes_file() {
        let tmp = TempDir::new().unwrap();
        let mut demands = on_disk(&tmp);
        demands.save(demand("DEM_1")).unwrap();

        let removed = demands.remove(&id("DEM_1")).unwrap();
        assert!(removed.is_some());
        assert!(demands.remove(&id("DEM_1")).unwrap().is_none());
        assert!(on_disk(&tmp).is_empty());
    }

    #[test]
    fn engine_reuses_contract_for_same_demand() {
        let demand = demand("DEM_1");
        let settings = Settings::draft(id("SETTINGS_1"), CaisseType::Standard);
        let request = SubscriptionRequest::for_demand(&demand, &settings).unwrap();
        let mut contracts = Collection::<Contract>::default();

        let first = contracts.subscribe(&request).unwrap();
        let second = contracts.subscribe(&request).unwrap();

        assert_eq!(contracts.len(), 1);
        assert_eq!(first, second);
        assert_eq!(contracts.get(&first).unwrap().settings_version, id("SETTINGS_1"));
    }
}
