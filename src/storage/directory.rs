//! A filesystem backed store of KARA documents
//!
//! The [`Directory`] manages the collections stored under a data directory,
//! together with the `kara.toml` configuration. Each collection is a
//! [`Collection`] mirrored to its own subdirectory.

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use chrono::{TimeDelta, Utc};

use crate::{
    domain::{
        CaisseType, Config, Contract, Contribution, Demand, DocumentId, Group, Member,
        Participant, Settings, resolve_active,
    },
    listing::NameLookup,
    storage::{Collection, Document, StoreError},
    workflow::{DemandConversion, DemandReview},
};

/// Name of the configuration file at the root of a data directory.
pub const CONFIG_FILE: &str = "kara.toml";

/// The collections of a loaded directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    config: Config,
    members: Collection<Member>,
    groups: Collection<Group>,
    demands: Collection<Demand>,
    settings: Collection<Settings>,
    contracts: Collection<Contract>,
    participants: Collection<Participant>,
    contributions: Collection<Contribution>,
}

/// A directory that has not been read yet.
#[derive(Debug, PartialEq, Eq)]
pub struct Unloaded;

/// A filesystem backed store of documents.
#[derive(Debug)]
pub struct Directory<S> {
    /// The root of the directory documents are stored in.
    root: PathBuf,
    state: S,
}

impl<S> Directory<S> {
    /// The root of the data directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Directory<Unloaded> {
    /// Opens a directory at the given path.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self {
            root,
            state: Unloaded,
        }
    }

    /// Creates the collection directories and a default configuration file,
    /// keeping any that already exist.
    ///
    /// Returns `true` if a new configuration file was written.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or the configuration file cannot be
    /// created.
    pub fn init(&self) -> io::Result<bool> {
        for collection in COLLECTIONS {
            std::fs::create_dir_all(self.root.join(collection))?;
        }

        let config_path = self.root.join(CONFIG_FILE);
        if config_path.exists() {
            return Ok(false);
        }

        Config::default()
            .save(&config_path)
            .map_err(io::Error::other)?;
        Ok(true)
    }

    /// Load all documents from disk
    ///
    /// # Errors
    ///
    /// This method has different behaviour depending on the configuration file
    /// in the data directory. If `allow_unrecognised` is `true`, then any
    /// files that cannot be parsed as documents of their collection are
    /// skipped. If `allow_unrecognised` is `false` (the default), then any
    /// such file makes loading fail.
    pub fn load_all(self) -> Result<Directory<Loaded>, DirectoryLoadError> {
        let config = load_config(&self.root);
        let mut unrecognised = Vec::new();

        let state = Loaded {
            members: load_collection(&self.root, &mut unrecognised),
            groups: load_collection(&self.root, &mut unrecognised),
            demands: load_collection(&self.root, &mut unrecognised),
            settings: load_collection(&self.root, &mut unrecognised),
            contracts: load_collection(&self.root, &mut unrecognised),
            participants: load_collection(&self.root, &mut unrecognised),
            contributions: load_collection(&self.root, &mut unrecognised),
            config,
        };

        if !unrecognised.is_empty() {
            if !state.config.allow_unrecognised {
                unrecognised.sort();
                return Err(DirectoryLoadError::UnrecognisedFiles(unrecognised));
            }
            tracing::warn!("Skipped {} unrecognised files", unrecognised.len());
        }

        Ok(Directory {
            root: self.root,
            state,
        })
    }
}

const COLLECTIONS: [&str; 7] = [
    Member::COLLECTION,
    Group::COLLECTION,
    Demand::COLLECTION,
    Settings::COLLECTION,
    Contract::COLLECTION,
    Participant::COLLECTION,
    Contribution::COLLECTION,
];

fn load_collection<T: Document>(root: &Path, unrecognised: &mut Vec<PathBuf>) -> Collection<T> {
    let (collection, skipped) = Collection::load(root);
    unrecognised.extend(skipped);
    collection
}

fn load_config(root: &Path) -> Config {
    let path = root.join(CONFIG_FILE);
    Config::load(&path).unwrap_or_else(|e| {
        tracing::debug!("Failed to load config: {e}");
        Config::default()
    })
}

/// Errors loading a directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryLoadError {
    /// Files that are not valid documents of their collection.
    UnrecognisedFiles(Vec<PathBuf>),
}

impl fmt::Display for DirectoryLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MAX_DISPLAY: usize = 5;

        match self {
            Self::UnrecognisedFiles(paths) => {
                write!(f, "Unrecognised files: ")?;
                for (i, path) in paths.iter().take(MAX_DISPLAY).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", path.display())?;
                }
                if paths.len() > MAX_DISPLAY {
                    write!(f, "... (and {} more)", paths.len() - MAX_DISPLAY)?;
                }
                Ok(())
            }
        }
    }
}

/// A document type held by a loaded [`Directory`].
pub trait Stored: Document {
    /// The collection of this type.
    fn collection(state: &Loaded) -> &Collection<Self>;

    /// The collection of this type, mutably.
    fn collection_mut(state: &mut Loaded) -> &mut Collection<Self>;
}

macro_rules! stored {
    ($ty:ty, $field:ident) => {
        impl Stored for $ty {
            fn collection(state: &Loaded) -> &Collection<Self> {
                &state.$field
            }

            fn collection_mut(state: &mut Loaded) -> &mut Collection<Self> {
                &mut state.$field
            }
        }
    };
}

stored!(Member, members);
stored!(Group, groups);
stored!(Demand, demands);
stored!(Settings, settings);
stored!(Contract, contracts);
stored!(Participant, participants);
stored!(Contribution, contributions);

impl Directory<Loaded> {
    /// The directory configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.state.config
    }

    /// The collection of documents of type `T`.
    #[must_use]
    pub fn collection<T: Stored>(&self) -> &Collection<T> {
        T::collection(&self.state)
    }

    /// Members, in id order.
    #[must_use]
    pub const fn members(&self) -> &Collection<Member> {
        &self.state.members
    }

    /// Groups, in id order.
    #[must_use]
    pub const fn groups(&self) -> &Collection<Group> {
        &self.state.groups
    }

    /// Demands, in id order.
    #[must_use]
    pub const fn demands(&self) -> &Collection<Demand> {
        &self.state.demands
    }

    /// All settings records, drafts included.
    #[must_use]
    pub const fn settings(&self) -> &Collection<Settings> {
        &self.state.settings
    }

    /// Contracts, in id order.
    #[must_use]
    pub const fn contracts(&self) -> &Collection<Contract> {
        &self.state.contracts
    }

    /// Charity participants, in id order.
    #[must_use]
    pub const fn participants(&self) -> &Collection<Participant> {
        &self.state.participants
    }

    /// Charity contributions, in id order.
    #[must_use]
    pub const fn contributions(&self) -> &Collection<Contribution> {
        &self.state.contributions
    }

    /// Inserts or replaces a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document file cannot be written.
    pub fn save<T: Stored>(&mut self, document: T) -> Result<(), StoreError> {
        T::collection_mut(&mut self.state).save(document)
    }

    /// Removes a document, returning it if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the document file cannot be deleted.
    pub fn remove<T: Stored>(&mut self, id: &DocumentId) -> Result<Option<T>, StoreError> {
        T::collection_mut(&mut self.state).remove(id)
    }

    /// Builds the name lookup for the current members and groups.
    #[must_use]
    pub fn name_lookup(&self) -> NameLookup {
        NameLookup::new(self.state.members.iter(), self.state.groups.iter())
    }

    /// The conversion workflow over this directory's demands, settings and
    /// contracts.
    pub fn conversion(
        &mut self,
    ) -> DemandConversion<'_, Collection<Demand>, Collection<Settings>, Collection<Contract>> {
        let Loaded {
            config,
            demands,
            settings,
            contracts,
            ..
        } = &mut self.state;

        DemandConversion::new(demands, settings, contracts).require_approval(config.require_approval)
    }

    /// The approval workflow over this directory's demands.
    pub fn review(&mut self) -> DemandReview<'_, Collection<Demand>> {
        DemandReview::new(&mut self.state.demands)
    }

    /// Publishes a new settings version for `caisse_type`.
    ///
    /// The rules of `template` are copied into a new record with a fresh id
    /// and the current time as publication date, which makes it the active
    /// version.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be written.
    pub fn publish_settings(
        &mut self,
        caisse_type: CaisseType,
        template: Settings,
    ) -> Result<Settings, StoreError> {
        // Publication times are strictly increasing per type, so the newest
        // record is always the active one.
        let now = Utc::now();
        let published_at = resolve_active(self.state.settings.iter(), caisse_type)
            .and_then(|active| active.published_at)
            .map_or(now, |latest| now.max(latest + TimeDelta::nanoseconds(1)));

        let settings = Settings {
            id: DocumentId::generate(),
            caisse_type,
            ..template
        }
        .published(published_at);

        self.state.settings.save(settings.clone())?;
        tracing::info!("Published settings {} for {caisse_type}", settings.id);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        domain::{
            DemandStatus,
            demand::tests::{id, standard_terms},
        },
        storage::SettingsStore,
    };

    fn setup_temp_directory() -> (TempDir, Directory<Loaded>) {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let path = tmp.path().to_path_buf();
        (tmp, Directory::new(path).load_all().unwrap())
    }

    fn reload(dir: &Directory<Loaded>) -> Directory<Loaded> {
        Directory::new(dir.root.clone()).load_all().unwrap()
    }

    #[test]
    fn init_creates_layout_once() {
        let tmp = TempDir::new().unwrap();
        let dir = Directory::new(tmp.path().to_path_buf());

        assert!(dir.init().unwrap());
        assert!(!dir.init().unwrap());

        for collection in COLLECTIONS {
            assert!(tmp.path().join(collection).is_dir());
        }
        assert!(tmp.path().join(CONFIG_FILE).is_file());
    }

    #[test]
    fn empty_directory_loads() {
        let (_tmp, dir) = setup_temp_directory();
        assert!(dir.demands().is_empty());
        assert_eq!(dir.config(), &Config::default());
    }

    #[test]
    fn saved_documents_survive_reload() {
        let (_tmp, mut dir) = setup_temp_directory();
        let demand = Demand::new(id("DEM_1"), standard_terms("MEM_1"), id("AGENT_1")).unwrap();
        dir.save(demand.clone()).unwrap();

        let reloaded = reload(&dir);
        assert_eq!(reloaded.collection::<Demand>().get(&id("DEM_1")), Some(&demand));
    }

    #[test]
    fn unrecognised_files_fail_loading_by_default() {
        let (tmp, _dir) = setup_temp_directory();
        let members = tmp.path().join("members");
        std::fs::create_dir_all(&members).unwrap();
        std::fs::write(members.join("broken.yaml"), "firstName: [").unwrap();

        let error = Directory::new(tmp.path().to_path_buf())
            .load_all()
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            format!("Unrecognised files: {}", members.join("broken.yaml").display())
        );
    }

    #[test]
    fn unrecognised_files_are_skipped_when_allowed() {
        let (tmp, _dir) = setup_temp_directory();
        let mut config = Config::default();
        config.allow_unrecognised = true;
        config.save(&tmp.path().join(CONFIG_FILE)).unwrap();
        let members = tmp.path().join("members");
        std::fs::create_dir_all(&members).unwrap();
        std::fs::write(members.join("broken.yaml"), "firstName: [").unwrap();

        let dir = Directory::new(tmp.path().to_path_buf()).load_all().unwrap();
        assert!(dir.members().is_empty());
    }

    #[test]
    fn publish_makes_settings_active() {
        let (_tmp, mut dir) = setup_temp_directory();
        let template = Settings::draft(id("TEMPLATE"), CaisseType::Libre);

        let first = dir.publish_settings(CaisseType::Libre, template.clone()).unwrap();
        let second = dir.publish_settings(CaisseType::Libre, template).unwrap();

        assert_ne!(first.id, second.id);
        let reloaded = reload(&dir);
        let active = reloaded
            .settings()
            .active_settings(CaisseType::Libre)
            .unwrap()
            .unwrap();
        assert_eq!(active.id, second.id);
    }

    #[test]
    fn review_then_conversion_persist() {
        let (_tmp, mut dir) = setup_temp_directory();
        dir.save(Demand::new(id("DEM_1"), standard_terms("MEM_1"), id("AGENT_1")).unwrap())
            .unwrap();
        dir.publish_settings(
            CaisseType::Standard,
            Settings::draft(id("TEMPLATE"), CaisseType::Standard),
        )
        .unwrap();

        dir.review().approve(&id("DEM_1"), &id("ADMIN_1")).unwrap();
        let converted = dir.conversion().convert(&id("DEM_1"), &id("ADMIN_1")).unwrap();

        let reloaded = reload(&dir);
        let demand = reloaded.demands().get(&id("DEM_1")).unwrap();
        assert_eq!(demand.status, DemandStatus::Converted);
        let contract_id = demand.contract_id.clone().unwrap();
        assert_eq!(Some(contract_id.clone()), converted.contract_id);
        assert_eq!(
            reloaded.contracts().get(&contract_id).unwrap().demand_id,
            Some(id("DEM_1"))
        );
    }
}
