use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub mod catalog;
pub mod config;
pub mod ddl;
pub mod engine;
pub mod error;
pub mod parser;
pub mod storage;
pub mod types;

use tracing::info;

use catalog::util::{now, update_annotated_element};
use catalog::{CatalogRepository, MemCatalog, ObjectAttrs, ObjectKind, Visibility};
use config::{EngineConfig, TestTraps};
use ddl::{DdlLockManager, DdlRegistry, DdlStatement, recover_abandoned_statements};
use engine::{EngineContext, StatementOutcome};
use storage::{DiskStorage, MemStorage, StorageEngine};

pub use error::{DdlError, DdlResult};

pub const CATALOG_FILE: &str = "catalog.json";

pub struct Database {
    path: Option<PathBuf>,
    config: EngineConfig,
    catalog: MemCatalog,
    storage: Box<dyn StorageEngine>,
    registry: DdlRegistry,
    locks: DdlLockManager,
    traps: TestTraps,
    last: StatementOutcome,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("catalog", &self.catalog)
            .field("locks", &self.locks)
            .finish()
    }
}

impl Database {
    /// Opens a database directory, creating it when missing, and cleans up
    /// statements a previous process left half-finished.
    pub fn open(path: impl Into<PathBuf>) -> DdlResult<Self> {
        let path = path.into();
        fs::create_dir_all(&path)?;
        let config = EngineConfig::load_from_dir(&path)?;
        let catalog = MemCatalog::open(path.join(CATALOG_FILE))?;
        let storage = DiskStorage::open(&path)?;
        let mut db = Self::assemble(Some(path), config, catalog, Box::new(storage));
        db.bootstrap()?;
        let recovered = db.recover_abandoned()?;
        info!(path = ?db.path, recovered, "database opened");
        Ok(db)
    }

    /// A database that lives only as long as the value.
    pub fn in_memory(config: EngineConfig) -> DdlResult<Self> {
        let mut db = Self::assemble(None, config, MemCatalog::new(), Box::new(MemStorage::new()));
        db.bootstrap()?;
        Ok(db)
    }

    fn assemble(
        path: Option<PathBuf>,
        config: EngineConfig,
        catalog: MemCatalog,
        storage: Box<dyn StorageEngine>,
    ) -> Self {
        let traps = TestTraps::from_config(&config);
        Self {
            path,
            config,
            catalog,
            storage,
            registry: DdlRegistry::standard(),
            locks: DdlLockManager::new(),
            traps,
            last: StatementOutcome::default(),
        }
    }

    fn bootstrap(&mut self) -> DdlResult<()> {
        let name = self.config.default_schema.clone();
        let exists = self
            .catalog
            .find_by_name(None, &name)
            .is_some_and(|id| self.catalog.kind_of(id) == Some(ObjectKind::Schema));
        if exists {
            return Ok(());
        }
        self.catalog.begin_txn(true)?;
        let created = self
            .catalog
            .create_object(&name, None, ObjectAttrs::Schema)
            .and_then(|id| {
                self.catalog.set_visibility(id, Visibility::Public)?;
                update_annotated_element(&mut self.catalog, id, now(), true)
            });
        match created {
            Ok(()) => self.catalog.commit_txn(),
            Err(err) => {
                self.catalog.rollback_txn()?;
                Err(err)
            }
        }
    }

    pub fn execute(&mut self, input: &str) -> DdlResult<String> {
        let cmd = parser::parser::parse(input).map_err(DdlError::Parse)?;
        let mut cx = self.context();
        engine::execute_command(cmd, &mut cx)
    }

    /// Runs a statement that does not come from the parser.
    pub fn run_statement(&mut self, stmt: &mut dyn DdlStatement) -> DdlResult<String> {
        let mut cx = self.context();
        engine::run_ddl(stmt, &mut cx)
    }

    fn context(&mut self) -> EngineContext<'_> {
        EngineContext {
            catalog: &mut self.catalog,
            storage: self.storage.as_mut(),
            registry: &self.registry,
            locks: &mut self.locks,
            config: &self.config,
            traps: &self.traps,
            last: &mut self.last,
        }
    }

    pub fn recover_abandoned(&mut self) -> DdlResult<usize> {
        recover_abandoned_statements(&mut self.catalog, self.storage.as_mut())
    }

    /// Replaces the handler registry, e.g. to add handlers for custom kinds.
    pub fn set_registry(&mut self, registry: DdlRegistry) {
        self.registry = registry;
    }

    pub fn catalog(&self) -> &MemCatalog {
        &self.catalog
    }

    pub fn storage(&self) -> &dyn StorageEngine {
        self.storage.as_ref()
    }

    pub fn traps(&self) -> &TestTraps {
        &self.traps
    }

    pub fn locks_mut(&mut self) -> &mut DdlLockManager {
        &mut self.locks
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Diagnostics of the last DDL statement run.
    pub fn last_outcome(&self) -> &StatementOutcome {
        &self.last
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
