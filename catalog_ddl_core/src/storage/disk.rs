use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::catalog::ObjectId;
use crate::error::DdlResult;
use crate::storage::engine::StorageEngine;
use crate::storage::mem::{MemStorage, StorageFile};
use crate::types::Row;

pub const STORAGE_FILE: &str = "storage.json";

/// Disk-backed storage: works in memory and writes a snapshot of every table
/// and index root at each checkpoint.
#[derive(Debug)]
pub struct DiskStorage {
    root: PathBuf,
    inner: MemStorage,
}

fn initialize_layout(root: &Path) -> DdlResult<()> {
    fs::create_dir_all(root)?;
    Ok(())
}

impl DiskStorage {
    pub fn open(root: impl Into<PathBuf>) -> DdlResult<Self> {
        let root = root.into();
        initialize_layout(&root)?;
        let file_path = root.join(STORAGE_FILE);
        let inner = if file_path.exists() {
            let content = fs::read_to_string(&file_path)?;
            if content.trim().is_empty() {
                MemStorage::new()
            } else {
                let file: StorageFile = serde_json::from_str(&content)?;
                MemStorage::from_file(file)
            }
        } else {
            MemStorage::new()
        };
        Ok(Self { root, inner })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn snapshot_path(&self) -> PathBuf {
        self.root.join(STORAGE_FILE)
    }
}

impl StorageEngine for DiskStorage {
    fn create_table(&mut self, table: ObjectId) -> DdlResult<()> {
        self.inner.create_table(table)
    }

    fn drop_table(&mut self, table: ObjectId) -> DdlResult<()> {
        self.inner.drop_table(table)
    }

    fn truncate_table(&mut self, table: ObjectId) -> DdlResult<()> {
        self.inner.truncate_table(table)
    }

    fn has_table(&self, table: ObjectId) -> bool {
        self.inner.has_table(table)
    }

    fn insert_row(&mut self, table: ObjectId, row: Row) -> DdlResult<u64> {
        self.inner.insert_row(table, row)
    }

    fn scan(&self, table: ObjectId) -> DdlResult<&[Row]> {
        self.inner.scan(table)
    }

    fn replace_rows(&mut self, table: ObjectId, rows: Vec<Row>) -> DdlResult<()> {
        self.inner.replace_rows(table, rows)
    }

    fn create_index_storage(&mut self) -> DdlResult<u64> {
        self.inner.create_index_storage()
    }

    fn drop_index_storage(&mut self, root: u64, truncate: bool) -> DdlResult<()> {
        self.inner.drop_index_storage(root, truncate)
    }

    fn has_index_root(&self, root: u64) -> bool {
        self.inner.has_index_root(root)
    }

    fn index_insert(&mut self, root: u64, key: String, position: u64, unique: bool) -> DdlResult<()> {
        self.inner.index_insert(root, key, position, unique)
    }

    fn index_len(&self, root: u64) -> DdlResult<usize> {
        self.inner.index_len(root)
    }

    fn index_contains(&self, root: u64, key: &str) -> DdlResult<bool> {
        self.inner.index_contains(root, key)
    }

    fn index_roots(&self) -> Vec<u64> {
        self.inner.index_roots()
    }

    fn begin_statement(&mut self) {
        self.inner.begin_statement()
    }

    fn rollback_statement(&mut self) -> DdlResult<()> {
        self.inner.rollback_statement()
    }

    fn end_statement(&mut self) {
        self.inner.end_statement()
    }

    fn checkpoint(&mut self) -> DdlResult<()> {
        let payload = serde_json::to_string_pretty(&self.inner.to_file())?;
        let path = self.snapshot_path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), "storage checkpoint written");
        Ok(())
    }
}
