use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::catalog::ObjectId;
use crate::error::{DdlError, DdlResult};
use crate::storage::engine::StorageEngine;
use crate::types::Row;

type IndexEntries = BTreeMap<String, Vec<u64>>;

/// In-memory storage implementation
#[derive(Debug, Clone)]
pub struct MemStorage {
    tables: HashMap<ObjectId, Vec<Row>>,
    indexes: BTreeMap<u64, IndexEntries>,
    next_root: u64,
    /// Undo entries of the open statement, oldest first.
    journal: Option<Vec<Undo>>,
}

/// How to reverse one change. Allocated roots are never handed out again,
/// so `next_root` is not journaled.
#[derive(Debug, Clone)]
enum Undo {
    CreatedTable(ObjectId),
    RestoreRows(ObjectId, Vec<Row>),
    InsertedRow(ObjectId),
    CreatedRoot(u64),
    RestoreRoot(u64, IndexEntries),
    IndexedKey(u64, String),
}

/// Serialized snapshot of a [`MemStorage`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct StorageFile {
    next_root: u64,
    #[serde(default)]
    tables: Vec<TableFile>,
    #[serde(default)]
    indexes: Vec<IndexFile>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableFile {
    table: ObjectId,
    rows: Vec<Row>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    root: u64,
    entries: Vec<(String, Vec<u64>)>,
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            indexes: BTreeMap::new(),
            next_root: 1,
            journal: None,
        }
    }

    pub(crate) fn to_file(&self) -> StorageFile {
        let mut tables: Vec<TableFile> = self
            .tables
            .iter()
            .map(|(table, rows)| TableFile {
                table: *table,
                rows: rows.clone(),
            })
            .collect();
        tables.sort_by_key(|t| t.table);
        StorageFile {
            next_root: self.next_root,
            tables,
            indexes: self
                .indexes
                .iter()
                .map(|(root, entries)| IndexFile {
                    root: *root,
                    entries: entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                })
                .collect(),
        }
    }

    pub(crate) fn from_file(file: StorageFile) -> Self {
        Self {
            tables: file.tables.into_iter().map(|t| (t.table, t.rows)).collect(),
            indexes: file
                .indexes
                .into_iter()
                .map(|i| (i.root, i.entries.into_iter().collect()))
                .collect(),
            next_root: file.next_root.max(1),
            journal: None,
        }
    }

    fn record(&mut self, undo: Undo) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(undo);
        }
    }

    fn undo(&mut self, undo: Undo) {
        match undo {
            Undo::CreatedTable(table) => {
                self.tables.remove(&table);
            }
            Undo::RestoreRows(table, rows) => {
                self.tables.insert(table, rows);
            }
            Undo::InsertedRow(table) => {
                if let Some(rows) = self.tables.get_mut(&table) {
                    rows.pop();
                }
            }
            Undo::CreatedRoot(root) => {
                self.indexes.remove(&root);
            }
            Undo::RestoreRoot(root, entries) => {
                self.indexes.insert(root, entries);
            }
            Undo::IndexedKey(root, key) => {
                let Some(index) = self.indexes.get_mut(&root) else {
                    return;
                };
                if let Some(slot) = index.get_mut(&key) {
                    slot.pop();
                    if slot.is_empty() {
                        index.remove(&key);
                    }
                }
            }
        }
    }

    fn rows_mut(&mut self, table: ObjectId) -> DdlResult<&mut Vec<Row>> {
        self.tables
            .get_mut(&table)
            .ok_or_else(|| DdlError::storage(format!("Table storage {table} does not exist")))
    }

    fn index_mut(&mut self, root: u64) -> DdlResult<&mut BTreeMap<String, Vec<u64>>> {
        self.indexes
            .get_mut(&root)
            .ok_or_else(|| DdlError::storage(format!("Index root {root} does not exist")))
    }
}

impl StorageEngine for MemStorage {
    fn create_table(&mut self, table: ObjectId) -> DdlResult<()> {
        if self.tables.contains_key(&table) {
            return Err(DdlError::storage(format!(
                "Table storage {table} already exists"
            )));
        }
        self.tables.insert(table, Vec::new());
        self.record(Undo::CreatedTable(table));
        Ok(())
    }

    fn drop_table(&mut self, table: ObjectId) -> DdlResult<()> {
        let rows = self
            .tables
            .remove(&table)
            .ok_or_else(|| DdlError::storage(format!("Table storage {table} does not exist")))?;
        self.record(Undo::RestoreRows(table, rows));
        Ok(())
    }

    fn truncate_table(&mut self, table: ObjectId) -> DdlResult<()> {
        let rows = std::mem::take(self.rows_mut(table)?);
        self.record(Undo::RestoreRows(table, rows));
        Ok(())
    }

    fn has_table(&self, table: ObjectId) -> bool {
        self.tables.contains_key(&table)
    }

    fn insert_row(&mut self, table: ObjectId, row: Row) -> DdlResult<u64> {
        let rows = self.rows_mut(table)?;
        rows.push(row);
        let position = (rows.len() - 1) as u64;
        self.record(Undo::InsertedRow(table));
        Ok(position)
    }

    fn scan(&self, table: ObjectId) -> DdlResult<&[Row]> {
        self.tables
            .get(&table)
            .map(|v| v.as_slice())
            .ok_or_else(|| DdlError::storage(format!("Table storage {table} does not exist")))
    }

    fn replace_rows(&mut self, table: ObjectId, rows: Vec<Row>) -> DdlResult<()> {
        let old = std::mem::replace(self.rows_mut(table)?, rows);
        self.record(Undo::RestoreRows(table, old));
        Ok(())
    }

    fn create_index_storage(&mut self) -> DdlResult<u64> {
        let root = self.next_root;
        self.next_root += 1;
        self.indexes.insert(root, BTreeMap::new());
        self.record(Undo::CreatedRoot(root));
        Ok(root)
    }

    fn drop_index_storage(&mut self, root: u64, truncate: bool) -> DdlResult<()> {
        let entries = if truncate {
            std::mem::take(self.index_mut(root)?)
        } else {
            self.indexes
                .remove(&root)
                .ok_or_else(|| DdlError::storage(format!("Index root {root} does not exist")))?
        };
        self.record(Undo::RestoreRoot(root, entries));
        Ok(())
    }

    fn has_index_root(&self, root: u64) -> bool {
        self.indexes.contains_key(&root)
    }

    fn index_insert(&mut self, root: u64, key: String, position: u64, unique: bool) -> DdlResult<()> {
        let index = self.index_mut(root)?;
        if unique && index.get(&key).is_some_and(|slot| !slot.is_empty()) {
            return Err(DdlError::storage(format!(
                "Unique index root {root} already holds this key"
            )));
        }
        index.entry(key.clone()).or_default().push(position);
        self.record(Undo::IndexedKey(root, key));
        Ok(())
    }

    fn index_len(&self, root: u64) -> DdlResult<usize> {
        self.indexes
            .get(&root)
            .map(|entries| entries.values().map(|v| v.len()).sum())
            .ok_or_else(|| DdlError::storage(format!("Index root {root} does not exist")))
    }

    fn index_contains(&self, root: u64, key: &str) -> DdlResult<bool> {
        self.indexes
            .get(&root)
            .map(|entries| entries.get(key).is_some_and(|v| !v.is_empty()))
            .ok_or_else(|| DdlError::storage(format!("Index root {root} does not exist")))
    }

    fn index_roots(&self) -> Vec<u64> {
        self.indexes.keys().copied().collect()
    }

    fn begin_statement(&mut self) {
        self.journal = Some(Vec::new());
    }

    fn rollback_statement(&mut self) -> DdlResult<()> {
        let Some(journal) = self.journal.take() else {
            return Ok(());
        };
        debug!(changes = journal.len(), "undoing storage changes");
        for undo in journal.into_iter().rev() {
            self.undo(undo);
        }
        Ok(())
    }

    fn end_statement(&mut self) {
        self.journal = None;
    }
}
