use crate::catalog::ObjectId;
use crate::error::DdlResult;
use crate::types::Row;

/// Storage engine trait - abstraction for different storage backends
/// (in-memory, disk-based, etc.). Tables are keyed by catalog id; index
/// storage is addressed by allocated roots.
pub trait StorageEngine {
    /// Creates a table in the storage (allocates space for rows)
    fn create_table(&mut self, table: ObjectId) -> DdlResult<()>;

    fn drop_table(&mut self, table: ObjectId) -> DdlResult<()>;

    /// Removes every row but keeps the table allocated
    fn truncate_table(&mut self, table: ObjectId) -> DdlResult<()>;

    fn has_table(&self, table: ObjectId) -> bool;

    /// Inserts a row into the specified table, returning its position
    fn insert_row(&mut self, table: ObjectId, row: Row) -> DdlResult<u64>;

    /// Scans all rows from the specified table
    fn scan(&self, table: ObjectId) -> DdlResult<&[Row]>;

    /// Replaces the table contents wholesale (reloads, reshapes)
    fn replace_rows(&mut self, table: ObjectId, rows: Vec<Row>) -> DdlResult<()>;

    /// Allocates an empty index root
    fn create_index_storage(&mut self) -> DdlResult<u64>;

    /// Frees an index root, or only empties it when `truncate` is set
    fn drop_index_storage(&mut self, root: u64, truncate: bool) -> DdlResult<()>;

    fn has_index_root(&self, root: u64) -> bool;

    /// Adds an entry; unique roots reject a key that is already present
    fn index_insert(&mut self, root: u64, key: String, position: u64, unique: bool) -> DdlResult<()>;

    fn index_len(&self, root: u64) -> DdlResult<usize>;

    /// Checks whether a key is already present under the root
    fn index_contains(&self, root: u64, key: &str) -> DdlResult<bool>;

    /// Every allocated index root, ascending
    fn index_roots(&self) -> Vec<u64>;

    /// Starts journaling changes so a failed DDL statement can undo them.
    /// Backends without a journal keep whatever was applied.
    fn begin_statement(&mut self) {}

    /// Undoes every change since `begin_statement`, newest first.
    fn rollback_statement(&mut self) -> DdlResult<()> {
        Ok(())
    }

    /// Keeps the changes and stops journaling.
    fn end_statement(&mut self) {}

    /// Makes the current state durable
    fn checkpoint(&mut self) -> DdlResult<()> {
        Ok(())
    }
}
