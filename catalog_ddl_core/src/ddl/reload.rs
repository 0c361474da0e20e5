//! Table reload: the shared machinery behind ALTER TABLE ADD COLUMN and
//! ALTER TABLE REBUILD.

use indexmap::IndexMap;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::catalog::util::{
    column_positions, create_recovery_marker, now, set_index_root, set_row_count,
    update_annotated_element,
};
use crate::catalog::{CatalogRepository, ObjectAttrs, ObjectId, RecoveryType, RelationshipType};
use crate::config::TestTraps;
use crate::error::{DdlError, DdlResult};
use crate::storage::StorageEngine;
use crate::types::datatype::DataType;
use crate::types::value::Value;
use crate::types::Row;

use super::handlers::relational::index_key;
use super::multi_phase::PhaseContext;

/// Value produced for a column that the source rows do not have yet.
#[derive(Debug, Clone, PartialEq)]
pub enum AppendedValue {
    Null,
    Literal(Value),
    Sequence {
        data_type: DataType,
        start: i64,
        increment: i64,
    },
}

impl AppendedValue {
    fn value_for(&self, ordinal: u64) -> Value {
        match self {
            AppendedValue::Null => Value::Null,
            AppendedValue::Literal(v) => v.clone(),
            AppendedValue::Sequence {
                data_type,
                start,
                increment,
            } => Value::from_sequence(data_type, *start, *increment, ordinal),
        }
    }
}

/// One index root to fill during the reload.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexWrite {
    pub index: ObjectId,
    pub root: u64,
    pub key_positions: Vec<usize>,
    pub unique: bool,
}

/// Everything the unlocked step needs, captured while the catalog was locked.
#[derive(Debug, Clone, PartialEq)]
pub struct ReloadCommand {
    pub table: ObjectId,
    /// Rendered DML, e.g. `insert into public.t(a,b) select a,b from public.t`.
    pub sql: String,
    /// Leading values of each source row that are copied.
    pub source_width: usize,
    pub appended: Vec<AppendedValue>,
    pub index_writes: Vec<IndexWrite>,
}

/// A nested session able to run reload DML without a catalog transaction.
pub trait ReentrantSession {
    /// Runs the reload and returns the number of rows written.
    fn execute_dml(&mut self, command: &ReloadCommand) -> DdlResult<u64>;
}

/// Reentrant session over the storage engine only.
pub struct StorageSession<'s> {
    storage: &'s mut dyn StorageEngine,
    executed: Vec<String>,
}

impl<'s> StorageSession<'s> {
    pub fn new(storage: &'s mut dyn StorageEngine) -> Self {
        Self {
            storage,
            executed: Vec::new(),
        }
    }

    pub fn into_executed(self) -> Vec<String> {
        self.executed
    }
}

impl ReentrantSession for StorageSession<'_> {
    fn execute_dml(&mut self, command: &ReloadCommand) -> DdlResult<u64> {
        debug!(sql = %command.sql, "executing reload");
        let source = self.storage.scan(command.table)?.to_vec();
        let mut rows: Vec<Row> = Vec::with_capacity(source.len());
        for (ordinal, row) in source.into_iter().enumerate() {
            let mut row: Row = row.into_iter().take(command.source_width).collect();
            row.resize(command.source_width, Value::Null);
            for appended in &command.appended {
                row.push(appended.value_for(ordinal as u64));
            }
            rows.push(row);
        }

        for write in &command.index_writes {
            for (position, row) in rows.iter().enumerate() {
                let (key, has_null) = index_key(row, &write.key_positions);
                self.storage.index_insert(
                    write.root,
                    key,
                    position as u64,
                    write.unique && !has_null,
                )?;
            }
        }

        let count = rows.len() as u64;
        self.storage.replace_rows(command.table, rows)?;
        self.storage.checkpoint()?;
        self.executed.push(command.sql.clone());
        Ok(count)
    }
}

/// Per-statement state of a reload. Lives only in memory; the recovery
/// marker is what survives a crash.
#[derive(Debug)]
pub struct TableReload {
    table: ObjectId,
    recovery_type: RecoveryType,
    rebuild_indexes: bool,
    write_index_map: IndexMap<ObjectId, u64>,
    recovery_marker: Option<ObjectId>,
    prior_row_count: u64,
    command: Option<ReloadCommand>,
    reloaded_rows: Option<u64>,
}

impl TableReload {
    pub fn new(table: ObjectId, recovery_type: RecoveryType, rebuild_indexes: bool) -> Self {
        Self {
            table,
            recovery_type,
            rebuild_indexes,
            write_index_map: IndexMap::new(),
            recovery_marker: None,
            prior_row_count: 0,
            command: None,
            reloaded_rows: None,
        }
    }

    pub fn table(&self) -> ObjectId {
        self.table
    }

    pub fn rebuild_indexes(&self) -> bool {
        self.rebuild_indexes
    }

    /// Index to newly allocated root.
    pub fn write_index_map(&self) -> &IndexMap<ObjectId, u64> {
        &self.write_index_map
    }

    pub fn recovery_marker(&self) -> Option<ObjectId> {
        self.recovery_marker
    }

    pub fn command(&self) -> Option<&ReloadCommand> {
        self.command.as_ref()
    }

    /// Allocates roots for `indexes`, persists the recovery marker and
    /// captures the reload command.
    pub fn prepare(
        &mut self,
        cx: &mut PhaseContext<'_>,
        indexes: Vec<ObjectId>,
        sql: String,
        source_width: usize,
        appended: Vec<AppendedValue>,
    ) -> DdlResult<()> {
        let mut index_writes = Vec::with_capacity(indexes.len());
        for index in indexes {
            let unique = matches!(
                cx.repo.lookup(index).map(|o| &o.attrs),
                Some(ObjectAttrs::Index { unique: true, .. })
            );
            let columns = cx.repo.links_from(index, RelationshipType::IndexedColumn);
            let key_positions = column_positions(&*cx.repo, self.table, &columns);
            let root = cx.storage.create_index_storage()?;
            self.write_index_map.insert(index, root);
            mark_index_invalid(&mut *cx.repo, index, true)?;
            index_writes.push(IndexWrite {
                index,
                root,
                key_positions,
                unique,
            });
        }

        self.prior_row_count = cx
            .repo
            .lookup(self.table)
            .and_then(|o| o.row_count())
            .unwrap_or(0);
        let pending_roots = self.write_index_map.values().copied().collect();
        let marker = create_recovery_marker(
            &mut *cx.repo,
            self.recovery_type,
            self.table,
            pending_roots,
            Some(self.prior_row_count),
        )?;
        self.recovery_marker = Some(marker);

        set_row_count(&mut *cx.repo, self.table, 0)?;
        update_annotated_element(&mut *cx.repo, self.table, now(), false)?;
        self.command = Some(ReloadCommand {
            table: self.table,
            sql,
            source_width,
            appended,
            index_writes,
        });
        debug!(
            table = %self.table,
            roots = self.write_index_map.len(),
            "reload prepared"
        );
        Ok(())
    }

    pub fn execute(&mut self, session: &mut dyn ReentrantSession, traps: &TestTraps) -> DdlResult<()> {
        if let Some(millis) = traps.take_sleep() {
            info!(millis, "reload sleep trap");
            thread::sleep(Duration::from_millis(millis));
        }
        let command = self
            .command
            .as_ref()
            .ok_or_else(|| DdlError::Internal("reload executed before prepare".to_string()))?;
        let rows = session
            .execute_dml(command)
            .map_err(|e| DdlError::UnlockedExecution(e.to_string()))?;
        self.reloaded_rows = Some(rows);
        if traps.take_failure() {
            return Err(DdlError::UnlockedExecution(
                "injected failure after table reload".to_string(),
            ));
        }
        Ok(())
    }

    /// Removes the marker, then either swaps in the new roots or undoes them.
    pub fn complete(&mut self, cx: &mut PhaseContext<'_>, success: bool) -> DdlResult<()> {
        if cx.traps.take_crash() {
            return Err(DdlError::SimulatedCrash(format!(
                "{} completion of {}",
                self.recovery_type, self.table
            )));
        }
        if let Some(marker) = self.recovery_marker.take() {
            if cx.repo.lookup(marker).is_some() {
                cx.repo.delete(marker)?;
            }
        }
        if !success {
            return self.recover_from_failure(cx);
        }

        let timestamp = now();
        for (&index, &root) in &self.write_index_map {
            let old_root = cx.repo.lookup(index).and_then(|o| o.index_root());
            set_index_root(&mut *cx.repo, index, Some(root))?;
            if let Some(old) = old_root {
                if cx.storage.has_index_root(old) {
                    cx.storage.drop_index_storage(old, false)?;
                }
            }
            mark_index_invalid(&mut *cx.repo, index, false)?;
            update_annotated_element(&mut *cx.repo, index, timestamp, false)?;
        }
        let rows = self.reloaded_rows.unwrap_or(self.prior_row_count);
        set_row_count(&mut *cx.repo, self.table, rows)?;
        update_annotated_element(&mut *cx.repo, self.table, timestamp, false)?;
        info!(table = %self.table, rows, "reload completed");
        Ok(())
    }

    /// Frees the roots allocated by prepare and restores the row count.
    fn recover_from_failure(&mut self, cx: &mut PhaseContext<'_>) -> DdlResult<()> {
        for (&index, &root) in &self.write_index_map {
            if cx.storage.has_index_root(root) {
                cx.storage.drop_index_storage(root, false)?;
            }
            if cx.repo.lookup(index).is_some() {
                mark_index_invalid(&mut *cx.repo, index, false)?;
            }
        }
        self.write_index_map.clear();
        set_row_count(&mut *cx.repo, self.table, self.prior_row_count)?;
        info!(table = %self.table, "reload rolled back");
        Ok(())
    }
}

pub(crate) fn mark_index_invalid(
    repo: &mut dyn CatalogRepository,
    index: ObjectId,
    value: bool,
) -> DdlResult<()> {
    repo.modify(index, "invalid", &mut |obj| {
        if let ObjectAttrs::Index { invalid, .. } = &mut obj.attrs {
            *invalid = value;
        }
    })
}
