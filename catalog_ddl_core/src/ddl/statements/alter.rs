use crate::catalog::util::{now, qualified_name, resolve_table, table_columns, table_indexes};
use crate::catalog::{ObjectAttrs, ObjectId, RecoveryType, RelationshipType};
use crate::config::TestTraps;
use crate::ddl::multi_phase::{MultiPhaseStatement, PhaseContext};
use crate::ddl::recovery::undo_add_column;
use crate::ddl::reload::{AppendedValue, ReentrantSession, TableReload};
use crate::ddl::statement::{DdlStatement, StatementContext};
use crate::error::{DdlError, DdlResult};
use crate::parser::command::ColumnDef;
use crate::types::value::Value;

use super::create::{create_column, create_unique_key};

fn reload_state(reload: &mut Option<TableReload>) -> DdlResult<&mut TableReload> {
    reload
        .as_mut()
        .ok_or_else(|| DdlError::Internal("table reload was not prepared".to_string()))
}

fn resolved(table: Option<ObjectId>) -> DdlResult<ObjectId> {
    table.ok_or_else(|| DdlError::Internal("alter target was not resolved".to_string()))
}

/// ALTER TABLE ... ADD COLUMN. The new column is committed first; existing
/// rows are reloaded into the widened layout without holding the catalog.
#[derive(Debug)]
pub struct AlterTableAddColumn {
    table_name: String,
    column: ColumnDef,
    table: Option<ObjectId>,
    original_columns: Vec<ObjectId>,
    new_column: Option<ObjectId>,
    reload: Option<TableReload>,
}

impl AlterTableAddColumn {
    pub fn new(table_name: impl Into<String>, column: ColumnDef) -> Self {
        Self {
            table_name: table_name.into(),
            column,
            table: None,
            original_columns: Vec::new(),
            new_column: None,
            reload: None,
        }
    }

    pub fn new_column(&self) -> Option<ObjectId> {
        self.new_column
    }

    pub fn reload(&self) -> Option<&TableReload> {
        self.reload.as_ref()
    }

    fn appended_value(&self, cx: &PhaseContext<'_>, column: ObjectId) -> DdlResult<AppendedValue> {
        let sequence = cx.repo.lookup(column).and_then(|obj| {
            obj.owned
                .iter()
                .find_map(|id| match cx.repo.lookup(*id).map(|o| &o.attrs) {
                    Some(ObjectAttrs::Sequence { start, increment }) => Some((*start, *increment)),
                    _ => None,
                })
        });
        if let Some((start, increment)) = sequence {
            return Ok(AppendedValue::Sequence {
                data_type: self.column.dtype.clone(),
                start,
                increment,
            });
        }
        match &self.column.default {
            Some(default) => Value::parse(&self.column.dtype, default)
                .map(AppendedValue::Literal)
                .map_err(DdlError::Validation),
            None => Ok(AppendedValue::Null),
        }
    }
}

impl DdlStatement for AlterTableAddColumn {
    fn describe(&self) -> String {
        format!("alter table {} add column {}", self.table_name, self.column.name)
    }

    fn apply(&mut self, cx: &mut StatementContext<'_>) -> DdlResult<()> {
        let table = resolve_table(&*cx.repo, cx.default_schema(), &self.table_name)?;
        self.table = Some(table);
        self.original_columns = table_columns(&*cx.repo, table);
        let ordinal = self.original_columns.len();
        self.new_column = Some(create_column(&mut *cx.repo, table, &self.column, ordinal)?);
        if self.column.unique {
            create_unique_key(&mut *cx.repo, table, None, std::slice::from_ref(&self.column.name))?;
        }
        Ok(())
    }

    fn pre_validate(&mut self, cx: &mut StatementContext<'_>) -> DdlResult<()> {
        let table = resolved(self.table)?;
        if let Some(ObjectAttrs::Table { temporary: true, .. }) = cx.repo.lookup(table).map(|o| &o.attrs) {
            return Err(DdlError::validation(format!(
                "cannot add a column to temporary table {}",
                self.table_name
            )));
        }
        Ok(())
    }

    fn as_multi_phase(&mut self) -> Option<&mut dyn MultiPhaseStatement> {
        Some(self)
    }

    fn completion_message(&self) -> String {
        format!("altered table {}: added column {}", self.table_name, self.column.name)
    }
}

impl MultiPhaseStatement for AlterTableAddColumn {
    fn target(&self) -> Option<ObjectId> {
        self.table
    }

    fn prep_for_execute_unlocked(&mut self, cx: &mut PhaseContext<'_>) -> DdlResult<()> {
        let table = resolved(self.table)?;
        let column = resolved(self.new_column)?;
        let rebuild = !cx.config.alter_table_add_column_incremental;
        let indexes = if rebuild {
            table_indexes(&*cx.repo, table)
        } else {
            cx.repo.links_to(column, RelationshipType::IndexedColumn)
        };

        let qualified = qualified_name(&*cx.repo, table);
        let names: Vec<String> = self
            .original_columns
            .iter()
            .filter_map(|c| cx.repo.lookup(*c).map(|o| o.name.clone()))
            .collect();
        let list = names.join(",");
        let sql = format!("insert into {qualified}({list}) select {list} from {qualified}");
        let appended = self.appended_value(cx, column)?;

        let mut reload = TableReload::new(table, RecoveryType::AlterTableAddColumn, rebuild);
        reload.prepare(cx, indexes, sql, self.original_columns.len(), vec![appended])?;
        self.reload = Some(reload);
        Ok(())
    }

    fn execute_unlocked(
        &mut self,
        session: &mut dyn ReentrantSession,
        traps: &TestTraps,
    ) -> DdlResult<()> {
        reload_state(&mut self.reload)?.execute(session, traps)
    }

    fn complete_after_execute_unlocked(
        &mut self,
        cx: &mut PhaseContext<'_>,
        success: bool,
    ) -> DdlResult<()> {
        let table = resolved(self.table)?;
        reload_state(&mut self.reload)?.complete(cx, success)?;
        if !success {
            return undo_add_column(&mut *cx.repo, &mut *cx.storage, table);
        }
        if let Some(column) = self.new_column {
            let timestamp = now();
            cx.repo.modify(column, "creation_timestamp", &mut |obj| {
                obj.creation_timestamp = Some(timestamp);
                obj.modification_timestamp = Some(timestamp);
            })?;
        }
        Ok(())
    }
}

/// ALTER TABLE ... REBUILD: reloads the rows and rebuilds every index into
/// fresh roots.
#[derive(Debug)]
pub struct AlterTableRebuild {
    table_name: String,
    table: Option<ObjectId>,
    reload: Option<TableReload>,
}

impl AlterTableRebuild {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            table: None,
            reload: None,
        }
    }

    pub fn reload(&self) -> Option<&TableReload> {
        self.reload.as_ref()
    }
}

impl DdlStatement for AlterTableRebuild {
    fn describe(&self) -> String {
        format!("alter table {} rebuild", self.table_name)
    }

    fn apply(&mut self, cx: &mut StatementContext<'_>) -> DdlResult<()> {
        self.table = Some(resolve_table(&*cx.repo, cx.default_schema(), &self.table_name)?);
        Ok(())
    }

    fn as_multi_phase(&mut self) -> Option<&mut dyn MultiPhaseStatement> {
        Some(self)
    }

    fn completion_message(&self) -> String {
        format!("rebuilt table {}", self.table_name)
    }
}

impl MultiPhaseStatement for AlterTableRebuild {
    fn target(&self) -> Option<ObjectId> {
        self.table
    }

    fn prep_for_execute_unlocked(&mut self, cx: &mut PhaseContext<'_>) -> DdlResult<()> {
        let table = resolved(self.table)?;
        let indexes = table_indexes(&*cx.repo, table);
        let width = table_columns(&*cx.repo, table).len();
        let qualified = qualified_name(&*cx.repo, table);
        let sql = format!("insert into {qualified} select * from {qualified}");

        let mut reload = TableReload::new(table, RecoveryType::AlterTableRebuild, true);
        reload.prepare(cx, indexes, sql, width, Vec::new())?;
        self.reload = Some(reload);
        Ok(())
    }

    fn execute_unlocked(
        &mut self,
        session: &mut dyn ReentrantSession,
        traps: &TestTraps,
    ) -> DdlResult<()> {
        reload_state(&mut self.reload)?.execute(session, traps)
    }

    fn complete_after_execute_unlocked(
        &mut self,
        cx: &mut PhaseContext<'_>,
        success: bool,
    ) -> DdlResult<()> {
        reload_state(&mut self.reload)?.complete(cx, success)
    }
}
