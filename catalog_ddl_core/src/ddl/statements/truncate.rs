use crate::catalog::util::resolve_table;
use crate::catalog::ObjectId;
use crate::ddl::statement::{DdlStatement, StatementContext};
use crate::error::{DdlError, DdlResult};

#[derive(Debug, Clone)]
pub struct TruncateTable {
    name: String,
    table: Option<ObjectId>,
}

impl TruncateTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
        }
    }
}

impl DdlStatement for TruncateTable {
    fn describe(&self) -> String {
        format!("truncate table {}", self.name)
    }

    fn apply(&mut self, cx: &mut StatementContext<'_>) -> DdlResult<()> {
        self.table = Some(resolve_table(&*cx.repo, cx.default_schema(), &self.name)?);
        Ok(())
    }

    fn pre_validate(&mut self, cx: &mut StatementContext<'_>) -> DdlResult<()> {
        let table = self
            .table
            .ok_or_else(|| DdlError::Internal("truncate target was not resolved".to_string()))?;
        cx.schedule_truncation(table)
    }

    fn completion_message(&self) -> String {
        format!("truncated table {}", self.name)
    }
}
