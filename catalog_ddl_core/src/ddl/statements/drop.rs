use tracing::debug;

use crate::catalog::util::{resolve_element, resolve_schema};
use crate::catalog::{ObjectId, ObjectKind};
use crate::ddl::statement::{DdlStatement, StatementContext};
use crate::error::{DdlError, DdlResult};

/// DROP {SCHEMA|TABLE|VIEW|INDEX} name [CASCADE|RESTRICT]. RESTRICT is the
/// default.
#[derive(Debug, Clone)]
pub struct DropObject {
    kind: ObjectKind,
    name: String,
    restrict: bool,
    target: Option<ObjectId>,
}

impl DropObject {
    pub fn new(kind: ObjectKind, name: impl Into<String>, cascade: bool) -> Self {
        Self {
            kind,
            name: name.into(),
            restrict: !cascade,
            target: None,
        }
    }
}

impl DdlStatement for DropObject {
    fn describe(&self) -> String {
        let mode = if self.restrict { "restrict" } else { "cascade" };
        format!("drop {} {} {mode}", self.kind.label(), self.name)
    }

    fn apply(&mut self, cx: &mut StatementContext<'_>) -> DdlResult<()> {
        let target = match self.kind {
            ObjectKind::Schema => resolve_schema(&*cx.repo, &self.name)?,
            ObjectKind::Table | ObjectKind::View | ObjectKind::Index => resolve_element(
                &*cx.repo,
                cx.default_schema(),
                &self.name,
                &[self.kind],
                self.kind.label(),
            )?,
            other => {
                return Err(DdlError::Parse(format!(
                    "cannot drop a {} directly",
                    other.label()
                )))
            }
        };
        self.target = Some(target);
        Ok(())
    }

    fn pre_validate(&mut self, cx: &mut StatementContext<'_>) -> DdlResult<()> {
        let target = self
            .target
            .ok_or_else(|| DdlError::Internal("drop target was not resolved".to_string()))?;
        debug!(target = %target, "probing deletion of drop target");
        cx.repo.delete(target)
    }

    fn drop_target(&self) -> Option<ObjectId> {
        self.target
    }

    fn is_drop_restricted(&self) -> bool {
        self.restrict
    }

    fn completion_message(&self) -> String {
        format!("dropped {} {}", self.kind.label(), self.name)
    }
}
