use crate::catalog::{CatalogRepository, ObjectId};
use crate::config::EngineConfig;
use crate::error::DdlResult;
use crate::storage::StorageEngine;

use super::multi_phase::MultiPhaseStatement;
use super::session::ValidationSession;

/// What a statement sees while it applies its raw catalog mutations.
pub struct StatementContext<'s> {
    pub repo: &'s mut dyn CatalogRepository,
    pub storage: &'s dyn StorageEngine,
    pub config: &'s EngineConfig,
    pub(crate) session: &'s mut ValidationSession,
}

impl<'s> StatementContext<'s> {
    pub fn default_schema(&self) -> &str {
        &self.config.default_schema
    }

    pub fn schedule_truncation(&mut self, table: ObjectId) -> DdlResult<()> {
        self.session.schedule_truncation(table)
    }

    pub fn session(&self) -> &ValidationSession {
        &*self.session
    }
}

/// A parsed DDL statement. `apply` mutates the catalog directly; the
/// validator discovers the effects through change notifications.
pub trait DdlStatement {
    fn describe(&self) -> String;

    fn apply(&mut self, cx: &mut StatementContext<'_>) -> DdlResult<()>;

    /// Runs before validation. Drops delete their target here.
    fn pre_validate(&mut self, _cx: &mut StatementContext<'_>) -> DdlResult<()> {
        Ok(())
    }

    /// Root of a DROP; enables cascade probing.
    fn drop_target(&self) -> Option<ObjectId> {
        None
    }

    /// DROP ... RESTRICT: restrict rules raise instead of cascading.
    fn is_drop_restricted(&self) -> bool {
        false
    }

    /// CREATE OR REPLACE: the element this statement created. An existing
    /// sibling with the same name and kind is deleted and its dependents
    /// are moved over to this element.
    fn replacing(&self) -> Option<ObjectId> {
        None
    }

    fn as_multi_phase(&mut self) -> Option<&mut dyn MultiPhaseStatement> {
        None
    }

    /// Text returned to the caller once the statement committed.
    fn completion_message(&self) -> String {
        self.describe()
    }
}
