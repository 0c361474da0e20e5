use std::fmt;

use tracing::{info, warn};

use crate::catalog::{CatalogRepository, ObjectId};
use crate::config::{EngineConfig, TestTraps};
use crate::error::{DdlError, DdlResult};
use crate::storage::StorageEngine;

use super::lock::DdlLockManager;
use super::reload::{ReentrantSession, StorageSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    Prepared,
    ExecutingUnlocked,
    Completing,
    Done,
    Failed,
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PhaseState::Prepared => "prepared",
            PhaseState::ExecutingUnlocked => "executing-unlocked",
            PhaseState::Completing => "completing",
            PhaseState::Done => "done",
            PhaseState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Catalog side of a multi-phase statement: what prepare and completion run against.
pub struct PhaseContext<'p> {
    pub repo: &'p mut dyn CatalogRepository,
    pub storage: &'p mut dyn StorageEngine,
    pub config: &'p EngineConfig,
    pub traps: &'p TestTraps,
}

/// A statement whose physical work runs outside any catalog transaction.
///
/// `prep_for_execute_unlocked` runs in the statement's transaction and must
/// capture everything the unlocked step needs; `execute_unlocked` sees only
/// storage; `complete_after_execute_unlocked` runs in a fresh transaction
/// and must remove the recovery marker whatever the outcome.
pub trait MultiPhaseStatement {
    /// Object held in use while the unlocked step runs.
    fn target(&self) -> Option<ObjectId>;

    fn prep_for_execute_unlocked(&mut self, cx: &mut PhaseContext<'_>) -> DdlResult<()>;

    fn execute_unlocked(
        &mut self,
        session: &mut dyn ReentrantSession,
        traps: &TestTraps,
    ) -> DdlResult<()>;

    fn complete_requires_write_txn(&self) -> bool {
        true
    }

    fn complete_after_execute_unlocked(
        &mut self,
        cx: &mut PhaseContext<'_>,
        success: bool,
    ) -> DdlResult<()>;
}

/// Drives one statement through prepare, unlocked execution and completion.
/// Must be entered with the statement's write transaction open; the driver
/// commits it before the unlocked step.
pub struct MultiPhaseDriver<'d> {
    repo: &'d mut dyn CatalogRepository,
    storage: &'d mut dyn StorageEngine,
    config: &'d EngineConfig,
    traps: &'d TestTraps,
    locks: &'d mut DdlLockManager,
    state: Option<PhaseState>,
    executed: Vec<String>,
}

impl<'d> MultiPhaseDriver<'d> {
    pub fn new(
        repo: &'d mut dyn CatalogRepository,
        storage: &'d mut dyn StorageEngine,
        config: &'d EngineConfig,
        traps: &'d TestTraps,
        locks: &'d mut DdlLockManager,
    ) -> Self {
        Self {
            repo,
            storage,
            config,
            traps,
            locks,
            state: None,
            executed: Vec::new(),
        }
    }

    /// Last state reached.
    pub fn state(&self) -> Option<PhaseState> {
        self.state
    }

    /// DML text run by the unlocked step.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    fn enter(&mut self, state: PhaseState) {
        info!(%state, "multi-phase statement");
        self.state = Some(state);
    }

    fn context(&mut self) -> PhaseContext<'_> {
        PhaseContext {
            repo: &mut *self.repo,
            storage: &mut *self.storage,
            config: self.config,
            traps: self.traps,
        }
    }

    pub fn run(&mut self, stmt: &mut dyn MultiPhaseStatement) -> DdlResult<()> {
        if self.repo.txn_depth() == 0 {
            return Err(DdlError::NoTransaction);
        }
        stmt.prep_for_execute_unlocked(&mut self.context())?;
        self.enter(PhaseState::Prepared);
        self.repo.commit_txn()?;
        self.storage.checkpoint()?;

        let target = stmt.target();
        if let Some(target) = target {
            self.locks.acquire(target);
        }
        let outcome = self.execute_and_complete(stmt);
        if let Some(target) = target {
            self.locks.release(target);
        }
        outcome
    }

    fn execute_and_complete(&mut self, stmt: &mut dyn MultiPhaseStatement) -> DdlResult<()> {
        self.enter(PhaseState::ExecutingUnlocked);
        let unlocked = {
            let mut session = StorageSession::new(&mut *self.storage);
            let result = stmt.execute_unlocked(&mut session, self.traps);
            self.executed = session.into_executed();
            result
        };

        match unlocked {
            Ok(()) => {
                self.enter(PhaseState::Completing);
                self.complete(stmt, true)?;
                self.enter(PhaseState::Done);
                Ok(())
            }
            Err(err) => {
                self.enter(PhaseState::Failed);
                warn!(error = %err, "unlocked execution failed; recovering");
                if let Err(recovery) = self.complete(stmt, false) {
                    warn!(error = %recovery, "recovery after failed execution also failed");
                }
                Err(err)
            }
        }
    }

    fn complete(&mut self, stmt: &mut dyn MultiPhaseStatement, success: bool) -> DdlResult<()> {
        self.repo.begin_txn(stmt.complete_requires_write_txn())?;
        match stmt.complete_after_execute_unlocked(&mut self.context(), success) {
            Ok(()) => {
                self.repo.commit_txn()?;
                self.storage.checkpoint()
            }
            Err(err) => {
                self.repo.rollback_txn()?;
                Err(err)
            }
        }
    }
}
