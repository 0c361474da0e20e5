//! Schema-change validation and execution.
//!
//! A statement mutates the catalog directly; [`DdlValidator`] hears every
//! mutation through the repository's change feed, validates the touched
//! objects to a fixpoint, then commits their storage effects. Statements
//! with expensive physical work continue through [`MultiPhaseDriver`].

pub mod action;
pub mod deferred;
pub mod dispatch;
pub mod drop_rule;
pub mod handlers;
pub mod lock;
pub mod multi_phase;
pub mod recovery;
pub mod reload;
pub mod session;
pub mod statement;
pub mod statements;
pub mod validator;

pub use action::ActionKind;
pub use deferred::DeferredError;
pub use dispatch::{DdlHandler, DdlRegistry, HandlerContext, HandlerMethod, HandlerRegistry};
pub use drop_rule::{DropAction, DropRule, DropRuleTable, DropRuleTableBuilder};
pub use lock::DdlLockManager;
pub use multi_phase::{MultiPhaseDriver, MultiPhaseStatement, PhaseContext, PhaseState};
pub use recovery::recover_abandoned_statements;
pub use reload::{ReentrantSession, ReloadCommand, StorageSession, TableReload};
pub use session::ValidationSession;
pub use statement::{DdlStatement, StatementContext};
pub use validator::{DdlValidator, StorageReport};
