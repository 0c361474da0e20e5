use thiserror::Error;

use crate::catalog::ObjectId;

/// Errors raised while validating or executing a DDL statement.
#[derive(Debug, Error)]
pub enum DdlError {
    #[error("{kind} '{name}' does not exist")]
    NotFound { kind: &'static str, name: String },

    #[error("catalog object {0} does not exist")]
    MissingObject(ObjectId),

    #[error("{0}")]
    Validation(String),

    #[error("{element} is defined more than once in {container}")]
    DuplicateName { element: String, container: String },

    #[error("{element} already exists in {container}")]
    NameInUse { element: String, container: String },

    /// Retry signal: the object depends on something validated later in the
    /// same statement. Consumed by the fixpoint loop, never returned from it.
    #[error("validation of {0} depends on an object that has not been validated yet")]
    UnvalidatedDependency(ObjectId),

    #[error("dependency cycle detected among: {}", .members.join(", "))]
    DependencyCycle { members: Vec<String> },

    #[error("cannot drop {dropped} because {dependent} depends on it; use CASCADE")]
    DropRestrict { dropped: String, dependent: String },

    #[error("cannot drop {0} because it is in use")]
    ObjectInUse(String),

    #[error("cannot replace {0} because it is in use")]
    ReplacedObjectInUse(String),

    #[error("no catalog transaction is active")]
    NoTransaction,

    #[error("catalog transaction is read-only")]
    ReadOnlyTransaction,

    #[error("unlocked execution failed: {0}")]
    UnlockedExecution(String),

    #[error("simulated crash: {0}")]
    SimulatedCrash(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type DdlResult<T> = Result<T, DdlError>;

impl DdlError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DdlError::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        DdlError::Storage(msg.into())
    }

    /// True for the retry signal used by rule bodies.
    pub fn is_unvalidated_dependency(&self) -> bool {
        matches!(self, DdlError::UnvalidatedDependency(_))
    }
}
