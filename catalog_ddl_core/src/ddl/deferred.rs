use crate::catalog::util::describe;
use crate::catalog::{CatalogRepository, ObjectId};
use crate::error::DdlError;

/// Error detected while objects are mid-deletion. Only identifiers are kept;
/// the message is built after the probe rollback restores the objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredError {
    DropRestrict {
        dropped: ObjectId,
        dependent: ObjectId,
    },
    ObjectInUse {
        id: ObjectId,
    },
}

impl DeferredError {
    pub fn materialize(&self, repo: &dyn CatalogRepository) -> DdlError {
        match *self {
            DeferredError::DropRestrict { dropped, dependent } => DdlError::DropRestrict {
                dropped: describe(repo, dropped),
                dependent: describe(repo, dependent),
            },
            DeferredError::ObjectInUse { id } => DdlError::ObjectInUse(describe(repo, id)),
        }
    }
}
