use std::rc::Rc;

use crate::error::DdlResult;

use super::event::{ChangeListener, ListenerId};
use super::object::{CatalogObject, ObjectAttrs, ObjectId, ObjectKind, Visibility};
use super::relationship::RelationshipType;

/// Catalog repository contract - the object store the DDL engine validates
/// against. Mutations notify subscribed listeners before they take effect
/// and require an open write transaction.
pub trait CatalogRepository {
    /// Begins a (possibly nested) transaction.
    fn begin_txn(&mut self, write: bool) -> DdlResult<()>;

    /// Commits the innermost transaction; the outermost commit makes changes durable.
    fn commit_txn(&mut self) -> DdlResult<()>;

    /// Rolls back the innermost transaction. Identifiers allocated inside it
    /// are never reused.
    fn rollback_txn(&mut self) -> DdlResult<()>;

    fn txn_depth(&self) -> usize;

    fn lookup(&self, id: ObjectId) -> Option<&CatalogObject>;

    fn create_object(
        &mut self,
        name: &str,
        container: Option<ObjectId>,
        attrs: ObjectAttrs,
    ) -> DdlResult<ObjectId>;

    /// Applies `edit` to the object and notifies an attribute change.
    fn modify(
        &mut self,
        id: ObjectId,
        attribute: &'static str,
        edit: &mut dyn FnMut(&mut CatalogObject),
    ) -> DdlResult<()>;

    /// Deletes the object, everything it owns, and every link touching them.
    fn delete(&mut self, id: ObjectId) -> DdlResult<()>;

    fn link(&mut self, relationship: RelationshipType, source: ObjectId, target: ObjectId)
    -> DdlResult<()>;

    fn unlink(
        &mut self,
        relationship: RelationshipType,
        source: ObjectId,
        target: ObjectId,
    ) -> DdlResult<()>;

    /// Targets of links of `relationship` whose source is `id`, in link order.
    fn links_from(&self, id: ObjectId, relationship: RelationshipType) -> Vec<ObjectId>;

    /// Sources of links of `relationship` whose target is `id`, in link order.
    fn links_to(&self, id: ObjectId, relationship: RelationshipType) -> Vec<ObjectId>;

    fn objects_of_kind(&self, kind: ObjectKind) -> Vec<ObjectId>;

    /// Case-insensitive name lookup among the elements owned by `container`
    /// (or among top-level elements when `container` is `None`).
    fn find_by_name(&self, container: Option<ObjectId>, name: &str) -> Option<ObjectId>;

    fn subscribe(&mut self, listener: Rc<dyn ChangeListener>) -> ListenerId;

    fn unsubscribe(&mut self, id: ListenerId);

    /// Integrity problems around one object: dangling containers or links.
    fn verify_integrity(&self, _id: ObjectId) -> Vec<String> {
        Vec::new()
    }

    fn set_visibility(&mut self, id: ObjectId, visibility: Visibility) -> DdlResult<()> {
        self.modify(id, "visibility", &mut |obj| obj.visibility = visibility)
    }

    fn kind_of(&self, id: ObjectId) -> Option<ObjectKind> {
        self.lookup(id).map(|o| o.kind)
    }
}
