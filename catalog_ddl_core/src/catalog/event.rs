use super::object::{ObjectId, ObjectKind};
use super::relationship::{LinkEnd, RelationshipType};

/// Pre-commit change notification delivered by a catalog repository.
///
/// Link events name the end at which `fixed` sits; the other element is
/// `new` (for additions) or `old` (for removals). Kinds travel with the
/// event so subscribers can inspect elements that are mid-deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    InstanceDelete {
        id: ObjectId,
        kind: ObjectKind,
    },
    AttributeChange {
        id: ObjectId,
        attribute: &'static str,
    },
    LinkAdd {
        relationship: RelationshipType,
        end: LinkEnd,
        fixed: ObjectId,
        new: ObjectId,
    },
    LinkRemove {
        relationship: RelationshipType,
        end: LinkEnd,
        fixed: ObjectId,
        fixed_kind: ObjectKind,
        old: ObjectId,
        old_kind: ObjectKind,
    },
}

/// Observer invoked synchronously before each catalog mutation.
pub trait ChangeListener {
    fn planned_change(&self, event: &ChangeEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);
