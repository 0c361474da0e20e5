use serde::{Deserialize, Serialize};

use super::object::ObjectId;

/// Association types of the catalog graph. Each link runs from a source
/// element to a target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Container owns element. Stored on the objects themselves; only seen
    /// as change events.
    Ownership,
    /// Index (source) spans table (target).
    IndexSpansTable,
    /// Index (source) is keyed on column (target).
    IndexedColumn,
    /// Unique or foreign key (source) covers column (target).
    KeyColumn,
    /// Unique key (source) is enforced by index (target).
    KeyIndex,
    /// Foreign key (source) references table (target).
    ForeignKeyReferences,
    /// View (source) reads from table or view (target).
    ViewDependsOn,
    /// Grant (source) is granted on element (target).
    PrivilegeOnElement,
    /// Recovery marker (source) describes an unfinished change to table (target).
    RecoveryTarget,
}

/// Which end of a link an element sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkEnd {
    Source,
    Target,
}

impl LinkEnd {
    pub fn opposite(self) -> LinkEnd {
        match self {
            LinkEnd::Source => LinkEnd::Target,
            LinkEnd::Target => LinkEnd::Source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub relationship: RelationshipType,
    pub source: ObjectId,
    pub target: ObjectId,
}

impl Link {
    pub fn touches(&self, id: ObjectId) -> bool {
        self.source == id || self.target == id
    }

    /// End at which `id` sits and the element at the other end.
    pub fn end_of(&self, id: ObjectId) -> Option<(LinkEnd, ObjectId)> {
        if self.source == id {
            Some((LinkEnd::Source, self.target))
        } else if self.target == id {
            Some((LinkEnd::Target, self.source))
        } else {
            None
        }
    }
}
