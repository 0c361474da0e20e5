use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::types::datatype::DataType;

/// Repository-assigned identifier, stable across rollback and restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Concrete catalog object types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Schema,
    Table,
    View,
    Column,
    Index,
    UniqueConstraint,
    ForeignKey,
    Sequence,
    Grant,
    RecoveryMarker,
}

/// Type tags handlers register against: every concrete kind plus the
/// abstract supertypes of the catalog type hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Element,
    Namespace,
    ColumnSet,
    Constraint,
    Schema,
    Table,
    View,
    Column,
    Index,
    UniqueConstraint,
    ForeignKey,
    Sequence,
    Grant,
    RecoveryMarker,
}

impl ObjectKind {
    /// Type hierarchy of this kind, most specific tag first.
    pub fn lineage(self) -> &'static [TypeTag] {
        match self {
            ObjectKind::Schema => &[TypeTag::Schema, TypeTag::Namespace, TypeTag::Element],
            ObjectKind::Table => &[
                TypeTag::Table,
                TypeTag::ColumnSet,
                TypeTag::Namespace,
                TypeTag::Element,
            ],
            ObjectKind::View => &[
                TypeTag::View,
                TypeTag::ColumnSet,
                TypeTag::Namespace,
                TypeTag::Element,
            ],
            ObjectKind::Column => &[TypeTag::Column, TypeTag::Element],
            ObjectKind::Index => &[TypeTag::Index, TypeTag::Element],
            ObjectKind::UniqueConstraint => &[
                TypeTag::UniqueConstraint,
                TypeTag::Constraint,
                TypeTag::Element,
            ],
            ObjectKind::ForeignKey => &[TypeTag::ForeignKey, TypeTag::Constraint, TypeTag::Element],
            ObjectKind::Sequence => &[TypeTag::Sequence, TypeTag::Element],
            ObjectKind::Grant => &[TypeTag::Grant, TypeTag::Element],
            ObjectKind::RecoveryMarker => &[TypeTag::RecoveryMarker, TypeTag::Element],
        }
    }

    pub fn is_a(self, tag: TypeTag) -> bool {
        self.lineage().contains(&tag)
    }

    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::Schema => "schema",
            ObjectKind::Table => "table",
            ObjectKind::View => "view",
            ObjectKind::Column => "column",
            ObjectKind::Index => "index",
            ObjectKind::UniqueConstraint => "unique constraint",
            ObjectKind::ForeignKey => "foreign key",
            ObjectKind::Sequence => "sequence",
            ObjectKind::Grant => "grant",
            ObjectKind::RecoveryMarker => "recovery reference",
        }
    }

    /// Name class used for uniqueness checks; tables and views share one.
    pub fn namespace_class(self) -> &'static str {
        match self {
            ObjectKind::Table | ObjectKind::View => "column set",
            ObjectKind::UniqueConstraint | ObjectKind::ForeignKey => "constraint",
            other => other.label(),
        }
    }
}

/// "New vs. pre-existing" marker. Objects created by the current statement
/// start `Unset`, become `Private` once validated and `Public` once committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Unset,
    Private,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryType {
    AlterTableAddColumn,
    AlterTableRebuild,
}

impl fmt::Display for RecoveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryType::AlterTableAddColumn => write!(f, "alter-table-add-column"),
            RecoveryType::AlterTableRebuild => write!(f, "alter-table-rebuild"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectAttrs {
    Schema,
    Table {
        temporary: bool,
        row_count: u64,
    },
    View {
        definition: String,
    },
    Column {
        data_type: DataType,
        nullable: bool,
        default: Option<String>,
        ordinal: usize,
    },
    Index {
        unique: bool,
        root: Option<u64>,
        invalid: bool,
    },
    UniqueConstraint,
    ForeignKey {
        referenced_columns: Vec<String>,
    },
    Sequence {
        start: i64,
        increment: i64,
    },
    Grant {
        grantor: String,
        grantee: String,
        privilege: String,
    },
    RecoveryMarker {
        recovery_type: RecoveryType,
        pending_roots: Vec<u64>,
        prior_row_count: Option<u64>,
    },
}

impl ObjectAttrs {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectAttrs::Schema => ObjectKind::Schema,
            ObjectAttrs::Table { .. } => ObjectKind::Table,
            ObjectAttrs::View { .. } => ObjectKind::View,
            ObjectAttrs::Column { .. } => ObjectKind::Column,
            ObjectAttrs::Index { .. } => ObjectKind::Index,
            ObjectAttrs::UniqueConstraint => ObjectKind::UniqueConstraint,
            ObjectAttrs::ForeignKey { .. } => ObjectKind::ForeignKey,
            ObjectAttrs::Sequence { .. } => ObjectKind::Sequence,
            ObjectAttrs::Grant { .. } => ObjectKind::Grant,
            ObjectAttrs::RecoveryMarker { .. } => ObjectKind::RecoveryMarker,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogObject {
    pub id: ObjectId,
    pub name: String,
    pub kind: ObjectKind,
    pub container: Option<ObjectId>,
    #[serde(default)]
    pub owned: Vec<ObjectId>,
    #[serde(default)]
    pub visibility: Visibility,
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub modification_timestamp: Option<DateTime<Utc>>,
    pub lineage_id: Option<Uuid>,
    pub attrs: ObjectAttrs,
}

impl CatalogObject {
    pub fn is_new(&self) -> bool {
        self.visibility != Visibility::Public
    }

    pub fn column_type(&self) -> Option<&DataType> {
        match &self.attrs {
            ObjectAttrs::Column { data_type, .. } => Some(data_type),
            _ => None,
        }
    }

    pub fn ordinal(&self) -> Option<usize> {
        match &self.attrs {
            ObjectAttrs::Column { ordinal, .. } => Some(*ordinal),
            _ => None,
        }
    }

    pub fn index_root(&self) -> Option<u64> {
        match &self.attrs {
            ObjectAttrs::Index { root, .. } => *root,
            _ => None,
        }
    }

    pub fn row_count(&self) -> Option<u64> {
        match &self.attrs {
            ObjectAttrs::Table { row_count, .. } => Some(*row_count),
            _ => None,
        }
    }
}
