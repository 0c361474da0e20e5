use crate::catalog::ObjectKind;
use crate::types::datatype::DataType;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub dtype: DataType,
    pub not_null: bool,
    pub unique: bool,
    /// Values come from an owned sequence starting at 1.
    pub identity: bool,
    pub default: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, dtype: DataType) -> Self {
        Self {
            name: name.into(),
            dtype,
            not_null: false,
            unique: false,
            identity: false,
            default: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraintDef {
    Unique {
        name: Option<String>,
        columns: Vec<String>,
    },
    ForeignKey {
        name: Option<String>,
        columns: Vec<String>,
        ref_table: String,
        ref_columns: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterAction {
    AddColumn(ColumnDef),
    Rebuild,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateSchema {
        name: String,
    },
    CreateTable {
        table: String,
        temporary: bool,
        columns: Vec<ColumnDef>,
        table_constraints: Vec<TableConstraintDef>,
    },
    CreateIndex {
        name: String,
        unique: bool,
        table: String,
        columns: Vec<String>,
    },
    CreateView {
        name: String,
        /// CREATE OR REPLACE: an existing view of the same name is replaced.
        replace: bool,
        definition: String,
        sources: Vec<String>,
    },
    Drop {
        kind: ObjectKind,
        name: String,
        cascade: bool,
    },
    Truncate {
        table: String,
    },
    Alter {
        table: String,
        action: AlterAction,
    },
    Insert {
        table: String,
        values: Vec<String>,
    },
    Select {
        table: String,
    },
    Describe {
        table: String,
    },
    ShowTables,
}

impl Command {
    /// Schema-changing commands run through the DDL validator.
    pub fn is_ddl(&self) -> bool {
        !matches!(
            self,
            Command::Insert { .. } | Command::Select { .. } | Command::Describe { .. } | Command::ShowTables
        )
    }
}
