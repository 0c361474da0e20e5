use crate::catalog::util::{
    find_column, resolve_element, resolve_schema, resolve_table, split_qualified,
};
use crate::catalog::{CatalogRepository, ObjectAttrs, ObjectId, ObjectKind, RelationshipType};
use crate::ddl::statement::{DdlStatement, StatementContext};
use crate::error::{DdlError, DdlResult};
use crate::parser::command::{ColumnDef, TableConstraintDef};

const IDENTITY_START: i64 = 1;
const IDENTITY_INCREMENT: i64 = 1;

/// Creates a column owned by `table`, plus its identity sequence.
pub(crate) fn create_column(
    repo: &mut dyn CatalogRepository,
    table: ObjectId,
    def: &ColumnDef,
    ordinal: usize,
) -> DdlResult<ObjectId> {
    let column = repo.create_object(
        &def.name,
        Some(table),
        ObjectAttrs::Column {
            data_type: def.dtype.clone(),
            nullable: !def.not_null,
            default: def.default.clone(),
            ordinal,
        },
    )?;
    if def.identity {
        repo.create_object(
            &format!("{}_seq", def.name),
            Some(column),
            ObjectAttrs::Sequence {
                start: IDENTITY_START,
                increment: IDENTITY_INCREMENT,
            },
        )?;
    }
    Ok(column)
}

fn resolve_columns(
    repo: &dyn CatalogRepository,
    table: ObjectId,
    names: &[String],
) -> DdlResult<Vec<ObjectId>> {
    names
        .iter()
        .map(|name| {
            find_column(repo, table, name).ok_or_else(|| DdlError::NotFound {
                kind: "column",
                name: name.clone(),
            })
        })
        .collect()
}

fn generated_name(prefix: &str, repo: &dyn CatalogRepository, table: ObjectId, columns: &[String]) -> String {
    let table_name = repo.lookup(table).map(|o| o.name.clone()).unwrap_or_default();
    format!("{prefix}_{}_{}", table_name, columns.join("_")).to_lowercase()
}

/// Creates a unique key on `table` and the unique index that enforces it.
pub(crate) fn create_unique_key(
    repo: &mut dyn CatalogRepository,
    table: ObjectId,
    name: Option<&str>,
    columns: &[String],
) -> DdlResult<ObjectId> {
    let column_ids = resolve_columns(&*repo, table, columns)?;
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| generated_name("uk", &*repo, table, columns));
    let key = repo.create_object(&name, Some(table), ObjectAttrs::UniqueConstraint)?;
    for column in &column_ids {
        repo.link(RelationshipType::KeyColumn, key, *column)?;
    }

    let schema = repo
        .lookup(table)
        .and_then(|o| o.container)
        .ok_or(DdlError::MissingObject(table))?;
    let index = repo.create_object(
        &name,
        Some(schema),
        ObjectAttrs::Index {
            unique: true,
            root: None,
            invalid: false,
        },
    )?;
    repo.link(RelationshipType::IndexSpansTable, index, table)?;
    for column in &column_ids {
        repo.link(RelationshipType::IndexedColumn, index, *column)?;
    }
    repo.link(RelationshipType::KeyIndex, key, index)?;
    Ok(key)
}

fn create_foreign_key(
    repo: &mut dyn CatalogRepository,
    default_schema: &str,
    table: ObjectId,
    name: Option<&str>,
    columns: &[String],
    ref_table: &str,
    ref_columns: &[String],
) -> DdlResult<ObjectId> {
    let column_ids = resolve_columns(&*repo, table, columns)?;
    let referenced = resolve_table(&*repo, default_schema, ref_table)?;
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| generated_name("fk", &*repo, table, columns));
    let fk = repo.create_object(
        &name,
        Some(table),
        ObjectAttrs::ForeignKey {
            referenced_columns: ref_columns.to_vec(),
        },
    )?;
    for column in column_ids {
        repo.link(RelationshipType::KeyColumn, fk, column)?;
    }
    repo.link(RelationshipType::ForeignKeyReferences, fk, referenced)?;
    Ok(fk)
}

fn target_schema(cx: &StatementContext<'_>, name: &str) -> DdlResult<(ObjectId, String)> {
    let (schema, local) = split_qualified(name);
    let schema = resolve_schema(&*cx.repo, schema.unwrap_or(cx.default_schema()))?;
    Ok((schema, local.to_string()))
}

#[derive(Debug, Clone)]
pub struct CreateSchema {
    name: String,
}

impl CreateSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl DdlStatement for CreateSchema {
    fn describe(&self) -> String {
        format!("create schema {}", self.name)
    }

    fn apply(&mut self, cx: &mut StatementContext<'_>) -> DdlResult<()> {
        if cx.repo.find_by_name(None, &self.name).is_some() {
            return Err(DdlError::NameInUse {
                element: format!("schema {}", self.name),
                container: "the catalog".to_string(),
            });
        }
        cx.repo.create_object(&self.name, None, ObjectAttrs::Schema)?;
        Ok(())
    }

    fn completion_message(&self) -> String {
        format!("created schema {}", self.name)
    }
}

#[derive(Debug, Clone)]
pub struct CreateTable {
    name: String,
    temporary: bool,
    columns: Vec<ColumnDef>,
    constraints: Vec<TableConstraintDef>,
    table: Option<ObjectId>,
}

impl CreateTable {
    pub fn new(
        name: impl Into<String>,
        temporary: bool,
        columns: Vec<ColumnDef>,
        constraints: Vec<TableConstraintDef>,
    ) -> Self {
        Self {
            name: name.into(),
            temporary,
            columns,
            constraints,
            table: None,
        }
    }

    pub fn table(&self) -> Option<ObjectId> {
        self.table
    }
}

impl DdlStatement for CreateTable {
    fn describe(&self) -> String {
        format!("create table {}", self.name)
    }

    fn apply(&mut self, cx: &mut StatementContext<'_>) -> DdlResult<()> {
        let (schema, local) = target_schema(cx, &self.name)?;
        let table = cx.repo.create_object(
            &local,
            Some(schema),
            ObjectAttrs::Table {
                temporary: self.temporary,
                row_count: 0,
            },
        )?;
        self.table = Some(table);

        for (ordinal, def) in self.columns.iter().enumerate() {
            create_column(&mut *cx.repo, table, def, ordinal)?;
        }
        for def in self.columns.iter().filter(|c| c.unique) {
            create_unique_key(&mut *cx.repo, table, None, std::slice::from_ref(&def.name))?;
        }
        for constraint in &self.constraints {
            match constraint {
                TableConstraintDef::Unique { name, columns } => {
                    create_unique_key(&mut *cx.repo, table, name.as_deref(), columns)?;
                }
                TableConstraintDef::ForeignKey {
                    name,
                    columns,
                    ref_table,
                    ref_columns,
                } => {
                    let default_schema = cx.config.default_schema.clone();
                    create_foreign_key(
                        &mut *cx.repo,
                        &default_schema,
                        table,
                        name.as_deref(),
                        columns,
                        ref_table,
                        ref_columns,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn completion_message(&self) -> String {
        format!("created table {}", self.name)
    }
}

#[derive(Debug, Clone)]
pub struct CreateIndex {
    name: String,
    unique: bool,
    table: String,
    columns: Vec<String>,
}

impl CreateIndex {
    pub fn new(name: impl Into<String>, unique: bool, table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            unique,
            table: table.into(),
            columns,
        }
    }
}

impl DdlStatement for CreateIndex {
    fn describe(&self) -> String {
        format!("create index {} on {}", self.name, self.table)
    }

    fn apply(&mut self, cx: &mut StatementContext<'_>) -> DdlResult<()> {
        let table = resolve_table(&*cx.repo, cx.default_schema(), &self.table)?;
        let column_ids = resolve_columns(&*cx.repo, table, &self.columns)?;
        let schema = cx
            .repo
            .lookup(table)
            .and_then(|o| o.container)
            .ok_or(DdlError::MissingObject(table))?;
        let index = cx.repo.create_object(
            &self.name,
            Some(schema),
            ObjectAttrs::Index {
                unique: self.unique,
                root: None,
                invalid: false,
            },
        )?;
        cx.repo.link(RelationshipType::IndexSpansTable, index, table)?;
        for column in column_ids {
            cx.repo.link(RelationshipType::IndexedColumn, index, column)?;
        }
        Ok(())
    }

    fn completion_message(&self) -> String {
        format!("created index {} on {}({})", self.name, self.table, self.columns.join(","))
    }
}

/// CREATE [OR REPLACE] VIEW. Sources are resolved before the view exists,
/// so a replacement may read the view it replaces.
#[derive(Debug, Clone)]
pub struct CreateView {
    name: String,
    definition: String,
    sources: Vec<String>,
    replace: bool,
    view: Option<ObjectId>,
}

impl CreateView {
    pub fn new(name: impl Into<String>, definition: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            sources,
            replace: false,
            view: None,
        }
    }

    pub fn or_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    pub fn view(&self) -> Option<ObjectId> {
        self.view
    }
}

impl DdlStatement for CreateView {
    fn describe(&self) -> String {
        if self.replace {
            format!("create or replace view {}", self.name)
        } else {
            format!("create view {}", self.name)
        }
    }

    fn apply(&mut self, cx: &mut StatementContext<'_>) -> DdlResult<()> {
        let (schema, local) = target_schema(cx, &self.name)?;
        let mut suppliers = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            suppliers.push(resolve_element(
                &*cx.repo,
                cx.default_schema(),
                source,
                &[ObjectKind::Table, ObjectKind::View],
                "table or view",
            )?);
        }
        let view = cx.repo.create_object(
            &local,
            Some(schema),
            ObjectAttrs::View {
                definition: self.definition.clone(),
            },
        )?;
        for supplier in suppliers {
            cx.repo.link(RelationshipType::ViewDependsOn, view, supplier)?;
        }
        self.view = Some(view);
        Ok(())
    }

    fn replacing(&self) -> Option<ObjectId> {
        self.view.filter(|_| self.replace)
    }

    fn completion_message(&self) -> String {
        if self.replace {
            format!("created or replaced view {}", self.name)
        } else {
            format!("created view {}", self.name)
        }
    }
}

