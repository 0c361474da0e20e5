use tracing::debug;

use crate::catalog::util::{
    column_positions, owned_of_kind, qualified_name, resolve_element, resolve_table,
    set_row_count, table_columns, table_indexes,
};
use crate::catalog::{CatalogObject, ObjectAttrs, ObjectId, ObjectKind, RelationshipType};
use crate::ddl::handlers::relational::index_key;
use crate::error::{DdlError, DdlResult};
use crate::types::Row;
use crate::types::value::Value;

use super::execute::EngineContext;
use super::format::{format_describe, format_select, format_tables};

/// Index entries one inserted row adds.
struct IndexEntry {
    root: u64,
    key: String,
    unique: bool,
}

pub(super) fn handle_insert(
    table_name: &str,
    tokens: &[String],
    cx: &mut EngineContext<'_>,
) -> DdlResult<String> {
    let table = resolve_table(&*cx.catalog, &cx.config.default_schema, table_name)?;
    let columns = column_objects(cx, table)?;
    if tokens.len() != columns.len() {
        return Err(DdlError::validation(format!(
            "Expected {} values for {} but got {}",
            columns.len(),
            table_name,
            tokens.len()
        )));
    }

    if !cx.storage.has_table(table) {
        return Err(DdlError::storage(format!("table '{table_name}' has no storage")));
    }
    let ordinal = cx.storage.scan(table)?.len() as u64;

    let mut row: Row = Vec::with_capacity(columns.len());
    for (column, token) in columns.iter().zip(tokens) {
        let value = column_value(cx, column, token, ordinal)?;
        if value.is_null() && matches!(column.attrs, ObjectAttrs::Column { nullable: false, .. }) {
            return Err(DdlError::validation(format!(
                "column '{}' cannot be null",
                column.name
            )));
        }
        row.push(value);
    }

    let entries = index_entries(cx, table, &row)?;
    for entry in entries.iter().filter(|e| e.unique) {
        if cx.storage.index_contains(entry.root, &entry.key)? {
            return Err(DdlError::validation(format!(
                "duplicate key violates unique index on {table_name}"
            )));
        }
    }

    let position = cx.storage.insert_row(table, row)?;
    for entry in entries {
        cx.storage
            .index_insert(entry.root, entry.key, position, entry.unique)?;
    }

    let depth = cx.catalog.txn_depth();
    cx.catalog.begin_txn(true)?;
    if let Err(err) = set_row_count(&mut *cx.catalog, table, ordinal + 1) {
        while cx.catalog.txn_depth() > depth {
            cx.catalog.rollback_txn()?;
        }
        return Err(err);
    }
    cx.catalog.commit_txn()?;
    cx.storage.checkpoint()?;
    debug!(table = %table, position, "row inserted");
    Ok("inserted 1 row".to_string())
}

pub(super) fn handle_select(table_name: &str, cx: &mut EngineContext<'_>) -> DdlResult<String> {
    let table = resolve_table(&*cx.catalog, &cx.config.default_schema, table_name)?;
    let columns = column_objects(cx, table)?;
    let rows = cx.storage.scan(table)?;
    Ok(format_select(&columns, rows))
}

pub(super) fn handle_describe(table_name: &str, cx: &mut EngineContext<'_>) -> DdlResult<String> {
    let target = resolve_element(
        &*cx.catalog,
        &cx.config.default_schema,
        table_name,
        &[ObjectKind::Table, ObjectKind::View],
        "table",
    )?;
    let columns = column_objects(cx, target)?;
    let indexes = table_indexes(&*cx.catalog, target)
        .into_iter()
        .filter_map(|id| cx.catalog.lookup(id).cloned())
        .collect::<Vec<_>>();
    Ok(format_describe(&*cx.catalog, &columns, &indexes))
}

pub(super) fn handle_show_tables(cx: &mut EngineContext<'_>) -> DdlResult<String> {
    let mut names = cx
        .catalog
        .objects_of_kind(ObjectKind::Table)
        .into_iter()
        .map(|id| qualified_name(&*cx.catalog, id))
        .collect::<Vec<_>>();
    names.sort();
    Ok(format_tables(&names))
}

fn column_objects(cx: &EngineContext<'_>, table: ObjectId) -> DdlResult<Vec<CatalogObject>> {
    table_columns(&*cx.catalog, table)
        .into_iter()
        .map(|id| {
            cx.catalog
                .lookup(id)
                .cloned()
                .ok_or(DdlError::MissingObject(id))
        })
        .collect()
}

fn column_value(
    cx: &EngineContext<'_>,
    column: &CatalogObject,
    token: &str,
    ordinal: u64,
) -> DdlResult<Value> {
    let ObjectAttrs::Column {
        data_type, default, ..
    } = &column.attrs
    else {
        return Err(DdlError::Internal(format!("{} is not a column", column.id)));
    };
    if !token.eq_ignore_ascii_case("default") {
        return Value::parse(data_type, token).map_err(DdlError::Validation);
    }
    let identity = owned_of_kind(&*cx.catalog, column.id, ObjectKind::Sequence)
        .first()
        .and_then(|id| cx.catalog.lookup(*id))
        .and_then(|seq| match seq.attrs {
            ObjectAttrs::Sequence { start, increment } => Some((start, increment)),
            _ => None,
        });
    match (identity, default) {
        (Some((start, increment)), _) => Ok(Value::from_sequence(data_type, start, increment, ordinal)),
        (None, Some(text)) => Value::parse(data_type, text).map_err(DdlError::Validation),
        (None, None) => Ok(Value::Null),
    }
}

fn index_entries(cx: &EngineContext<'_>, table: ObjectId, row: &[Value]) -> DdlResult<Vec<IndexEntry>> {
    let mut entries = Vec::new();
    for index in table_indexes(&*cx.catalog, table) {
        let obj = cx.catalog.lookup(index).ok_or(DdlError::MissingObject(index))?;
        let ObjectAttrs::Index {
            unique,
            root: Some(root),
            invalid: false,
        } = obj.attrs
        else {
            continue;
        };
        let columns = cx.catalog.links_from(index, RelationshipType::IndexedColumn);
        let positions = column_positions(&*cx.catalog, table, &columns);
        let (key, has_null) = index_key(row, &positions);
        entries.push(IndexEntry {
            root,
            key,
            unique: unique && !has_null,
        });
    }
    Ok(entries)
}
