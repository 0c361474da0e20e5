//! Rule bodies for the relational object types.

use std::collections::BTreeSet;

use tracing::debug;

use crate::catalog::util::{
    column_positions, describe, find_column, owned_of_kind, set_index_root, set_row_count, table_columns,
    table_indexes,
};
use crate::catalog::{LinkEnd, ObjectAttrs, ObjectId, ObjectKind, RelationshipType, TypeTag};
use crate::error::{DdlError, DdlResult};
use crate::types::datatype::DataType;
use crate::types::value::{encode_key, Value};

use crate::ddl::dispatch::{DdlHandler, HandlerContext, HandlerMethod};
use crate::ddl::drop_rule::{DropRule, DropRuleTableBuilder};

const MAX_DECIMAL_PRECISION: u32 = 28;

/// Definition, drop and storage rules for schemas, tables, views, columns,
/// indexes, keys and sequences.
#[derive(Debug, Default, Clone, Copy)]
pub struct RelationalHandler;

const METHODS: &[(HandlerMethod, TypeTag)] = &[
    (HandlerMethod::ValidateDefinition, TypeTag::Namespace),
    (HandlerMethod::ValidateDefinition, TypeTag::Table),
    (HandlerMethod::ValidateDefinition, TypeTag::View),
    (HandlerMethod::ValidateDefinition, TypeTag::Column),
    (HandlerMethod::ValidateDefinition, TypeTag::Index),
    (HandlerMethod::ValidateDefinition, TypeTag::UniqueConstraint),
    (HandlerMethod::ValidateDefinition, TypeTag::ForeignKey),
    (HandlerMethod::ValidateDefinition, TypeTag::Sequence),
    (HandlerMethod::ValidateModification, TypeTag::Column),
    (HandlerMethod::ValidateDrop, TypeTag::Schema),
    (HandlerMethod::ValidateDrop, TypeTag::Column),
    (HandlerMethod::ValidateDrop, TypeTag::Index),
    (HandlerMethod::ValidateTruncation, TypeTag::Table),
    (HandlerMethod::ExecuteCreation, TypeTag::Table),
    (HandlerMethod::ExecuteCreation, TypeTag::Index),
    (HandlerMethod::ExecuteDrop, TypeTag::Table),
    (HandlerMethod::ExecuteDrop, TypeTag::Index),
    (HandlerMethod::ExecuteTruncation, TypeTag::Table),
];

impl DdlHandler for RelationalHandler {
    fn name(&self) -> &'static str {
        "relational"
    }

    fn methods(&self) -> &'static [(HandlerMethod, TypeTag)] {
        METHODS
    }

    fn invoke(
        &self,
        method: HandlerMethod,
        tag: TypeTag,
        cx: &mut HandlerContext<'_>,
        id: ObjectId,
    ) -> DdlResult<()> {
        use HandlerMethod::*;
        match (method, tag) {
            (ValidateDefinition, TypeTag::Namespace) => validate_namespace(cx, id),
            (ValidateDefinition, TypeTag::Table) => validate_table(cx, id),
            (ValidateDefinition, TypeTag::View) => validate_view(cx, id),
            (ValidateDefinition, TypeTag::Column) => validate_column(cx, id, true),
            (ValidateModification, TypeTag::Column) => validate_column(cx, id, false),
            (ValidateDefinition, TypeTag::Index) => validate_index(cx, id),
            (ValidateDefinition, TypeTag::UniqueConstraint) => validate_unique_key(cx, id),
            (ValidateDefinition, TypeTag::ForeignKey) => validate_foreign_key(cx, id),
            (ValidateDefinition, TypeTag::Sequence) => validate_sequence(cx, id),
            (ValidateDrop, TypeTag::Schema) => validate_drop_schema(cx, id),
            (ValidateDrop, TypeTag::Column) => validate_drop_column(cx, id),
            (ValidateDrop, TypeTag::Index) => validate_drop_index(cx, id),
            (ValidateTruncation, TypeTag::Table) => validate_truncate_table(cx, id),
            (ExecuteCreation, TypeTag::Table) => execute_create_table(cx, id),
            (ExecuteCreation, TypeTag::Index) => execute_create_index(cx, id),
            (ExecuteDrop, TypeTag::Table) => execute_drop_table(cx, id),
            (ExecuteDrop, TypeTag::Index) => execute_drop_index(cx, id),
            (ExecuteTruncation, TypeTag::Table) => execute_truncate_table(cx, id),
            _ => Err(DdlError::Internal(format!(
                "relational handler has no {method:?} for {tag:?}"
            ))),
        }
    }

    fn define_drop_rules(&self, rules: &mut DropRuleTableBuilder) {
        rules
            .add(
                RelationshipType::IndexSpansTable,
                DropRule::cascade(LinkEnd::Target),
            )
            .add(
                RelationshipType::IndexedColumn,
                DropRule::cascade(LinkEnd::Target).with_filter(TypeTag::Column),
            )
            .add(
                RelationshipType::KeyColumn,
                DropRule::cascade(LinkEnd::Target).with_filter(TypeTag::Column),
            )
            .add(
                RelationshipType::KeyIndex,
                DropRule::cascade(LinkEnd::Source),
            )
            .add(
                RelationshipType::ForeignKeyReferences,
                DropRule::restrict(LinkEnd::Target).with_filter(TypeTag::ColumnSet),
            )
            .add(
                RelationshipType::ViewDependsOn,
                DropRule::restrict(LinkEnd::Target).with_filter(TypeTag::ColumnSet),
            )
            .add(
                RelationshipType::PrivilegeOnElement,
                DropRule::cascade(LinkEnd::Target),
            )
            .add(
                RelationshipType::RecoveryTarget,
                DropRule::cascade(LinkEnd::Target),
            );
    }
}

fn live_owned(cx: &HandlerContext<'_>, container: ObjectId) -> DdlResult<Vec<ObjectId>> {
    let obj = cx.object(container)?;
    Ok(obj
        .owned
        .iter()
        .copied()
        .filter(|id| !cx.is_deleted_object(*id))
        .collect())
}

fn container_of(cx: &HandlerContext<'_>, id: ObjectId) -> DdlResult<ObjectId> {
    cx.object(id)?
        .container
        .ok_or_else(|| DdlError::validation(format!("{} has no container", cx.describe(id))))
}

fn validate_namespace(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    let owned = live_owned(cx, id)?;
    cx.validate_unique_names(id, &owned, true)
}

fn validate_table(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    let owned = live_owned(cx, id)?;
    cx.validate_unique_names(id, &owned, true)?;

    let columns: Vec<ObjectId> = table_columns(&*cx.repo, id)
        .into_iter()
        .filter(|c| !cx.is_deleted_object(*c))
        .collect();
    if columns.is_empty() {
        return Err(DdlError::validation(format!(
            "{} must have at least one column",
            cx.describe(id)
        )));
    }
    for (position, column) in columns.iter().enumerate() {
        if cx.object(*column)?.ordinal() != Some(position) {
            cx.repo.modify(*column, "ordinal", &mut |obj| {
                if let ObjectAttrs::Column { ordinal, .. } = &mut obj.attrs {
                    *ordinal = position;
                }
            })?;
        }
    }
    Ok(())
}

fn validate_view(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    let definition = match &cx.object(id)?.attrs {
        ObjectAttrs::View { definition } => definition.clone(),
        _ => return Err(DdlError::Internal(format!("{id} is not a view"))),
    };
    if definition.trim().is_empty() {
        return Err(DdlError::validation(format!(
            "{} has an empty definition",
            cx.describe(id)
        )));
    }
    for supplier in cx.repo.links_from(id, RelationshipType::ViewDependsOn) {
        if supplier != id {
            cx.require_validated(supplier)?;
        }
    }
    Ok(())
}

fn check_data_type(cx: &HandlerContext<'_>, id: ObjectId, data_type: &DataType) -> DdlResult<()> {
    match data_type {
        DataType::VarChar(0) => Err(DdlError::validation(format!(
            "{}: varchar length must be positive",
            cx.describe(id)
        ))),
        DataType::Decimal { precision, scale } => {
            if *precision == 0 || *precision > MAX_DECIMAL_PRECISION {
                return Err(DdlError::validation(format!(
                    "{}: decimal precision must be between 1 and {MAX_DECIMAL_PRECISION}",
                    cx.describe(id)
                )));
            }
            if scale > precision {
                return Err(DdlError::validation(format!(
                    "{}: decimal scale {scale} exceeds precision {precision}",
                    cx.describe(id)
                )));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn validate_column(cx: &mut HandlerContext<'_>, id: ObjectId, check_not_null: bool) -> DdlResult<()> {
    let obj = cx.object(id)?;
    let (data_type, nullable, default) = match &obj.attrs {
        ObjectAttrs::Column {
            data_type,
            nullable,
            default,
            ..
        } => (data_type.clone(), *nullable, default.clone()),
        _ => return Err(DdlError::Internal(format!("{id} is not a column"))),
    };
    let has_sequence = obj
        .owned
        .iter()
        .any(|o| cx.repo.kind_of(*o) == Some(ObjectKind::Sequence));
    check_data_type(cx, id, &data_type)?;

    if let Some(default) = &default {
        let value = Value::parse(&data_type, default).map_err(|e| {
            DdlError::validation(format!("{}: invalid default: {e}", cx.describe(id)))
        })?;
        if !nullable && value.is_null() {
            return Err(DdlError::validation(format!(
                "{}: NOT NULL column cannot default to null",
                cx.describe(id)
            )));
        }
    }
    if has_sequence && !data_type.is_integral() {
        return Err(DdlError::validation(format!(
            "{}: identity columns must be int or bigint",
            cx.describe(id)
        )));
    }

    if check_not_null && !nullable && default.is_none() && !has_sequence {
        let table = container_of(cx, id)?;
        let table_obj = cx.object(table)?;
        let populated = !table_obj.is_new() && table_obj.row_count().unwrap_or(0) > 0;
        if cx.is_created_object(id) && populated {
            return Err(DdlError::validation(format!(
                "cannot add NOT NULL {} without a default to non-empty {}",
                cx.describe(id),
                cx.describe(table)
            )));
        }
    }
    Ok(())
}

fn validate_index(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    let table = cx
        .repo
        .links_from(id, RelationshipType::IndexSpansTable)
        .first()
        .copied()
        .ok_or_else(|| {
            DdlError::validation(format!("{} does not span a table", cx.describe(id)))
        })?;
    cx.require_validated(table)?;
    check_key_columns(cx, id, table, RelationshipType::IndexedColumn)
}

fn check_key_columns(
    cx: &HandlerContext<'_>,
    id: ObjectId,
    table: ObjectId,
    relationship: RelationshipType,
) -> DdlResult<()> {
    let columns = cx.repo.links_from(id, relationship);
    if columns.is_empty() {
        return Err(DdlError::validation(format!(
            "{} has no key columns",
            cx.describe(id)
        )));
    }
    let mut seen = BTreeSet::new();
    for column in columns {
        if cx.object(column)?.container != Some(table) {
            return Err(DdlError::validation(format!(
                "{} does not belong to {}",
                cx.describe(column),
                cx.describe(table)
            )));
        }
        if !seen.insert(column) {
            return Err(DdlError::validation(format!(
                "{} lists {} twice",
                cx.describe(id),
                cx.describe(column)
            )));
        }
    }
    Ok(())
}

fn validate_unique_key(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    let table = container_of(cx, id)?;
    cx.require_validated(table)?;
    check_key_columns(cx, id, table, RelationshipType::KeyColumn)
}

fn validate_foreign_key(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    let table = container_of(cx, id)?;
    check_key_columns(cx, id, table, RelationshipType::KeyColumn)?;

    let referenced = cx
        .repo
        .links_from(id, RelationshipType::ForeignKeyReferences)
        .first()
        .copied()
        .ok_or_else(|| {
            DdlError::validation(format!("{} references no table", cx.describe(id)))
        })?;
    if referenced != table {
        cx.require_validated(referenced)?;
    }

    let referenced_names = match &cx.object(id)?.attrs {
        ObjectAttrs::ForeignKey { referenced_columns } => referenced_columns.clone(),
        _ => return Err(DdlError::Internal(format!("{id} is not a foreign key"))),
    };
    let columns = cx.repo.links_from(id, RelationshipType::KeyColumn);
    if columns.len() != referenced_names.len() {
        return Err(DdlError::validation(format!(
            "{} has {} columns but references {}",
            cx.describe(id),
            columns.len(),
            referenced_names.len()
        )));
    }

    let mut referenced_columns = Vec::with_capacity(referenced_names.len());
    for name in &referenced_names {
        let column = find_column(&*cx.repo, referenced, name).ok_or_else(|| {
            DdlError::validation(format!(
                "column '{name}' does not exist in {}",
                cx.describe(referenced)
            ))
        })?;
        referenced_columns.push(column);
    }
    for (local, remote) in columns.iter().zip(&referenced_columns) {
        if cx.object(*local)?.column_type() != cx.object(*remote)?.column_type() {
            return Err(DdlError::validation(format!(
                "{} and {} have different types",
                cx.describe(*local),
                cx.describe(*remote)
            )));
        }
    }

    let wanted: BTreeSet<ObjectId> = referenced_columns.into_iter().collect();
    let covered = owned_of_kind(&*cx.repo, referenced, ObjectKind::UniqueConstraint)
        .into_iter()
        .filter(|key| !cx.is_deleted_object(*key))
        .any(|key| {
            let key_columns: BTreeSet<ObjectId> = cx
                .repo
                .links_from(key, RelationshipType::KeyColumn)
                .into_iter()
                .collect();
            key_columns == wanted
        });
    if !covered {
        return Err(DdlError::validation(format!(
            "{}: referenced columns of {} are not covered by a unique key",
            cx.describe(id),
            cx.describe(referenced)
        )));
    }
    Ok(())
}

fn validate_sequence(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    if let ObjectAttrs::Sequence { increment: 0, .. } = cx.object(id)?.attrs {
        return Err(DdlError::validation(format!(
            "{}: increment must not be zero",
            cx.describe(id)
        )));
    }
    Ok(())
}

fn validate_drop_schema(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    if cx.drop_restrict && !cx.object(id)?.owned.is_empty() {
        return Err(DdlError::validation(format!(
            "{} is not empty; use CASCADE",
            cx.describe(id)
        )));
    }
    Ok(())
}

fn validate_drop_column(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    let table = container_of(cx, id)?;
    if cx.is_deleted_object(table) {
        return Ok(());
    }
    let remaining = table_columns(&*cx.repo, table)
        .into_iter()
        .filter(|c| !cx.is_deleted_object(*c))
        .count();
    if remaining == 0 {
        return Err(DdlError::validation(format!(
            "cannot drop {}: it is the last column of {}",
            cx.describe(id),
            cx.describe(table)
        )));
    }
    Ok(())
}

/// An index enforcing a unique key goes only with its key or its table.
fn validate_drop_index(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    let Some(table) = cx
        .repo
        .links_from(id, RelationshipType::IndexSpansTable)
        .first()
        .copied()
    else {
        return Ok(());
    };
    if cx.is_deleted_object(table) {
        return Ok(());
    }
    let key = cx
        .repo
        .links_to(id, RelationshipType::KeyIndex)
        .into_iter()
        .find(|key| !cx.is_deleted_object(*key));
    if let Some(key) = key {
        return Err(DdlError::validation(format!(
            "cannot drop {}: it enforces {} on {}",
            cx.describe(id),
            cx.describe(key),
            cx.describe(table)
        )));
    }
    Ok(())
}

fn validate_truncate_table(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    for fk in cx.repo.links_to(id, RelationshipType::ForeignKeyReferences) {
        let Some(referencing) = cx.repo.lookup(fk).and_then(|o| o.container) else {
            continue;
        };
        if referencing == id {
            continue;
        }
        let rows = cx.object(referencing)?.row_count().unwrap_or(0);
        if rows > 0 {
            return Err(DdlError::validation(format!(
                "cannot truncate {} because {} on {} references it",
                cx.describe(id),
                cx.describe(fk),
                cx.describe(referencing)
            )));
        }
    }
    Ok(())
}

fn execute_create_table(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    if !cx.storage.has_table(id) {
        cx.storage.create_table(id)?;
        debug!(table = %id, "table storage created");
    }
    Ok(())
}

fn execute_create_index(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    let obj = cx.object(id)?;
    let unique = matches!(obj.attrs, ObjectAttrs::Index { unique: true, .. });
    if obj.index_root().is_some() {
        return Ok(());
    }
    let Some(table) = cx
        .repo
        .links_from(id, RelationshipType::IndexSpansTable)
        .first()
        .copied()
    else {
        return Ok(());
    };
    let columns = cx.repo.links_from(id, RelationshipType::IndexedColumn);
    let positions = column_positions(&*cx.repo, table, &columns);

    let root = cx.storage.create_index_storage()?;
    if cx.storage.has_table(table) {
        let rows = cx.storage.scan(table)?.to_vec();
        for (position, row) in rows.iter().enumerate() {
            let (key, has_null) = index_key(row, &positions);
            if cx
                .storage
                .index_insert(root, key, position as u64, unique && !has_null)
                .is_err()
            {
                cx.storage.drop_index_storage(root, false)?;
                return Err(DdlError::validation(format!(
                    "cannot create {}: {} contains duplicate keys",
                    describe(&*cx.repo, id),
                    describe(&*cx.repo, table)
                )));
            }
        }
    }
    set_index_root(&mut *cx.repo, id, Some(root))?;
    debug!(index = %id, root, "index storage created");
    Ok(())
}

/// Encoded key of `row` over the given positions, and whether any part is null.
pub(crate) fn index_key(row: &[Value], positions: &[usize]) -> (String, bool) {
    let parts: Vec<&Value> = positions
        .iter()
        .map(|p| row.get(*p).unwrap_or(&Value::Null))
        .collect();
    let has_null = parts.iter().any(|v| v.is_null());
    (encode_key(&parts), has_null)
}

fn execute_drop_table(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    if cx.storage.has_table(id) {
        cx.storage.drop_table(id)?;
        debug!(table = %id, "table storage dropped");
    }
    Ok(())
}

fn execute_drop_index(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    if let Some(root) = cx.object(id)?.index_root() {
        if cx.storage.has_index_root(root) {
            cx.storage.drop_index_storage(root, false)?;
            debug!(index = %id, root, "index storage dropped");
        }
    }
    Ok(())
}

fn execute_truncate_table(cx: &mut HandlerContext<'_>, id: ObjectId) -> DdlResult<()> {
    if cx.storage.has_table(id) {
        cx.storage.truncate_table(id)?;
    }
    for index in table_indexes(&*cx.repo, id) {
        if let Some(root) = cx.object(index)?.index_root() {
            cx.storage.drop_index_storage(root, true)?;
        }
    }
    set_row_count(&mut *cx.repo, id, 0)
}
