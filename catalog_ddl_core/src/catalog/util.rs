//! Helpers over the repository contract shared by handlers, statements and
//! recovery.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{DdlError, DdlResult};

use super::object::{ObjectAttrs, ObjectId, ObjectKind, RecoveryType, Visibility};
use super::relationship::RelationshipType;
use super::repository::CatalogRepository;

pub const SYSTEM_USER_NAME: &str = "_SYSTEM";
pub const CREATION_PRIVILEGE: &str = "CREATION";

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Dotted path from the outermost container down to the object.
pub fn qualified_name(repo: &dyn CatalogRepository, id: ObjectId) -> String {
    let mut parts = Vec::new();
    let mut cursor = repo.lookup(id);
    while let Some(obj) = cursor {
        parts.push(obj.name.clone());
        cursor = obj.container.and_then(|c| repo.lookup(c));
    }
    parts.reverse();
    parts.join(".")
}

/// Localized name, e.g. `table public.orders`.
pub fn describe(repo: &dyn CatalogRepository, id: ObjectId) -> String {
    match repo.lookup(id) {
        Some(obj) => format!("{} {}", obj.kind.label(), qualified_name(repo, id)),
        None => format!("object {id}"),
    }
}

pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((schema, rest)) => (Some(schema), rest),
        None => (None, name),
    }
}

pub fn resolve_schema(
    repo: &dyn CatalogRepository,
    name: &str,
) -> DdlResult<ObjectId> {
    repo.find_by_name(None, name)
        .filter(|id| repo.kind_of(*id) == Some(ObjectKind::Schema))
        .ok_or_else(|| DdlError::NotFound {
            kind: "schema",
            name: name.to_string(),
        })
}

/// Resolves `[schema.]name` to an element of one of `kinds`.
pub fn resolve_element(
    repo: &dyn CatalogRepository,
    default_schema: &str,
    name: &str,
    kinds: &[ObjectKind],
    label: &'static str,
) -> DdlResult<ObjectId> {
    let (schema, local) = split_qualified(name);
    let schema_id = resolve_schema(repo, schema.unwrap_or(default_schema))?;
    repo.find_by_name(Some(schema_id), local)
        .filter(|id| repo.kind_of(*id).is_some_and(|k| kinds.contains(&k)))
        .ok_or_else(|| DdlError::NotFound {
            kind: label,
            name: name.to_string(),
        })
}

pub fn resolve_table(
    repo: &dyn CatalogRepository,
    default_schema: &str,
    name: &str,
) -> DdlResult<ObjectId> {
    resolve_element(repo, default_schema, name, &[ObjectKind::Table], "table")
}

/// Columns owned by a table or view, in ordinal order.
pub fn table_columns(repo: &dyn CatalogRepository, table: ObjectId) -> Vec<ObjectId> {
    let Some(obj) = repo.lookup(table) else {
        return Vec::new();
    };
    let mut cols: Vec<(usize, ObjectId)> = obj
        .owned
        .iter()
        .filter_map(|id| repo.lookup(*id))
        .filter(|o| o.kind == ObjectKind::Column)
        .map(|o| (o.ordinal().unwrap_or(usize::MAX), o.id))
        .collect();
    cols.sort();
    cols.into_iter().map(|(_, id)| id).collect()
}

pub fn find_column(repo: &dyn CatalogRepository, table: ObjectId, name: &str) -> Option<ObjectId> {
    table_columns(repo, table)
        .into_iter()
        .find(|c| repo.lookup(*c).is_some_and(|o| o.name.eq_ignore_ascii_case(name)))
}

/// Indexes spanning a table.
pub fn table_indexes(repo: &dyn CatalogRepository, table: ObjectId) -> Vec<ObjectId> {
    repo.links_to(table, RelationshipType::IndexSpansTable)
}

pub fn owned_of_kind(
    repo: &dyn CatalogRepository,
    container: ObjectId,
    kind: ObjectKind,
) -> Vec<ObjectId> {
    repo.lookup(container)
        .map(|obj| {
            obj.owned
                .iter()
                .copied()
                .filter(|id| repo.kind_of(*id) == Some(kind))
                .collect()
        })
        .unwrap_or_default()
}

/// Positions of the given columns within their table's row layout.
pub fn column_positions(repo: &dyn CatalogRepository, table: ObjectId, columns: &[ObjectId]) -> Vec<usize> {
    let layout = table_columns(repo, table);
    columns
        .iter()
        .filter_map(|c| layout.iter().position(|l| l == c))
        .collect()
}

/// Stamps modification time, and creation time plus lineage for new elements.
pub fn update_annotated_element(
    repo: &mut dyn CatalogRepository,
    id: ObjectId,
    timestamp: DateTime<Utc>,
    is_new: bool,
) -> DdlResult<()> {
    repo.modify(id, "modification_timestamp", &mut |obj| {
        obj.modification_timestamp = Some(timestamp);
        if is_new {
            obj.creation_timestamp = Some(timestamp);
            obj.lineage_id = Some(Uuid::new_v4());
        }
    })
}

/// Pseudo-grant recording who created an element.
pub fn new_creation_grant(
    repo: &mut dyn CatalogRepository,
    grantor: &str,
    grantee: &str,
    element: ObjectId,
) -> DdlResult<ObjectId> {
    let grant = repo.create_object(
        &format!("{CREATION_PRIVILEGE} on {element}"),
        None,
        ObjectAttrs::Grant {
            grantor: grantor.to_string(),
            grantee: grantee.to_string(),
            privilege: CREATION_PRIVILEGE.to_string(),
        },
    )?;
    repo.link(RelationshipType::PrivilegeOnElement, grant, element)?;
    repo.set_visibility(grant, Visibility::Public)?;
    update_annotated_element(repo, grant, now(), true)?;
    Ok(grant)
}

pub fn delete_grants(repo: &mut dyn CatalogRepository, element: ObjectId) -> DdlResult<()> {
    for grant in repo.links_to(element, RelationshipType::PrivilegeOnElement) {
        if repo.lookup(grant).is_some() {
            repo.delete(grant)?;
        }
    }
    Ok(())
}

pub fn create_recovery_marker(
    repo: &mut dyn CatalogRepository,
    recovery_type: RecoveryType,
    target: ObjectId,
    pending_roots: Vec<u64>,
    prior_row_count: Option<u64>,
) -> DdlResult<ObjectId> {
    let marker = repo.create_object(
        &format!("{recovery_type} {target}"),
        None,
        ObjectAttrs::RecoveryMarker {
            recovery_type,
            pending_roots,
            prior_row_count,
        },
    )?;
    repo.link(RelationshipType::RecoveryTarget, marker, target)?;
    repo.set_visibility(marker, Visibility::Public)?;
    Ok(marker)
}

pub fn set_row_count(repo: &mut dyn CatalogRepository, table: ObjectId, count: u64) -> DdlResult<()> {
    repo.modify(table, "row_count", &mut |obj| {
        if let ObjectAttrs::Table { row_count, .. } = &mut obj.attrs {
            *row_count = count;
        }
    })
}

pub fn set_index_root(
    repo: &mut dyn CatalogRepository,
    index: ObjectId,
    new_root: Option<u64>,
) -> DdlResult<()> {
    repo.modify(index, "root", &mut |obj| {
        if let ObjectAttrs::Index { root, .. } = &mut obj.attrs {
            *root = new_root;
        }
    })
}
