//! Cold-start cleanup of multi-phase statements that never completed.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::catalog::util::{delete_grants, describe, set_row_count, table_columns, table_indexes};
use crate::catalog::{CatalogRepository, ObjectAttrs, ObjectId, ObjectKind, RecoveryType, RelationshipType};
use crate::error::{DdlError, DdlResult};
use crate::storage::StorageEngine;

use super::reload::mark_index_invalid;

/// Processes every recovery marker left in the catalog. Returns how many
/// abandoned statements were cleaned up.
pub fn recover_abandoned_statements(
    repo: &mut dyn CatalogRepository,
    storage: &mut dyn StorageEngine,
) -> DdlResult<usize> {
    let markers = repo.objects_of_kind(ObjectKind::RecoveryMarker);
    if markers.is_empty() {
        return Ok(0);
    }
    repo.begin_txn(true)?;
    let mut recovered = 0;
    for marker in markers {
        if let Err(err) = recover_marker(repo, storage, marker) {
            repo.rollback_txn()?;
            return Err(err);
        }
        recovered += 1;
    }
    repo.commit_txn()?;
    storage.checkpoint()?;
    info!(recovered, "abandoned statements recovered");
    Ok(recovered)
}

fn recover_marker(
    repo: &mut dyn CatalogRepository,
    storage: &mut dyn StorageEngine,
    marker: ObjectId,
) -> DdlResult<()> {
    let (recovery_type, pending_roots, prior_row_count) = match repo.lookup(marker).map(|o| &o.attrs) {
        Some(ObjectAttrs::RecoveryMarker {
            recovery_type,
            pending_roots,
            prior_row_count,
        }) => (*recovery_type, pending_roots.clone(), *prior_row_count),
        _ => return Err(DdlError::Internal(format!("{marker} is not a recovery marker"))),
    };
    let target = repo
        .links_from(marker, RelationshipType::RecoveryTarget)
        .first()
        .copied();
    warn!(
        %marker,
        %recovery_type,
        target = %target.map(|t| describe(&*repo, t)).unwrap_or_default(),
        "recovering abandoned statement"
    );

    let referenced: BTreeSet<u64> = repo
        .objects_of_kind(ObjectKind::Index)
        .into_iter()
        .filter_map(|index| repo.lookup(index).and_then(|o| o.index_root()))
        .collect();
    for root in pending_roots {
        if !referenced.contains(&root) && storage.has_index_root(root) {
            storage.drop_index_storage(root, false)?;
        }
    }

    if let Some(table) = target {
        if recovery_type == RecoveryType::AlterTableAddColumn {
            undo_add_column(repo, storage, table)?;
        }
        if let Some(count) = prior_row_count {
            set_row_count(repo, table, count)?;
        }
        for index in table_indexes(&*repo, table) {
            mark_index_invalid(repo, index, false)?;
        }
    }
    repo.delete(marker)
}

/// Removes the last column of `table` together with its sequence grants,
/// unique keys, indexes and their grants, then trims stored rows to the
/// remaining width.
pub fn undo_add_column(
    repo: &mut dyn CatalogRepository,
    storage: &mut dyn StorageEngine,
    table: ObjectId,
) -> DdlResult<()> {
    let columns = table_columns(&*repo, table);
    if columns.len() < 2 {
        warn!(table = %table, "refusing to remove the only column");
        return Ok(());
    }
    let Some(&column) = columns.last() else {
        return Ok(());
    };
    info!(column = %describe(&*repo, column), "removing added column");

    let sequences: Vec<ObjectId> = repo
        .lookup(column)
        .map(|o| o.owned.clone())
        .unwrap_or_default()
        .into_iter()
        .filter(|o| repo.kind_of(*o) == Some(ObjectKind::Sequence))
        .collect();
    for sequence in sequences {
        delete_grants(repo, sequence)?;
    }

    for key in repo.links_to(column, RelationshipType::KeyColumn) {
        if repo.kind_of(key) == Some(ObjectKind::UniqueConstraint) {
            delete_grants(repo, key)?;
            repo.delete(key)?;
        }
    }

    for index in repo.links_to(column, RelationshipType::IndexedColumn) {
        let Some(root) = repo.lookup(index).map(|o| o.index_root()) else {
            continue;
        };
        if let Some(root) = root {
            if storage.has_index_root(root) {
                storage.drop_index_storage(root, false)?;
            }
        }
        delete_grants(repo, index)?;
        repo.delete(index)?;
    }

    delete_grants(repo, column)?;
    repo.delete(column)?;

    let width = columns.len() - 1;
    if storage.has_table(table) {
        let rows = storage.scan(table)?;
        if rows.iter().any(|r| r.len() > width) {
            let trimmed = rows
                .iter()
                .map(|r| r.iter().take(width).cloned().collect())
                .collect();
            storage.replace_rows(table, trimmed)?;
        }
    }
    Ok(())
}
