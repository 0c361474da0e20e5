use std::time::Instant;

use super::*;
use catalog_ddl_core::DdlError;
use catalog_ddl_core::catalog::ObjectAttrs;
use catalog_ddl_core::ddl::PhaseState;
use catalog_ddl_core::ddl::statements::{AlterTableAddColumn, AlterTableRebuild};
use catalog_ddl_core::parser::command::ColumnDef;
use catalog_ddl_core::types::datatype::DataType;

fn index_roots(db: &Database) -> Vec<(ObjectId, u64)> {
    db.catalog()
        .objects_of_kind(ObjectKind::Index)
        .into_iter()
        .map(|id| (id, db.catalog().lookup(id).unwrap().index_root().unwrap()))
        .collect()
}

fn is_invalid(db: &Database, index: ObjectId) -> bool {
    matches!(
        db.catalog().lookup(index).unwrap().attrs,
        ObjectAttrs::Index { invalid: true, .. }
    )
}

#[test]
fn test_add_column_rebuilds_every_index() {
    let mut db = test_db();
    seed_items_3(&mut db);
    let table = object_id(&db, ObjectKind::Table, "items");
    let before = index_roots(&db);
    assert_eq!(before.len(), 2);
    let modified_before = db.catalog().lookup(table).unwrap().modification_timestamp;

    let mut column = ColumnDef::new("qty", DataType::Int);
    column.default = Some("0".to_string());
    let mut stmt = AlterTableAddColumn::new("items", column);
    let out = db.run_statement(&mut stmt).unwrap();
    assert_eq!(out, "altered table items: added column qty");

    let reload = stmt.reload().unwrap();
    assert!(reload.rebuild_indexes());
    assert_eq!(reload.write_index_map().len(), 2);
    for (index, old_root) in &before {
        let new_root = reload.write_index_map()[index];
        assert_ne!(new_root, *old_root);
        assert_eq!(
            db.catalog().lookup(*index).unwrap().index_root(),
            Some(new_root)
        );
        assert!(!db.storage().has_index_root(*old_root));
        assert_eq!(db.storage().index_len(new_root).unwrap(), 3);
        assert!(!is_invalid(&db, *index));
    }

    let outcome = db.last_outcome();
    assert_eq!(outcome.phase, Some(PhaseState::Done));
    assert_eq!(
        outcome.executed_dml,
        vec!["insert into public.items(id,name) select id,name from public.items".to_string()]
    );

    assert_eq!(
        db.execute("select * from items").unwrap(),
        "id\tname\tqty\n1\ta\t0\n2\tb\t0\n3\tc\t0"
    );
    let obj = db.catalog().lookup(table).unwrap();
    assert_eq!(obj.row_count(), Some(3));
    assert!(obj.modification_timestamp >= modified_before);
    assert_eq!(count_of(&db, ObjectKind::RecoveryMarker), 0);

    let column = stmt.new_column().unwrap();
    let column_obj = db.catalog().lookup(column).unwrap();
    assert!(column_obj.creation_timestamp.is_some());
    assert_eq!(column_obj.creation_timestamp, column_obj.modification_timestamp);
}

#[test]
fn test_incremental_add_column_only_builds_new_indexes() {
    let mut db = test_db_with(EngineConfig {
        alter_table_add_column_incremental: true,
        ..EngineConfig::default()
    });
    seed_items_3(&mut db);
    let before = index_roots(&db);

    let mut column = ColumnDef::new("sku", DataType::Text);
    column.unique = true;
    let mut stmt = AlterTableAddColumn::new("items", column);
    db.run_statement(&mut stmt).unwrap();

    let reload = stmt.reload().unwrap();
    assert!(!reload.rebuild_indexes());
    assert_eq!(reload.write_index_map().len(), 1);
    for (index, old_root) in &before {
        assert!(!reload.write_index_map().contains_key(index));
        assert_eq!(
            db.catalog().lookup(*index).unwrap().index_root(),
            Some(*old_root)
        );
    }
    assert_eq!(count_of(&db, ObjectKind::Index), 3);
}

#[test]
fn test_add_identity_column_numbers_existing_rows() {
    let mut db = test_db();
    seed_items_3(&mut db);
    db.execute("alter table items add column seq int identity").unwrap();
    assert_eq!(
        db.execute("select * from items").unwrap(),
        "id\tname\tseq\n1\ta\t1\n2\tb\t2\n3\tc\t3"
    );
    db.execute("insert into items values (4, d, default)").unwrap();
    assert!(db.execute("select * from items").unwrap().ends_with("4\td\t4"));
}

#[test]
fn test_add_not_null_column_without_default_to_populated_table() {
    let mut db = test_db();
    seed_items_3(&mut db);
    let objects_before = db.catalog().object_count();

    let err = db.execute("alter table items add column qty int not null").unwrap_err();
    assert!(err.to_string().contains("without a default"), "{err}");
    assert_eq!(db.catalog().object_count(), objects_before);
    assert_eq!(db.last_outcome().phase, None);

    db.execute("alter table items add column qty int not null default 1").unwrap();
}

#[test]
fn test_add_column_to_temporary_table_rejected() {
    let mut db = test_db();
    db.execute("create temporary table scratch (a int)").unwrap();
    let err = db.execute("alter table scratch add b int").unwrap_err();
    assert!(err.to_string().contains("temporary table"));
}

#[test]
fn test_failed_reload_is_recovered() {
    let mut db = test_db();
    seed_items_3(&mut db);
    let roots_before = db.storage().index_roots();
    let grants_before = count_of(&db, ObjectKind::Grant);
    let describe_before = db.execute("describe items").unwrap();

    db.traps().arm_failure();
    let err = db.execute("alter table items add column qty int unique").unwrap_err();
    assert!(matches!(err, DdlError::UnlockedExecution(_)));
    assert!(err.to_string().contains("injected failure"));
    assert_eq!(db.last_outcome().phase, Some(PhaseState::Failed));
    assert!(!db.traps().is_armed());

    assert_eq!(db.execute("describe items").unwrap(), describe_before);
    assert_eq!(
        db.execute("select * from items").unwrap(),
        "id\tname\n1\ta\n2\tb\n3\tc"
    );
    assert_eq!(db.storage().index_roots(), roots_before);
    assert_eq!(count_of(&db, ObjectKind::Grant), grants_before);
    assert_eq!(count_of(&db, ObjectKind::RecoveryMarker), 0);
    let table = object_id(&db, ObjectKind::Table, "items");
    assert_eq!(db.catalog().lookup(table).unwrap().row_count(), Some(3));
    for (index, _) in index_roots(&db) {
        assert!(!is_invalid(&db, index));
    }

    // the table is usable and unlocked afterwards
    assert!(!db.locks_mut().is_object_in_use(table));
    db.execute("alter table items add column qty int").unwrap();
}

#[test]
fn test_rebuild_swaps_roots() {
    let mut db = test_db();
    seed_items_3(&mut db);
    let before = index_roots(&db);

    let mut stmt = AlterTableRebuild::new("items");
    assert_eq!(db.run_statement(&mut stmt).unwrap(), "rebuilt table items");

    let after = index_roots(&db);
    for ((index, old), (same, new)) in before.iter().zip(&after) {
        assert_eq!(index, same);
        assert_ne!(old, new);
        assert_eq!(db.storage().index_len(*new).unwrap(), 3);
    }
    assert_eq!(
        db.last_outcome().executed_dml,
        vec!["insert into public.items select * from public.items".to_string()]
    );
    assert_eq!(
        db.execute("select * from items").unwrap(),
        "id\tname\n1\ta\n2\tb\n3\tc"
    );
}

#[test]
fn test_sleep_trap_delays_unlocked_step_once() {
    let mut db = test_db();
    seed_items_3(&mut db);

    db.traps().arm_sleep(40);
    let started = Instant::now();
    db.execute("alter table items rebuild").unwrap();
    assert!(started.elapsed().as_millis() >= 40);
    assert!(!db.traps().is_armed());
}

#[test]
fn test_crash_leaves_marker_until_recovery() {
    let mut db = test_db();
    seed_items_3(&mut db);
    let roots_before = db.storage().index_roots();

    db.traps().arm_crash();
    let err = db.execute("alter table items add column qty int").unwrap_err();
    assert!(matches!(err, DdlError::SimulatedCrash(_)));
    assert_eq!(db.last_outcome().phase, Some(PhaseState::Completing));
    assert_eq!(count_of(&db, ObjectKind::RecoveryMarker), 1);
    assert!(db.execute("describe items").unwrap().contains("qty int"));

    assert_eq!(db.recover_abandoned().unwrap(), 1);
    assert_eq!(count_of(&db, ObjectKind::RecoveryMarker), 0);
    assert!(!db.execute("describe items").unwrap().contains("qty"));
    assert_eq!(db.storage().index_roots(), roots_before);
    assert_eq!(db.recover_abandoned().unwrap(), 0);
}
