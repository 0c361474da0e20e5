use super::*;
use catalog_ddl_core::DdlError;

fn seed(db: &mut Database) {
    db.execute("create table t (id int unique, name text)").unwrap();
    db.execute("create index ix_t_name on t (name)").unwrap();
    db.execute("insert into t values (1, x)").unwrap();
    db.execute("insert into t values (2, y)").unwrap();
}

#[test]
fn test_crash_during_add_column_is_recovered_on_open() {
    let path = temp_path();
    let (describe_before, roots_before, grants_before, objects_before) = {
        let mut db = Database::open(&path).unwrap();
        seed(&mut db);
        let snapshot = (
            db.execute("describe t").unwrap(),
            db.storage().index_roots(),
            count_of(&db, ObjectKind::Grant),
            db.catalog().object_count(),
        );

        db.traps().arm_crash();
        let err = db.execute("alter table t add column extra int unique").unwrap_err();
        assert!(matches!(err, DdlError::SimulatedCrash(_)));
        assert_eq!(count_of(&db, ObjectKind::RecoveryMarker), 1);
        snapshot
    };

    let mut db = Database::open(&path).unwrap();
    assert_eq!(count_of(&db, ObjectKind::RecoveryMarker), 0);
    assert_eq!(db.execute("describe t").unwrap(), describe_before);
    assert_eq!(db.storage().index_roots(), roots_before);
    assert_eq!(count_of(&db, ObjectKind::Grant), grants_before);
    assert_eq!(db.catalog().object_count(), objects_before);
    assert_eq!(db.execute("select * from t").unwrap(), "id\tname\n1\tx\n2\ty");

    let table = db.catalog().objects_of_kind(ObjectKind::Table)[0];
    assert_eq!(db.catalog().lookup(table).unwrap().row_count(), Some(2));
    drop(db);

    // recovery committed; a second open finds nothing to do
    let db = Database::open(&path).unwrap();
    assert_eq!(count_of(&db, ObjectKind::RecoveryMarker), 0);
}

#[test]
fn test_crash_during_rebuild_is_recovered_on_open() {
    let path = temp_path();
    let roots_before = {
        let mut db = Database::open(&path).unwrap();
        seed(&mut db);
        let roots = db.storage().index_roots();
        db.traps().arm_crash();
        db.execute("alter table t rebuild").unwrap_err();
        assert!(db.storage().index_roots().len() > roots.len());
        roots
    };

    let mut db = Database::open(&path).unwrap();
    assert_eq!(db.storage().index_roots(), roots_before);
    assert_eq!(db.execute("select * from t").unwrap(), "id\tname\n1\tx\n2\ty");
    db.execute("insert into t values (3, z)").unwrap();
}

#[test]
fn test_crash_trap_from_config_file() {
    let path = temp_path();
    {
        let mut db = Database::open(&path).unwrap();
        seed(&mut db);
    }
    std::fs::write(
        path.join("engine.json"),
        r#"{ "test_table_reload_crash": true }"#,
    )
    .unwrap();

    {
        let mut db = Database::open(&path).unwrap();
        assert!(db.traps().is_armed());
        db.execute("alter table t add qty int").unwrap_err();
        assert!(!db.traps().is_armed());
    }
    std::fs::remove_file(path.join("engine.json")).unwrap();

    let mut db = Database::open(&path).unwrap();
    assert!(!db.execute("describe t").unwrap().contains("qty"));
}
