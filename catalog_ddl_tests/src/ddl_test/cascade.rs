use super::*;

#[test]
fn test_drop_table_cascades_indexes_and_grants() {
    let mut db = test_db();
    let grants_before = count_of(&db, ObjectKind::Grant);
    seed_items_3(&mut db);
    assert!(count_of(&db, ObjectKind::Grant) > grants_before);
    let table = object_id(&db, ObjectKind::Table, "items");

    let out = db.execute("drop table items").unwrap();
    assert_eq!(out, "dropped table items");

    assert!(db.catalog().lookup(table).is_none());
    assert!(try_object_id(&db, ObjectKind::Index, "ix_items_name").is_none());
    assert_eq!(count_of(&db, ObjectKind::Index), 0);
    assert_eq!(count_of(&db, ObjectKind::UniqueConstraint), 0);
    assert_eq!(count_of(&db, ObjectKind::Column), 0);
    assert_eq!(count_of(&db, ObjectKind::Grant), grants_before);

    assert!(!db.storage().has_table(table));
    assert!(db.storage().index_roots().is_empty());
}

#[test]
fn test_drop_index_keeps_table() {
    let mut db = test_db();
    seed_items_3(&mut db);
    let index = object_id(&db, ObjectKind::Index, "ix_items_name");
    let root = db.catalog().lookup(index).unwrap().index_root().unwrap();

    db.execute("drop index ix_items_name").unwrap();
    assert!(db.catalog().lookup(index).is_none());
    assert!(!db.storage().has_index_root(root));
    assert_eq!(
        db.execute("select * from items").unwrap(),
        "id\tname\n1\ta\n2\tb\n3\tc"
    );
}

#[test]
fn test_drop_schema_cascade_removes_contents() {
    let mut db = test_db();
    db.execute("create schema sales").unwrap();
    db.execute("create table sales.leads (id int, owner text)").unwrap();
    db.execute("create index ix_leads_owner on sales.leads (owner)").unwrap();
    db.execute("create table keep (id int)").unwrap();

    let err = db.execute("drop schema sales").unwrap_err();
    assert!(err.to_string().contains("is not empty; use CASCADE"), "{err}");
    assert_eq!(db.execute("show tables").unwrap(), "public.keep\nsales.leads");

    db.execute("drop schema sales cascade").unwrap();
    assert_eq!(db.execute("show tables").unwrap(), "public.keep");
    assert_eq!(count_of(&db, ObjectKind::Index), 0);
    assert_eq!(count_of(&db, ObjectKind::Schema), 1);
}

#[test]
fn test_drop_empty_schema_restrict() {
    let mut db = test_db();
    db.execute("create schema scratch").unwrap();
    assert_eq!(db.execute("drop schema scratch").unwrap(), "dropped schema scratch");
    assert_eq!(count_of(&db, ObjectKind::Schema), 1);
}

#[test]
fn test_drop_cascade_removes_referencing_foreign_key() {
    let mut db = test_db();
    seed_customers_orders(&mut db);
    let orders = object_id(&db, ObjectKind::Table, "orders");

    db.execute("drop table customers cascade").unwrap();

    assert!(try_object_id(&db, ObjectKind::Table, "customers").is_none());
    assert!(db.catalog().lookup(orders).is_some());
    assert_eq!(count_of(&db, ObjectKind::ForeignKey), 0);
    assert_eq!(db.execute("describe orders").unwrap(), "id int\ncust int");
}

#[test]
fn test_storage_report_lists_contained_objects_as_subsumed() {
    let mut db = test_db();
    db.execute("create table t (a int, b int)").unwrap();
    let table = object_id(&db, ObjectKind::Table, "t");
    let columns = db.catalog().lookup(table).unwrap().owned.clone();

    db.execute("drop table t").unwrap();
    let report = &db.last_outcome().report;

    assert!(report.deleted.contains(&table));
    for column in &columns {
        assert!(report.subsumed.contains(column));
        assert!(!report.deleted.contains(column));
    }
    assert!(report.promoted.is_empty());
}

#[test]
fn test_drop_missing_object_errors() {
    let mut db = test_db();
    let err = db.execute("drop table nope").unwrap_err();
    assert_eq!(err.to_string(), "table 'nope' does not exist");
}

#[test]
fn test_wide_drop_cascades_in_one_round() {
    let mut db = test_db();
    db.execute("create table wide (a int, b int)").unwrap();
    for i in 0..64 {
        db.execute(&format!("create index ix_wide_{i} on wide (a, b)")).unwrap();
    }
    assert_eq!(count_of(&db, ObjectKind::Index), 64);

    db.execute("drop table wide").unwrap();
    assert_eq!(count_of(&db, ObjectKind::Index), 0);
    assert_eq!(db.last_outcome().rounds, 1);
    assert!(db.storage().index_roots().is_empty());
}
