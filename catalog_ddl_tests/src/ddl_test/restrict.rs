use super::*;
use catalog_ddl_core::DdlError;

#[test]
fn test_restrict_drop_names_dependent_and_rolls_back() {
    let mut db = test_db();
    seed_customers_orders(&mut db);
    let customers = object_id(&db, ObjectKind::Table, "customers");
    let index = object_id(&db, ObjectKind::Index, "ix_customers_name");
    let fk = db
        .catalog()
        .objects_of_kind(ObjectKind::ForeignKey)
        .first()
        .copied()
        .unwrap();
    let objects_before = db.catalog().object_count();

    let err = db.execute("drop table customers").unwrap_err();
    assert!(matches!(err, DdlError::DropRestrict { .. }));
    assert_eq!(
        err.to_string(),
        "cannot drop table public.customers because foreign key public.orders.fk_orders_cust depends on it; use CASCADE"
    );

    assert!(db.catalog().lookup(customers).is_some());
    assert!(db.catalog().lookup(index).is_some());
    assert!(db.catalog().lookup(fk).is_some());
    assert_eq!(db.catalog().object_count(), objects_before);
    assert_eq!(db.catalog().txn_depth(), 0);
}

#[test]
fn test_explicit_restrict_keyword() {
    let mut db = test_db();
    seed_customers_orders(&mut db);
    let err = db.execute("drop table customers restrict").unwrap_err();
    assert!(err.to_string().contains("use CASCADE"));
}

#[test]
fn test_restrict_drop_of_view_supplier() {
    let mut db = test_db();
    db.execute("create table t (a int)").unwrap();
    db.execute("create view v as select * from t").unwrap();

    let err = db.execute("drop table t").unwrap_err();
    assert!(err.to_string().contains("view public.v depends on it"), "{err}");

    db.execute("drop table t cascade").unwrap();
    assert!(try_object_id(&db, ObjectKind::View, "v").is_none());
}

#[test]
fn test_dropping_referencing_table_is_allowed() {
    let mut db = test_db();
    seed_customers_orders(&mut db);
    db.execute("drop table orders").unwrap();
    assert_eq!(count_of(&db, ObjectKind::ForeignKey), 0);
    db.execute("drop table customers").unwrap();
    assert_eq!(count_of(&db, ObjectKind::Table), 0);
}

#[test]
fn test_self_referencing_foreign_key_drops_with_table() {
    let mut db = test_db();
    db.execute(
        "create table nodes (id int unique, parent int, foreign key (parent) references nodes (id))",
    )
    .unwrap();
    db.execute("drop table nodes").unwrap();
    assert_eq!(count_of(&db, ObjectKind::ForeignKey), 0);
}

#[test]
fn test_drop_unique_key_index_is_rejected() {
    let mut db = test_db();
    seed_customers_orders(&mut db);
    let index = object_id(&db, ObjectKind::Index, "uk_customers_id");
    let objects_before = db.catalog().object_count();

    let err = db.execute("drop index uk_customers_id").unwrap_err();
    assert!(matches!(err, DdlError::Validation(_)), "{err}");
    assert!(
        err.to_string().contains("it enforces unique constraint"),
        "{err}"
    );
    assert!(db.catalog().lookup(index).is_some());
    assert_eq!(db.catalog().object_count(), objects_before);
    assert_eq!(count_of(&db, ObjectKind::UniqueConstraint), 1);

    db.execute("insert into customers values (1, a)").unwrap();
    let dup = db.execute("insert into customers values (1, b)").unwrap_err();
    assert!(!dup.to_string().is_empty());
    assert_eq!(db.execute("select * from customers").unwrap(), "id\tname\n1\ta");
}

#[test]
fn test_unique_key_index_goes_with_its_table() {
    let mut db = test_db();
    db.execute("create table tags (id int unique, label text)").unwrap();
    assert_eq!(count_of(&db, ObjectKind::Index), 1);

    db.execute("drop table tags").unwrap();
    assert_eq!(count_of(&db, ObjectKind::Index), 0);
    assert_eq!(count_of(&db, ObjectKind::UniqueConstraint), 0);
    assert!(db.storage().index_roots().is_empty());
}
