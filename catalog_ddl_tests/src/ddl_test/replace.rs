use super::*;
use catalog_ddl_core::catalog::{ObjectAttrs, RelationshipType};
use catalog_ddl_core::DdlError;

fn seed_view_chain(db: &mut Database) {
    db.execute("create table t1 (a int)").unwrap();
    db.execute("create table t2 (a int)").unwrap();
    db.execute("create view v1 as select * from t1").unwrap();
    db.execute("create view v2 as select * from v1").unwrap();
}

fn view_definition(db: &Database, name: &str) -> String {
    let id = object_id(db, ObjectKind::View, name);
    match &db.catalog().lookup(id).unwrap().attrs {
        ObjectAttrs::View { definition } => definition.clone(),
        other => panic!("{name} is not a view: {other:?}"),
    }
}

#[test]
fn test_replace_moves_dependents_to_new_view() {
    let mut db = test_db();
    seed_view_chain(&mut db);
    let old_v1 = object_id(&db, ObjectKind::View, "v1");
    let v2 = object_id(&db, ObjectKind::View, "v2");

    let msg = db
        .execute("create or replace view v1 as select * from t2")
        .unwrap();
    assert_eq!(msg, "created or replaced view v1");

    let new_v1 = object_id(&db, ObjectKind::View, "v1");
    assert_ne!(new_v1, old_v1);
    assert!(db.catalog().lookup(old_v1).is_none());
    assert_eq!(view_definition(&db, "v1"), "select * from t2");
    assert_eq!(
        db.catalog().links_to(new_v1, RelationshipType::ViewDependsOn),
        vec![v2]
    );
    assert_eq!(db.last_outcome().report.revalidated, vec![v2]);
    assert_eq!(count_of(&db, ObjectKind::View), 2);

    // v1 no longer reads t1, but now holds t2 in place.
    db.execute("drop table t1").unwrap();
    let err = db.execute("drop table t2").unwrap_err();
    assert!(matches!(err, DdlError::DropRestrict { .. }), "{err}");
    assert!(err.to_string().contains("view public.v1 depends on it"), "{err}");
}

#[test]
fn test_replace_without_existing_view_creates_it() {
    let mut db = test_db();
    db.execute("create table t (a int)").unwrap();

    db.execute("create or replace view v as select * from t")
        .unwrap();
    assert!(try_object_id(&db, ObjectKind::View, "v").is_some());
    assert!(db.last_outcome().report.revalidated.is_empty());
}

#[test]
fn test_plain_create_of_existing_view_fails() {
    let mut db = test_db();
    seed_view_chain(&mut db);
    let old_v1 = object_id(&db, ObjectKind::View, "v1");

    let err = db.execute("create view v1 as select * from t2").unwrap_err();
    assert!(matches!(err, DdlError::NameInUse { .. }), "{err}");
    assert!(db.catalog().lookup(old_v1).is_some());
    assert_eq!(view_definition(&db, "v1"), "select * from t1");
}

#[test]
fn test_replace_of_in_use_view_fails() {
    let mut db = test_db();
    seed_view_chain(&mut db);
    let old_v1 = object_id(&db, ObjectKind::View, "v1");
    let v2 = object_id(&db, ObjectKind::View, "v2");

    db.locks_mut().acquire(old_v1);
    let err = db
        .execute("create or replace view v1 as select * from t2")
        .unwrap_err();
    assert!(matches!(err, DdlError::ReplacedObjectInUse(_)));
    assert_eq!(
        err.to_string(),
        "cannot replace view public.v1 because it is in use"
    );
    assert_eq!(object_id(&db, ObjectKind::View, "v1"), old_v1);
    assert_eq!(view_definition(&db, "v1"), "select * from t1");
    assert_eq!(
        db.catalog().links_to(old_v1, RelationshipType::ViewDependsOn),
        vec![v2]
    );

    db.locks_mut().release(old_v1);
    db.execute("create or replace view v1 as select * from t2")
        .unwrap();
    assert_eq!(view_definition(&db, "v1"), "select * from t2");
}

#[test]
fn test_replace_that_closes_a_cycle_fails() {
    let mut db = test_db();
    seed_view_chain(&mut db);
    let old_v1 = object_id(&db, ObjectKind::View, "v1");
    let views = count_of(&db, ObjectKind::View);

    let err = db
        .execute("create or replace view v1 as select * from v2")
        .unwrap_err();
    assert!(matches!(err, DdlError::DependencyCycle { .. }), "{err}");
    assert!(err.to_string().contains("view public.v2"), "{err}");

    assert_eq!(object_id(&db, ObjectKind::View, "v1"), old_v1);
    assert_eq!(view_definition(&db, "v1"), "select * from t1");
    assert_eq!(count_of(&db, ObjectKind::View), views);
}

#[test]
fn test_replace_reading_itself_fails() {
    let mut db = test_db();
    db.execute("create table t (a int)").unwrap();
    db.execute("create view v as select * from t").unwrap();
    let old_v = object_id(&db, ObjectKind::View, "v");

    let err = db
        .execute("create or replace view v as select * from v")
        .unwrap_err();
    assert!(matches!(err, DdlError::DependencyCycle { .. }), "{err}");
    assert!(err.to_string().contains("view public.v"), "{err}");
    assert_eq!(object_id(&db, ObjectKind::View, "v"), old_v);
    assert_eq!(view_definition(&db, "v"), "select * from t");
}
