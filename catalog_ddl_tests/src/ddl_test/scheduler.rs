use super::*;
use catalog_ddl_core::catalog::util::{resolve_schema, resolve_table};
use catalog_ddl_core::catalog::{ObjectAttrs, RelationshipType};
use catalog_ddl_core::ddl::{ActionKind, DdlStatement, StatementContext, ValidationSession};
use catalog_ddl_core::{DdlError, DdlResult};

/// Creates views v1 and v2 in one statement; v1 reads v2. With `cyclic`
/// v2 reads v1 back, otherwise v2 reads table t.
struct CreateViewPair {
    cyclic: bool,
}

impl DdlStatement for CreateViewPair {
    fn describe(&self) -> String {
        "create views v1, v2".to_string()
    }

    fn apply(&mut self, cx: &mut StatementContext<'_>) -> DdlResult<()> {
        let schema = resolve_schema(&*cx.repo, cx.default_schema())?;
        let v1 = cx.repo.create_object(
            "v1",
            Some(schema),
            ObjectAttrs::View {
                definition: "select * from v2".to_string(),
            },
        )?;
        let v2 = cx.repo.create_object(
            "v2",
            Some(schema),
            ObjectAttrs::View {
                definition: "select * from t".to_string(),
            },
        )?;
        cx.repo.link(RelationshipType::ViewDependsOn, v1, v2)?;
        if self.cyclic {
            cx.repo.link(RelationshipType::ViewDependsOn, v2, v1)?;
        } else {
            let t = resolve_table(&*cx.repo, cx.default_schema(), "t")?;
            cx.repo.link(RelationshipType::ViewDependsOn, v2, t)?;
        }
        Ok(())
    }
}

#[test]
fn test_deletion_overrides_pending_action() {
    let mut session = ValidationSession::new();
    let id = ObjectId(7);
    assert!(session.schedule_modification(id, true));
    assert_eq!(session.action_of(id), Some(ActionKind::Creation));

    session.schedule_deletion(id);
    assert_eq!(session.action_of(id), Some(ActionKind::Deletion));
    assert_eq!(session.scheduling().len(), 1);
}

#[test]
fn test_tracked_object_keeps_its_action() {
    let mut session = ValidationSession::new();
    let id = ObjectId(3);
    session.schedule_deletion(id);
    assert!(!session.schedule_modification(id, false));
    assert_eq!(session.action_of(id), Some(ActionKind::Deletion));
    assert!(session.schedule_truncation(id).is_err());
}

#[test]
fn test_forward_dependency_resolves_in_later_round() {
    let mut db = test_db();
    db.execute("create table t (a int)").unwrap();

    let mut stmt = CreateViewPair { cyclic: false };
    let out = db.run_statement(&mut stmt).unwrap();
    assert_eq!(out, "create views v1, v2");

    let rounds = db.last_outcome().rounds;
    assert!(rounds >= 2, "expected a retry round, got {rounds}");
    assert!(rounds <= 5);
    assert!(try_object_id(&db, ObjectKind::View, "v1").is_some());
    assert!(try_object_id(&db, ObjectKind::View, "v2").is_some());
}

#[test]
fn test_dependency_cycle_is_reported() {
    let mut db = test_db();
    let mut stmt = CreateViewPair { cyclic: true };
    let err = db.run_statement(&mut stmt).unwrap_err();

    assert!(matches!(err, DdlError::DependencyCycle { .. }));
    let msg = err.to_string();
    assert!(msg.contains("view public.v1"), "{msg}");
    assert!(msg.contains("view public.v2"), "{msg}");

    // v1, v2 and the schema were touched.
    assert!(db.last_outcome().rounds <= 3 + 1);
    assert!(try_object_id(&db, ObjectKind::View, "v1").is_none());
    assert!(try_object_id(&db, ObjectKind::View, "v2").is_none());
}

#[test]
fn test_view_waits_for_table_created_earlier_in_catalog() {
    let mut db = test_db();
    db.execute("create table t (a int, b text)").unwrap();
    let out = db.execute("create view v as select a from t").unwrap();
    assert_eq!(out, "created view v");
    assert!(db.last_outcome().rounds >= 1);
}

#[test]
fn test_duplicate_column_names_rejected() {
    let mut db = test_db();
    let err = db.execute("create table t (a int, A text)").unwrap_err();
    assert!(matches!(err, DdlError::DuplicateName { .. }));
    assert!(err.to_string().contains("defined more than once"));
    assert!(try_object_id(&db, ObjectKind::Table, "t").is_none());
}

#[test]
fn test_name_already_in_use() {
    let mut db = test_db();
    db.execute("create table t (a int)").unwrap();

    let err = db.execute("create table t (b int)").unwrap_err();
    assert!(matches!(err, DdlError::NameInUse { .. }));
    assert!(err.to_string().contains("already exists in schema public"));

    // tables and views share a namespace
    let err = db.execute("create view t as select * from t").unwrap_err();
    assert!(err.to_string().contains("already exists"));
}

#[test]
fn test_failed_statement_leaves_catalog_unchanged() {
    let mut db = test_db();
    db.execute("create table t (a int)").unwrap();
    let before = db.catalog().object_count();

    db.execute("create table u (a int, b varchar(0))").unwrap_err();
    assert_eq!(db.catalog().object_count(), before);
    assert_eq!(db.catalog().txn_depth(), 0);
}
