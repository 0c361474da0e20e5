use catalog_ddl_core::catalog::util::{now, update_annotated_element};
use catalog_ddl_core::catalog::{
    CatalogRepository, MemCatalog, ObjectAttrs, ObjectId, ObjectKind, Visibility,
};
use catalog_ddl_core::config::EngineConfig;
use catalog_ddl_core::ddl::statements::CreateTable;
use catalog_ddl_core::ddl::{DdlLockManager, DdlRegistry, DdlValidator};
use catalog_ddl_core::parser::command::ColumnDef;
use catalog_ddl_core::storage::{MemStorage, StorageEngine};
use catalog_ddl_core::types::datatype::DataType;

fn bootstrapped_catalog() -> MemCatalog {
    let mut catalog = MemCatalog::new();
    catalog.begin_txn(true).unwrap();
    let schema = catalog
        .create_object("public", None, ObjectAttrs::Schema)
        .unwrap();
    catalog.set_visibility(schema, Visibility::Public).unwrap();
    update_annotated_element(&mut catalog, schema, now(), true).unwrap();
    catalog.commit_txn().unwrap();
    catalog
}

#[test]
fn test_new_objects_go_unset_private_public() {
    let mut catalog = bootstrapped_catalog();
    let mut storage = MemStorage::new();
    let registry = DdlRegistry::standard();
    let locks = DdlLockManager::new();
    let config = EngineConfig::default();

    let mut stmt = CreateTable::new(
        "t",
        false,
        vec![ColumnDef::new("a", DataType::Int)],
        Vec::new(),
    );

    catalog.begin_txn(true).unwrap();
    let table;
    let report;
    {
        let mut validator =
            DdlValidator::new(&mut catalog, &mut storage, &registry, &locks, &config);
        validator.apply(&mut stmt).unwrap();
        table = stmt.table().unwrap();
        assert_eq!(visibility_of(&mut validator, table), Some(Visibility::Unset));

        validator.validate(&mut stmt).unwrap();
        assert_eq!(visibility_of(&mut validator, table), Some(Visibility::Private));

        report = validator.execute_storage().unwrap();
        assert_eq!(visibility_of(&mut validator, table), Some(Visibility::Public));
    }
    catalog.commit_txn().unwrap();

    assert!(report.promoted.contains(&table));
    let obj = catalog.lookup(table).unwrap();
    assert_eq!(obj.visibility, Visibility::Public);
    assert!(obj.creation_timestamp.is_some());
    assert!(obj.lineage_id.is_some());
    assert!(storage_has_table(&storage, table));
    assert_eq!(report.grants.len(), report.promoted.len());
}

#[test]
fn test_creation_grant_goes_to_current_user() {
    let mut db = catalog_ddl_core::Database::in_memory(EngineConfig {
        current_user: "alice".to_string(),
        ..EngineConfig::default()
    })
    .unwrap();
    db.execute("create table t (a int)").unwrap();

    let grants = db.catalog().objects_of_kind(ObjectKind::Grant);
    assert_eq!(grants.len(), 2);
    for grant in grants {
        match &db.catalog().lookup(grant).unwrap().attrs {
            ObjectAttrs::Grant {
                grantor,
                grantee,
                privilege,
            } => {
                assert_eq!(grantor, "_SYSTEM");
                assert_eq!(grantee, "alice");
                assert_eq!(privilege, "CREATION");
            }
            other => panic!("unexpected attrs {other:?}"),
        }
    }
}

fn visibility_of(validator: &mut DdlValidator<'_>, id: ObjectId) -> Option<Visibility> {
    validator
        .statement_context()
        .repo
        .lookup(id)
        .map(|o| o.visibility)
}

fn storage_has_table(storage: &MemStorage, table: ObjectId) -> bool {
    storage.has_table(table)
}
