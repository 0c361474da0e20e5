use super::*;
use catalog_ddl_core::DdlError;
use catalog_ddl_core::catalog::ObjectAttrs;
use catalog_ddl_core::config::EngineConfig;

#[test]
fn test_defaults_without_config_file() {
    let path = temp_path();
    std::fs::create_dir_all(&path).unwrap();
    let config = EngineConfig::load_from_dir(&path).unwrap();
    assert_eq!(config, EngineConfig::default());
    assert_eq!(config.default_schema, "public");
    assert!(!config.alter_table_add_column_incremental);
}

#[test]
fn test_config_file_sets_schema_and_user() {
    let path = temp_path();
    std::fs::create_dir_all(&path).unwrap();
    std::fs::write(
        path.join("engine.json"),
        r#"{ "default_schema": "app", "current_user": "carol" }"#,
    )
    .unwrap();

    let mut db = Database::open(&path).unwrap();
    assert_eq!(db.config().default_schema, "app");
    db.execute("create table t (a int)").unwrap();
    assert_eq!(db.execute("show tables").unwrap(), "app.t");

    let grantees: Vec<String> = db
        .catalog()
        .objects_of_kind(ObjectKind::Grant)
        .into_iter()
        .filter_map(|g| match &db.catalog().lookup(g)?.attrs {
            ObjectAttrs::Grant { grantee, .. } => Some(grantee.clone()),
            _ => None,
        })
        .collect();
    assert!(!grantees.is_empty());
    assert!(grantees.iter().all(|g| g == "carol"));
}

#[test]
fn test_malformed_config_is_rejected() {
    let path = temp_path();
    std::fs::create_dir_all(&path).unwrap();
    std::fs::write(path.join("engine.json"), "{ not json").unwrap();

    let err = Database::open(&path).unwrap_err();
    assert!(matches!(err, DdlError::Config(_)));
}
