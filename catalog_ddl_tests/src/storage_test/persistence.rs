use super::*;
use catalog_ddl_core::CATALOG_FILE;
use catalog_ddl_core::storage::disk::STORAGE_FILE;

#[test]
fn test_catalog_and_rows_survive_reopen() {
    let path = temp_path();
    {
        let mut db = Database::open(&path).unwrap();
        db.execute("create table users (id int unique, name text)").unwrap();
        db.execute("create index ix_users_name on users (name)").unwrap();
        db.execute(r#"insert into users values (1, "ann")"#).unwrap();
        db.execute(r#"insert into users values (2, "bob")"#).unwrap();
    }
    assert!(path.join(CATALOG_FILE).exists());
    assert!(path.join(STORAGE_FILE).exists());

    let mut db = Database::open(&path).unwrap();
    assert_eq!(
        db.execute("select * from users").unwrap(),
        "id\tname\n1\tann\n2\tbob"
    );
    assert_eq!(count_of(&db, ObjectKind::Schema), 1);
    assert_eq!(count_of(&db, ObjectKind::Index), 2);

    // unique index entries were persisted too
    let err = db.execute(r#"insert into users values (1, "again")"#).unwrap_err();
    assert!(err.to_string().contains("duplicate key"));
}

#[test]
fn test_identifiers_are_not_reused_after_reopen() {
    let path = temp_path();
    let first = {
        let mut db = Database::open(&path).unwrap();
        db.execute("create table a (x int)").unwrap();
        db.execute("drop table a").unwrap();
        db.catalog().object_count()
    };

    let mut db = Database::open(&path).unwrap();
    assert_eq!(db.catalog().object_count(), first);
    db.execute("create table b (x int)").unwrap();
    let b = db.catalog().objects_of_kind(ObjectKind::Table)[0];
    // schema, a, a.x and their grants came first
    assert!(b.0 > 3);
}

#[test]
fn test_drop_persists() {
    let path = temp_path();
    {
        let mut db = Database::open(&path).unwrap();
        db.execute("create table a (x int)").unwrap();
        db.execute("create table b (x int)").unwrap();
        db.execute("drop table a").unwrap();
    }
    let mut db = Database::open(&path).unwrap();
    assert_eq!(db.execute("show tables").unwrap(), "public.b");
}

#[test]
fn test_catalog_file_contents() -> anyhow::Result<()> {
    let path = temp_path();
    {
        let mut db = Database::open(&path)?;
        db.execute("create table t (a int)")?;
        db.execute("create index ix_t_a on t (a)")?;
    }

    let content = std::fs::read_to_string(path.join(CATALOG_FILE))?;
    let json: serde_json::Value = serde_json::from_str(&content)?;
    let objects = json["objects"].as_array().expect("objects array");
    let names: Vec<&str> = objects.iter().filter_map(|o| o["name"].as_str()).collect();
    assert!(names.contains(&"t"));
    assert!(names.contains(&"ix_t_a"));
    assert!(json["next_id"].as_u64().unwrap_or(0) as usize > objects.len());
    assert!(!json["links"].as_array().expect("links array").is_empty());
    Ok(())
}
