use catalog_ddl_core::Database;
use catalog_ddl_core::catalog::util::resolve_element;
use catalog_ddl_core::catalog::{CatalogRepository, ObjectId, ObjectKind};
use catalog_ddl_core::config::EngineConfig;

fn test_db() -> Database {
    Database::in_memory(EngineConfig::default()).unwrap()
}

fn test_db_with(config: EngineConfig) -> Database {
    Database::in_memory(config).unwrap()
}

fn object_id(db: &Database, kind: ObjectKind, name: &str) -> ObjectId {
    resolve_element(db.catalog(), "public", name, &[kind], kind.label()).unwrap()
}

fn try_object_id(db: &Database, kind: ObjectKind, name: &str) -> Option<ObjectId> {
    resolve_element(db.catalog(), "public", name, &[kind], kind.label()).ok()
}

fn count_of(db: &Database, kind: ObjectKind) -> usize {
    db.catalog().objects_of_kind(kind).len()
}

fn seed_items_3(db: &mut Database) {
    db.execute("create table items (id int unique, name text)").unwrap();
    db.execute("create index ix_items_name on items (name)").unwrap();
    db.execute(r#"insert into items values (1, "a")"#).unwrap();
    db.execute(r#"insert into items values (2, "b")"#).unwrap();
    db.execute(r#"insert into items values (3, "c")"#).unwrap();
}

fn seed_customers_orders(db: &mut Database) {
    db.execute("create table customers (id int unique, name text)").unwrap();
    db.execute("create index ix_customers_name on customers (name)").unwrap();
    db.execute(
        "create table orders (id int, cust int, constraint fk_orders_cust foreign key (cust) references customers (id))",
    )
    .unwrap();
}

mod cascade;
mod multi_phase;
mod replace;
mod restrict;
mod scheduler;
mod visibility;
