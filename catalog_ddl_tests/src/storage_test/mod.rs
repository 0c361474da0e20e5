use catalog_ddl_core::Database;
use catalog_ddl_core::catalog::{CatalogRepository, ObjectKind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

fn temp_path() -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let mut path: PathBuf = std::env::temp_dir();
    path.push(format!("catalog_ddl_test_{}_{}", std::process::id(), id));
    let _ = std::fs::remove_dir_all(&path);
    path
}

fn count_of(db: &Database, kind: ObjectKind) -> usize {
    db.catalog().objects_of_kind(kind).len()
}

mod config;
mod persistence;
mod recovery;
