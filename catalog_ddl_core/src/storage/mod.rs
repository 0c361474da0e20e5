pub mod disk;
pub mod engine;
pub mod mem;

pub use disk::DiskStorage;
pub use engine::StorageEngine;
pub use mem::MemStorage;
