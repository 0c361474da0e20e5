pub mod alter;
pub mod create;
pub mod drop;
pub mod truncate;

pub use alter::{AlterTableAddColumn, AlterTableRebuild};
pub use create::{CreateIndex, CreateSchema, CreateTable, CreateView};
pub use drop::DropObject;
pub use truncate::TruncateTable;
