pub mod dml;
pub mod execute;
pub mod format;

pub use execute::{execute_command, run_ddl, EngineContext, StatementOutcome};
pub use format::{format_describe, format_select, format_tables};
