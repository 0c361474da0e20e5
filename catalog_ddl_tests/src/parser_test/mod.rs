use catalog_ddl_core::catalog::ObjectKind;
use catalog_ddl_core::parser::command::{AlterAction, ColumnDef, Command, TableConstraintDef};
use catalog_ddl_core::parser::parser::parse;
use catalog_ddl_core::types::datatype::DataType;

fn columns_of(cmd: Command) -> Vec<ColumnDef> {
    match cmd {
        Command::CreateTable { columns, .. } => columns,
        other => panic!("expected CreateTable, got {other:?}"),
    }
}

mod alter;
mod dml;
mod drop;
mod tokenizer;
