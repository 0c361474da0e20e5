use tracing::{debug, info};

use crate::catalog::CatalogRepository;
use crate::config::{EngineConfig, TestTraps};
use crate::ddl::statements::{
    AlterTableAddColumn, AlterTableRebuild, CreateIndex, CreateSchema, CreateTable, CreateView,
    DropObject, TruncateTable,
};
use crate::ddl::{
    DdlLockManager, DdlRegistry, DdlStatement, DdlValidator, MultiPhaseDriver, PhaseState,
    StorageReport,
};
use crate::error::DdlResult;
use crate::parser::command::{AlterAction, Command};
use crate::storage::StorageEngine;

use super::dml::{handle_describe, handle_insert, handle_select, handle_show_tables};

/// Everything a command runs against.
pub struct EngineContext<'e> {
    pub catalog: &'e mut dyn CatalogRepository,
    pub storage: &'e mut dyn StorageEngine,
    pub registry: &'e DdlRegistry,
    pub locks: &'e mut DdlLockManager,
    pub config: &'e EngineConfig,
    pub traps: &'e TestTraps,
    pub last: &'e mut StatementOutcome,
}

/// Diagnostics of the most recent DDL statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementOutcome {
    pub report: StorageReport,
    pub rounds: usize,
    pub phase: Option<PhaseState>,
    pub executed_dml: Vec<String>,
}

/// Executes a parsed command against the catalog and storage engine
pub fn execute_command(cmd: Command, cx: &mut EngineContext<'_>) -> DdlResult<String> {
    match cmd {
        Command::CreateSchema { name } => run_ddl(&mut CreateSchema::new(name), cx),
        Command::CreateTable {
            table,
            temporary,
            columns,
            table_constraints,
        } => run_ddl(
            &mut CreateTable::new(table, temporary, columns, table_constraints),
            cx,
        ),
        Command::CreateIndex {
            name,
            unique,
            table,
            columns,
        } => run_ddl(&mut CreateIndex::new(name, unique, table, columns), cx),
        Command::CreateView {
            name,
            replace,
            definition,
            sources,
        } => run_ddl(
            &mut CreateView::new(name, definition, sources).or_replace(replace),
            cx,
        ),
        Command::Drop {
            kind,
            name,
            cascade,
        } => run_ddl(&mut DropObject::new(kind, name, cascade), cx),
        Command::Truncate { table } => run_ddl(&mut TruncateTable::new(table), cx),
        Command::Alter { table, action } => match action {
            AlterAction::AddColumn(column) => {
                run_ddl(&mut AlterTableAddColumn::new(table, column), cx)
            }
            AlterAction::Rebuild => run_ddl(&mut AlterTableRebuild::new(table), cx),
        },
        Command::Insert { table, values } => handle_insert(&table, &values, cx),
        Command::Select { table } => handle_select(&table, cx),
        Command::Describe { table } => handle_describe(&table, cx),
        Command::ShowTables => handle_show_tables(cx),
    }
}

/// Runs one DDL statement: apply, validate and commit storage under a write
/// transaction, then hand multi-phase statements to the driver. On error
/// the catalog is rolled back to where it was, and so are storage changes
/// made by the commit pass.
pub fn run_ddl(stmt: &mut dyn DdlStatement, cx: &mut EngineContext<'_>) -> DdlResult<String> {
    *cx.last = StatementOutcome::default();
    let depth = cx.catalog.txn_depth();
    cx.catalog.begin_txn(true)?;
    cx.storage.begin_statement();

    if let Err(err) = validate_and_commit_storage(stmt, cx) {
        cx.storage.rollback_statement()?;
        rollback_to(cx.catalog, depth)?;
        debug!(statement = %stmt.describe(), error = %err, "statement rolled back");
        return Err(err);
    }
    cx.storage.end_statement();

    match stmt.as_multi_phase() {
        Some(multi) => {
            let mut driver = MultiPhaseDriver::new(
                &mut *cx.catalog,
                &mut *cx.storage,
                cx.config,
                cx.traps,
                &mut *cx.locks,
            );
            let result = driver.run(multi);
            cx.last.phase = driver.state();
            cx.last.executed_dml = driver.executed().to_vec();
            if let Err(err) = result {
                rollback_to(cx.catalog, depth)?;
                return Err(err);
            }
        }
        None => {
            cx.catalog.commit_txn()?;
            cx.storage.checkpoint()?;
        }
    }
    info!(statement = %stmt.describe(), "statement committed");
    Ok(stmt.completion_message())
}

fn validate_and_commit_storage(
    stmt: &mut dyn DdlStatement,
    cx: &mut EngineContext<'_>,
) -> DdlResult<()> {
    let mut validator = DdlValidator::new(
        &mut *cx.catalog,
        &mut *cx.storage,
        cx.registry,
        &*cx.locks,
        cx.config,
    );
    validator.apply(stmt)?;
    let validated = validator.validate(stmt);
    cx.last.rounds = validator.rounds();
    validated?;
    cx.last.report = validator.execute_storage()?;
    Ok(())
}

fn rollback_to(catalog: &mut dyn CatalogRepository, depth: usize) -> DdlResult<()> {
    while catalog.txn_depth() > depth {
        catalog.rollback_txn()?;
    }
    Ok(())
}
