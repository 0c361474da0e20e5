use crate::parser::command::{ColumnDef, Command, TableConstraintDef};
use super::common::{parse_column_name_list, parse_datatype_at};

const CREATE_TABLE_USAGE: &str = "Usage: create [temporary] table <table> (<col> <type>, ...)";

pub(super) fn parse_create(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() < 2 {
        return Err("Usage: create schema|table|index|[or replace] view ...".to_string());
    }
    match tokens[1].to_lowercase().as_str() {
        "schema" => parse_create_schema(tokens),
        "table" => parse_create_table(tokens, 2, false),
        "temporary" | "temp" => {
            if tokens.len() < 3 || !tokens[2].eq_ignore_ascii_case("table") {
                return Err(CREATE_TABLE_USAGE.to_string());
            }
            parse_create_table(tokens, 3, true)
        }
        "index" => parse_create_index(tokens, 2, false),
        "unique" => {
            if tokens.len() < 3 || !tokens[2].eq_ignore_ascii_case("index") {
                return Err("Usage: create [unique] index <name> on <table> (<col>, ...)".to_string());
            }
            parse_create_index(tokens, 3, true)
        }
        "view" => parse_create_view(tokens, 2, false),
        "or" => {
            let replace = tokens.len() > 3
                && tokens[2].eq_ignore_ascii_case("replace")
                && tokens[3].eq_ignore_ascii_case("view");
            if !replace {
                return Err("Usage: create or replace view <name> as select ...".to_string());
            }
            parse_create_view(tokens, 4, true)
        }
        other => Err(format!("Unknown object type '{other}' in CREATE")),
    }
}

fn parse_create_schema(tokens: &[String]) -> Result<Command, String> {
    // create schema <name>
    if tokens.len() != 3 {
        return Err("Usage: create schema <name>".to_string());
    }
    Ok(Command::CreateSchema {
        name: tokens[2].clone(),
    })
}

fn parse_create_table(tokens: &[String], name_at: usize, temporary: bool) -> Result<Command, String> {
    if tokens.len() < name_at + 5 {
        return Err(CREATE_TABLE_USAGE.to_string());
    }
    if tokens[name_at + 1] != "(" || tokens[tokens.len() - 1] != ")" {
        return Err("CREATE TABLE requires parenthesized column definitions".to_string());
    }
    let table = tokens[name_at].clone();

    let mut columns: Vec<ColumnDef> = Vec::new();
    let mut table_constraints: Vec<TableConstraintDef> = Vec::new();
    let mut i = name_at + 2;
    let end = tokens.len() - 1;

    while i < end {
        let t = tokens[i].to_lowercase();
        if matches!(t.as_str(), "constraint" | "unique" | "foreign") {
            let (constraint, next) = parse_table_constraint(tokens, i, end)?;
            table_constraints.push(constraint);
            i = next;
        } else {
            let (column, next) = parse_column_def(tokens, i, end)?;
            columns.push(column);
            i = next;
        }
        if i < end {
            if tokens[i] != "," {
                return Err("Bad CREATE TABLE list. Entries must be comma-separated.".to_string());
            }
            i += 1;
            if i >= end {
                return Err("Bad CREATE TABLE list. Trailing comma is not allowed.".to_string());
            }
        }
    }

    if columns.is_empty() {
        return Err("CREATE TABLE requires at least one column".to_string());
    }

    Ok(Command::CreateTable {
        table,
        temporary,
        columns,
        table_constraints,
    })
}

/// `<name> <type> [not null | null | unique | primary key | identity | default <value>]...`
pub(super) fn parse_column_def(
    tokens: &[String],
    start: usize,
    end: usize,
) -> Result<(ColumnDef, usize), String> {
    if start >= end {
        return Err("Missing column definition".to_string());
    }
    let name = tokens[start].clone();
    let (dtype, mut i) = parse_datatype_at(tokens, start + 1, end)?;
    let mut column = ColumnDef::new(name, dtype);

    while i < end && tokens[i] != "," {
        match tokens[i].to_lowercase().as_str() {
            "not" => {
                if i + 1 >= end || !tokens[i + 1].eq_ignore_ascii_case("null") {
                    return Err("Bad NOT NULL constraint. Use 'not null'".to_string());
                }
                column.not_null = true;
                i += 2;
            }
            "null" => {
                column.not_null = false;
                i += 1;
            }
            "unique" => {
                column.unique = true;
                i += 1;
            }
            "primary" => {
                if i + 1 >= end || !tokens[i + 1].eq_ignore_ascii_case("key") {
                    return Err("Bad PRIMARY KEY constraint. Use 'primary key'".to_string());
                }
                column.unique = true;
                column.not_null = true;
                i += 2;
            }
            "identity" => {
                column.identity = true;
                i += 1;
            }
            "default" => {
                if i + 1 >= end || tokens[i + 1] == "," {
                    return Err("DEFAULT requires a value".to_string());
                }
                column.default = Some(tokens[i + 1].clone());
                i += 2;
            }
            other => return Err(format!("Unknown column constraint token '{other}'")),
        }
    }
    Ok((column, i))
}

fn parse_table_constraint(
    tokens: &[String],
    start: usize,
    end: usize,
) -> Result<(TableConstraintDef, usize), String> {
    let mut i = start;
    let mut name = None;
    if tokens[i].eq_ignore_ascii_case("constraint") {
        if i + 2 >= end {
            return Err("Bad CONSTRAINT clause. Use constraint <name> unique(...)".to_string());
        }
        name = Some(tokens[i + 1].clone());
        i += 2;
    }

    if tokens[i].eq_ignore_ascii_case("unique") {
        let (columns, next) = parse_column_name_list(tokens, i + 1, end)?;
        return Ok((TableConstraintDef::Unique { name, columns }, next));
    }
    if tokens[i].eq_ignore_ascii_case("foreign") {
        if i + 1 >= end || !tokens[i + 1].eq_ignore_ascii_case("key") {
            return Err("Bad FOREIGN KEY constraint. Use foreign key(col) references t(col)".to_string());
        }
        let (columns, after_cols) = parse_column_name_list(tokens, i + 2, end)?;
        if after_cols >= end || !tokens[after_cols].eq_ignore_ascii_case("references") {
            return Err("Bad FOREIGN KEY constraint. Missing REFERENCES".to_string());
        }
        if after_cols + 1 >= end {
            return Err("Bad FOREIGN KEY constraint. Missing parent table".to_string());
        }
        let ref_table = tokens[after_cols + 1].clone();
        let (ref_columns, next) = parse_column_name_list(tokens, after_cols + 2, end)?;
        return Ok((
            TableConstraintDef::ForeignKey {
                name,
                columns,
                ref_table,
                ref_columns,
            },
            next,
        ));
    }
    Err(format!("Unknown table constraint '{}'", tokens[i]))
}

fn parse_create_index(tokens: &[String], name_at: usize, unique: bool) -> Result<Command, String> {
    // create [unique] index <name> on <table> (col[,col...])
    let usage = "Usage: create [unique] index <name> on <table> (<col>, ...)";
    if tokens.len() < name_at + 6 || !tokens[name_at + 1].eq_ignore_ascii_case("on") {
        return Err(usage.to_string());
    }
    let (columns, next) = parse_column_name_list(tokens, name_at + 3, tokens.len())?;
    if next != tokens.len() {
        return Err(usage.to_string());
    }
    Ok(Command::CreateIndex {
        name: tokens[name_at].clone(),
        unique,
        table: tokens[name_at + 2].clone(),
        columns,
    })
}

fn parse_create_view(tokens: &[String], name_at: usize, replace: bool) -> Result<Command, String> {
    // create [or replace] view <name> as select ... from <source>[, <source>...] [where ...]
    let usage = "Usage: create [or replace] view <name> as select ... from <table>[, <table>...]";
    if tokens.len() < name_at + 5
        || !tokens[name_at + 1].eq_ignore_ascii_case("as")
        || !tokens[name_at + 2].eq_ignore_ascii_case("select")
    {
        return Err(usage.to_string());
    }
    let from = tokens
        .iter()
        .position(|t| t.eq_ignore_ascii_case("from"))
        .ok_or_else(|| usage.to_string())?;

    let mut sources = Vec::new();
    let mut i = from + 1;
    while i < tokens.len() && !tokens[i].eq_ignore_ascii_case("where") {
        if tokens[i] != "," {
            sources.push(tokens[i].clone());
        }
        i += 1;
    }
    if sources.is_empty() {
        return Err(usage.to_string());
    }

    Ok(Command::CreateView {
        name: tokens[name_at].clone(),
        replace,
        definition: tokens[name_at + 2..].join(" "),
        sources,
    })
}
