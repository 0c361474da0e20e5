use crate::parser::command::{AlterAction, Command};
use super::create::parse_column_def;

const ALTER_USAGE: &str = "Usage: alter table <table> add [column] <col> <type> [constraints] | alter table <table> rebuild";

pub(super) fn parse_alter(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() < 4 || !tokens[1].eq_ignore_ascii_case("table") {
        return Err(ALTER_USAGE.to_string());
    }
    let table = tokens[2].clone();
    match tokens[3].to_lowercase().as_str() {
        "rebuild" => {
            if tokens.len() != 4 {
                return Err(ALTER_USAGE.to_string());
            }
            Ok(Command::Alter {
                table,
                action: AlterAction::Rebuild,
            })
        }
        "add" => {
            let mut i = 4;
            if i < tokens.len() && tokens[i].eq_ignore_ascii_case("column") {
                i += 1;
            }
            let (column, next) = parse_column_def(tokens, i, tokens.len())?;
            if next != tokens.len() {
                return Err(ALTER_USAGE.to_string());
            }
            Ok(Command::Alter {
                table,
                action: AlterAction::AddColumn(column),
            })
        }
        _ => Err(ALTER_USAGE.to_string()),
    }
}
