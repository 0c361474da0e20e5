use crate::parser::command::Command;
use super::common::parse_object_kind;

pub(super) fn parse_drop(tokens: &[String]) -> Result<Command, String> {
    // drop schema|table|view|index <name> [cascade|restrict]
    let usage = "Usage: drop schema|table|view|index <name> [cascade|restrict]";
    if tokens.len() < 3 || tokens.len() > 4 {
        return Err(usage.to_string());
    }
    let kind = parse_object_kind(&tokens[1])?;
    let cascade = match tokens.get(3).map(|t| t.to_lowercase()) {
        None => false,
        Some(t) if t == "restrict" => false,
        Some(t) if t == "cascade" => true,
        Some(_) => return Err(usage.to_string()),
    };
    Ok(Command::Drop {
        kind,
        name: tokens[2].clone(),
        cascade,
    })
}

pub(super) fn parse_truncate(tokens: &[String]) -> Result<Command, String> {
    // truncate [table] <name>
    match tokens.len() {
        2 => Ok(Command::Truncate {
            table: tokens[1].clone(),
        }),
        3 if tokens[1].eq_ignore_ascii_case("table") => Ok(Command::Truncate {
            table: tokens[2].clone(),
        }),
        _ => Err("Usage: truncate table <table>".to_string()),
    }
}
