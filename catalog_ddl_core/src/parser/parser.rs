mod alter;
mod common;
mod create;
mod dml;
mod drop;
mod tokenizer;

use crate::parser::command::Command;

use alter::parse_alter;
use create::parse_create;
use dml::{parse_describe, parse_insert, parse_select, parse_show};
use drop::{parse_drop, parse_truncate};
use tokenizer::tokenize;

pub fn parse(input: &str) -> Result<Command, String> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("Empty command".to_string());
    }

    let keyword = tokens[0].to_lowercase();

    match keyword.as_str() {
        "create" => parse_create(&tokens),
        "drop" => parse_drop(&tokens),
        "truncate" => parse_truncate(&tokens),
        "alter" => parse_alter(&tokens),
        "insert" => parse_insert(&tokens),
        "select" => parse_select(&tokens),
        "describe" | "desc" => parse_describe(&tokens),
        "show" => parse_show(&tokens),
        _ => Err(format!("Unknown command '{}'", tokens[0])),
    }
}
