use crate::parser::command::Command;

pub(super) fn parse_insert(tokens: &[String]) -> Result<Command, String> {
    // insert into <table> values (<v1>, <v2>, ...)
    let usage = "Usage: insert into <table> values (<v1>, <v2>, ...)";
    if tokens.len() < 7 {
        return Err(usage.to_string());
    }
    if !tokens[1].eq_ignore_ascii_case("into")
        || !tokens[3].eq_ignore_ascii_case("values")
        || tokens[4] != "("
        || tokens[tokens.len() - 1] != ")"
    {
        return Err(usage.to_string());
    }
    let table = tokens[2].clone();
    let mut values: Vec<String> = Vec::new();
    let mut i = 5usize;
    let end = tokens.len() - 1;

    while i < end {
        values.push(tokens[i].clone());
        i += 1;
        if i < end {
            if tokens[i] != "," {
                return Err("Bad INSERT values. Values must be comma-separated.".to_string());
            }
            i += 1;
            if i >= end {
                return Err("Bad INSERT values. Trailing comma is not allowed.".to_string());
            }
        }
    }

    Ok(Command::Insert { table, values })
}

pub(super) fn parse_select(tokens: &[String]) -> Result<Command, String> {
    // select * from <table>
    if tokens.len() != 4 || tokens[1] != "*" || !tokens[2].eq_ignore_ascii_case("from") {
        return Err("Usage: select * from <table>".to_string());
    }
    Ok(Command::Select {
        table: tokens[3].clone(),
    })
}

pub(super) fn parse_describe(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() != 2 {
        return Err("Usage: describe <table>".to_string());
    }
    Ok(Command::Describe {
        table: tokens[1].clone(),
    })
}

pub(super) fn parse_show(tokens: &[String]) -> Result<Command, String> {
    if tokens.len() != 2 || !tokens[1].eq_ignore_ascii_case("tables") {
        return Err("Usage: show tables".to_string());
    }
    Ok(Command::ShowTables)
}
