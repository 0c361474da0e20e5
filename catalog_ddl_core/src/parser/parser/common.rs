use crate::catalog::ObjectKind;
use crate::types::datatype::{parse_datatype, DataType};

pub(super) fn parse_column_name_list(
    tokens: &[String],
    start: usize,
    end: usize,
) -> Result<(Vec<String>, usize), String> {
    if start >= end || tokens[start] != "(" {
        return Err("Column list must start with '('".to_string());
    }
    let mut i = start + 1;
    let mut cols: Vec<String> = Vec::new();
    let mut expect_col = true;
    while i < end {
        if tokens[i] == ")" {
            if cols.is_empty() || expect_col {
                return Err("Column list cannot be empty".to_string());
            }
            return Ok((cols, i + 1));
        }
        if expect_col {
            if tokens[i] == "," {
                return Err("Bad column list".to_string());
            }
            cols.push(tokens[i].clone());
            expect_col = false;
        } else if tokens[i] != "," {
            return Err("Bad column list, expected comma".to_string());
        } else {
            expect_col = true;
        }
        i += 1;
    }
    Err("Unclosed column list".to_string())
}

/// Reads `type`, `varchar(n)` or `decimal(p,s)` starting at `start`.
pub(super) fn parse_datatype_at(
    tokens: &[String],
    start: usize,
    end: usize,
) -> Result<(DataType, usize), String> {
    if start >= end {
        return Err("Missing datatype in column definition".to_string());
    }
    match tokens[start].to_lowercase().as_str() {
        "varchar" => {
            if tokens.get(start + 1).map(String::as_str) != Some("(")
                || tokens.get(start + 3).map(String::as_str) != Some(")")
            {
                return Err("Bad varchar type. Use varchar(n)".to_string());
            }
            let combined = format!("varchar({})", tokens[start + 2]);
            Ok((parse_datatype(&combined)?, start + 4))
        }
        "decimal" => {
            if tokens.get(start + 1).map(String::as_str) != Some("(")
                || tokens.get(start + 3).map(String::as_str) != Some(",")
                || tokens.get(start + 5).map(String::as_str) != Some(")")
            {
                return Err("Bad decimal type. Use decimal(p,s)".to_string());
            }
            let combined = format!("decimal({},{})", tokens[start + 2], tokens[start + 4]);
            Ok((parse_datatype(&combined)?, start + 6))
        }
        _ => Ok((parse_datatype(&tokens[start])?, start + 1)),
    }
}

pub(super) fn parse_object_kind(token: &str) -> Result<ObjectKind, String> {
    match token.to_lowercase().as_str() {
        "schema" => Ok(ObjectKind::Schema),
        "table" => Ok(ObjectKind::Table),
        "view" => Ok(ObjectKind::View),
        "index" => Ok(ObjectKind::Index),
        other => Err(format!("Unknown object type '{other}'. Use schema|table|view|index")),
    }
}
