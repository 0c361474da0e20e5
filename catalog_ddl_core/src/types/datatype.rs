use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Bool,
    Int,
    BigInt,
    Decimal { precision: u32, scale: u32 },
    VarChar(usize),
    Text,
    Date,
    Timestamp,
    Uuid,
    Json,
    Blob,
}

impl DataType {
    /// Types an identity column may be declared with.
    pub fn is_integral(&self) -> bool {
        matches!(self, DataType::Int | DataType::BigInt)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "bool"),
            DataType::Int => write!(f, "int"),
            DataType::BigInt => write!(f, "bigint"),
            DataType::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            DataType::VarChar(n) => write!(f, "varchar({n})"),
            DataType::Text => write!(f, "text"),
            DataType::Date => write!(f, "date"),
            DataType::Timestamp => write!(f, "timestamp"),
            DataType::Uuid => write!(f, "uuid"),
            DataType::Json => write!(f, "json"),
            DataType::Blob => write!(f, "blob"),
        }
    }
}

pub fn parse_datatype(s: &str) -> Result<DataType, String> {
    let lower = s.to_lowercase();
    if let Some(inner) = lower
        .strip_prefix("varchar(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let n: usize = inner
            .trim()
            .parse()
            .map_err(|_| format!("Bad varchar length '{inner}'"))?;
        return Ok(DataType::VarChar(n));
    }
    if let Some(inner) = lower
        .strip_prefix("decimal(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let (p, s) = inner
            .split_once(',')
            .ok_or_else(|| "Bad decimal type. Use decimal(p,s)".to_string())?;
        let precision: u32 = p
            .trim()
            .parse()
            .map_err(|_| format!("Bad decimal precision '{p}'"))?;
        let scale: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("Bad decimal scale '{s}'"))?;
        return Ok(DataType::Decimal { precision, scale });
    }
    match lower.as_str() {
        "bool" | "boolean" => Ok(DataType::Bool),
        "int" | "integer" => Ok(DataType::Int),
        "bigint" => Ok(DataType::BigInt),
        "text" => Ok(DataType::Text),
        "date" => Ok(DataType::Date),
        "timestamp" => Ok(DataType::Timestamp),
        "uuid" => Ok(DataType::Uuid),
        "json" => Ok(DataType::Json),
        "blob" => Ok(DataType::Blob),
        other => Err(format!(
            "Unknown type '{other}'. Use bool|int|bigint|decimal(p,s)|varchar(n)|text|date|timestamp|uuid|json|blob"
        )),
    }
}
