use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::types::datatype::DataType;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A stored cell. Rows are persisted as-is, so the variant set is part of
/// the `storage.json` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    BigInt(i128),
    Decimal(Decimal),
    VarChar(String),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Uuid(Uuid),
    Json(JsonValue),
    Blob(Vec<u8>),
}

impl Value {
    /// Reads an insert literal or a column default as a value of `dtype`.
    /// `null` is accepted for every type; nullability is checked by callers.
    pub fn parse(dtype: &DataType, literal: &str) -> Result<Value, String> {
        if literal.eq_ignore_ascii_case("null") {
            return Ok(Value::Null);
        }
        let mismatch = || format!("'{literal}' is not a valid {dtype}");
        let value = match dtype {
            DataType::Bool => match literal.to_ascii_lowercase().as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => return Err(mismatch()),
            },
            DataType::Int => Value::Int(literal.parse().map_err(|_| mismatch())?),
            DataType::BigInt => Value::BigInt(literal.parse().map_err(|_| mismatch())?),
            DataType::Decimal { precision, scale } => {
                let d: Decimal = literal.parse().map_err(|_| mismatch())?;
                check_decimal_fits(d, *precision, *scale)?;
                Value::Decimal(d)
            }
            DataType::VarChar(max) => {
                let len = literal.chars().count();
                if len > *max {
                    return Err(format!("'{literal}' is {len} characters, longer than {dtype}"));
                }
                Value::VarChar(literal.to_string())
            }
            DataType::Text => Value::Text(literal.to_string()),
            DataType::Date => {
                Value::Date(NaiveDate::parse_from_str(literal, DATE_FORMAT).map_err(|_| mismatch())?)
            }
            DataType::Timestamp => TIMESTAMP_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(literal, fmt).ok())
                .map(Value::Timestamp)
                .ok_or_else(mismatch)?,
            DataType::Uuid => Value::Uuid(Uuid::parse_str(literal).map_err(|_| mismatch())?),
            DataType::Json => Value::Json(serde_json::from_str(literal).map_err(|_| mismatch())?),
            DataType::Blob => {
                let digits = literal
                    .strip_prefix("0x")
                    .or_else(|| literal.strip_prefix("0X"))
                    .unwrap_or(literal);
                Value::Blob(hex::decode(digits).map_err(|_| mismatch())?)
            }
        };
        Ok(value)
    }

    /// Value an identity column holds for the row at `ordinal`.
    pub fn from_sequence(dtype: &DataType, start: i64, increment: i64, ordinal: u64) -> Value {
        let n = i128::from(start) + i128::from(increment) * i128::from(ordinal);
        match dtype {
            DataType::BigInt => Value::BigInt(n),
            _ => Value::Int(n as i64),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

fn check_decimal_fits(d: Decimal, precision: u32, scale: u32) -> Result<(), String> {
    let d = d.normalize();
    if d.scale() > scale {
        return Err(format!("{d} has more than {scale} fractional digits"));
    }
    let digits = d.mantissa().unsigned_abs().to_string().len() as u32;
    let whole = digits.saturating_sub(d.scale());
    let allowed = precision.saturating_sub(scale);
    if whole > allowed {
        return Err(format!("{d} has more than {allowed} digits before the decimal point"));
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::BigInt(n) => write!(f, "{n}"),
            Value::Decimal(d) => write!(f, "{}", d.normalize()),
            Value::VarChar(s) | Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMATS[0])),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Json(j) => write!(f, "{j}"),
            Value::Blob(b) => write!(f, "0x{}", hex::encode_upper(b)),
        }
    }
}

/// Index key for a tuple of values. Parts are length-prefixed so that
/// `("a;", "b")` and `("a", ";b")` stay distinct.
pub fn encode_key(values: &[&Value]) -> String {
    values.iter().fold(String::new(), |mut key, value| {
        let part = value.to_string();
        key.push_str(&format!("{}:{part};", part.len()));
        key
    })
}
