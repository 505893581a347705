//! MySQL type mapping to Rust types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::mysql::types::MySqlTime;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row, TypeInfo, ValueRef};

use crate::error::ServerError;

/// A SQL value that can be serialized to JSON and bound as a parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    DateTimeUtc(DateTime<Utc>),
    Json(serde_json::Value),
}

impl SqlValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Check if this value is null or a string holding only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            SqlValue::Null => true,
            SqlValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Convert a JSON request value into a bindable value.
    ///
    /// Arrays and objects are bound as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => SqlValue::Null,
            serde_json::Value::Bool(b) => SqlValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::I64(i)
                } else if let Some(u) = n.as_u64() {
                    SqlValue::U64(u)
                } else if let Some(f) = n.as_f64() {
                    SqlValue::F64(f)
                } else {
                    SqlValue::String(n.to_string())
                }
            }
            serde_json::Value::String(s) => SqlValue::String(s.clone()),
            other => SqlValue::String(other.to_string()),
        }
    }

    /// Convert to a display string.
    pub fn to_display_string(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(v) => v.to_string(),
            SqlValue::I64(v) => v.to_string(),
            SqlValue::U64(v) => v.to_string(),
            SqlValue::F32(v) => v.to_string(),
            SqlValue::F64(v) => v.to_string(),
            SqlValue::Decimal(v) => v.to_string(),
            SqlValue::String(v) => v.clone(),
            SqlValue::Bytes(v) => format!("0x{}", hex::encode(v)),
            SqlValue::Date(v) => v.to_string(),
            SqlValue::DateTime(v) => v.to_string(),
            SqlValue::DateTimeUtc(v) => v.to_rfc3339(),
            SqlValue::Json(v) => v.to_string(),
        }
    }

    /// Bind this value as the next positional parameter of a query.
    pub fn bind_to<'q>(
        &self,
        query: Query<'q, MySql, MySqlArguments>,
    ) -> Query<'q, MySql, MySqlArguments> {
        match self {
            SqlValue::Null => query.bind(Option::<String>::None),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::I64(v) => query.bind(*v),
            SqlValue::U64(v) => query.bind(*v),
            SqlValue::F32(v) => query.bind(*v),
            SqlValue::F64(v) => query.bind(*v),
            SqlValue::Decimal(v) => query.bind(*v),
            SqlValue::String(v) => query.bind(v.clone()),
            SqlValue::Bytes(v) => query.bind(v.clone()),
            SqlValue::Date(v) => query.bind(*v),
            SqlValue::DateTime(v) => query.bind(*v),
            SqlValue::DateTimeUtc(v) => query.bind(*v),
            SqlValue::Json(v) => query.bind(v.to_string()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::String(value.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::I64(value)
    }
}

/// Type mapper for converting MySQL column values to [`SqlValue`].
pub struct TypeMapper;

impl TypeMapper {
    /// Extract a value from a MySQL row column.
    ///
    /// Only SQL NULL becomes [`SqlValue::Null`]. A value the typed decoders
    /// reject is returned as text or raw bytes instead.
    pub fn extract_column(row: &MySqlRow, idx: usize) -> Result<SqlValue, ServerError> {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }
        let type_name = raw.type_info().name().to_string();

        if let Some(value) = Self::extract_typed(row, idx, &type_name) {
            return Ok(value);
        }

        Self::extract_raw(row, idx, &type_name)
    }

    /// Decode a non-null value using the declared column type.
    fn extract_typed(row: &MySqlRow, idx: usize, type_name: &str) -> Option<SqlValue> {
        match type_name {
            "BOOLEAN" => try_get::<bool>(row, idx).map(SqlValue::Bool),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
                try_get::<i64>(row, idx).map(SqlValue::I64)
            }
            "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
            | "BIGINT UNSIGNED" | "BIT" => try_get::<u64>(row, idx).map(SqlValue::U64),
            "FLOAT" => try_get::<f32>(row, idx).map(SqlValue::F32),
            "DOUBLE" => try_get::<f64>(row, idx).map(SqlValue::F64),
            "DECIMAL" => try_get::<Decimal>(row, idx).map(SqlValue::Decimal),
            "DATE" => try_get::<NaiveDate>(row, idx).map(SqlValue::Date),
            "TIME" => try_get::<MySqlTime>(row, idx).map(|t| SqlValue::String(time_text(&t))),
            "DATETIME" => try_get::<NaiveDateTime>(row, idx).map(SqlValue::DateTime),
            "TIMESTAMP" => try_get::<DateTime<Utc>>(row, idx).map(SqlValue::DateTimeUtc),
            "JSON" => try_get::<serde_json::Value>(row, idx).map(SqlValue::Json),
            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
                try_get::<Vec<u8>>(row, idx).map(SqlValue::Bytes)
            }
            _ => try_get::<String>(row, idx).map(SqlValue::String),
        }
    }

    /// Fall back to the bytes the server sent.
    fn extract_raw(row: &MySqlRow, idx: usize, type_name: &str) -> Result<SqlValue, ServerError> {
        let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx).map_err(|e| {
            let column = row.columns().get(idx).map(|c| c.name()).unwrap_or("?");
            ServerError::query_error(format!(
                "Cannot decode column '{}' of type {}: {}",
                column, type_name, e
            ))
        })?;

        Ok(raw_value(type_name, bytes))
    }
}

/// Interpret undecodable column bytes.
///
/// Zero dates become their MySQL spelling; text-encoded types (such as a
/// DECIMAL too wide for `rust_decimal`) keep their text; anything else stays
/// as bytes.
fn raw_value(type_name: &str, bytes: Vec<u8>) -> SqlValue {
    if let Some(zero) = zero_temporal(type_name, &bytes) {
        return SqlValue::String(zero);
    }
    if is_binary_encoded(type_name) {
        return SqlValue::Bytes(bytes);
    }
    match String::from_utf8(bytes) {
        Ok(text) => SqlValue::String(text),
        Err(e) => SqlValue::Bytes(e.into_bytes()),
    }
}

/// Zero dates arrive without a date payload in the binary protocol.
fn zero_temporal(type_name: &str, bytes: &[u8]) -> Option<String> {
    let zero = match type_name {
        "DATE" => "0000-00-00",
        "DATETIME" | "TIMESTAMP" => "0000-00-00 00:00:00",
        _ => return None,
    };

    if bytes.len() <= 1 {
        return Some(zero.to_string());
    }
    if bytes.starts_with(b"0000-00-00") {
        return Some(String::from_utf8_lossy(bytes).into_owned());
    }
    None
}

/// Types whose binary-protocol payload is not text.
fn is_binary_encoded(type_name: &str) -> bool {
    let base = type_name.strip_suffix(" UNSIGNED").unwrap_or(type_name);
    matches!(
        base,
        "BOOLEAN"
            | "TINYINT"
            | "SMALLINT"
            | "MEDIUMINT"
            | "INT"
            | "BIGINT"
            | "YEAR"
            | "BIT"
            | "FLOAT"
            | "DOUBLE"
            | "DATE"
            | "TIME"
            | "DATETIME"
            | "TIMESTAMP"
            | "GEOMETRY"
    )
}

/// Render a TIME the way MySQL prints it, including values outside a day.
fn time_text(time: &MySqlTime) -> String {
    let sign = if time.is_negative() { "-" } else { "" };
    let mut text = format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        time.hours(),
        time.minutes(),
        time.seconds()
    );
    if time.microseconds() != 0 {
        text.push_str(&format!(".{:06}", time.microseconds()));
    }
    text
}

/// Decode a non-null column, returning `None` if the Rust type does not match.
fn try_get<T>(row: &MySqlRow, idx: usize) -> Option<T>
where
    T: for<'r> sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get::<T, _>(idx).ok()
}

/// Hex encoding helper (minimal implementation to avoid extra dependency).
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02X}", b)).collect()
    }
}
