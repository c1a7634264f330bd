//! PostgreSQL backend built on a sqlx connection pool.

use std::fmt::Write as _;
use std::str::FromStr;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use facade_core::Row;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde_json::Value;
use sqlx::postgres::types::{Oid, PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow, PgValueRef};
use sqlx::{Column as _, Row as _, TypeInfo as _, ValueRef as _};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{BackendError, DatabaseConfig, QueryBackend};

/// Postgres reports `MONEY` as an integer count of the smallest currency unit.
const MONEY_SCALE: u32 = 2;

/// [`QueryBackend`] that runs queries on a PostgreSQL pool.
///
/// Cloning is cheap; clones share the same pool.
#[derive(Debug, Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    /// Open a connection pool using `config`.
    ///
    /// # Errors
    /// Returns [`BackendError::Database`] if the initial connection fails.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, BackendError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;
        info!(
            max_connections = config.max_connections,
            acquire_timeout_ms = u64::try_from(config.acquire_timeout.as_millis()).unwrap_or(u64::MAX),
            "database pool ready"
        );
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close every pooled connection. Pending checkouts fail afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("database pool closed");
    }
}

#[async_trait]
impl QueryBackend for PgBackend {
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>, BackendError> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(convert_row).collect())
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .map(|col| {
            (
                col.name().to_owned(),
                convert_value(row, col.ordinal(), col.type_info().name()),
            )
        })
        .collect()
}

/// Decode one column. Only SQL `NULL` becomes `null`; a value the typed
/// decoders cannot handle is rendered from its raw bytes instead.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    let Ok(raw) = row.try_get_raw(index) else {
        return Value::Null;
    };
    if raw.is_null() {
        return Value::Null;
    }
    decode_typed(row, index, type_name).unwrap_or_else(|| render_raw(&raw))
}

fn decode_typed(row: &PgRow, index: usize, type_name: &str) -> Option<Value> {
    match type_name {
        "BOOL" => decode::<bool>(row, index).map(Value::Bool),
        "INT2" => decode::<i16>(row, index).map(Value::from),
        "INT4" => decode::<i32>(row, index).map(Value::from),
        "INT8" => decode::<i64>(row, index).map(Value::from),
        "OID" => decode::<Oid>(row, index).map(|v| Value::from(v.0)),
        "FLOAT4" => decode::<f32>(row, index).map(Value::from),
        "FLOAT8" => decode::<f64>(row, index).map(Value::from),
        "NUMERIC" => decode::<Decimal>(row, index).map(decimal_to_json),
        "MONEY" => decode::<PgMoney>(row, index).map(|v| decimal_to_json(v.to_decimal(MONEY_SCALE))),
        "TIMESTAMPTZ" => decode::<DateTime<Utc>>(row, index).map(|v| Value::String(v.to_rfc3339())),
        "TIMESTAMP" => decode::<NaiveDateTime>(row, index).map(|v| Value::String(naive_datetime_text(v))),
        "DATE" => decode::<NaiveDate>(row, index).map(|v| Value::String(v.to_string())),
        "TIME" => decode::<NaiveTime>(row, index).map(|v| Value::String(v.to_string())),
        "TIMETZ" => decode::<PgTimeTz<NaiveTime, FixedOffset>>(row, index)
            .map(|v| Value::String(format!("{}{}", v.time, v.offset))),
        "INTERVAL" => decode::<PgInterval>(row, index).map(|v| Value::String(interval_to_iso8601(&v))),
        "INET" | "CIDR" => row
            .try_get_raw(index)
            .ok()
            .and_then(|v| v.as_bytes().ok())
            .and_then(inet_to_string)
            .map(Value::String),
        "JSON" | "JSONB" => decode::<Value>(row, index),
        "UUID" => decode::<Uuid>(row, index).map(|v| Value::String(v.to_string())),
        "BYTEA" => decode::<Vec<u8>>(row, index).map(|v| Value::String(STANDARD.encode(v))),
        "BOOL[]" => decode_array::<bool>(row, index, Value::Bool),
        "INT2[]" => decode_array::<i16>(row, index, Value::from),
        "INT4[]" => decode_array::<i32>(row, index, Value::from),
        "INT8[]" => decode_array::<i64>(row, index, Value::from),
        "FLOAT4[]" => decode_array::<f32>(row, index, Value::from),
        "FLOAT8[]" => decode_array::<f64>(row, index, Value::from),
        "NUMERIC[]" => decode_array::<Decimal>(row, index, decimal_to_json),
        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => {
            decode_array::<String>(row, index, Value::String)
        }
        "UUID[]" => decode_array::<Uuid>(row, index, |v| Value::String(v.to_string())),
        "DATE[]" => decode_array::<NaiveDate>(row, index, |v| Value::String(v.to_string())),
        "TIMESTAMP[]" => {
            decode_array::<NaiveDateTime>(row, index, |v| Value::String(naive_datetime_text(v)))
        }
        "TIMESTAMPTZ[]" => {
            decode_array::<DateTime<Utc>>(row, index, |v| Value::String(v.to_rfc3339()))
        }
        "JSONB[]" => decode_array::<Value>(row, index, |v| v),
        _ => decode::<String>(row, index).map(Value::String),
    }
}

fn decode<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<Option<T>, _>(index).ok().flatten()
}

/// One-dimensional arrays; `NULL` elements stay `null`.
fn decode_array<T>(row: &PgRow, index: usize, convert: impl Fn(T) -> Value) -> Option<Value>
where
    Vec<Option<T>>: for<'a> sqlx::Decode<'a, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    decode::<Vec<Option<T>>>(row, index).map(|items| {
        Value::Array(items.into_iter().map(|item| item.map_or(Value::Null, &convert)).collect())
    })
}

fn naive_datetime_text(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// A JSON number when the decimal survives the trip through `i64`/`f64`
/// exactly, otherwise its decimal text.
fn decimal_to_json(value: Decimal) -> Value {
    if value.fract().is_zero() {
        if let Some(int) = value.to_i64() {
            return Value::from(int);
        }
    }
    if let Some(float) = value.to_f64() {
        let exact = float.is_finite()
            && Decimal::from_str(&float.to_string()).is_ok_and(|back| back == value);
        if exact {
            return Value::from(float);
        }
    }
    Value::String(value.normalize().to_string())
}

/// ISO-8601 duration, e.g. `P1Y2M3DT4H5M6.5S`. Each component keeps its own
/// sign because Postgres stores months, days and time separately.
fn interval_to_iso8601(interval: &PgInterval) -> String {
    const MICROS_PER_SECOND: i64 = 1_000_000;
    const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
    const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;

    let mut out = String::from("P");
    let years = interval.months / 12;
    let months = interval.months % 12;
    if years != 0 {
        let _ = write!(out, "{years}Y");
    }
    if months != 0 {
        let _ = write!(out, "{months}M");
    }
    if interval.days != 0 {
        let _ = write!(out, "{}D", interval.days);
    }

    let micros = interval.microseconds;
    if micros != 0 {
        out.push('T');
        let hours = micros / MICROS_PER_HOUR;
        let minutes = (micros % MICROS_PER_HOUR) / MICROS_PER_MINUTE;
        let rest = micros % MICROS_PER_MINUTE;
        if hours != 0 {
            let _ = write!(out, "{hours}H");
        }
        if minutes != 0 {
            let _ = write!(out, "{minutes}M");
        }
        if rest != 0 {
            let sign = if rest < 0 { "-" } else { "" };
            let rest = rest.abs();
            let whole = rest / MICROS_PER_SECOND;
            let frac = rest % MICROS_PER_SECOND;
            if frac == 0 {
                let _ = write!(out, "{sign}{whole}S");
            } else {
                let frac = format!("{frac:06}");
                let _ = write!(out, "{sign}{whole}.{}S", frac.trim_end_matches('0'));
            }
        }
    }

    if out == "P" {
        out.push_str("T0S");
    }
    out
}

/// Binary `inet`/`cidr`: family, mask bits, is-cidr flag, address length, address.
fn inet_to_string(bytes: &[u8]) -> Option<String> {
    const PGSQL_AF_INET: u8 = 2;
    const PGSQL_AF_INET6: u8 = 3;

    let [family, bits, is_cidr, len, addr @ ..] = bytes else {
        return None;
    };
    let (ip, max_bits) = match (*family, *len, addr.len()) {
        (PGSQL_AF_INET, 4, 4) => {
            let octets: [u8; 4] = addr.try_into().ok()?;
            (std::net::IpAddr::from(octets), 32)
        }
        (PGSQL_AF_INET6, 16, 16) => {
            let octets: [u8; 16] = addr.try_into().ok()?;
            (std::net::IpAddr::from(octets), 128)
        }
        _ => return None,
    };
    if *is_cidr != 0 || *bits != max_bits {
        Some(format!("{ip}/{bits}"))
    } else {
        Some(ip.to_string())
    }
}

/// Fallback for types without a typed decoder (enums, `xml`, `"char"`, ranges...).
fn render_raw(raw: &PgValueRef<'_>) -> Value {
    match raw.as_bytes() {
        Ok(bytes) => Value::String(bytes_to_text(bytes)),
        Err(_) => Value::Null,
    }
}

/// Printable UTF-8 as-is, anything else as Postgres-style `\x` hex.
fn bytes_to_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) if !text.chars().any(|c| c.is_control() && !c.is_whitespace()) => {
            text.to_owned()
        }
        _ => {
            let mut hex = String::with_capacity(2 + bytes.len() * 2);
            hex.push_str("\\x");
            for byte in bytes {
                let _ = write!(hex, "{byte:02x}");
            }
            hex
        }
    }
}
