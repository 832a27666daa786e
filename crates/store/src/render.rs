//! Lossless text rendering of result values.
//!
//! Every value is rendered the way a reader of the row would expect:
//! integers and decimals keep all digits, floats keep a fractional part,
//! dates and timestamps use ISO order, and NULL becomes `None`.

use jobsuite_core::error::StoreError;

pub const NULL: &str = "None";

/// Render a float so integral values keep a trailing `.0`.
pub fn render_f64(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

pub fn render_f32(value: f32) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e7 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

pub fn render_bool(value: bool) -> String {
    if value { "True".into() } else { "False".into() }
}

/// Hex rendering for binary values.
pub fn render_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn decode_error(column: usize, e: impl std::fmt::Display) -> StoreError {
    StoreError::QueryFailed(format!("Failed to decode column {column}: {e}"))
}

/// Quote text inside a list: single quotes unless the text contains one
/// and no double quote.
pub fn quote(text: &str) -> String {
    if text.contains('\'') && !text.contains('"') {
        return format!("\"{}\"", text.replace('\\', "\\\\"));
    }
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Render already-rendered elements as `[a, b, c]`.
pub fn render_list(items: impl IntoIterator<Item = String>) -> String {
    let items: Vec<String> = items.into_iter().collect();
    format!("[{}]", items.join(", "))
}

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

/// Render an interval as `D days, H:MM:SS[.ffffff]`, counting a month as
/// 30 days. Negative spans borrow whole days so the clock part stays
/// positive: minus one hour is `-1 day, 23:00:00`.
pub fn render_interval(months: i32, days: i32, micros: i64) -> String {
    let total = (months as i64 * 30 + days as i64) * MICROS_PER_DAY + micros;
    let days = total.div_euclid(MICROS_PER_DAY);
    let clock = total.rem_euclid(MICROS_PER_DAY);

    let hours = clock / (3600 * MICROS_PER_SECOND);
    let minutes = clock / (60 * MICROS_PER_SECOND) % 60;
    let seconds = clock / MICROS_PER_SECOND % 60;
    let fraction = clock % MICROS_PER_SECOND;

    let mut out = String::new();
    if days != 0 {
        let unit = if days.abs() == 1 { "day" } else { "days" };
        out.push_str(&format!("{days} {unit}, "));
    }
    out.push_str(&format!("{hours}:{minutes:02}:{seconds:02}"));
    if fraction != 0 {
        out.push_str(&format!(".{fraction:06}"));
    }
    out
}

#[cfg(feature = "sqlite")]
pub mod sqlite {
    use super::*;
    use sqlx::sqlite::SqliteRow;
    use sqlx::{Row, TypeInfo, ValueRef};

    /// Render column `i` of a SQLite row.
    pub fn value(row: &SqliteRow, i: usize) -> Result<String, StoreError> {
        let raw = row.try_get_raw(i).map_err(|e| decode_error(i, e))?;
        if raw.is_null() {
            return Ok(NULL.into());
        }
        let type_name = raw.type_info().name().to_ascii_uppercase();

        match type_name.as_str() {
            "INTEGER" | "INT" | "INT8" | "BIGINT" | "BOOLEAN" => row
                .try_get_unchecked::<i64, _>(i)
                .map(|v| v.to_string())
                .map_err(|e| decode_error(i, e)),
            "REAL" | "FLOAT" | "DOUBLE" => row
                .try_get_unchecked::<f64, _>(i)
                .map(render_f64)
                .map_err(|e| decode_error(i, e)),
            "BLOB" => row
                .try_get_unchecked::<Vec<u8>, _>(i)
                .map(|v| render_bytes(&v))
                .map_err(|e| decode_error(i, e)),
            _ => row
                .try_get_unchecked::<String, _>(i)
                .map_err(|e| decode_error(i, e)),
        }
    }
}

#[cfg(feature = "postgres")]
pub mod postgres {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use sqlx::postgres::types::PgInterval;
    use sqlx::postgres::{PgHasArrayType, PgRow, PgValueFormat, Postgres};
    use sqlx::types::BigDecimal;
    use sqlx::{Decode, Row, Type, TypeInfo, ValueRef};

    /// Render column `i` of a PostgreSQL row.
    pub fn value(row: &PgRow, i: usize) -> Result<String, StoreError> {
        let raw = row.try_get_raw(i).map_err(|e| decode_error(i, e))?;
        if raw.is_null() {
            return Ok(NULL.into());
        }
        if raw.format() == PgValueFormat::Text {
            return raw.as_str().map(str::to_string).map_err(|e| decode_error(i, e));
        }
        let type_name = raw.type_info().name().to_string();

        let rendered = match type_name.as_str() {
            "BOOL" => row.try_get::<bool, _>(i).map(render_bool),
            "INT2" => row.try_get::<i16, _>(i).map(|v| v.to_string()),
            "INT4" => row.try_get::<i32, _>(i).map(|v| v.to_string()),
            "INT8" => row.try_get::<i64, _>(i).map(|v| v.to_string()),
            "FLOAT4" => row.try_get::<f32, _>(i).map(render_f32),
            "FLOAT8" => row.try_get::<f64, _>(i).map(render_f64),
            "NUMERIC" => row.try_get::<BigDecimal, _>(i).map(|v| render_numeric(&v)),
            "DATE" => row.try_get::<NaiveDate, _>(i).map(|v| v.to_string()),
            "TIME" => row.try_get::<NaiveTime, _>(i).map(|v| v.to_string()),
            "TIMESTAMP" => row.try_get::<NaiveDateTime, _>(i).map(|v| v.to_string()),
            "TIMESTAMPTZ" => row.try_get::<DateTime<Utc>, _>(i).map(render_timestamptz),
            "INTERVAL" => row.try_get::<PgInterval, _>(i).map(|v| render_pg_interval(&v)),
            "UUID" => row.try_get::<uuid::Uuid, _>(i).map(|v| v.to_string()),
            "JSON" | "JSONB" => row.try_get::<serde_json::Value, _>(i).map(|v| v.to_string()),
            "BYTEA" => row.try_get::<Vec<u8>, _>(i).map(|v| render_bytes(&v)),
            "TEXT" | "VARCHAR" | "CHAR" | "NAME" => row.try_get::<String, _>(i),

            "BOOL[]" => array::<bool>(row, i, render_bool),
            "INT2[]" => array::<i16>(row, i, |v| v.to_string()),
            "INT4[]" => array::<i32>(row, i, |v| v.to_string()),
            "INT8[]" => array::<i64>(row, i, |v| v.to_string()),
            "FLOAT4[]" => array::<f32>(row, i, render_f32),
            "FLOAT8[]" => array::<f64>(row, i, render_f64),
            "NUMERIC[]" => array::<BigDecimal>(row, i, |v| render_numeric(&v)),
            "DATE[]" => array::<NaiveDate>(row, i, |v| quote(&v.to_string())),
            "TIMESTAMP[]" => array::<NaiveDateTime>(row, i, |v| quote(&v.to_string())),
            "TIMESTAMPTZ[]" => array::<DateTime<Utc>>(row, i, |v| quote(&render_timestamptz(v))),
            "INTERVAL[]" => array::<PgInterval>(row, i, |v| quote(&render_pg_interval(&v))),
            "UUID[]" => array::<uuid::Uuid>(row, i, |v| quote(&v.to_string())),
            "JSON[]" | "JSONB[]" => array::<serde_json::Value>(row, i, |v| v.to_string()),
            "TEXT[]" | "VARCHAR[]" | "CHAR[]" | "NAME[]" => array::<String>(row, i, |v| quote(&v)),

            // Enums and other text-like types send their label as UTF-8
            _ => row.try_get_unchecked::<String, _>(i),
        };

        rendered.map_err(|e| decode_error(i, e))
    }

    /// Decode an array column, NULL elements included, as a list literal.
    fn array<T>(row: &PgRow, i: usize, render: impl Fn(T) -> String) -> Result<String, sqlx::Error>
    where
        T: for<'a> Decode<'a, Postgres> + Type<Postgres> + PgHasArrayType,
    {
        let items: Vec<Option<T>> = row.try_get(i)?;
        Ok(render_list(
            items
                .into_iter()
                .map(|item| item.map(&render).unwrap_or_else(|| NULL.to_string())),
        ))
    }

    /// Exact decimal text, never in exponent notation.
    pub fn render_numeric(value: &BigDecimal) -> String {
        value.to_plain_string()
    }

    fn render_timestamptz(value: DateTime<Utc>) -> String {
        value.format("%Y-%m-%d %H:%M:%S%.f+00:00").to_string()
    }

    fn render_pg_interval(value: &PgInterval) -> String {
        render_interval(value.months, value.days, value.microseconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_keep_fraction() {
        assert_eq!(render_f64(85000.0), "85000.0");
        assert_eq!(render_f64(2.5), "2.5");
        assert_eq!(render_f64(0.1), "0.1");
        assert_eq!(render_f32(3.0), "3.0");
    }

    #[test]
    fn bools_and_bytes() {
        assert_eq!(render_bool(true), "True");
        assert_eq!(render_bytes(&[0xde, 0xad]), "\\xdead");
    }

    #[test]
    fn list_elements_quoted_like_literals() {
        assert_eq!(quote("Nurse"), "'Nurse'");
        assert_eq!(quote("Director's office"), "\"Director's office\"");
        assert_eq!(quote(r"a\b"), r"'a\\b'");
        assert_eq!(quote(r#"it's "x""#), r#"'it\'s "x"'"#);

        let titles = vec![Some("Nurse"), None, Some("Data Analyst")]
            .into_iter()
            .map(|t| t.map(quote).unwrap_or_else(|| NULL.to_string()));
        assert_eq!(render_list(titles), "['Nurse', None, 'Data Analyst']");
        assert_eq!(render_list(vec![render_f64(1.0), render_f64(2.5)]), "[1.0, 2.5]");
        assert_eq!(render_list(Vec::new()), "[]");
    }

    #[test]
    fn intervals_render_as_day_clock() {
        assert_eq!(render_interval(0, 0, 0), "0:00:00");
        assert_eq!(render_interval(0, 3, 4 * 3_600_000_000 + 5 * 60_000_000 + 6_000_000), "3 days, 4:05:06");
        assert_eq!(render_interval(0, 1, 0), "1 day, 0:00:00");
        assert_eq!(render_interval(1, 2, 0), "32 days, 0:00:00");
        assert_eq!(render_interval(0, 0, 1_500_000), "0:00:01.500000");
        assert_eq!(render_interval(0, 0, -3_600_000_000), "-1 day, 23:00:00");
        assert_eq!(render_interval(0, -2, 0), "-2 days, 0:00:00");
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn numeric_keeps_scale_and_digits() {
        use sqlx::types::BigDecimal;
        use std::str::FromStr;

        let render = |s: &str| postgres::render_numeric(&BigDecimal::from_str(s).unwrap());
        assert_eq!(render("85000.00"), "85000.00");
        assert_eq!(render("-12.5"), "-12.5");
        assert_eq!(render("0.0000001"), "0.0000001");
        assert_eq!(render("123456789012345678901234567890.123"), "123456789012345678901234567890.123");
        assert_eq!(render("0"), "0");
    }
}
