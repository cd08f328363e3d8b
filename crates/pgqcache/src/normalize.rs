//! Result normalization (spec §4.5): turns `tokio_postgres::Row`s into JSON
//! and shapes them per the calling exec.
//!
//! The column-type dispatch in [`row_to_json`] is grounded on the same
//! technique a `sqlx`-based host uses to turn a row into a generic
//! `serde_json::Value` by switching on the driver's reported column type
//! rather than requiring a `FromRow` impl per table -- this crate's filter
//! record is dynamic, so there is no destination struct to decode into.

use chrono::{NaiveDateTime, Utc};
use serde_json::Value as Json;
use tokio_postgres::types::Type;
use tokio_postgres::Row;

use crate::error::{CacheDbError, CacheDbResult};

/// The shaped outcome of one dispatch call (spec §4.5 per-exec result table).
#[derive(Debug, Clone)]
pub enum ExecResult {
    /// `find` (always), or `read` with `first` set: first row as an object,
    /// or `Null` if there were none.
    Row(Json),
    /// `read` without `first`: every matching row as an array.
    Rows(Vec<Json>),
    /// `list`: rows plus the paired count, queried independently of paging.
    List { items: Vec<Json>, count: i64 },
    /// `count`: the scalar row count, or `Null` if the query produced no row
    /// (practically unreachable for `COUNT(1)`, but the shape stays honest).
    Count(Json),
    /// `check`: whether at least one row matched.
    Check(bool),
    /// `insert`: the `RETURNING` row (or primary key column) if requested,
    /// plus rows-affected (always 1 on success, since `insert` is single-row).
    Insert { returning: Json, affected: u64 },
    /// `update` / `remove`: `RETURNING` rows if requested (collapsed to the
    /// first row when `first` is set, same rule as `find`/`read`), else just
    /// a count.
    Mutation { returning: Option<Json>, affected: u64 },
    /// `scalar` aggregate: a single value, or `Null`.
    Scalar(Json),
    /// `scalar` group: one row per group.
    ScalarGroup(Vec<Json>),
    /// `drop` / `truncate`: no result payload.
    Ddl,
    /// `query` / `command`: raw rows, shape left to the caller.
    Raw(Vec<Json>),
}

/// Convert every row to a JSON object, keyed by column name.
pub fn rows_to_json(rows: &[Row]) -> CacheDbResult<Vec<Json>> {
    rows.iter().map(row_to_json).collect()
}

/// Convert a single row to a JSON object.
pub fn row_to_json(row: &Row) -> CacheDbResult<Json> {
    let mut obj = serde_json::Map::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let value = column_to_json(row, i, column.type_())?;
        obj.insert(column.name().to_string(), value);
    }
    Ok(Json::Object(obj))
}

fn column_to_json(row: &Row, idx: usize, ty: &Type) -> CacheDbResult<Json> {
    let decode_err = |message: String| CacheDbError::decode(ty.name(), message);

    macro_rules! get {
        ($t:ty) => {
            row.try_get::<_, Option<$t>>(idx).map_err(|e| decode_err(e.to_string()))
        };
    }

    let value = match *ty {
        Type::BOOL => get!(bool)?.map(Json::Bool),
        Type::INT2 => get!(i16)?.map(|v| Json::from(v as i64)),
        Type::INT4 => get!(i32)?.map(|v| Json::from(v as i64)),
        Type::INT8 => get!(i64)?.map(Json::from),
        Type::FLOAT4 => get!(f32)?.map(|v| Json::from(v as f64)),
        Type::FLOAT8 => get!(f64)?.map(Json::from),
        #[cfg(feature = "rust_decimal")]
        Type::NUMERIC => get!(rust_decimal::Decimal)?.and_then(|d| {
            d.to_string().parse::<f64>().ok().and_then(serde_json::Number::from_f64).map(Json::Number)
        }),
        Type::TIMESTAMP => get!(NaiveDateTime)?
            .map(|d| Json::String(d.format("%Y-%m-%d %H:%M:%S").to_string())),
        Type::TIMESTAMPTZ => get!(chrono::DateTime<Utc>)?
            .map(|d| Json::String(d.format("%Y-%m-%d %H:%M:%S%:z").to_string())),
        Type::JSON | Type::JSONB => get!(Json)?,
        _ => get!(String)?.map(Json::String),
    };
    Ok(value.unwrap_or(Json::Null))
}

/// `find`: first row or `Null`.
pub fn first_or_null(rows: &[Row]) -> CacheDbResult<Json> {
    match rows.first() {
        Some(row) => row_to_json(row),
        None => Ok(Json::Null),
    }
}

/// `count`/`scalar` agg: the single `value`/`count` column of the first row,
/// or `Null` if there was no row.
pub fn scalar_column(rows: &[Row], column: &str) -> CacheDbResult<Json> {
    match rows.first() {
        Some(row) => {
            let idx = row
                .columns()
                .iter()
                .position(|c| c.name() == column)
                .ok_or_else(|| CacheDbError::decode(column, "column missing from result set"))?;
            column_to_json(row, idx, row.columns()[idx].type_())
        }
        None => Ok(Json::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_or_null_on_empty_rows_is_null() {
        assert_eq!(first_or_null(&[]).unwrap(), Json::Null);
    }

    #[test]
    fn scalar_column_on_empty_rows_is_null() {
        assert_eq!(scalar_column(&[], "value").unwrap(), Json::Null);
    }
}
