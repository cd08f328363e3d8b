//! `insert` / `update` / `remove` (spec §4.2, §4.4).

use crate::error::{CacheDbError, CacheDbResult};
use crate::filter::{Filter, PayloadOp};
use crate::ident;
use crate::value::{render, Value};

use super::where_clause::render_where;
use super::BuiltQuery;

pub fn build_insert(filter: &Filter) -> CacheDbResult<BuiltQuery> {
    let mut columns = Vec::new();
    let mut value_slots = Vec::new();
    let mut params = Vec::new();

    for (key, entry) in &filter.payload {
        match entry.op {
            PayloadOp::RawSkipInsert => continue,
            PayloadOp::Negate => {
                columns.push(ident::quote(key));
                value_slots.push("FALSE".to_string());
            }
            PayloadOp::Raw => {
                let Some(value) = &entry.value else { continue };
                columns.push(ident::quote(key));
                value_slots.push(render(value, false));
            }
            PayloadOp::Set | PayloadOp::Increment(_) | PayloadOp::Greatest | PayloadOp::Least => {
                let value = match (&entry.value, entry.op) {
                    (Some(v), _) => v.clone(),
                    (None, PayloadOp::Set) => continue,
                    (None, _) => Value::Int(0),
                };
                columns.push(ident::quote(key));
                params.push(value);
                value_slots.push(format!("${}", params.len()));
            }
        }
    }

    if columns.is_empty() {
        return Err(CacheDbError::build("`insert` requires at least one payload column"));
    }

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES({})",
        filter.table2(),
        columns.join(", "),
        value_slots.join(", "),
    );
    push_returning_or_primarykey(&mut sql, filter);
    Ok(BuiltQuery::with_params(sql, params))
}

pub fn build_update(filter: &Filter) -> CacheDbResult<BuiltQuery> {
    require_where(filter, "update")?;

    let mut sets = Vec::new();
    let mut params = Vec::new();
    for (key, entry) in &filter.payload {
        let col = ident::quote(key);
        match entry.op {
            PayloadOp::Set => {
                let Some(value) = &entry.value else { continue };
                params.push(value.clone());
                sets.push(format!("{col}=${}", params.len()));
            }
            PayloadOp::Increment(op) => {
                let Some(value) = &entry.value else { continue };
                params.push(value.clone());
                sets.push(format!("{col}=COALESCE({col},0) {op} ${}", params.len()));
            }
            PayloadOp::Greatest => {
                let Some(value) = &entry.value else { continue };
                params.push(value.clone());
                sets.push(format!("{col}=GREATEST({col},${})", params.len()));
            }
            PayloadOp::Least => {
                let Some(value) = &entry.value else { continue };
                params.push(value.clone());
                sets.push(format!("{col}=LEAST({col},${})", params.len()));
            }
            PayloadOp::Negate => {
                sets.push(format!("{col}=NOT {col}"));
            }
            PayloadOp::Raw | PayloadOp::RawSkipInsert => {
                let literal = entry.value.as_ref().map(|v| render(v, false)).unwrap_or_else(|| "null".to_string());
                sets.push(format!("{col}={literal}"));
            }
        }
    }

    if sets.is_empty() {
        return Err(CacheDbError::build("`update` requires at least one payload column"));
    }

    let where_clause = render_where(&filter.filter, filter.language.as_deref())?;

    if filter.returning.is_empty() {
        let mut inner = format!("UPDATE {} SET {}", filter.table2(), sets.join(", "));
        if let Some(clause) = &where_clause {
            inner.push_str(" WHERE ");
            inner.push_str(clause);
        }
        inner.push_str(" RETURNING 1");
        let sql = format!("WITH rows AS ({inner}) SELECT COUNT(1)::int count FROM rows");
        Ok(BuiltQuery::with_params(sql, params))
    } else {
        let mut sql = format!("UPDATE {} SET {}", filter.table2(), sets.join(", "));
        if let Some(clause) = &where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(clause);
        }
        sql.push_str(" RETURNING ");
        sql.push_str(&filter.returning.join(", "));
        Ok(BuiltQuery::with_params(sql, params))
    }
}

pub fn build_remove(filter: &Filter) -> CacheDbResult<BuiltQuery> {
    require_where(filter, "remove")?;

    let mut sql = format!("DELETE FROM {}", filter.table2());
    if let Some(clause) = render_where(&filter.filter, filter.language.as_deref())? {
        sql.push_str(" WHERE ");
        sql.push_str(&clause);
    }
    if !filter.returning.is_empty() {
        sql.push_str(" RETURNING ");
        sql.push_str(&filter.returning.join(", "));
    }
    Ok(BuiltQuery::new(sql))
}

fn require_where(filter: &Filter, op: &str) -> CacheDbResult<()> {
    if filter.filter.is_empty() {
        Err(CacheDbError::validation(format!(
            "`{op}` requires a WHERE clause to avoid an unscoped statement"
        )))
    } else {
        Ok(())
    }
}

fn push_returning_or_primarykey(sql: &mut String, filter: &Filter) {
    if !filter.returning.is_empty() {
        sql.push_str(" RETURNING ");
        sql.push_str(&filter.returning.join(", "));
    } else if let Some(pk) = &filter.primarykey {
        sql.push_str(" RETURNING ");
        sql.push_str(pk);
    }
}
