//! SQL builder: turns a [`Filter`] into ready-to-execute SQL (spec §4.4).
//!
//! Split the way the shapes fall out of the spec's exec table: `select` for
//! the read-shaped execs, `mutate` for `insert`/`update`/`remove`, `scalar`
//! for aggregate/group queries, and `raw` for `query`/`command`/`drop`/`truncate`.
//! [`where_clause`] and [`fields`] are shared by all of them.

mod fields;
mod mutate;
mod raw;
mod scalar;
mod select;
mod where_clause;

#[cfg(test)]
mod tests;

use bytes::BytesMut;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};

use crate::error::CacheDbResult;
use crate::filter::{Exec, Filter};
use crate::value::Value;

pub use fields::{global as field_cache, render_field_list};

/// A built statement: finished SQL text plus its positional bind parameters.
/// `params[i]` binds to `$<i+1>`.
#[derive(Debug, Clone, Default)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl BuiltQuery {
    fn new(sql: impl Into<String>) -> Self {
        BuiltQuery {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    fn with_params(sql: impl Into<String>, params: Vec<Value>) -> Self {
        BuiltQuery {
            sql: sql.into(),
            params,
        }
    }

    /// Borrow `params` as driver-ready bind parameters.
    pub fn bind_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
    }
}

/// Build the SQL for `filter`. For `Exec::List` this returns only the rows
/// query; call [`count_filter_for_list`] to get the paired count query, and
/// run both against the same pooled client (see `executor`, which also fixes
/// the original two-client bug this split is named after).
pub fn build(filter: &Filter) -> CacheDbResult<BuiltQuery> {
    match filter.exec {
        Exec::Find | Exec::Read | Exec::List => select::build_select(filter),
        Exec::Count => select::build_count(filter),
        Exec::Check => select::build_check(filter),
        Exec::Insert => mutate::build_insert(filter),
        Exec::Update => mutate::build_update(filter),
        Exec::Remove => mutate::build_remove(filter),
        Exec::Scalar => scalar::build_scalar(filter),
        Exec::Drop => raw::build_drop(filter),
        Exec::Truncate => raw::build_truncate(filter),
        Exec::Query | Exec::Command => raw::build_raw(filter),
    }
}

/// Derive the paired count filter for a `list` exec: same table/schema/filter
/// predicates, stripped of fields/sort/paging, with `exec` switched to `Count`.
pub fn count_filter_for_list(filter: &Filter) -> Filter {
    let mut count = Filter::new(Exec::Count, filter.table.clone());
    count.schema = filter.schema.clone();
    count.filter = filter.filter.clone();
    count.language = filter.language.clone();
    count
}

/// `ToSql` for a dynamic [`Value`]: dispatches to the concrete type's own
/// `ToSql` impl after resolving any `Deferred` thunk. `accepts` is permissive
/// (`true` for every type) because a `Value`'s intended Postgres type is only
/// known at bind time, not statically -- the same reason this crate carries a
/// dynamic filter record instead of the teacher's compile-time-typed columns.
impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.resolved() {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql(ty, out),
            Value::Int(i) => i.to_sql(ty, out),
            Value::Float(f) => f.to_sql(ty, out),
            Value::Text(s) => s.to_sql(ty, out),
            Value::Date(d) => d.to_sql(ty, out),
            Value::Array(items) => items.to_sql(ty, out),
            Value::Object(o) => o.to_sql(ty, out),
            Value::Deferred(_) => unreachable!("resolved() strips Deferred"),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
