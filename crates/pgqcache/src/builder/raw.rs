//! `query` / `command` (raw SQL with an optional spliced `WHERE`) and the DDL
//! execs `drop` / `truncate` (spec §4.4).

use crate::error::{CacheDbError, CacheDbResult};
use crate::filter::Filter;

use super::where_clause::render_where;
use super::BuiltQuery;

const WHERE_MARKER: &str = "{where}";

pub fn build_raw(filter: &Filter) -> CacheDbResult<BuiltQuery> {
    let template = filter
        .query
        .as_deref()
        .ok_or_else(|| CacheDbError::build("`query`/`command` exec requires a `query` string"))?;

    let clause = render_where(&filter.filter, filter.language.as_deref())?;
    let sql = match clause {
        Some(clause) => {
            let fragment = format!("WHERE {clause}");
            if template.contains(WHERE_MARKER) {
                template.replace(WHERE_MARKER, &fragment)
            } else {
                format!("{template} {fragment}")
            }
        }
        None => template.replace(WHERE_MARKER, ""),
    };

    Ok(BuiltQuery::with_params(sql, filter.params.clone()))
}

pub fn build_drop(filter: &Filter) -> CacheDbResult<BuiltQuery> {
    Ok(BuiltQuery::new(format!("DROP TABLE {}", filter.table2())))
}

pub fn build_truncate(filter: &Filter) -> CacheDbResult<BuiltQuery> {
    Ok(BuiltQuery::new(format!("TRUNCATE {} RESTART IDENTITY", filter.table2())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Comparer, Exec, Predicate};
    use crate::value::Value;

    #[test]
    fn raw_query_with_marker_is_substituted() {
        let mut f = Filter::new(Exec::Query, "");
        f.query = Some("SELECT * FROM products {where} ORDER BY id".into());
        f.filter.push(Predicate::Where { name: "active".into(), comparer: Comparer::Eq, value: Value::Bool(true) });
        let q = build_raw(&f).unwrap();
        assert_eq!(q.sql, "SELECT * FROM products WHERE \"active\"=true ORDER BY id");
    }

    #[test]
    fn raw_query_without_marker_appends_where() {
        let mut f = Filter::new(Exec::Query, "");
        f.query = Some("SELECT * FROM products".into());
        f.filter.push(Predicate::Where { name: "active".into(), comparer: Comparer::Eq, value: Value::Bool(true) });
        let q = build_raw(&f).unwrap();
        assert_eq!(q.sql, "SELECT * FROM products WHERE \"active\"=true");
    }

    #[test]
    fn raw_query_with_marker_but_no_predicates_blanks_marker() {
        let mut f = Filter::new(Exec::Query, "");
        f.query = Some("SELECT * FROM products {where} ORDER BY id".into());
        let q = build_raw(&f).unwrap();
        assert_eq!(q.sql, "SELECT * FROM products  ORDER BY id");
    }

    #[test]
    fn raw_command_passes_through_bound_params() {
        let mut f = Filter::new(Exec::Command, "");
        f.query = Some("UPDATE products SET price = $1 WHERE id = $2".into());
        f.params = vec![Value::Float(9.99), Value::Int(1)];
        let q = build_raw(&f).unwrap();
        assert_eq!(q.sql, "UPDATE products SET price = $1 WHERE id = $2");
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn drop_and_truncate_shapes() {
        let f = Filter::new(Exec::Drop, "sessions");
        assert_eq!(build_drop(&f).unwrap().sql, "DROP TABLE sessions");
        let f = Filter::new(Exec::Truncate, "sessions");
        assert_eq!(build_truncate(&f).unwrap().sql, "TRUNCATE sessions RESTART IDENTITY");
    }
}
