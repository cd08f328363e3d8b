//! `scalar`: aggregate and group-by queries (spec §3 `scalar` attribute, §4.4).

use crate::error::{CacheDbError, CacheDbResult};
use crate::filter::{Filter, ScalarKind};
use crate::ident;

use super::where_clause::render_where;
use super::BuiltQuery;

pub fn build_scalar(filter: &Filter) -> CacheDbResult<BuiltQuery> {
    let spec = filter
        .scalar
        .as_ref()
        .ok_or_else(|| CacheDbError::build("`scalar` exec requires a `scalar` attribute"))?;

    let where_clause = render_where(&filter.filter, filter.language.as_deref())?;

    if spec.kind == ScalarKind::Group {
        let key = spec
            .key
            .as_ref()
            .ok_or_else(|| CacheDbError::build("`scalar` group requires `key`"))?;
        let group_col = ident::render_where(key, filter.language.as_deref());
        let agg = match &spec.key2 {
            Some(key2) => format!(
                "SUM({})::numeric",
                ident::render_where(key2, filter.language.as_deref())
            ),
            None => "COUNT(1)::int".to_string(),
        };
        let mut sql = format!("SELECT {group_col}, {agg} as value FROM {}", filter.table2());
        if let Some(clause) = &where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(clause);
        }
        sql.push_str(" GROUP BY ");
        sql.push_str(&group_col);
        return Ok(BuiltQuery::new(sql));
    }

    let expr = match spec.kind {
        ScalarKind::Count => "COUNT(1)::int".to_string(),
        other => {
            let key = spec
                .key
                .as_ref()
                .ok_or_else(|| CacheDbError::build(format!("`scalar` {other:?} requires `key`")))?;
            let col = ident::render_where(key, filter.language.as_deref());
            let fn_name = match other {
                ScalarKind::Avg => "AVG",
                ScalarKind::Min => "MIN",
                ScalarKind::Sum => "SUM",
                ScalarKind::Max => "MAX",
                ScalarKind::Count | ScalarKind::Group => unreachable!(),
            };
            format!("{fn_name}({col})::numeric")
        }
    };

    let mut sql = format!("SELECT {expr} as value FROM {}", filter.table2());
    if let Some(clause) = &where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(clause);
    }
    Ok(BuiltQuery::new(sql))
}
