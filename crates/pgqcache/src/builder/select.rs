//! `find` / `read` / `list` (rows half) / `count` / `check` (spec §4.4).

use crate::error::CacheDbResult;
use crate::filter::{Filter, SortDir, SortKey};

use super::fields::render_field_list;
use super::where_clause::render_where;
use super::BuiltQuery;

pub fn build_select(filter: &Filter) -> CacheDbResult<BuiltQuery> {
    let fields = render_field_list(&filter.fields, filter.language.as_deref());
    let mut sql = format!("SELECT {fields} FROM {}", filter.table2());
    if let Some(clause) = render_where(&filter.filter, filter.language.as_deref())? {
        sql.push_str(" WHERE ");
        sql.push_str(&clause);
    }
    push_order_by(&mut sql, filter);

    let take = if filter.take.is_none() && filter.wants_first_row() {
        Some(1)
    } else {
        filter.take
    };
    if let Some(take) = take {
        sql.push_str(&format!(" LIMIT {take}"));
    }
    if let Some(skip) = filter.skip {
        sql.push_str(&format!(" OFFSET {skip}"));
    }
    Ok(BuiltQuery::new(sql))
}

pub fn build_count(filter: &Filter) -> CacheDbResult<BuiltQuery> {
    let mut sql = format!("SELECT COUNT(1)::int as count FROM {}", filter.table2());
    if let Some(clause) = render_where(&filter.filter, filter.language.as_deref())? {
        sql.push_str(" WHERE ");
        sql.push_str(&clause);
    }
    Ok(BuiltQuery::new(sql))
}

pub fn build_check(filter: &Filter) -> CacheDbResult<BuiltQuery> {
    let mut sql = format!("SELECT 1 as count FROM {}", filter.table2());
    if let Some(clause) = render_where(&filter.filter, filter.language.as_deref())? {
        sql.push_str(" WHERE ");
        sql.push_str(&clause);
    }
    let limit = filter.take.unwrap_or(1);
    sql.push_str(&format!(" LIMIT {limit}"));
    Ok(BuiltQuery::new(sql))
}

fn push_order_by(sql: &mut String, filter: &Filter) {
    let keys: Vec<SortKey> = filter.sort.iter().filter_map(|t| SortKey::parse(t)).collect();
    if keys.is_empty() {
        return;
    }
    let rendered: Vec<String> = keys
        .iter()
        .map(|k| {
            let col = super::fields::global().render_where(&k.column, filter.language.as_deref());
            let dir = match k.dir {
                SortDir::Asc => "ASC",
                SortDir::Desc => "DESC",
            };
            format!("{col} {dir}")
        })
        .collect();
    sql.push_str(" ORDER BY ");
    sql.push_str(&rendered.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Comparer, Predicate};

    #[test]
    fn find_defaults_to_limit_one() {
        let f = Filter::find("products");
        let q = build_select(&f).unwrap();
        assert_eq!(q.sql, "SELECT * FROM products LIMIT 1");
    }

    #[test]
    fn find_respects_explicit_take() {
        let f = Filter::find("products").take(5);
        let q = build_select(&f).unwrap();
        assert_eq!(q.sql, "SELECT * FROM products LIMIT 5");
    }

    #[test]
    fn read_without_first_has_no_implicit_limit() {
        let f = crate::filter::Filter::new(crate::filter::Exec::Read, "products");
        let q = build_select(&f).unwrap();
        assert_eq!(q.sql, "SELECT * FROM products");
    }

    #[test]
    fn read_with_first_flag_defaults_to_limit_one() {
        let mut f = crate::filter::Filter::new(crate::filter::Exec::Read, "products");
        f.first = true;
        let q = build_select(&f).unwrap();
        assert_eq!(q.sql, "SELECT * FROM products LIMIT 1");
    }

    #[test]
    fn list_with_paging_and_sort() {
        let mut f = Filter::list("products");
        f.fields = vec!["name".into(), "price".into()];
        f.sort = vec!["price_desc".into()];
        f.take = Some(20);
        f.skip = Some(40);
        f.filter.push(Predicate::Where {
            name: "status".into(),
            comparer: Comparer::Eq,
            value: "paid".into(),
        });
        let q = build_select(&f).unwrap();
        assert_eq!(
            q.sql,
            "SELECT \"name\", \"price\" FROM products WHERE \"status\"='paid' ORDER BY \"price\" DESC LIMIT 20 OFFSET 40"
        );
    }

    #[test]
    fn count_ignores_fields_sort_and_paging() {
        let mut f = Filter::count("products");
        f.fields = vec!["name".into()];
        f.take = Some(20);
        let q = build_count(&f).unwrap();
        assert_eq!(q.sql, "SELECT COUNT(1)::int as count FROM products");
    }

    #[test]
    fn check_uses_take_as_limit_when_set() {
        let f = Filter::check("products").take(3);
        let q = build_check(&f).unwrap();
        assert_eq!(q.sql, "SELECT 1 as count FROM products LIMIT 3");
    }

    #[test]
    fn check_defaults_limit_to_one() {
        let f = Filter::check("products");
        let q = build_check(&f).unwrap();
        assert_eq!(q.sql, "SELECT 1 as count FROM products LIMIT 1");
    }
}
