//! Integration-level coverage for the builder dispatch (spec §8 scenarios).

use crate::filter::{Comparer, Exec, Filter, Payload, PayloadEntry, PayloadOp, Predicate, ScalarKind, ScalarSpec};
use crate::value::Value;

use super::{build, count_filter_for_list};

#[test]
fn scenario_insert_with_returning() {
    let mut payload = Payload::new();
    payload.insert("name".into(), PayloadEntry::set("Widget"));
    payload.insert("price".into(), PayloadEntry::set(19.99));
    let mut f = Filter::insert("products", payload);
    f.returning = vec!["id".into()];
    let q = build(&f).unwrap();
    assert_eq!(q.sql, "INSERT INTO products (\"name\", \"price\") VALUES($1, $2) RETURNING id");
}

#[test]
fn scenario_list_with_paging_builds_rows_query_only() {
    let mut f = Filter::list("products");
    f.take = Some(10);
    f.skip = Some(0);
    let q = build(&f).unwrap();
    assert!(q.sql.starts_with("SELECT * FROM products"));
    assert!(!q.sql.to_uppercase().contains("COUNT"));
}

#[test]
fn scenario_list_count_filter_is_a_distinct_statement() {
    let mut f = Filter::list("products");
    f.take = Some(10);
    f.sort = vec!["price_desc".into()];
    f.filter.push(Predicate::Where { name: "status".into(), comparer: Comparer::Eq, value: "paid".into() });

    let rows = build(&f).unwrap();
    let count_filter = count_filter_for_list(&f);
    let count = build(&count_filter).unwrap();

    assert_ne!(rows.sql, count.sql);
    assert!(count.sql.contains("COUNT(1)::int as count"));
    assert!(!count.sql.contains("ORDER BY"));
    assert!(!count.sql.contains("LIMIT"));
    // Both carry the same predicate text.
    assert!(rows.sql.contains("\"status\"='paid'"));
    assert!(count.sql.contains("\"status\"='paid'"));
}

#[test]
fn scenario_update_without_returning_counts_rows() {
    let mut payload = Payload::new();
    payload.insert("status".into(), PayloadEntry::set("shipped"));
    let mut f = Filter::update("orders", payload);
    f.filter.push(Predicate::Where { name: "id".into(), comparer: Comparer::Eq, value: Value::Int(42) });
    let q = build(&f).unwrap();
    assert!(q.sql.starts_with("WITH rows AS (UPDATE orders SET"));
    assert!(q.sql.ends_with("SELECT COUNT(1)::int count FROM rows"));
}

#[test]
fn scenario_scalar_group_by_category() {
    let mut f = Filter::new(Exec::Scalar, "orders");
    f.scalar = Some(ScalarSpec { kind: ScalarKind::Group, key: Some("category".into()), key2: Some("total".into()) });
    let q = build(&f).unwrap();
    assert_eq!(q.sql, "SELECT \"category\", SUM(\"total\")::numeric as value FROM orders GROUP BY \"category\"");
}

#[test]
fn payload_operator_prefix_table_on_update() {
    let cases: Vec<(PayloadOp, Option<Value>, &str)> = vec![
        (PayloadOp::Set, Some(Value::Int(1)), "\"k\"=$1"),
        (PayloadOp::Increment('+'), Some(Value::Int(1)), "\"k\"=COALESCE(\"k\",0) + $1"),
        (PayloadOp::Increment('-'), Some(Value::Int(1)), "\"k\"=COALESCE(\"k\",0) - $1"),
        (PayloadOp::Increment('*'), Some(Value::Int(2)), "\"k\"=COALESCE(\"k\",0) * $1"),
        (PayloadOp::Increment('/'), Some(Value::Int(2)), "\"k\"=COALESCE(\"k\",0) / $1"),
        (PayloadOp::Greatest, Some(Value::Int(5)), "\"k\"=GREATEST(\"k\",$1)"),
        (PayloadOp::Least, Some(Value::Int(5)), "\"k\"=LEAST(\"k\",$1)"),
        (PayloadOp::Negate, None, "\"k\"=NOT \"k\""),
        (PayloadOp::Raw, Some(Value::Bool(true)), "\"k\"=true"),
        (PayloadOp::RawSkipInsert, Some(Value::text("now()")), "\"k\"='now()'"),
    ];
    for (op, value, expected_set) in cases {
        let mut payload = Payload::new();
        payload.insert("k".into(), PayloadEntry { op, value });
        let mut f = Filter::update("t", payload);
        f.filter.push(Predicate::Where { name: "id".into(), comparer: Comparer::Eq, value: Value::Int(1) });
        let q = build(&f).unwrap();
        assert!(q.sql.contains(expected_set), "op {op:?} produced {}", q.sql);
    }
}

#[test]
fn drop_and_truncate_ddl_shapes() {
    let f = Filter::new(Exec::Drop, "sessions");
    assert_eq!(build(&f).unwrap().sql, "DROP TABLE sessions");
    let f = Filter::new(Exec::Truncate, "sessions");
    assert_eq!(build(&f).unwrap().sql, "TRUNCATE sessions RESTART IDENTITY");
}

#[test]
fn command_exec_shares_the_raw_builder_path() {
    let mut f = Filter::new(Exec::Command, "");
    f.query = Some("DELETE FROM sessions WHERE expired".into());
    let q = build(&f).unwrap();
    assert_eq!(q.sql, "DELETE FROM sessions WHERE expired");
}
