//! Deterministic cache-key fingerprinting.
//!
//! A read-shaped filter hashes to the same key every time it is built the
//! same way, so the coordinator can use the hash as a Redis key without
//! storing the filter itself. `sha2` is already in the dependency graph of
//! several crates in this workspace's source pack; reused here rather than
//! hand-rolling a hash.

use sha2::{Digest, Sha256};

use crate::error::{CacheDbError, CacheDbResult};
use crate::filter::Filter;

/// Hash the read-relevant parts of `filter` into a stable hex digest.
///
/// Only the fields that affect the resulting SQL/result set are included --
/// `debug`/`nocache`/`primarykey`/`returning`/`payload` never change what a
/// read returns, so they are left out to avoid needless cache-key churn.
/// Any `Value::Deferred` thunk is resolved first (via `Predicate`'s
/// `Serialize` impl, which calls `Value::resolved()`), so two otherwise
/// identical filters fingerprint identically regardless of whether a value
/// arrived as a literal or a thunk.
pub fn fingerprint(filter: &Filter) -> CacheDbResult<String> {
    let canonical = serde_json::json!({
        "exec": filter.exec,
        "table": filter.table,
        "schema": filter.schema,
        "filter": filter.filter,
        "fields": filter.fields,
        "sort": filter.sort,
        "take": filter.take,
        "skip": filter.skip,
        "language": filter.language,
        // Distinguishes e.g. `{type:sum,key:a}` from `{type:avg,key:b}`
        // against the same table/filter -- without this two `scalar`
        // requests that differ only in aggregate kind/column would hash to
        // the same cache key and one would serve the other's result.
        "scalar": filter.scalar,
        // `read` collapses to a single row instead of an array depending on
        // this flag (spec §4.5) -- two otherwise-identical `read` filters
        // that disagree on it must not share a cache entry, since they
        // don't share a result shape. `find` always behaves as first=true
        // regardless of the flag's literal value, but including it
        // unconditionally keeps this canonicalization simple and correct
        // either way.
        "first": filter.first,
    });
    let text = serde_json::to_string(&canonical).map_err(|e| CacheDbError::build(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Comparer, Predicate};
    use crate::value::Value;
    use std::sync::Arc;

    #[test]
    fn identical_filters_fingerprint_identically() {
        let a = Filter::find("products").where_eq("status", "paid");
        let b = Filter::find("products").where_eq("status", "paid");
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn different_filters_fingerprint_differently() {
        let a = Filter::find("products").where_eq("status", "paid");
        let b = Filter::find("products").where_eq("status", "refunded");
        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn deferred_value_fingerprints_the_same_as_its_literal() {
        let mut a = Filter::find("products");
        a.filter.push(Predicate::Where { name: "id".into(), comparer: Comparer::Eq, value: Value::Int(7) });

        let mut b = Filter::find("products");
        b.filter.push(Predicate::Where {
            name: "id".into(),
            comparer: Comparer::Eq,
            value: Value::Deferred(Arc::new(|| Value::Int(7))),
        });

        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn read_with_and_without_first_fingerprint_differently() {
        use crate::filter::Exec;
        let mut a = Filter::new(Exec::Read, "products");
        a.first = false;
        let mut b = Filter::new(Exec::Read, "products");
        b.first = true;
        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn scalar_requests_differing_only_in_spec_fingerprint_differently() {
        use crate::filter::{Exec, ScalarKind, ScalarSpec};
        let mut a = Filter::new(Exec::Scalar, "products");
        a.scalar = Some(ScalarSpec { kind: ScalarKind::Sum, key: Some("a".into()), key2: None });
        let mut b = Filter::new(Exec::Scalar, "products");
        b.scalar = Some(ScalarSpec { kind: ScalarKind::Avg, key: Some("b".into()), key2: None });
        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }
}
