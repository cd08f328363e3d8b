//! The filter record: the sole input to the executor (see spec §3).
//!
//! A `Filter` is owned by the caller and must not be mutated after it is
//! handed to [`crate::executor::dispatch`] -- the dispatch entry point takes
//! `&Filter`, so the compiler enforces this rather than a doc comment.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// The operation kind carried by a filter record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exec {
    Find,
    Read,
    List,
    Count,
    Check,
    Scalar,
    Insert,
    Update,
    Remove,
    Drop,
    Truncate,
    Query,
    /// Synonym for `Query` at the dispatch boundary (see SPEC_FULL.md §4.4);
    /// exists so callers can express write-shaped raw SQL without routing
    /// through a name that implies a read.
    Command,
}

impl Exec {
    pub fn is_read_shaped(self) -> bool {
        matches!(self, Exec::Find | Exec::Read | Exec::List | Exec::Count | Exec::Check | Exec::Scalar)
    }

    /// Raw-SQL execs (`query`/`command`) share one builder path.
    pub fn is_raw(self) -> bool {
        matches!(self, Exec::Query | Exec::Command)
    }
}

/// `=`, `<>`, `>`, `>=`, `<`, `<=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparer {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>", alias = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
}

impl Comparer {
    pub fn as_sql(self) -> &'static str {
        match self {
            Comparer::Eq => "=",
            Comparer::Ne => "<>",
            Comparer::Gt => ">",
            Comparer::Gte => ">=",
            Comparer::Lt => "<",
            Comparer::Lte => "<=",
        }
    }
}

/// Anchor mode for `search` predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchAnchor {
    /// `value%`
    Beg,
    /// `%value`
    End,
    /// `%value%`
    Contains,
}

/// The part extracted by `EXTRACT(<part> FROM <name>)` in a date-part predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
}

impl DatePart {
    pub fn as_sql(self) -> &'static str {
        match self {
            DatePart::Year => "year",
            DatePart::Month => "month",
            DatePart::Day => "day",
            DatePart::Hour => "hour",
            DatePart::Minute => "minute",
        }
    }
}

/// One predicate clause (spec §3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Predicate {
    Where {
        name: String,
        comparer: Comparer,
        value: Value,
    },
    In {
        name: String,
        values: Vec<Value>,
    },
    Notin {
        name: String,
        values: Vec<Value>,
    },
    Or {
        or: Vec<Predicate>,
    },
    Array {
        name: String,
        comparer: Comparer,
        values: Vec<Value>,
    },
    Between {
        name: String,
        low: Value,
        high: Value,
    },
    Search {
        name: String,
        value: String,
        #[serde(default = "default_anchor")]
        anchor: SearchAnchor,
    },
    Contains {
        name: String,
    },
    Empty {
        name: String,
    },
    Datepart {
        part: DatePart,
        name: String,
        comparer: Comparer,
        value: Value,
    },
    Permit {
        name: String,
        values: Vec<Value>,
        #[serde(default)]
        userid: Option<Value>,
        #[serde(default)]
        required: bool,
    },
    Query {
        query: String,
    },
}

fn default_anchor() -> SearchAnchor {
    SearchAnchor::Contains
}

/// Aggregate/group scalar request (spec §3 `scalar` attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Avg,
    Min,
    Sum,
    Max,
    Count,
    Group,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarSpec {
    #[serde(rename = "type")]
    pub kind: ScalarKind,
    pub key: Option<String>,
    #[serde(default)]
    pub key2: Option<String>,
}

/// `<col>_asc` / `<col>_desc` ascending/descending direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub column: String,
    pub dir: SortDir,
}

impl SortKey {
    /// Parse a `"<col>_asc"` / `"<col>_desc"` token.
    pub fn parse(token: &str) -> Option<Self> {
        if let Some(col) = token.strip_suffix("_asc") {
            Some(SortKey {
                column: col.to_string(),
                dir: SortDir::Asc,
            })
        } else {
            token.strip_suffix("_desc").map(|col| SortKey {
                column: col.to_string(),
                dir: SortDir::Desc,
            })
        }
    }
}

/// The one-character prefix controlling an UPDATE SET clause / INSERT value
/// shape for a payload entry (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadOp {
    /// No prefix: `"k"=$n`.
    Set,
    /// `+`, `-`, `*`, `/`: `"k"=COALESCE("k",0) <op> $n`.
    Increment(char),
    /// `>`: `"k"=GREATEST("k",$n)`.
    Greatest,
    /// `<`: `"k"=LEAST("k",$n)`.
    Least,
    /// `!`: `"k"=NOT "k"` on UPDATE, `("k") values (FALSE)` on INSERT, no bound param.
    Negate,
    /// `=`: value is inlined as a raw SQL literal rather than bound.
    Raw,
    /// `#`: inlined as a literal on UPDATE; the key is skipped entirely on INSERT.
    RawSkipInsert,
}

#[derive(Debug, Clone)]
pub struct PayloadEntry {
    pub op: PayloadOp,
    /// `None` encodes the "undefined" sentinel from spec §4.2: the entry is
    /// silently dropped before building.
    pub value: Option<Value>,
}

impl PayloadEntry {
    pub fn set(value: impl Into<Value>) -> Self {
        PayloadEntry {
            op: PayloadOp::Set,
            value: Some(value.into()),
        }
    }
}

/// An ordered column -> value map for `insert`/`update` payloads. Order is
/// significant: parameter indices are assigned in payload-iteration order
/// (spec §4.2, §8 invariant), which rules out `HashMap` (unordered) and
/// `BTreeMap` (alphabetical, not insertion order).
pub type Payload = IndexMap<String, PayloadEntry>;

/// The filter record (spec §3). Construct with [`Filter::new`] and adjust the
/// public fields directly; the fluent façade that builds these is explicitly
/// out of this crate's scope.
#[derive(Debug, Clone)]
pub struct Filter {
    pub exec: Exec,
    pub table: String,
    pub schema: Option<String>,
    pub filter: Vec<Predicate>,
    pub fields: Vec<String>,
    pub sort: Vec<String>,
    pub take: Option<i64>,
    pub skip: Option<i64>,
    pub payload: Payload,
    pub returning: Vec<String>,
    pub primarykey: Option<String>,
    pub first: bool,
    pub scalar: Option<ScalarSpec>,
    pub query: Option<String>,
    pub params: Vec<Value>,
    pub language: Option<String>,
    pub debug: bool,
    pub nocache: bool,
}

impl Filter {
    pub fn new(exec: Exec, table: impl Into<String>) -> Self {
        Filter {
            exec,
            table: table.into(),
            schema: None,
            filter: Vec::new(),
            fields: Vec::new(),
            sort: Vec::new(),
            take: None,
            skip: None,
            payload: Payload::new(),
            returning: Vec::new(),
            primarykey: None,
            first: false,
            scalar: None,
            query: None,
            params: Vec::new(),
            language: None,
            debug: false,
            nocache: false,
        }
    }

    pub fn find(table: impl Into<String>) -> Self {
        Self::new(Exec::Find, table)
    }

    pub fn list(table: impl Into<String>) -> Self {
        Self::new(Exec::List, table)
    }

    pub fn count(table: impl Into<String>) -> Self {
        Self::new(Exec::Count, table)
    }

    pub fn check(table: impl Into<String>) -> Self {
        Self::new(Exec::Check, table)
    }

    pub fn insert(table: impl Into<String>, payload: Payload) -> Self {
        let mut f = Self::new(Exec::Insert, table);
        f.payload = payload;
        f
    }

    pub fn update(table: impl Into<String>, payload: Payload) -> Self {
        let mut f = Self::new(Exec::Update, table);
        f.payload = payload;
        f
    }

    pub fn remove(table: impl Into<String>) -> Self {
        Self::new(Exec::Remove, table)
    }

    pub fn command(sql: impl Into<String>) -> Self {
        let mut f = Self::new(Exec::Command, "");
        f.query = Some(sql.into());
        f
    }

    pub fn where_eq(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.push(Predicate::Where {
            name: name.into(),
            comparer: Comparer::Eq,
            value: value.into(),
        });
        self
    }

    pub fn sort_by(mut self, tokens: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.sort = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn take(mut self, n: i64) -> Self {
        self.take = Some(n);
        self
    }

    pub fn skip(mut self, n: i64) -> Self {
        self.skip = Some(n);
        self
    }

    pub fn returning(mut self, cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.returning = cols.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_scalar_group(&self) -> bool {
        matches!(self.scalar, Some(ScalarSpec { kind: ScalarKind::Group, .. }))
    }

    /// Whether a `find`/`read` exec should collapse to a single row (or
    /// `null`) instead of an array (spec §4.5: "first row or `null` when
    /// `first`; else array of rows"). `find` always behaves this way
    /// regardless of the `first` flag -- the exec name itself implies a
    /// singular result, the same default the builder applies when giving
    /// `find` an implicit `LIMIT 1`; `read` only collapses when the caller
    /// explicitly sets `first`.
    pub fn wants_first_row(&self) -> bool {
        self.exec == Exec::Find || self.first
    }

    pub fn table2(&self) -> String {
        match &self.schema {
            Some(schema) if !schema.is_empty() => format!("{schema}.{}", self.table),
            _ => self.table.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_parses_asc_desc() {
        let k = SortKey::parse("created_desc").unwrap();
        assert_eq!(k.column, "created");
        assert_eq!(k.dir, SortDir::Desc);

        let k = SortKey::parse("name_asc").unwrap();
        assert_eq!(k.column, "name");
        assert_eq!(k.dir, SortDir::Asc);
    }

    #[test]
    fn sort_key_rejects_unsuffixed_token() {
        assert!(SortKey::parse("created").is_none());
    }

    #[test]
    fn table2_qualifies_with_schema() {
        let f = Filter::find("products");
        assert_eq!(f.table2(), "products");

        let mut f = Filter::find("products");
        f.schema = Some("shop".to_string());
        assert_eq!(f.table2(), "shop.products");
    }

    #[test]
    fn predicate_deserializes_from_tagged_json() {
        let json = serde_json::json!({"type": "where", "name": "status", "comparer": "=", "value": "paid"});
        let p: Predicate = serde_json::from_value(json).unwrap();
        assert!(matches!(p, Predicate::Where { comparer: Comparer::Eq, .. }));
    }

    #[test]
    fn or_predicate_deserializes_nested_list() {
        let json = serde_json::json!({
            "type": "or",
            "or": [
                {"type": "where", "name": "a", "comparer": "=", "value": 1},
                {"type": "where", "name": "b", "comparer": "=", "value": 2}
            ]
        });
        let p: Predicate = serde_json::from_value(json).unwrap();
        match p {
            Predicate::Or { or } => assert_eq!(or.len(), 2),
            other => panic!("expected Or, got {other:?}"),
        }
    }
}
