//! WHERE clause composition (spec §4.3).
//!
//! Every predicate renders to inline SQL literals -- there is no parameter
//! binding in this path. That is the injection-safety invariant from §4.1:
//! values never cross into identifier position, and [`crate::value::render`]
//! guarantees any string literal is fully escaped, so inlining is safe.

use crate::error::{CacheDbError, CacheDbResult};
use crate::filter::{Comparer, DatePart, Predicate, SearchAnchor};
use crate::ident;
use crate::value::{render, Value};

/// Render a top-level predicate list, joined by `AND`. Returns `None` if
/// `preds` is empty (callers omit the `WHERE` keyword entirely in that case).
pub fn render_where(preds: &[Predicate], language: Option<&str>) -> CacheDbResult<Option<String>> {
    if preds.is_empty() {
        return Ok(None);
    }
    Ok(Some(join_predicates(preds, language, "AND")?))
}

fn join_predicates(preds: &[Predicate], language: Option<&str>, joiner: &str) -> CacheDbResult<String> {
    let mut rendered = Vec::with_capacity(preds.len());
    for p in preds {
        rendered.push(render_predicate(p, language)?);
    }
    Ok(rendered.join(&format!(" {joiner} ")))
}

fn render_predicate(p: &Predicate, language: Option<&str>) -> CacheDbResult<String> {
    match p {
        Predicate::Where { name, comparer, value } => render_binary(name, *comparer, value, language),
        Predicate::In { name, values } => render_in(name, values, language, false),
        Predicate::Notin { name, values } => render_in(name, values, language, true),
        Predicate::Or { or } => {
            if or.is_empty() {
                return Err(CacheDbError::build("`or` predicate requires at least one clause"));
            }
            Ok(format!("({})", join_predicates(or, language, "OR")?))
        }
        Predicate::Array { name, comparer, values } => render_array(name, *comparer, values, language),
        Predicate::Between { name, low, high } => Ok(format!(
            "({} BETWEEN {} AND {})",
            ident::render_where(name, language),
            render(low, false),
            render(high, false),
        )),
        Predicate::Search { name, value, anchor } => render_search(name, value, *anchor, language),
        Predicate::Contains { name } => Ok(format!(
            "LENGTH({}::text)>0",
            ident::render_where(name, language)
        )),
        Predicate::Empty { name } => {
            let col = ident::render_where(name, language);
            Ok(format!("({col} IS NULL OR LENGTH({col}::text)=0)"))
        }
        Predicate::Datepart { part, name, comparer, value } => Ok(format!(
            "EXTRACT({} from {}){}{}",
            part_sql(*part),
            ident::render_where(name, language),
            comparer.as_sql(),
            render(value, false),
        )),
        Predicate::Permit {
            name,
            values,
            userid,
            required,
        } => render_permit(name, values, userid.as_ref(), *required, language),
        Predicate::Query { query } => Ok(format!("({query})")),
    }
}

fn part_sql(part: DatePart) -> &'static str {
    part.as_sql()
}

fn render_binary(name: &str, comparer: Comparer, value: &Value, language: Option<&str>) -> CacheDbResult<String> {
    let col = ident::render_where(name, language);
    if value.resolved().is_null() {
        return match comparer {
            Comparer::Eq => Ok(format!("{col} IS NULL")),
            Comparer::Ne => Ok(format!("{col} IS NOT NULL")),
            other => Err(CacheDbError::build(format!(
                "`where` predicate with a null value only supports `=`/`<>` comparers, got {:?}",
                other
            ))),
        };
    }
    Ok(format!("{col}{}{}", comparer.as_sql(), render(value, false)))
}

fn render_in(name: &str, values: &[Value], language: Option<&str>, negate: bool) -> CacheDbResult<String> {
    let col = ident::render_where(name, language);
    let list = if values.is_empty() {
        "null".to_string()
    } else {
        values.iter().map(|v| render(v, false)).collect::<Vec<_>>().join(", ")
    };
    Ok(format!("{col} {}IN ({list})", if negate { "NOT " } else { "" }))
}

fn render_array(name: &str, comparer: Comparer, values: &[Value], language: Option<&str>) -> CacheDbResult<String> {
    let col = ident::render_where(name, language);
    let flattened = flatten_array_input(values);
    let literals: Vec<String> = flattened.iter().map(|v| render(v, true)).collect();
    Ok(format!(
        "{col} {} ARRAY[{}]",
        comparer.as_sql(),
        literals.join(", ")
    ))
}

/// If `array` was given a single comma-bearing string, split it into several
/// text elements (spec §4.3: "string input split on `,`").
fn flatten_array_input(values: &[Value]) -> Vec<Value> {
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        match v.resolved() {
            Value::Text(s) if s.contains(',') => {
                out.extend(s.split(',').map(|part| Value::Text(part.to_string())));
            }
            other => out.push(other),
        }
    }
    out
}

fn render_search(name: &str, value: &str, anchor: SearchAnchor, language: Option<&str>) -> CacheDbResult<String> {
    let col = ident::render_where(name, language);
    let stripped: String = value.chars().filter(|&c| c != '%').collect();
    let pattern = match anchor {
        SearchAnchor::Beg => format!("{stripped}%"),
        SearchAnchor::End => format!("%{stripped}"),
        SearchAnchor::Contains => format!("%{stripped}%"),
    };
    Ok(format!("{col} ILIKE {}", render(&Value::Text(pattern), false)))
}

fn render_permit(
    name: &str,
    values: &[Value],
    userid: Option<&Value>,
    required: bool,
    language: Option<&str>,
) -> CacheDbResult<String> {
    let col = ident::render_where(name, language);
    let literals: Vec<String> = values.iter().map(|v| render(v, true)).collect();
    let overlap = format!("{col}::_text && ARRAY[{}]", literals.join(", "));
    let nullable_branch = if required {
        format!("array_length({col},1) IS NULL OR {overlap}")
    } else {
        overlap
    };
    match userid {
        Some(uid) => Ok(format!("(\"userid\"={} OR {nullable_branch})", render(uid, false))),
        None => Ok(format!("({nullable_branch})")),
    }
}
