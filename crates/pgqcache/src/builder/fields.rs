//! Process-wide field-name memoization table.
//!
//! Rendering a column name (`ident::render_where` / `ident::render_projection`)
//! is pure but not free -- it walks the sentinel and quoting rules on every
//! call. The spec (§3, §9) asks for a process-wide `(kind, language, raw) ->
//! rendered` cache so a hot filter shape doesn't re-render the same handful of
//! column names on every request. Entries are inserted idempotently: two
//! callers racing to render the same key just overwrite each other with the
//! same string, so a `RwLock<HashMap<..>>` needs no finer synchronization.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::ident;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    Where,
    Projection,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    kind: Kind,
    language: Option<String>,
    raw: String,
}

#[derive(Default)]
pub struct FieldCache {
    entries: RwLock<HashMap<Key, String>>,
}

impl FieldCache {
    fn render(&self, kind: Kind, raw: &str, language: Option<&str>) -> String {
        let key = Key {
            kind,
            language: language.map(str::to_string),
            raw: raw.to_string(),
        };
        if let Some(hit) = self.entries.read().unwrap().get(&key) {
            return hit.clone();
        }
        let rendered = match kind {
            Kind::Where => ident::render_where(raw, language),
            Kind::Projection => ident::render_projection(raw, language),
        };
        self.entries.write().unwrap().insert(key, rendered.clone());
        rendered
    }

    pub fn render_where(&self, raw: &str, language: Option<&str>) -> String {
        self.render(Kind::Where, raw, language)
    }

    pub fn render_projection(&self, raw: &str, language: Option<&str>) -> String {
        self.render(Kind::Projection, raw, language)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every memoized entry. Called from `maintenance`'s periodic sweep
    /// so a long-lived process doesn't hold onto column names from tables
    /// that stopped being queried.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }
}

static GLOBAL: OnceLock<FieldCache> = OnceLock::new();

/// The process-wide field cache instance.
pub fn global() -> &'static FieldCache {
    GLOBAL.get_or_init(FieldCache::default)
}

/// Render a projection list: `*` when `fields` is empty, else each entry
/// through the memoized projection renderer, comma-joined.
pub fn render_field_list(fields: &[String], language: Option<&str>) -> String {
    if fields.is_empty() {
        "*".to_string()
    } else {
        fields
            .iter()
            .map(|f| global().render_projection(f, language))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memoizes_identical_key() {
        let cache = FieldCache::default();
        assert_eq!(cache.render_where("id", None), "\"id\"");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.render_where("id", None), "\"id\"");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinguishes_where_from_projection_and_by_language() {
        let cache = FieldCache::default();
        cache.render_where("title§", Some("_en"));
        cache.render_projection("title§", Some("_en"));
        cache.render_where("title§", Some("_fr"));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn clear_empties_the_table() {
        let cache = FieldCache::default();
        cache.render_where("id", None);
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn empty_field_list_renders_star() {
        assert_eq!(render_field_list(&[], None), "*");
    }
}
