//! Read-through / write-invalidate cache coordination (spec §4.7, §9).
//!
//! Every cache operation is fail-open: a store error or an open breaker
//! falls back to the database rather than surfacing to the caller. The
//! breaker's job is purely to stop hammering a store that is already down,
//! not to change correctness -- a cache miss (real or simulated) always
//! produces the right answer, just without the speedup.
//!
//! The coordinator holds its store behind `Arc<dyn CacheStore>` rather than a
//! generic parameter: the registry (spec §4.8) keeps many named connections
//! in one map, and a trait object lets `Connection`/`Registry` stay
//! non-generic instead of threading a store type through every public
//! signature for a choice that's made once, at `init` time.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use regex::Regex;
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::error::CacheDbResult;
use crate::filter::{Exec, Filter};

use super::breaker::{BreakerConfig, CircuitBreaker};
use super::fingerprint::fingerprint;
use super::store::CacheStore;

/// Cache policy knobs (spec §6 configuration surface / §10.3).
///
/// Field names mirror the spec's `config({...})` call verbatim so a host
/// translating that call into Rust can map it one field at a time.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub default_ttl: Duration,
    pub max_ttl: Duration,
    pub key_prefix: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            default_ttl: Duration::from_secs(300),
            max_ttl: Duration::from_secs(3600),
            key_prefix: "pgcache:".to_string(),
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
            circuit_breaker_threshold: 5,
            circuit_breaker_timeout: Duration::from_secs(30),
        }
    }
}

impl CacheConfig {
    /// Clamp every knob to a sensible minimum, mirroring the spec's "each
    /// clamped to sensible minima" configuration contract. `default_ttl` is
    /// additionally clamped to never exceed `max_ttl`.
    pub fn effective(&self) -> CacheConfig {
        let max_ttl = self.max_ttl.max(Duration::from_secs(1));
        CacheConfig {
            default_ttl: self.default_ttl.max(Duration::from_secs(1)).min(max_ttl),
            max_ttl,
            key_prefix: if self.key_prefix.is_empty() { "pgcache:".to_string() } else { self.key_prefix.clone() },
            max_retries: self.max_retries.max(1),
            retry_delay: self.retry_delay.max(Duration::from_millis(1)),
            circuit_breaker_threshold: self.circuit_breaker_threshold.max(1),
            circuit_breaker_timeout: self.circuit_breaker_timeout.max(Duration::from_secs(1)),
        }
    }

    fn breaker_config(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.circuit_breaker_threshold,
            open_timeout: self.circuit_breaker_timeout,
        }
    }
}

/// Per-exec TTL policy (spec §4.7): reads that return few rows are cached
/// longer, paged lists shorter (they go stale as soon as anything is
/// inserted), everything else gets the configured default.
fn ttl_for(filter: &Filter, config: &CacheConfig) -> Duration {
    let ttl = match filter.exec {
        Exec::Count | Exec::Scalar => config.default_ttl * 2,
        Exec::Find | Exec::Read if filter.take.map(|t| t <= 10).unwrap_or(true) => config.default_ttl * 3,
        Exec::List => (config.default_ttl / 2).max(Duration::from_secs(60)),
        _ => config.default_ttl,
    };
    ttl.min(config.max_ttl)
}

fn write_statement_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*(insert|update|delete|drop|truncate)\b").unwrap())
}

/// Whether `sql` is a write statement, by its leading keyword -- anchored so
/// a read query that merely mentions "update" in a string literal or alias
/// doesn't get misclassified.
pub fn is_write_statement(sql: &str) -> bool {
    write_statement_pattern().is_match(sql)
}

/// Tracks which cache keys were populated for which table, so invalidation
/// can target exactly those keys instead of scanning the whole keyspace.
/// Falls back to a substring `KEYS` scan (spec's originally-specified
/// behavior, see §9 "coarse invalidation") for any table not yet present in
/// the index -- e.g. right after a process restart, before anything has been
/// cached again.
#[derive(Default)]
struct DependencyIndex {
    table_keys: Mutex<HashMap<String, HashSet<String>>>,
}

impl DependencyIndex {
    fn record(&self, table: &str, key: &str) {
        self.table_keys
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string());
    }

    fn take(&self, table: &str) -> Option<HashSet<String>> {
        self.table_keys.lock().unwrap().remove(table)
    }

    fn clear(&self) {
        self.table_keys.lock().unwrap().clear();
    }
}

/// Snapshot of cache-store health (spec §6 `stats(name)`).
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    pub connected: bool,
    pub breaker_open: bool,
    pub consecutive_failures: u32,
}

pub struct CacheCoordinator {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
    breaker: CircuitBreaker,
    index: DependencyIndex,
}

impl CacheCoordinator {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        let config = config.effective();
        let breaker = CircuitBreaker::new(config.breaker_config());
        CacheCoordinator { store, config, breaker, index: DependencyIndex::default() }
    }

    /// Run `miss` (the real query) unless a cached result is available.
    /// `filter.nocache` or a non-read-shaped exec bypasses the cache
    /// entirely. Errors from the store never propagate to the caller.
    pub async fn read_through<F, Fut>(&self, filter: &Filter, miss: F) -> CacheDbResult<Json>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheDbResult<Json>>,
    {
        if filter.nocache || !filter.exec.is_read_shaped() {
            return miss().await;
        }
        if !self.breaker.can_execute() {
            debug!("cache breaker open, bypassing store");
            return miss().await;
        }

        let key = match fingerprint(filter) {
            Ok(k) => k,
            Err(_) => return miss().await,
        };

        match self.get_with_retry(&key).await {
            Some(Some(cached)) => {
                self.breaker.record_success();
                if let Ok(value) = serde_json::from_str(&cached) {
                    return Ok(value);
                }
            }
            Some(None) => self.breaker.record_success(),
            None => self.breaker.record_failure(),
        }

        let value = miss().await?;
        self.set_with_retry(&key, &value, filter).await;
        Ok(value)
    }

    /// Whether the breaker is currently tripped (surfaced via `health`).
    pub fn breaker_is_open(&self) -> bool {
        self.breaker.is_open()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            connected: true,
            breaker_open: self.breaker.is_open(),
            consecutive_failures: self.breaker.consecutive_failures(),
        }
    }

    /// Invalidate every cache key associated with `table`, via the
    /// dependency index when populated, else a substring scan of the whole
    /// keyspace (spec's coarse-invalidation fallback). `schema`, when given,
    /// is folded into the substring so `flush_table("orders", Some("shop"))`
    /// doesn't also clear an unrelated `public.orders`.
    pub async fn invalidate_table(&self, table: &str) {
        self.flush_table(table, None).await;
    }

    pub async fn flush_table(&self, table: &str, schema: Option<&str>) {
        if !self.breaker.can_execute() {
            return;
        }
        let keys = match self.index.take(table) {
            Some(keys) => keys.into_iter().collect(),
            None => {
                let needle = match schema {
                    Some(schema) => format!("*{schema}.{table}*"),
                    None => format!("*{table}*"),
                };
                match self.store.keys(&needle).await {
                    Ok(keys) => keys,
                    Err(e) => {
                        warn!(error = %e, "cache invalidation scan failed");
                        self.breaker.record_failure();
                        return;
                    }
                }
            }
        };
        self.delete_all(keys).await;
    }

    /// For raw `query`/`command` writes the table touched isn't reliably
    /// known without a real SQL parser, so this flushes the whole namespace
    /// defensively rather than risk serving stale reads.
    pub async fn invalidate_for_raw_write(&self, sql: &str) {
        if !is_write_statement(sql) {
            return;
        }
        self.flush().await;
    }

    /// Delete every key under this store's prefix (spec §6 `flush(name)`).
    pub async fn flush(&self) {
        if !self.breaker.can_execute() {
            return;
        }
        self.index.clear();
        match self.store.keys("*").await {
            Ok(keys) => self.delete_all(keys).await,
            Err(e) => {
                warn!(error = %e, "cache flush scan failed");
                self.breaker.record_failure();
            }
        }
    }

    /// Custom entries live under `<prefix>custom:<key>`, a separate
    /// namespace from fingerprinted query results so admin-set values never
    /// collide with (or get swept by) table invalidation.
    pub async fn custom_set(&self, key: &str, value: &str, ttl: Duration) -> CacheDbResult<()> {
        self.store.set_ex(&custom_key(key), value, ttl).await
    }

    pub async fn custom_get(&self, key: &str) -> CacheDbResult<Option<String>> {
        self.store.get(&custom_key(key)).await
    }

    pub async fn custom_del(&self, key: &str) -> CacheDbResult<()> {
        self.store.del(&custom_key(key)).await
    }

    async fn delete_all(&self, keys: Vec<String>) {
        let mut ok = true;
        for key in keys {
            if self.store.del(&key).await.is_err() {
                ok = false;
            }
        }
        if ok {
            self.breaker.record_success();
        } else {
            self.breaker.record_failure();
        }
    }

    async fn get_with_retry(&self, key: &str) -> Option<Option<String>> {
        for attempt in 0..self.config.max_retries {
            match self.store.get(key).await {
                Ok(value) => return Some(value),
                Err(e) => {
                    warn!(error = %e, attempt, "cache get failed");
                    tokio::time::sleep(self.config.retry_delay * (attempt + 1)).await;
                }
            }
        }
        None
    }

    async fn set_with_retry(&self, key: &str, value: &Json, filter: &Filter) {
        let Ok(text) = serde_json::to_string(value) else { return };
        let ttl = ttl_for(filter, &self.config);
        for attempt in 0..self.config.max_retries {
            match self.store.set_ex(key, &text, ttl).await {
                Ok(()) => {
                    self.index.record(&filter.table, key);
                    self.breaker.record_success();
                    return;
                }
                Err(e) => {
                    warn!(error = %e, attempt, "cache set failed");
                    tokio::time::sleep(self.config.retry_delay * (attempt + 1)).await;
                }
            }
        }
        self.breaker.record_failure();
    }
}

fn custom_key(key: &str) -> String {
    format!("custom:{key}")
}
