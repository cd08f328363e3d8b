//! # pgqcache
//!
//! A Postgres SQL builder, pooled query executor, and read-through /
//! write-invalidate cache, all driven by one dynamic filter record rather
//! than a per-table compile-time query DSL.
//!
//! ## Features
//!
//! - **Dynamic, not generated**: one [`Filter`] record expresses every exec
//!   shape (`find`, `list`, `insert`, `scalar`, raw `query`, ...) -- there is
//!   no codegen step and no per-table struct to keep in sync with the schema.
//! - **Safe defaults**: `update`/`remove` require a `WHERE`; every dynamic
//!   value is bound as a driver parameter or escaped through one literal
//!   renderer, never interpolated ad hoc.
//! - **Cache is optional and fails open**: a connection works identically
//!   with or without a cache store configured, and a store outage degrades
//!   to uncached reads rather than an error.

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod filter;
pub mod ident;
pub mod logging;
pub mod maintenance;
pub mod normalize;
pub mod pool;
pub mod registry;
pub mod value;

pub use builder::{build, count_filter_for_list, BuiltQuery};
pub use config::ConnectionOptions;
pub use error::{CacheDbError, CacheDbResult};
pub use executor::{read_query_count, write_query_count, Connection, ConnectionHealth, PoolHealth, StoreHealth};
pub use filter::{
    Comparer, DatePart, Exec, Filter, Payload, PayloadEntry, PayloadOp, Predicate, ScalarKind,
    ScalarSpec, SearchAnchor, SortDir, SortKey,
};
pub use logging::{ErrorSink, TracingErrorSink};
pub use normalize::ExecResult;
pub use pool::PoolConfig;
pub use value::Value;
pub use cache::{CacheConfig, CacheCoordinator, CacheStats, CacheStore, RedisCacheStore, RedisStoreConfig};

pub use registry::{
    close, del, dispatch, flush, flush_table, get, get_value, health, init, names, set, stats,
    RegisterOptions,
};
