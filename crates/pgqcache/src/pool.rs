//! Connection pool construction, adapted from the teacher's pool helpers to
//! take this crate's [`CacheDbError`] and default timeouts instead of
//! leaving every caller to wire up `deadpool_postgres::ManagerConfig` by hand.

use std::time::Duration;

use deadpool_postgres::{Manager, ManagerConfig, Pool, PoolBuilder, RecyclingMethod, Timeouts};
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};
use tokio_postgres::{NoTls, Socket};

use crate::error::{CacheDbError, CacheDbResult};

/// Pool sizing and timeout knobs (spec §10.3 `PoolConfig`).
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: usize,
    pub connect_timeout: Duration,
    pub recycle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_size: 16,
            connect_timeout: Duration::from_secs(10),
            recycle_timeout: Duration::from_secs(30),
        }
    }
}

/// Create a connection pool from a database URL, using [`NoTls`] and
/// [`PoolConfig::default`].
pub fn create_pool(database_url: &str) -> CacheDbResult<Pool> {
    create_pool_with_config(database_url, PoolConfig::default())
}

/// Create a connection pool with custom sizing/timeouts.
pub fn create_pool_with_config(database_url: &str, config: PoolConfig) -> CacheDbResult<Pool> {
    create_pool_with_tls(database_url, NoTls, config)
}

/// Create a connection pool using a custom TLS connector.
pub fn create_pool_with_tls<T>(database_url: &str, tls: T, config: PoolConfig) -> CacheDbResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| CacheDbError::build(format!("invalid connection string: {e}")))?;

    let manager = Manager::from_config(pg_config, tls, default_manager_config());
    configure_builder(Pool::builder(manager), &config)
        .build()
        .map_err(|e| CacheDbError::Pool(e.to_string()))
}

fn configure_builder(builder: PoolBuilder, config: &PoolConfig) -> PoolBuilder {
    builder.max_size(config.max_size).timeouts(Timeouts {
        wait: None,
        create: Some(config.connect_timeout),
        recycle: Some(config.recycle_timeout),
    })
}

fn default_manager_config() -> ManagerConfig {
    ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    }
}
