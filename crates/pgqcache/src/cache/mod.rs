//! Read-through cache: store abstraction, circuit breaker, fingerprinting,
//! and the coordinator that wires them together (spec §4.7).

mod breaker;
mod coordinator;
mod fingerprint;
mod store;

pub use breaker::{BreakerConfig, CircuitBreaker};
pub use coordinator::{is_write_statement, CacheConfig, CacheCoordinator, CacheStats};
pub use fingerprint::fingerprint;
pub use store::{CacheStore, RedisCacheStore, RedisStoreConfig};
