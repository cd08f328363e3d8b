//! Periodic background upkeep (spec §4.8/§9): clears the field-name
//! memoization table and reports any cache breaker that isn't CLOSED.
//!
//! There is no state here that correctness depends on -- skipping a sweep,
//! or running two concurrently, only affects memory footprint and how
//! quickly an operator notices a tripped breaker in the logs.

use std::time::Duration;

use tracing::{info, warn};

use crate::builder;
use crate::registry;

/// Run one maintenance sweep across every registered connection.
pub fn sweep() {
    let cleared = builder::field_cache().len();
    builder::field_cache().clear();
    if cleared > 0 {
        info!(cleared, "field-name memoization table cleared");
    }

    for name in registry::names() {
        if let Some(stats) = registry::stats(&name) {
            if stats.breaker_open {
                warn!(connection = %name, failures = stats.consecutive_failures, "cache circuit breaker is open");
            }
        }
    }
}

/// Spawn `sweep` on a repeating interval. Returns the task handle so a
/// caller can abort it on shutdown; dropping the handle does not stop the
/// task (same semantics as any other detached `tokio::spawn`).
pub fn spawn_periodic(interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            sweep();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_runs_without_a_registered_connection() {
        sweep();
    }

    #[tokio::test]
    async fn spawned_sweep_can_be_aborted() {
        let handle = spawn_periodic(Duration::from_secs(3600));
        handle.abort();
        let result = handle.await;
        assert!(result.is_err());
    }
}
