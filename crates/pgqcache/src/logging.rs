//! Pluggable error routing (spec §10.2).
//!
//! `dispatch` always returns `Err` on failure -- an `ErrorSink` is a side
//! channel for callers who also want failures pushed to a metrics/alerting
//! pipeline without threading that concern through every call site.

use crate::error::CacheDbError;

pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &CacheDbError, context: &str);
}

/// The default sink: routes to `tracing`, the way the rest of this crate logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, error: &CacheDbError, context: &str) {
        tracing::error!(error = %error, context, "pgqcache operation failed");
    }
}
