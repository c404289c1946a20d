//! Observability sink for runtime subscription errors.

use super::WatchError;

/// Receives errors the subscription reports while the watch is running.
///
/// Reporting must not block for long: it runs on the debounce loop.
pub trait ErrorSink: Send + 'static {
    fn report(&self, error: &WatchError);
}

impl<F> ErrorSink for F
where
    F: Fn(&WatchError) + Send + 'static,
{
    fn report(&self, error: &WatchError) {
        self(error)
    }
}

/// Default sink: logs through `tracing` at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, error: &WatchError) {
        tracing::warn!("[watcher] subscription error: {error}");
    }
}
