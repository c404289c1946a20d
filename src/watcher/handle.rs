//! The caller-facing watcher handle and its builder.

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError, bounded};

use super::engine::{DebounceEngine, Delivery};
use super::sink::{ErrorSink, TracingSink};
use super::subscription::{DirectorySubscription, NotifySubscription};
use super::target::WatchTarget;
use super::WatchError;
use crate::config::WatchConfig;

/// Delivers one settled-event per burst of changes to a single file.
///
/// Dropping the handle stops the watch the same way [`stop`](Self::stop) does.
pub struct Watcher {
    target: WatchTarget,
    /// Unit values, one per elapsed quiet period.
    settled: Receiver<()>,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Watcher {
    /// Watch `file` and deliver a settled-event after `dead_time` passes
    /// without any change to it.
    ///
    /// The timer is armed immediately, so the first event arrives after
    /// `dead_time` even if the file is never touched.
    pub fn new(file: impl AsRef<Path>, dead_time: Duration) -> Result<Self, WatchError> {
        Self::builder(file).dead_time(dead_time).build()
    }

    /// Create a builder for configuring the watcher.
    pub fn builder(file: impl AsRef<Path>) -> WatcherBuilder {
        WatcherBuilder::new(file)
    }

    /// The resolved file and directory.
    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    /// The settled-event stream. Disconnects once the loop has exited.
    pub fn settled(&self) -> &Receiver<()> {
        &self.settled
    }

    /// Block until the next settled-event.
    pub fn recv(&self) -> Result<(), RecvError> {
        self.settled.recv()
    }

    /// Block until the next settled-event or the timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<(), RecvTimeoutError> {
        self.settled.recv_timeout(timeout)
    }

    /// Take a settled-event only if the loop is offering one right now.
    pub fn try_recv(&self) -> Result<(), TryRecvError> {
        self.settled.try_recv()
    }

    /// Stop watching.
    ///
    /// Blocks until the loop accepts the request and has exited. On return
    /// the subscription is closed and no further settled-event will arrive.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // Err means the loop already exited on its own
            let _ = stop_tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("[watcher] debounce loop panicked");
            }
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("target", &self.target)
            .field("running", &self.worker.is_some())
            .finish()
    }
}

/// Builder for constructing a [`Watcher`].
pub struct WatcherBuilder {
    file: PathBuf,
    dead_time: Duration,
    delivery: Delivery,
    event_buffer: usize,
    sink: Box<dyn ErrorSink>,
}

impl WatcherBuilder {
    /// Create a builder with [`WatchConfig`] defaults.
    pub fn new(file: impl AsRef<Path>) -> Self {
        Self {
            file: file.as_ref().to_path_buf(),
            dead_time: Duration::ZERO,
            delivery: Delivery::default(),
            event_buffer: 0,
            sink: Box::new(TracingSink),
        }
        .config(&WatchConfig::default())
    }

    /// Apply dead-time, delivery and buffer settings from configuration.
    pub fn config(mut self, config: &WatchConfig) -> Self {
        self.dead_time = config.dead_time();
        self.delivery = config.delivery;
        self.event_buffer = config.event_buffer;
        self
    }

    /// Set the quiet period. Must be greater than zero.
    pub fn dead_time(mut self, dead_time: Duration) -> Self {
        self.dead_time = dead_time;
        self
    }

    /// Set how settled-events are handed over.
    pub fn delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Set the capacity of the notify-to-loop channels.
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Route runtime subscription errors somewhere other than the log.
    pub fn error_sink(mut self, sink: impl ErrorSink) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Build a watcher on the platform's notification mechanism.
    pub fn build(self) -> Result<Watcher, WatchError> {
        let target = self.prepare()?;
        let subscription = NotifySubscription::open(self.event_buffer)?;
        self.start(target, subscription)
    }

    /// Build a watcher on a caller-supplied subscription.
    ///
    /// The subscription is closed if construction fails.
    pub fn build_with<S: DirectorySubscription>(
        self,
        mut subscription: S,
    ) -> Result<Watcher, WatchError> {
        let target = match self.prepare() {
            Ok(target) => target,
            Err(e) => {
                subscription.close();
                return Err(e);
            }
        };
        self.start(target, subscription)
    }

    fn prepare(&self) -> Result<WatchTarget, WatchError> {
        if self.dead_time.is_zero() {
            return Err(WatchError::InvalidDeadTime);
        }
        WatchTarget::resolve(&self.file)
    }

    /// Register the directory, then hand everything to the loop thread.
    ///
    /// Registration happens before the thread exists, so a failure leaves
    /// nothing running.
    fn start<S: DirectorySubscription>(
        self,
        target: WatchTarget,
        mut subscription: S,
    ) -> Result<Watcher, WatchError> {
        if let Err(e) = subscription.watch(target.dir()) {
            subscription.close();
            return Err(e);
        }

        let (settled_tx, settled_rx) = bounded(0);
        let (stop_tx, stop_rx) = bounded(0);

        let engine = DebounceEngine::new(
            target.clone(),
            subscription,
            self.dead_time,
            self.delivery,
            settled_tx,
            stop_rx,
            self.sink,
        );

        // On spawn failure the closure is dropped, and the subscription with it
        let worker = thread::Builder::new()
            .name("settlewatch".to_string())
            .spawn(move || engine.run())
            .map_err(|e| WatchError::Spawn {
                reason: e.to_string(),
            })?;

        crate::debug_event!(
            "watcher",
            "constructed",
            "{} ({}ms dead-time)",
            target.file().display(),
            self.dead_time.as_millis()
        );

        Ok(Watcher {
            target,
            settled: settled_rx,
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        })
    }
}
