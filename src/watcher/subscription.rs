//! Directory subscriptions: the source of raw change notifications.
//!
//! [`DirectorySubscription`] is the seam between the debounce engine and the
//! platform watch mechanism. [`NotifySubscription`] is the production
//! implementation on top of `notify`.

use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, bounded};
use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};

use super::WatchError;

/// An open subscription to change notifications for a directory.
///
/// The engine takes exclusive ownership: it is the only reader of both
/// channels and the only caller of [`close`](Self::close).
pub trait DirectorySubscription: Send + 'static {
    /// Register a directory (non-recursively).
    fn watch(&mut self, dir: &Path) -> Result<(), WatchError>;

    /// One item per affected path.
    fn events(&self) -> &Receiver<PathBuf>;

    /// Errors reported by the mechanism after registration.
    fn errors(&self) -> &Receiver<WatchError>;

    /// Release the underlying watch. Must be idempotent.
    fn close(&mut self);
}

/// Subscription backed by `notify::RecommendedWatcher`.
pub struct NotifySubscription {
    /// `None` once closed.
    watcher: Option<notify::RecommendedWatcher>,
    events: Receiver<PathBuf>,
    errors: Receiver<WatchError>,
}

impl NotifySubscription {
    /// Open a platform watcher. Nothing is watched until [`watch`](DirectorySubscription::watch).
    ///
    /// `buffer` is the capacity of the notification and error channels; zero
    /// makes every handoff a rendezvous with the engine.
    pub fn open(buffer: usize) -> Result<Self, WatchError> {
        let (event_tx, event_rx) = bounded(buffer);
        let (error_tx, error_rx) = bounded(buffer);

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !is_content_change(&event.kind) {
                    return;
                }
                for path in event.paths {
                    // Receiver gone means the subscription is being torn down
                    if event_tx.send(path).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = error_tx.send(WatchError::Runtime {
                    details: e.to_string(),
                });
            }
        })?;

        Ok(Self {
            watcher: Some(watcher),
            events: event_rx,
            errors: error_rx,
        })
    }
}

impl DirectorySubscription for NotifySubscription {
    fn watch(&mut self, dir: &Path) -> Result<(), WatchError> {
        let registration_error = |reason: String| WatchError::DirectoryRegistration {
            path: dir.to_path_buf(),
            reason,
        };

        let watcher = self
            .watcher
            .as_mut()
            .ok_or_else(|| registration_error("subscription is closed".to_string()))?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| registration_error(e.to_string()))?;

        crate::debug_event!("watcher", "watching", "{}", dir.display());
        Ok(())
    }

    fn events(&self) -> &Receiver<PathBuf> {
        &self.events
    }

    fn errors(&self) -> &Receiver<WatchError> {
        &self.errors
    }

    fn close(&mut self) {
        // Receivers go first: a callback blocked on a full channel must see
        // the disconnect before the backend tries to join its thread.
        self.events = disconnected();
        self.errors = disconnected();

        if self.watcher.take().is_some() {
            crate::debug_event!("watcher", "subscription closed");
        }
    }
}

impl Drop for NotifySubscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// A receiver whose sender is already gone.
fn disconnected<T>() -> Receiver<T> {
    let (_, rx) = bounded(0);
    rx
}

/// Filter out read-side access events.
///
/// Reading the file after a settle (the usual reaction) must not count as
/// activity, otherwise every reload would schedule another one.
fn is_content_change(kind: &EventKind) -> bool {
    !matches!(
        kind,
        EventKind::Access(
            AccessKind::Read
                | AccessKind::Open(_)
                | AccessKind::Close(AccessMode::Read | AccessMode::Execute)
        )
    )
}
