//! Debounced watcher for a single file.
//!
//! Raw change notifications for the file's directory are filtered down to the
//! one tracked path; each match restarts a dead-time timer, and a unit
//! settled-event is delivered when the timer runs out.
//!
//! # Architecture
//!
//! ```text
//! Watcher (handle)
//!   - settled-event receiver
//!   - stop rendezvous
//!         |
//! DebounceEngine (one thread)
//!   - select! over events / errors / timer / stop
//!   - DeadlineTimer
//!   - WatchTarget (absolute path matching)
//!         |
//! DirectorySubscription
//!   - NotifySubscription (notify::RecommendedWatcher)
//! ```

mod engine;
mod error;
mod handle;
mod sink;
mod subscription;
mod target;
mod timer;

pub use engine::Delivery;
pub use error::WatchError;
pub use handle::{Watcher, WatcherBuilder};
pub use sink::{ErrorSink, TracingSink};
pub use subscription::{DirectorySubscription, NotifySubscription};
pub use target::WatchTarget;
