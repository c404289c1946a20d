//! Debounced single-file change notifications.
//!
//! [`Watcher`] watches one file and delivers a unit settled-event once a
//! configurable dead-time has passed with no further changes to it. A burst
//! of writes (a save, a formatter pass, an atomic rename) yields exactly one
//! event after activity stops.
//!
//! ```no_run
//! use std::time::Duration;
//! use settlewatch::Watcher;
//!
//! let watcher = Watcher::new("app.toml", Duration::from_millis(200))?;
//! while watcher.recv().is_ok() {
//!     println!("app.toml settled, reloading");
//! }
//! # Ok::<(), settlewatch::WatchError>(())
//! ```

pub mod cli;
pub mod config;
pub mod logging;
pub mod watcher;

pub use config::Settings;
pub use watcher::{Delivery, WatchError, Watcher, WatcherBuilder};
