//! Watch command.

use std::path::Path;

use anyhow::{Context, bail};

use crate::config::WatchConfig;
use crate::watcher::Watcher;

/// Run watch command - print one line per settled-event.
///
/// Returns after `count` events, or runs until the process is killed.
pub fn run_watch(file: &Path, config: &WatchConfig, count: Option<usize>) -> anyhow::Result<()> {
    let watcher = Watcher::builder(file)
        .config(config)
        .build()
        .with_context(|| format!("failed to watch {}", file.display()))?;

    eprintln!(
        "Watching {} ({}ms dead-time)",
        watcher.target().file().display(),
        config.dead_time_ms
    );

    let mut settled = 0usize;
    loop {
        if watcher.recv().is_err() {
            bail!("watch on {} ended unexpectedly", file.display());
        }

        settled += 1;
        println!(
            "settled {} {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            watcher.target().file().display()
        );

        if count.is_some_and(|limit| settled >= limit) {
            break;
        }
    }

    watcher.stop();
    Ok(())
}
