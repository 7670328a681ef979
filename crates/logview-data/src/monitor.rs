//! File system watcher for the attached log file.

use crate::error::Result;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tracing::{debug, warn};

/// Watches a single file and reports changes through a callback.
///
/// Notifications are delivered on a watcher-owned background context and
/// must be treated as hints: the receiver re-stats the path itself. Rapid
/// changes may be coalesced into one notification.
#[derive(Debug)]
pub struct Monitor {
    /// The watcher instance
    watcher: RecommendedWatcher,
}

impl Monitor {
    /// Create a monitor delivering events to `on_event`.
    pub fn new<F>(on_event: F) -> Result<Self>
    where
        F: Fn(Event) + Send + 'static,
    {
        let watcher = RecommendedWatcher::new(
            move |res| match res {
                Ok(event) => on_event(event),
                Err(e) => warn!("file watcher error: {}", e),
            },
            notify::Config::default(),
        )?;

        Ok(Self { watcher })
    }

    /// Start (or refresh) watching a file.
    pub fn watch_file(&mut self, path: &Path) -> Result<()> {
        debug!("watching {:?}", path);
        self.watcher.watch(path, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    /// Stop watching a file.
    pub fn unwatch_file(&mut self, path: &Path) -> Result<()> {
        debug!("unwatching {:?}", path);
        self.watcher.unwatch(path)?;
        Ok(())
    }
}
