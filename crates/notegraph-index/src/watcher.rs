//! Debounced filesystem watcher that keeps the store current while running.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notegraph_embed::EmbedProvider;
use notify_debouncer_mini::{DebouncedEventKind, new_debouncer};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::pipeline::{reindex_file, remove_file};
use crate::scanner::{is_eligible, normalize_path};
use crate::store::NoteStore;

/// Watcher configuration.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Quiet period after the last event on a path before it is handled.
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

/// What the watcher did with one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteUpdate {
    Indexed { path: String },
    Removed { path: String },
}

/// Per-update notification.
pub type UpdateFn = dyn Fn(&NoteUpdate) + Send + Sync;

pub struct NoteWatcher {
    handle: tokio::task::JoinHandle<()>,
}

impl NoteWatcher {
    /// Watch `root` recursively and reindex or remove notes as they change.
    ///
    /// Events are debounced per path; whether a path is reindexed or removed
    /// is decided by checking existence when the debounced event fires, not
    /// from the event kind. Per-path failures are logged and never stop the
    /// watcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the filesystem watcher cannot be initialized.
    pub fn start<P: EmbedProvider + Clone + Send + Sync + 'static>(
        root: &Path,
        store: NoteStore,
        provider: P,
        config: &WatcherConfig,
        on_update: Option<Box<UpdateFn>>,
    ) -> Result<Self> {
        let (notify_tx, mut notify_rx) = mpsc::channel::<PathBuf>(64);

        let watch_root = root.to_path_buf();
        let mut debouncer = new_debouncer(
            Duration::from_millis(config.debounce_ms),
            move |events: std::result::Result<
                Vec<notify_debouncer_mini::DebouncedEvent>,
                notify::Error,
            >| {
                let events = match events {
                    Ok(events) => events,
                    Err(e) => {
                        tracing::warn!("note watcher error: {e}");
                        return;
                    }
                };

                let paths: HashSet<PathBuf> = events
                    .into_iter()
                    .filter(|e| {
                        e.kind == DebouncedEventKind::Any
                            && is_eligible(e.path.strip_prefix(&watch_root).unwrap_or(&e.path))
                    })
                    .map(|e| e.path)
                    .collect();

                for path in paths {
                    let _ = notify_tx.blocking_send(path);
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(root, notify::RecursiveMode::Recursive)?;

        let root = root.to_path_buf();
        let handle = tokio::spawn(async move {
            let _debouncer = debouncer;
            while let Some(path) = notify_rx.recv().await {
                let rel = normalize_path(&root, &path);

                let update = if path.exists() {
                    match reindex_file(&root, &store, &provider, &rel).await {
                        Ok(true) => Some(NoteUpdate::Indexed { path: rel }),
                        Ok(false) => None,
                        Err(e) => {
                            tracing::warn!(path = %rel, "reindex failed: {e}");
                            None
                        }
                    }
                } else {
                    match remove_file(&store, &rel).await {
                        Ok(removed) if removed > 0 => Some(NoteUpdate::Removed { path: rel }),
                        Ok(_) => None,
                        Err(e) => {
                            tracing::warn!(path = %rel, "remove failed: {e}");
                            None
                        }
                    }
                };

                if let (Some(update), Some(f)) = (update, on_update.as_deref()) {
                    f(&update);
                }
            }
        });

        Ok(Self { handle })
    }

    /// Stop watching. In-flight work on the spawned task is abandoned.
    pub fn stop(self) {
        self.handle.abort();
    }
}
