//! Configuration file watcher for re-validation on change.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::Config;

/// Outcome of re-loading the watched file.
pub type ReloadOutcome = Result<Config, ConfigError>;

/// A watcher that re-runs the loader whenever the configuration file changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ReloadOutcome>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for every reload outcome, failures
    /// included.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ReloadOutcome>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching in a background thread.
    ///
    /// The parent directory is watched rather than the file, since editors
    /// usually save by writing a new file and renaming it over the old one.
    /// Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();
        let file_name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if touches(&event, &file_name) {
                        reload(&tx, &path);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            NotifyConfig::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// Load the file and send the outcome. Returns false, without loading, once
/// the receiver is gone.
fn reload(tx: &mpsc::UnboundedSender<ReloadOutcome>, path: &Path) -> bool {
    if tx.is_closed() {
        return false;
    }
    tracing::info!(path = %path.display(), "Config file change detected, reloading...");
    tx.send(load_config(path)).is_ok()
}

/// True for create/modify events that name the watched file.
fn touches(event: &Event, file_name: &OsString) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}
