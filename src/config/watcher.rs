//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::{AgentConfig, DnsOverrides};

/// Error raised when the watcher cannot be engaged.
///
/// Fatal at cold start: if reload was requested and watching fails, the
/// process must not run silently without it.
#[derive(Debug, thiserror::Error)]
#[error("watch setup failed: {0}")]
pub struct WatchSetupError(#[from] notify::Error);

/// A watcher that monitors the configuration file for changes.
///
/// Each detected change reloads the file and forwards the parsed snapshot
/// over a channel. The consuming task applies snapshots one at a time, so at
/// most one reload is ever in flight. Files that fail to load are logged and
/// dropped; the orchestrator only ever sees valid snapshots.
pub struct ConfigWatcher {
    path: PathBuf,
    dns: DnsOverrides,
    update_tx: mpsc::UnboundedSender<AgentConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration snapshots.
    pub fn new(path: &Path, dns: DnsOverrides) -> (Self, mpsc::UnboundedReceiver<AgentConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                dns,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned `RecommendedWatcher` must be kept alive for watching to
    /// continue.
    pub fn run(self) -> Result<RecommendedWatcher, WatchSetupError> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let dns = self.dns.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&path, &dns) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload config: {}. Keeping current configuration.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
