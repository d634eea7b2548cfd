//! Startup orchestration for the `serve` command.
//!
//! # Responsibilities
//! - Cold-start the orchestrator from the initial snapshot
//! - Engage the config watcher when reload is enabled
//! - Block on the termination signal, then run the shutdown transition
//!
//! # Design Decisions
//! - Fail fast: any cold-start error is fatal
//! - Reload attempts run on the watcher's task, never on the main task
//! - Watcher snapshots are applied one at a time (serialized reloads)

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::schema::{AgentConfig, DnsOverrides};
use crate::config::watcher::{ConfigWatcher, WatchSetupError};
use crate::lifecycle::orchestrator::{ColdStartError, Orchestrator};
use crate::lifecycle::{memory, signals};

/// A failure that must terminate the process with a non-zero status.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("cold start failed: {0}")]
    ColdStart(#[from] ColdStartError),

    #[error("{0}")]
    Watch(#[from] WatchSetupError),
}

/// Run the agent until a termination signal arrives.
///
/// `watch_requested` is the CLI flag; the snapshot's own `watch` flag must
/// also be set for the watcher to engage.
pub async fn run(
    config_path: &Path,
    config: AgentConfig,
    dns: DnsOverrides,
    watch_requested: bool,
) -> Result<(), FatalError> {
    let orchestrator = Arc::new(Orchestrator::start(&config).await?);

    // Kept alive for the lifetime of the serve loop; dropping it stops the
    // file watch.
    let mut _watch_handle = None;
    let mut reload_task = None;

    if watch_requested && config.watch {
        let (watcher, mut snapshots) = ConfigWatcher::new(config_path, dns);
        _watch_handle = Some(watcher.run()?);

        let orch = Arc::clone(&orchestrator);
        reload_task = Some(tokio::spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                // One attempt at a time; outcome logging lives in reload().
                let _ = orch.reload(snapshot).await;
            }
        }));
    } else {
        tracing::info!("Config watch disabled");
    }

    memory::reclaim_hint();
    signals::wait_for_termination().await;

    orchestrator.shutdown().await;
    if let Some(task) = reload_task {
        task.abort();
    }
    Ok(())
}
