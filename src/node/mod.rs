//! Node layer subsystem.
//!
//! # Data Flow
//! ```text
//! NodeConfig list + running CoreHandle
//!     → NodeSet::start (bind every node, rollback on first failure)
//!     → accept loops (listener.rs, bounded by per-node semaphore)
//!     → CoreHandle::dispatch (traffic routed into the core)
//!
//! On close:
//!     stop signal → accept loops exit → listeners released
//! ```
//!
//! # Design Decisions
//! - All binds complete before any accept loop starts; a failed start never
//!   leaks a running listener
//! - The core reference is for routing only; NodeSet never closes the core
//! - close() is idempotent and bounded

pub mod listener;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::schema::NodeConfig;
use crate::core::CoreHandle;
use crate::lifecycle::shutdown::{StopListener, StopSignal};
use listener::NodeListener;

/// How long close() waits for an accept loop to acknowledge the stop signal
/// before aborting it.
const ACCEPT_LOOP_STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Error starting the node layer. Always names the node that failed.
#[derive(Debug, Error)]
#[error("node '{node}' failed to start: {source}")]
pub struct NodeStartError {
    pub node: String,
    #[source]
    pub source: std::io::Error,
}

/// The running collection of node listeners bound to one CoreHandle.
#[derive(Debug)]
pub struct NodeSet {
    names: Vec<String>,
    addrs: Vec<SocketAddr>,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
    stop: StopSignal,
    closed: AtomicBool,
}

impl NodeSet {
    /// Bind and start a listener for every node definition, routed through
    /// `core`.
    ///
    /// Binds happen first, in order; if any node fails, listeners already
    /// bound by this call are dropped before the error is returned, so a
    /// failed start never leaks running listeners. Accept loops spawn only
    /// after every bind succeeded.
    pub async fn start(
        configs: &[NodeConfig],
        core: Arc<CoreHandle>,
    ) -> Result<Self, NodeStartError> {
        let mut listeners = Vec::with_capacity(configs.len());
        for config in configs {
            match NodeListener::bind(config).await {
                Ok(listener) => listeners.push(listener),
                Err(source) => {
                    // Rollback: everything bound so far drops here.
                    tracing::warn!(
                        node = %config.name,
                        error = %source,
                        bound_so_far = listeners.len(),
                        "Node bind failed, rolling back"
                    );
                    return Err(NodeStartError {
                        node: config.name.clone(),
                        source,
                    });
                }
            }
        }

        let stop = StopSignal::new();
        let mut names = Vec::with_capacity(listeners.len());
        let mut addrs = Vec::with_capacity(listeners.len());

        for listener in &listeners {
            names.push(listener.name().to_string());
            addrs.push(listener.local_addr().map_err(|source| NodeStartError {
                node: listener.name().to_string(),
                source,
            })?);
        }

        // Everything bound and inspected; only now start accepting.
        let tasks: Vec<JoinHandle<()>> = listeners
            .into_iter()
            .map(|listener| spawn_accept_loop(listener, Arc::clone(&core), stop.listener()))
            .collect();

        tracing::info!(nodes = names.len(), "Node layer started");
        Ok(Self {
            names,
            addrs,
            tasks: std::sync::Mutex::new(tasks),
            stop,
            closed: AtomicBool::new(false),
        })
    }

    /// Stop accepting on every listener and release their resources.
    ///
    /// Idempotent: later calls return immediately. Never touches the bound
    /// core.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop.trigger();

        let tasks = {
            let mut guard = self.tasks.lock().expect("node task list poisoned");
            std::mem::take(&mut *guard)
        };
        for mut task in tasks {
            if tokio::time::timeout(ACCEPT_LOOP_STOP_TIMEOUT, &mut task)
                .await
                .is_err()
            {
                task.abort();
            }
        }
        tracing::info!(nodes = self.names.len(), "Node layer closed");
    }

    /// Names of the nodes in this set.
    pub fn node_names(&self) -> &[String] {
        &self.names
    }

    /// Bound local addresses, index-aligned with [`node_names`].
    ///
    /// [`node_names`]: NodeSet::node_names
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    /// Whether close() has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn spawn_accept_loop(
    listener: NodeListener,
    core: Arc<CoreHandle>,
    mut stop: StopListener,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.stopped() => {
                    tracing::debug!(node = %listener.name(), "Accept loop stopping");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _peer, permit)) => {
                            match core.dispatch(stream, listener.name()) {
                                Some(conn) => {
                                    // Permit lives until the proxied stream
                                    // finishes.
                                    tokio::spawn(async move {
                                        let _ = conn.await;
                                        drop(permit);
                                    });
                                }
                                None => drop(permit),
                            }
                        }
                        Err(e) => {
                            tracing::warn!(node = %listener.name(), error = %e, "Accept failed");
                        }
                    }
                }
            }
        }
    })
}
