//! The restart/shutdown protocol for the live core + node pair.
//!
//! # Data Flow
//! ```text
//! Cold start:
//!     ConfigSnapshot → CoreHandle::start → NodeSet::start → Running
//!     (any failure is fatal; no partial service at cold start)
//!
//! Reload (blue/green):
//!     new snapshot → build candidate core → build candidate nodes
//!         → close old nodes → close old core → adopt candidate
//!     (any candidate failure aborts the attempt; old pair keeps serving)
//!
//! Shutdown:
//!     signal → acquire restart gate (bounded) → close nodes → close core
//! ```
//!
//! # Design Decisions
//! - The live-pair slot is guarded by a plain mutex held only across
//!   take/store, never across slow construction calls
//! - An async gate serializes a reload attempt against shutdown; shutdown
//!   waits for the in-flight attempt up to a timeout, then proceeds forcibly
//! - A late reload observes the shutting-down flag under the slot lock and
//!   discards its candidate instead of adopting it

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::schema::{AgentConfig, CoreKind};
use crate::core::{CoreHandle, CoreStartError};
use crate::lifecycle::memory;
use crate::node::{NodeSet, NodeStartError};

/// How long shutdown waits for an in-flight restart attempt to reach its
/// adoption point before proceeding forcibly.
pub const SHUTDOWN_GATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Public lifecycle state, for logs and inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    /// No pair running. The orchestrator is constructed directly into
    /// `Running` (cold start either fully succeeds or is fatal), so this is
    /// never observed in steady state; kept for operators reading state logs.
    Idle,
    /// One live pair serving.
    Running,
    /// Candidate pair under construction; old pair still live.
    Restarting,
    /// Old pair torn down and no replacement adopted. Unreachable under the
    /// blue/green ordering; kept for the close-then-build fallback.
    Degraded,
    /// Termination signal received; teardown in progress.
    ShuttingDown,
    /// Terminal.
    Stopped,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentState::Idle => "idle",
            AgentState::Running => "running",
            AgentState::Restarting => "restarting",
            AgentState::Degraded => "degraded",
            AgentState::ShuttingDown => "shutting-down",
            AgentState::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of one hot-reload attempt.
#[derive(Debug)]
pub enum RestartOutcome {
    /// The candidate pair is now live; the old pair was released.
    Applied,
    /// The attempt was discarded; the previous live pair keeps serving.
    Failed(ReloadError),
}

impl RestartOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RestartOutcome::Applied)
    }
}

/// Why a reload attempt was abandoned.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("candidate core start failed: {0}")]
    Core(#[from] CoreStartError),

    #[error("candidate node start failed: {0}")]
    Nodes(#[from] NodeStartError),

    #[error("shutdown preempted adoption")]
    ShutdownPreempted,
}

/// Fatal cold-start failure. The process must exit non-zero.
#[derive(Debug, Error)]
pub enum ColdStartError {
    #[error("core start failed: {0}")]
    Core(#[from] CoreStartError),

    #[error("node start failed: {0}")]
    Nodes(#[from] NodeStartError),
}

/// The currently live (core, nodes) combination.
#[derive(Debug)]
struct LivePair {
    core: Arc<CoreHandle>,
    nodes: NodeSet,
}

impl LivePair {
    /// Teardown order matters: nodes stop accepting before the core they
    /// route into disappears.
    async fn close(self) {
        self.nodes.close().await;
        self.core.close();
    }
}

/// Owns the live pair and sequences its lifecycle.
#[derive(Debug)]
pub struct Orchestrator {
    /// The live-pair slot. Lock held only across take/store.
    live: std::sync::Mutex<Option<LivePair>>,

    /// Serializes one restart attempt against shutdown.
    restart_gate: tokio::sync::Mutex<()>,

    /// Set once by shutdown; checked under the slot lock before adoption.
    shutting_down: AtomicBool,

    state: std::sync::Mutex<AgentState>,
}

impl Orchestrator {
    /// Cold start: build the core, then the nodes against it.
    ///
    /// Either failure is fatal; the orchestrator never enters `Running` with
    /// partial service.
    pub async fn start(config: &AgentConfig) -> Result<Self, ColdStartError> {
        let core = CoreHandle::start(&config.core)?;
        let nodes = match NodeSet::start(&config.nodes, Arc::clone(&core)).await {
            Ok(nodes) => nodes,
            Err(e) => {
                core.close();
                return Err(e.into());
            }
        };

        tracing::info!(kind = %core.kind(), nodes = nodes.node_names().len(), "Agent running");
        Ok(Self {
            live: std::sync::Mutex::new(Some(LivePair { core, nodes })),
            restart_gate: tokio::sync::Mutex::new(()),
            shutting_down: AtomicBool::new(false),
            state: std::sync::Mutex::new(AgentState::Running),
        })
    }

    /// Apply a new configuration snapshot with the blue/green policy.
    ///
    /// The old pair keeps serving until the candidate pair is fully built;
    /// the only reduced-service window is the swap itself. Failures are
    /// reported, never fatal: the previous pair stays live.
    pub async fn reload(&self, config: AgentConfig) -> RestartOutcome {
        let _gate = self.restart_gate.lock().await;
        if self.shutting_down.load(Ordering::SeqCst) {
            return self.reload_failed(ReloadError::ShutdownPreempted);
        }
        self.set_state(AgentState::Restarting);
        tracing::info!(kind = %config.core.kind, "Reload attempt started");

        let candidate_core = match CoreHandle::start(&config.core) {
            Ok(core) => core,
            Err(e) => {
                self.set_state(AgentState::Running);
                return self.reload_failed(e.into());
            }
        };

        let candidate_nodes =
            match NodeSet::start(&config.nodes, Arc::clone(&candidate_core)).await {
                Ok(nodes) => nodes,
                Err(e) => {
                    candidate_core.close();
                    self.set_state(AgentState::Running);
                    return self.reload_failed(e.into());
                }
            };

        // Both candidates are up. Retire the old pair, then adopt.
        let old = {
            let mut slot = self.live.lock().expect("live slot poisoned");
            slot.take()
        };
        if let Some(old) = old {
            old.close().await;
        }

        let candidate = LivePair {
            core: candidate_core,
            nodes: candidate_nodes,
        };
        let kind = candidate.core.kind();
        let rejected = {
            let mut slot = self.live.lock().expect("live slot poisoned");
            if self.shutting_down.load(Ordering::SeqCst) {
                Some(candidate)
            } else {
                *slot = Some(candidate);
                None
            }
        };

        if let Some(candidate) = rejected {
            // Shutdown won the race after the old pair was retired. Discard
            // the candidate so exactly zero cores stay live.
            candidate.close().await;
            return self.reload_failed(ReloadError::ShutdownPreempted);
        }

        self.set_state(AgentState::Running);
        memory::reclaim_hint();
        tracing::info!(kind = %kind, "Reload applied");
        RestartOutcome::Applied
    }

    /// Close everything and stop.
    ///
    /// Waits up to `gate_timeout` for an in-flight restart attempt to reach
    /// its adoption point; on expiry the wait is abandoned, logged, and
    /// teardown proceeds forcibly. Safe against raced restarts: stale handle
    /// closes are no-ops and a late adoption is discarded.
    pub async fn shutdown_with_timeout(&self, gate_timeout: Duration) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.set_state(AgentState::ShuttingDown);

        let gate = tokio::time::timeout(gate_timeout, self.restart_gate.lock()).await;
        if gate.is_err() {
            tracing::warn!(
                timeout_secs = gate_timeout.as_secs(),
                "Shutdown timed out waiting for in-flight restart, proceeding forcibly"
            );
        }

        let live = {
            let mut slot = self.live.lock().expect("live slot poisoned");
            slot.take()
        };
        if let Some(pair) = live {
            pair.close().await;
        }

        self.set_state(AgentState::Stopped);
        tracing::info!("Agent stopped");
    }

    /// Close everything and stop, with the default gate timeout.
    pub async fn shutdown(&self) {
        self.shutdown_with_timeout(SHUTDOWN_GATE_TIMEOUT).await;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AgentState {
        *self.state.lock().expect("state poisoned")
    }

    /// Backend kind of the live core, if a pair is live.
    pub fn current_kind(&self) -> Option<CoreKind> {
        self.live
            .lock()
            .expect("live slot poisoned")
            .as_ref()
            .map(|pair| pair.core.kind())
    }

    /// Handle of the live core, for inspection. Routing and lifecycle stay
    /// inside the orchestrator.
    pub fn current_core(&self) -> Option<Arc<CoreHandle>> {
        self.live
            .lock()
            .expect("live slot poisoned")
            .as_ref()
            .map(|pair| Arc::clone(&pair.core))
    }

    /// Names of the live nodes.
    pub fn live_node_names(&self) -> Vec<String> {
        self.live
            .lock()
            .expect("live slot poisoned")
            .as_ref()
            .map(|pair| pair.nodes.node_names().to_vec())
            .unwrap_or_default()
    }

    /// Bound addresses of the live nodes, index-aligned with names.
    pub fn live_node_addrs(&self) -> Vec<std::net::SocketAddr> {
        self.live
            .lock()
            .expect("live slot poisoned")
            .as_ref()
            .map(|pair| pair.nodes.local_addrs().to_vec())
            .unwrap_or_default()
    }

    fn reload_failed(&self, error: ReloadError) -> RestartOutcome {
        tracing::error!(error = %error, "Reload aborted");
        memory::reclaim_hint();
        RestartOutcome::Failed(error)
    }

    fn set_state(&self, next: AgentState) {
        let mut state = self.state.lock().expect("state poisoned");
        tracing::debug!(from = %*state, to = %next, "State transition");
        *state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{CoreConfig, NodeConfig};

    fn relay_config() -> AgentConfig {
        AgentConfig {
            core: CoreConfig {
                kind: crate::config::schema::CoreKind::Relay,
                upstream: Some("127.0.0.1:1".into()),
                ..Default::default()
            },
            nodes: vec![NodeConfig {
                name: "n1".into(),
                listen: "127.0.0.1:0".into(),
                max_connections: 8,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn shutdown_gate_timeout_proceeds_forcibly() {
        let orchestrator = Orchestrator::start(&relay_config()).await.unwrap();
        let old_core = orchestrator.current_core().unwrap();

        // Hold the restart gate, as a stalled reload attempt would, so
        // shutdown's wait must expire.
        let gate = orchestrator.restart_gate.lock().await;

        orchestrator
            .shutdown_with_timeout(Duration::from_millis(50))
            .await;

        assert_eq!(orchestrator.state(), AgentState::Stopped);
        assert!(orchestrator.current_core().is_none());
        assert!(!old_core.is_running());
        drop(gate);
    }

    #[tokio::test]
    async fn reload_after_shutdown_is_refused() {
        let orchestrator = Orchestrator::start(&relay_config()).await.unwrap();
        orchestrator
            .shutdown_with_timeout(Duration::from_millis(50))
            .await;

        let outcome = orchestrator.reload(relay_config()).await;
        assert!(matches!(
            outcome,
            RestartOutcome::Failed(ReloadError::ShutdownPreempted)
        ));
        assert!(orchestrator.current_core().is_none());
    }
}
