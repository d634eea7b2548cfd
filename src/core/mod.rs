//! Transport core subsystem.
//!
//! # Data Flow
//! ```text
//! CoreConfig (kind + backend settings)
//!     → CoreHandle::start (validate settings, load DNS fragment)
//!     → running core
//!     → node listeners hand accepted streams to dispatch()
//!     → backend moves the traffic (relay.rs / tunnel.rs)
//!
//! Core States:
//!     Started → Closed (close is idempotent)
//! ```
//!
//! # Design Decisions
//! - Backend selection is a closed tag: one enum variant per supported kind
//! - close() never blocks on in-flight connections; they run to completion
//! - The handle is shared with node listeners for routing only; lifecycle
//!   control stays with the orchestrator

pub mod relay;
pub mod tunnel;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpStream;

use crate::config::schema::{CoreConfig, CoreKind};
use relay::RelayCore;
use tunnel::TunnelCore;

/// Errors that can occur while starting a transport core.
#[derive(Debug, Error)]
pub enum CoreStartError {
    /// A backend-required setting is absent from the config.
    #[error("{kind} core requires setting '{setting}'")]
    MissingSetting {
        kind: CoreKind,
        setting: &'static str,
    },

    /// A backend setting is present but unusable.
    #[error("{kind} core setting '{setting}' is invalid: {reason}")]
    InvalidSetting {
        kind: CoreKind,
        setting: &'static str,
        reason: String,
    },

    /// An auxiliary asset (e.g., a DNS fragment file) could not be read.
    #[error("{kind} core asset '{path}' unavailable: {source}")]
    MissingAsset {
        kind: CoreKind,
        path: String,
        source: std::io::Error,
    },
}

/// One running transport core.
///
/// Created by [`CoreHandle::start`], destroyed by [`CoreHandle::close`].
/// Exactly one handle is live in steady state; during a restart attempt a
/// candidate handle may exist alongside the old one until the swap.
#[derive(Debug)]
pub struct CoreHandle {
    backend: Backend,
    running: AtomicBool,
    routed: AtomicU64,
}

/// Closed set of backend implementations.
#[derive(Debug)]
enum Backend {
    Relay(RelayCore),
    Tunnel(TunnelCore),
}

impl CoreHandle {
    /// Construct and start the backend selected by `config`.
    ///
    /// Fails fast if backend-required settings are missing or the configured
    /// DNS fragment cannot be read. On success the core is ready to accept
    /// dispatched streams.
    pub fn start(config: &CoreConfig) -> Result<Arc<Self>, CoreStartError> {
        let backend = match config.kind {
            CoreKind::Relay => Backend::Relay(RelayCore::start(config)?),
            CoreKind::Tunnel => Backend::Tunnel(TunnelCore::start(config)?),
        };

        let handle = Arc::new(Self {
            backend,
            running: AtomicBool::new(true),
            routed: AtomicU64::new(0),
        });

        tracing::info!(kind = %handle.kind(), "Transport core started");
        Ok(handle)
    }

    /// Which backend implementation is active. Pure accessor.
    pub fn kind(&self) -> CoreKind {
        match &self.backend {
            Backend::Relay(_) => CoreKind::Relay,
            Backend::Tunnel(_) => CoreKind::Tunnel,
        }
    }

    /// Whether the core is still accepting dispatched streams.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Release the core. Idempotent: only the first call logs and flips the
    /// running flag; later calls (e.g., from a raced restart) are no-ops.
    pub fn close(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!(kind = %self.kind(), "Transport core closed");
        }
    }

    /// Hand an accepted stream to the backend.
    ///
    /// Streams arriving after close are dropped (returns `None`). The
    /// per-stream work runs on its own task; dispatch itself never blocks the
    /// accept loop. The returned handle completes when the stream is done,
    /// letting the caller tie a connection permit to the stream's lifetime.
    pub fn dispatch(
        self: &Arc<Self>,
        stream: TcpStream,
        node: &str,
    ) -> Option<tokio::task::JoinHandle<()>> {
        if !self.is_running() {
            tracing::debug!(node, "Stream dropped: core closed");
            return None;
        }
        self.routed.fetch_add(1, Ordering::SeqCst);

        let handle = Arc::clone(self);
        let node = node.to_string();
        Some(tokio::spawn(async move {
            let result = match &handle.backend {
                Backend::Relay(core) => core.proxy(stream).await,
                Backend::Tunnel(core) => core.proxy(stream).await,
            };
            if let Err(e) = result {
                tracing::debug!(node, error = %e, "Proxied stream ended with error");
            }
        }))
    }

    /// Number of streams handed to this core since start.
    pub fn routed(&self) -> u64 {
        self.routed.load(Ordering::SeqCst)
    }
}

/// Read the auxiliary DNS fragment named in the config, if any.
///
/// The path comes verbatim from the environment; a set-but-unreadable path is
/// a start failure (the operator asked for an asset that is not there).
fn load_dns_fragment(config: &CoreConfig) -> Result<Option<String>, CoreStartError> {
    match &config.dns_path {
        None => Ok(None),
        Some(path) => match std::fs::read_to_string(path) {
            Ok(content) => {
                tracing::debug!(kind = %config.kind, path, "DNS fragment loaded");
                Ok(Some(content))
            }
            Err(source) => Err(CoreStartError::MissingAsset {
                kind: config.kind,
                path: path.clone(),
                source,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::CoreConfig;

    fn relay_config() -> CoreConfig {
        CoreConfig {
            kind: CoreKind::Relay,
            upstream: Some("127.0.0.1:1".into()),
            ..Default::default()
        }
    }

    #[test]
    fn start_reports_kind() {
        let core = CoreHandle::start(&relay_config()).unwrap();
        assert_eq!(core.kind(), CoreKind::Relay);
        assert!(core.is_running());
    }

    #[test]
    fn missing_upstream_fails() {
        let config = CoreConfig {
            kind: CoreKind::Relay,
            ..Default::default()
        };
        let err = CoreHandle::start(&config).unwrap_err();
        assert!(matches!(
            err,
            CoreStartError::MissingSetting { setting: "upstream", .. }
        ));
    }

    #[test]
    fn missing_tunnel_settings_fail() {
        let config = CoreConfig {
            kind: CoreKind::Tunnel,
            endpoint: Some("192.0.2.1:8443".into()),
            ..Default::default()
        };
        let err = CoreHandle::start(&config).unwrap_err();
        assert!(matches!(
            err,
            CoreStartError::MissingSetting { setting: "secret", .. }
        ));
    }

    #[test]
    fn close_is_idempotent() {
        let core = CoreHandle::start(&relay_config()).unwrap();
        core.close();
        core.close();
        assert!(!core.is_running());
    }

    #[test]
    fn unreadable_dns_fragment_fails_start() {
        let mut config = relay_config();
        config.dns_path = Some("/nonexistent/dns.json".into());
        let err = CoreHandle::start(&config).unwrap_err();
        assert!(matches!(err, CoreStartError::MissingAsset { .. }));
    }
}
