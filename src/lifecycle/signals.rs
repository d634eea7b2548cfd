//! OS signal handling.
//!
//! # Responsibilities
//! - Translate SIGINT/SIGTERM into a single termination event
//! - Keep the shutdown transition identical regardless of what raised it
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The orchestrator never sees which signal fired, only that one did

/// Block until the process receives a termination signal.
#[cfg(unix)]
pub async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            // Without a SIGTERM handler, fall back to interrupt only.
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received");
        }
        _ = sigterm.recv() => {
            tracing::info!("Termination signal received");
        }
    }
}

/// Block until the process receives Ctrl+C.
#[cfg(not(unix))]
pub async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Interrupt received");
}
