//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Cold-start core + nodes → Engage watcher → Wait on signal
//!
//! Reload (orchestrator.rs):
//!     Snapshot → build candidate pair → retire old pair → adopt candidate
//!
//! Shutdown (orchestrator.rs + signals.rs):
//!     SIGTERM/SIGINT → close nodes → close core → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: core first, then node listeners
//! - Ordered teardown: nodes stop accepting before their core disappears
//! - Shutdown waits for an in-flight restart only up to a bounded timeout

pub mod memory;
pub mod orchestrator;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use orchestrator::{AgentState, Orchestrator, ReloadError, RestartOutcome};
pub use shutdown::StopSignal;
pub use startup::FatalError;
