//! Runtime-lifecycle layer of a network-proxy node agent.
//!
//! # Architecture Overview
//! ```text
//!                  ┌──────────────────────────────────────────────┐
//!                  │                 PROXY AGENT                   │
//!                  │                                               │
//!   config file ───┼─▶ config (loader/watcher)                     │
//!                  │         │                                     │
//!                  │         ▼                                     │
//!                  │   lifecycle::Orchestrator                     │
//!                  │     │            │                            │
//!                  │     ▼            ▼                            │
//!   client ────────┼─▶ node (listeners) ──▶ core (relay/tunnel) ──┼─▶ upstream
//!                  │                                               │
//!                  │   observability (logging)                     │
//!                  └──────────────────────────────────────────────┘
//! ```
//!
//! The orchestrator owns the live (core, nodes) pair, rebuilds it blue/green
//! on config change, and tears it down on a termination signal.

pub mod config;
pub mod core;
pub mod lifecycle;
pub mod node;
pub mod observability;

pub use config::AgentConfig;
pub use crate::core::CoreHandle;
pub use lifecycle::{Orchestrator, RestartOutcome};
pub use node::NodeSet;
