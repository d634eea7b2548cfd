//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via tracing; level and sink from the config snapshot
//! - Sink configured once at cold start, never on reload

pub mod logging;

pub use logging::init_logging;
