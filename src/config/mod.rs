//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → semantic checks + DNS overrides from env
//!     → AgentConfig (validated, immutable snapshot)
//!     → consumed read-only by the orchestrator
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new snapshot
//!     → snapshot forwarded to the reload task
//!     → orchestrator runs the restart protocol
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a full snapshot reload
//! - All fields have defaults to allow minimal configs
//! - Unparseable reloads never reach the orchestrator; the watcher drops them

pub mod loader;
pub mod schema;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::AgentConfig;
pub use schema::CoreConfig;
pub use schema::CoreKind;
pub use schema::DnsOverrides;
pub use schema::NodeConfig;
pub use watcher::{ConfigWatcher, WatchSetupError};
