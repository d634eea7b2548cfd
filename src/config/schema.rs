//! Configuration schema definitions.
//!
//! This module defines the on-disk configuration for the agent. All types
//! derive Serde traits for deserialization from config files. A loaded
//! [`AgentConfig`] is an immutable snapshot: reload replaces it wholesale,
//! nothing mutates it in place.

use serde::{Deserialize, Serialize};

/// Environment variable naming the auxiliary DNS fragment for the relay core.
pub const RELAY_DNS_ENV: &str = "RELAY_DNS_PATH";

/// Environment variable naming the auxiliary DNS fragment for the tunnel core.
pub const TUNNEL_DNS_ENV: &str = "TUNNEL_DNS_PATH";

/// Root configuration snapshot for the agent.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Transport core selection and backend-specific settings.
    pub core: CoreConfig,

    /// Node (listener) definitions, each routed through the core.
    pub nodes: Vec<NodeConfig>,

    /// Logging settings, applied once at cold start.
    pub log: LogConfig,

    /// Whether to watch the config file and hot-reload on change.
    pub watch: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            nodes: Vec::new(),
            log: LogConfig::default(),
            watch: true,
        }
    }
}

/// Which transport core backend to run.
///
/// A closed set: one variant per supported backend, selected at construction
/// time. There is no runtime registration of additional kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoreKind {
    /// TCP relay core forwarding to a fixed upstream.
    #[default]
    Relay,
    /// Encrypted tunnel core dialing a remote endpoint.
    Tunnel,
}

impl std::fmt::Display for CoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreKind::Relay => write!(f, "relay"),
            CoreKind::Tunnel => write!(f, "tunnel"),
        }
    }
}

/// Transport core configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CoreConfig {
    /// Backend selector.
    pub kind: CoreKind,

    /// Upstream address for the relay backend (e.g., "10.0.0.2:443").
    pub upstream: Option<String>,

    /// Remote endpoint for the tunnel backend.
    pub endpoint: Option<String>,

    /// Shared secret for the tunnel backend.
    pub secret: Option<String>,

    /// Auxiliary DNS fragment path for the selected backend. Not read from
    /// the config file; filled in by the loader from [`DnsOverrides`].
    #[serde(skip)]
    pub dns_path: Option<String>,
}

/// One proxy node: a listener bound on the agent, routed through the core.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfig {
    /// Node identifier for logging and error reports.
    pub name: String,

    /// Listen address (e.g., "0.0.0.0:9001").
    pub listen: String,

    /// Maximum concurrent connections on this node (backpressure).
    #[serde(default = "default_node_max_connections")]
    pub max_connections: usize,
}

fn default_node_max_connections() -> usize {
    1024
}

/// Logging configuration.
///
/// Level values other than `debug`/`info`/`warn`/`error` leave the default
/// severity unchanged. An empty `output` logs to stderr; otherwise logs roll
/// into the named file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Textual level: debug, info, warn, error.
    pub level: String,

    /// Log file path; empty means stderr.
    pub output: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: String::new(),
        }
    }
}

/// Auxiliary DNS fragment paths, taken verbatim from the environment and
/// forwarded to the config loader for each backend kind. No validation here.
#[derive(Debug, Clone, Default)]
pub struct DnsOverrides {
    /// Fragment path for the relay core, from `RELAY_DNS_PATH`.
    pub relay_dns_path: Option<String>,

    /// Fragment path for the tunnel core, from `TUNNEL_DNS_PATH`.
    pub tunnel_dns_path: Option<String>,
}

impl DnsOverrides {
    /// Read both override paths from the process environment.
    pub fn from_env() -> Self {
        Self {
            relay_dns_path: std::env::var(RELAY_DNS_ENV).ok(),
            tunnel_dns_path: std::env::var(TUNNEL_DNS_ENV).ok(),
        }
    }

    /// The fragment path for a given backend kind, if set.
    pub fn for_kind(&self, kind: CoreKind) -> Option<&str> {
        match kind {
            CoreKind::Relay => self.relay_dns_path.as_deref(),
            CoreKind::Tunnel => self.tunnel_dns_path.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config: AgentConfig = toml::from_str("").unwrap();
        assert_eq!(config.core.kind, CoreKind::Relay);
        assert!(config.nodes.is_empty());
        assert_eq!(config.log.level, "info");
        assert!(config.watch);
    }

    #[test]
    fn full_config_parses() {
        let raw = r#"
            watch = true

            [core]
            kind = "tunnel"
            endpoint = "198.51.100.7:8443"
            secret = "s3cret"

            [[nodes]]
            name = "edge-1"
            listen = "127.0.0.1:9001"

            [[nodes]]
            name = "edge-2"
            listen = "127.0.0.1:9002"
            max_connections = 64

            [log]
            level = "debug"
            output = "/var/log/proxy-agent/agent.log"
        "#;
        let config: AgentConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.core.kind, CoreKind::Tunnel);
        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.nodes[0].max_connections, 1024);
        assert_eq!(config.nodes[1].max_connections, 64);
        assert!(config.watch);
    }

    #[test]
    fn dns_overrides_map_to_kind() {
        let overrides = DnsOverrides {
            relay_dns_path: Some("/etc/relay-dns.json".into()),
            tunnel_dns_path: None,
        };
        assert_eq!(overrides.for_kind(CoreKind::Relay), Some("/etc/relay-dns.json"));
        assert_eq!(overrides.for_kind(CoreKind::Tunnel), None);
    }
}
