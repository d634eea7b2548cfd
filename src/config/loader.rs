//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::{AgentConfig, CoreKind, DnsOverrides};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// A single semantic validation failure.
#[derive(Debug)]
pub enum ValidationError {
    EmptyNodeName,
    DuplicateNodeName(String),
    EmptyListenAddress(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyNodeName => write!(f, "node with empty name"),
            ValidationError::DuplicateNodeName(name) => {
                write!(f, "duplicate node name '{}'", name)
            }
            ValidationError::EmptyListenAddress(name) => {
                write!(f, "node '{}' has empty listen address", name)
            }
        }
    }
}

/// Load and validate a configuration snapshot from a TOML file.
///
/// The DNS override paths are forwarded verbatim into the snapshot's core
/// section; this layer does not validate them.
pub fn load_config(path: &Path, dns: &DnsOverrides) -> Result<AgentConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config: AgentConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    apply_dns_overrides(&mut config, dns);
    Ok(config)
}

/// Semantic checks, run after serde has accepted the file.
///
/// Returns all failures, not just the first.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for node in &config.nodes {
        if node.name.is_empty() {
            errors.push(ValidationError::EmptyNodeName);
            continue;
        }
        if !seen.insert(node.name.as_str()) {
            errors.push(ValidationError::DuplicateNodeName(node.name.clone()));
        }
        if node.listen.is_empty() {
            errors.push(ValidationError::EmptyListenAddress(node.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn apply_dns_overrides(config: &mut AgentConfig, dns: &DnsOverrides) {
    if let Some(path) = dns.for_kind(config.core.kind) {
        tracing::debug!(kind = %config.core.kind, dns_path = path, "DNS fragment override applied");
    }
    match config.core.kind {
        CoreKind::Relay => config.core.dns_path = dns.relay_dns_path.clone(),
        CoreKind::Tunnel => config.core.dns_path = dns.tunnel_dns_path.clone(),
    }
}
