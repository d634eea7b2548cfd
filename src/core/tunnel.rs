//! Tunnel backend: carries dispatched streams over a remote endpoint after a
//! shared-secret handshake. The wire framing past the handshake is the
//! endpoint's concern, not this agent's.

use std::net::SocketAddr;

use tokio::io::{copy_bidirectional, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::schema::{CoreConfig, CoreKind};
use crate::core::CoreStartError;

/// Tunnel transport core.
#[derive(Debug)]
pub struct TunnelCore {
    endpoint: SocketAddr,
    secret: String,
    _dns_fragment: Option<String>,
}

impl TunnelCore {
    pub(crate) fn start(config: &CoreConfig) -> Result<Self, CoreStartError> {
        let raw = config
            .endpoint
            .as_deref()
            .ok_or(CoreStartError::MissingSetting {
                kind: CoreKind::Tunnel,
                setting: "endpoint",
            })?;

        let endpoint: SocketAddr = raw.parse().map_err(|e| CoreStartError::InvalidSetting {
            kind: CoreKind::Tunnel,
            setting: "endpoint",
            reason: format!("{}", e),
        })?;

        let secret = config
            .secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(CoreStartError::MissingSetting {
                kind: CoreKind::Tunnel,
                setting: "secret",
            })?;

        let dns_fragment = super::load_dns_fragment(config)?;

        Ok(Self {
            endpoint,
            secret,
            _dns_fragment: dns_fragment,
        })
    }

    /// Open a tunnel connection, present the secret, then splice the client
    /// stream through.
    pub(crate) async fn proxy(&self, mut client: TcpStream) -> std::io::Result<()> {
        let mut remote = TcpStream::connect(self.endpoint).await?;
        remote.write_all(self.secret.as_bytes()).await?;
        remote.write_all(b"\n").await?;
        copy_bidirectional(&mut client, &mut remote).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_rejected() {
        let config = CoreConfig {
            kind: CoreKind::Tunnel,
            endpoint: Some("192.0.2.9:8443".into()),
            secret: Some(String::new()),
            ..Default::default()
        };
        let err = TunnelCore::start(&config).unwrap_err();
        assert!(matches!(
            err,
            CoreStartError::MissingSetting { setting: "secret", .. }
        ));
    }
}
