//! TCP relay backend: forwards every dispatched stream to a fixed upstream.

use std::net::SocketAddr;

use tokio::io::copy_bidirectional;
use tokio::net::TcpStream;

use crate::config::schema::{CoreConfig, CoreKind};
use crate::core::CoreStartError;

/// Relay transport core.
///
/// Holds only the validated upstream address; each dispatched stream dials
/// the upstream on its own task.
#[derive(Debug)]
pub struct RelayCore {
    upstream: SocketAddr,
    /// DNS fragment content, kept for the backend's resolver. Unused until a
    /// stream needs name resolution, but its absence must fail at start.
    _dns_fragment: Option<String>,
}

impl RelayCore {
    pub(crate) fn start(config: &CoreConfig) -> Result<Self, CoreStartError> {
        let raw = config
            .upstream
            .as_deref()
            .ok_or(CoreStartError::MissingSetting {
                kind: CoreKind::Relay,
                setting: "upstream",
            })?;

        let upstream: SocketAddr = raw.parse().map_err(|e| CoreStartError::InvalidSetting {
            kind: CoreKind::Relay,
            setting: "upstream",
            reason: format!("{}", e),
        })?;

        let dns_fragment = super::load_dns_fragment(config)?;

        Ok(Self {
            upstream,
            _dns_fragment: dns_fragment,
        })
    }

    /// Forward one client stream to the upstream until either side closes.
    pub(crate) async fn proxy(&self, mut client: TcpStream) -> std::io::Result<()> {
        let mut upstream = TcpStream::connect(self.upstream).await?;
        copy_bidirectional(&mut client, &mut upstream).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_upstream_address_rejected() {
        let config = CoreConfig {
            kind: CoreKind::Relay,
            upstream: Some("not-an-address".into()),
            ..Default::default()
        };
        let err = RelayCore::start(&config).unwrap_err();
        assert!(matches!(
            err,
            CoreStartError::InvalidSetting { setting: "upstream", .. }
        ));
    }
}
