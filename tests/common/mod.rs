//! Shared fixtures for integration tests.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use proxy_agent::config::schema::{AgentConfig, CoreConfig, CoreKind, NodeConfig};

/// Build a relay-core config with the given nodes.
pub fn relay_config(upstream: &str, nodes: &[(&str, &str)]) -> AgentConfig {
    AgentConfig {
        core: CoreConfig {
            kind: CoreKind::Relay,
            upstream: Some(upstream.into()),
            ..Default::default()
        },
        nodes: node_list(nodes),
        ..Default::default()
    }
}

/// Build a tunnel-core config with the given nodes.
pub fn tunnel_config(endpoint: &str, nodes: &[(&str, &str)]) -> AgentConfig {
    AgentConfig {
        core: CoreConfig {
            kind: CoreKind::Tunnel,
            endpoint: Some(endpoint.into()),
            secret: Some("integration-secret".into()),
            ..Default::default()
        },
        nodes: node_list(nodes),
        ..Default::default()
    }
}

fn node_list(nodes: &[(&str, &str)]) -> Vec<NodeConfig> {
    nodes
        .iter()
        .map(|(name, listen)| NodeConfig {
            name: (*name).into(),
            listen: (*listen).into(),
            max_connections: 16,
        })
        .collect()
}

/// Start an upstream that echoes whatever it receives, returning its address.
#[allow(dead_code)]
pub async fn start_echo_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        while let Ok(n) = socket.read(&mut buf).await {
                            if n == 0 {
                                break;
                            }
                            if socket.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
