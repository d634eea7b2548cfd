//! End-to-end hot reload: file change → watcher → restart protocol.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use proxy_agent::config::schema::{CoreKind, DnsOverrides};
use proxy_agent::config::watcher::ConfigWatcher;
use proxy_agent::config::loader::load_config;
use proxy_agent::lifecycle::orchestrator::Orchestrator;

const INITIAL: &str = r#"
watch = true

[core]
kind = "relay"
upstream = "127.0.0.1:1"

[[nodes]]
name = "n1"
listen = "127.0.0.1:0"
"#;

const UPDATED: &str = r#"
watch = true

[core]
kind = "tunnel"
endpoint = "127.0.0.1:1"
secret = "reload-secret"

[[nodes]]
name = "n1"
listen = "127.0.0.1:0"

[[nodes]]
name = "n3"
listen = "127.0.0.1:0"
"#;

#[tokio::test]
async fn file_change_drives_restart() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(INITIAL.as_bytes()).unwrap();
    file.flush().unwrap();

    let dns = DnsOverrides::default();
    let config = load_config(file.path(), &dns).unwrap();
    let orchestrator = Arc::new(Orchestrator::start(&config).await.unwrap());
    assert_eq!(orchestrator.current_kind(), Some(CoreKind::Relay));

    let (watcher, mut snapshots) = ConfigWatcher::new(file.path(), dns);
    let _watch_handle = watcher.run().unwrap();

    let reload_task = {
        let orch = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                let _ = orch.reload(snapshot).await;
            }
        })
    };

    // Rewrite the config; the watcher should pick it up and the orchestrator
    // should swap to the tunnel core.
    std::fs::write(file.path(), UPDATED).unwrap();

    let mut swapped = false;
    for _ in 0..100 {
        if orchestrator.current_kind() == Some(CoreKind::Tunnel) {
            swapped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(swapped, "watcher never drove the restart");
    assert_eq!(orchestrator.live_node_names(), vec!["n1", "n3"]);

    orchestrator.shutdown_with_timeout(Duration::from_millis(200)).await;
    reload_task.abort();
}

#[tokio::test]
async fn unparseable_rewrite_never_reaches_orchestrator() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(INITIAL.as_bytes()).unwrap();
    file.flush().unwrap();

    let dns = DnsOverrides::default();
    let (watcher, mut snapshots) = ConfigWatcher::new(file.path(), dns);
    let _watch_handle = watcher.run().unwrap();

    std::fs::write(file.path(), "this is [ not toml").unwrap();

    // The watcher drops the broken snapshot; nothing arrives.
    let received = tokio::time::timeout(Duration::from_secs(3), snapshots.recv()).await;
    assert!(received.is_err(), "broken config should have been dropped");
}

#[test]
fn watching_missing_file_fails_setup() {
    let (watcher, _rx) = ConfigWatcher::new(
        std::path::Path::new("/nonexistent/proxy-agent.toml"),
        DnsOverrides::default(),
    );
    assert!(watcher.run().is_err());
}
