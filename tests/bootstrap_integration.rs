// ABOUTME: Integration tests for restoring stored sessions at startup.
// ABOUTME: Builds credential roots on disk and checks which sessions come back.

use std::sync::Arc;

use wabridge::bootstrap::restore_sessions;
use wabridge::config::{ReconnectConfig, TransportConfig};
use wabridge::credentials::{CredentialStore, FileCredentialStore};
use wabridge::ingest::MessageIngestSink;
use wabridge::qr::TerminalQrRenderer;
use wabridge::session::{Lifecycle, LifecycleParams, SessionRegistry};
use wabridge::transport::{MemoryController, MemoryTransport};

fn registry(root: &std::path::Path) -> (SessionRegistry, MemoryController) {
    let (transport, controller) = MemoryTransport::new();
    let lifecycle = Lifecycle::new(LifecycleParams {
        transport: Arc::new(transport),
        store: Arc::new(FileCredentialStore::new(root)),
        renderer: Arc::new(TerminalQrRenderer),
        sink: MessageIngestSink::new(),
        transport_config: TransportConfig::default(),
        reconnect: ReconnectConfig::default(),
    });
    (SessionRegistry::new(lifecycle), controller)
}

#[tokio::test]
async fn restores_good_sessions_and_reports_bad_ones() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("a")).unwrap();
    std::fs::write(
        dir.path().join("a").join("creds.json"),
        r#"{"me":{"id":"a@memory"},"registered":true}"#,
    )
    .unwrap();
    std::fs::create_dir_all(dir.path().join("b")).unwrap();
    std::fs::write(dir.path().join("b").join("creds.json"), "{not json").unwrap();

    let (registry, controller) = registry(dir.path());
    let report = restore_sessions(&registry, registry.lifecycle().store()).await;

    assert_eq!(report.restored, vec!["a".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].session_id, "b");
    assert_eq!(registry.list_active().await, vec!["a".to_string()]);
    assert_eq!(controller.paired_on_open("a"), vec![true]);
    assert_eq!(controller.open_count("b"), 0);
}

#[tokio::test]
async fn stray_files_in_root_are_not_sessions() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
    std::fs::create_dir_all(dir.path().join("fresh")).unwrap();

    let (registry, controller) = registry(dir.path());
    let report = restore_sessions(&registry, registry.lifecycle().store()).await;

    assert_eq!(report.restored, vec!["fresh".to_string()]);
    assert!(report.failed.is_empty());
    assert_eq!(controller.paired_on_open("fresh"), vec![false]);
}

#[tokio::test]
async fn missing_root_restores_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("does-not-exist");

    let (registry, controller) = registry(&root);
    let store: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::new(&root));
    let report = restore_sessions(&registry, &store).await;

    assert!(report.restored.is_empty());
    assert!(report.failed.is_empty());
    assert!(registry.list_active().await.is_empty());
    assert_eq!(controller.open_count("anything"), 0);
}
