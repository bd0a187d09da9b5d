// ABOUTME: App orchestrator — wires the credential store, transport, registry, and HTTP server.
// ABOUTME: Restores stored sessions, serves until Ctrl+C, then shuts every session down.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::bootstrap;
use crate::config::Config;
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::http::{self, HttpState};
use crate::ingest::MessageIngestSink;
use crate::qr::TerminalQrRenderer;
use crate::session::{Lifecycle, LifecycleParams, SessionRegistry};
use crate::transport::{MemoryTransport, TransportFactory};

/// Top-level application that orchestrates all subsystems.
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Build the registry from config. The driver name was checked by `Config::validate`.
    fn build_registry(&self) -> SessionRegistry {
        let store: Arc<dyn CredentialStore> =
            Arc::new(FileCredentialStore::new(&self.config.credentials.root));

        let (memory, _controller) = MemoryTransport::new();
        warn!(
            driver = %self.config.transport.driver,
            "no network driver is linked; sessions use the in-process transport"
        );
        let transport: Arc<dyn TransportFactory> = Arc::new(memory);

        SessionRegistry::new(Lifecycle::new(LifecycleParams {
            transport,
            store,
            renderer: Arc::new(TerminalQrRenderer),
            sink: MessageIngestSink::new(),
            transport_config: self.config.transport.clone(),
            reconnect: self.config.reconnect.clone(),
        }))
    }

    /// Run the bridge: restore sessions, then serve HTTP until Ctrl+C.
    pub async fn run(self) -> anyhow::Result<()> {
        let registry = Arc::new(self.build_registry());
        info!(root = %self.config.credentials.root.display(), "credential store ready");

        let report = bootstrap::restore_sessions(&registry, registry.lifecycle().store()).await;
        if !report.failed.is_empty() {
            warn!(failed = report.failed.len(), "some stored sessions could not be restored");
        }

        let bind = &self.config.server.bind;
        let listener = TcpListener::bind(bind)
            .await
            .with_context(|| format!("failed to bind {bind}"))?;

        let router = http::router(HttpState::new(
            Arc::clone(&registry),
            &self.config.server.token,
        ));
        let served = http::serve(listener, router, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            info!("shutdown requested");
        })
        .await;

        registry.shutdown().await;
        served.context("http server failed")
    }
}
