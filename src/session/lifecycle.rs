// ABOUTME: Per-session connection lifecycle — establishment sequence and the supervisor loop.
// ABOUTME: The supervisor pumps transport events, persists credentials, and reconnects on close.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::handle::ConnectionHandle;
use super::policy::{CloseDecision, decide_on_close};
use super::state::LifecycleState;
use crate::config::{FailurePolicy, ReconnectConfig, TransportConfig};
use crate::credentials::CredentialStore;
use crate::error::{BridgeError, Result};
use crate::ingest::MessageIngestSink;
use crate::qr::QrRenderer;
use crate::transport::{ConnectOptions, DisconnectReason, TransportEvent, TransportFactory};

type EventStream = mpsc::UnboundedReceiver<TransportEvent>;

/// Bundled collaborators for the lifecycle.
pub struct LifecycleParams {
    pub transport: Arc<dyn TransportFactory>,
    pub store: Arc<dyn CredentialStore>,
    pub renderer: Arc<dyn QrRenderer>,
    pub sink: MessageIngestSink,
    pub transport_config: TransportConfig,
    pub reconnect: ReconnectConfig,
}

/// Drives sessions through pairing, connection, and recovery.
pub struct Lifecycle {
    transport: Arc<dyn TransportFactory>,
    store: Arc<dyn CredentialStore>,
    renderer: Arc<dyn QrRenderer>,
    sink: MessageIngestSink,
    transport_config: TransportConfig,
    reconnect: ReconnectConfig,
}

impl Lifecycle {
    pub fn new(params: LifecycleParams) -> Self {
        Self {
            transport: params.transport,
            store: params.store,
            renderer: params.renderer,
            sink: params.sink,
            transport_config: params.transport_config,
            reconnect: params.reconnect,
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Load credentials, resolve the protocol version, and open a connection,
    /// installing its client on the handle.
    pub async fn establish(&self, handle: &ConnectionHandle) -> Result<EventStream> {
        let session_id = handle.id();
        let auth = self.store.load(session_id).await?;
        let version = self.transport.resolve_version().await?;
        debug!(
            session = %session_id,
            %version,
            paired = auth.is_paired(),
            "opening transport"
        );

        let connection = self
            .transport
            .open(ConnectOptions {
                session_id: session_id.to_string(),
                auth,
                version,
                browser: self.transport_config.browser.clone(),
                sync_full_history: self.transport_config.sync_full_history,
                mark_online_on_connect: self.transport_config.mark_online_on_connect,
            })
            .await?;

        let generation = handle.install_client(connection.client);
        debug!(session = %session_id, generation, "transport client installed");
        Ok(connection.events)
    }

    /// Run a session until it is logged out or re-establishment is given up.
    ///
    /// Each close is handled here, in a loop, so exactly one re-establishment
    /// happens per close and the next connection's events are only read once
    /// it is open.
    pub async fn supervise(self: Arc<Self>, handle: Arc<ConnectionHandle>, mut events: EventStream) {
        let session_id = handle.id().to_string();
        loop {
            let reason = self.pump(&handle, &mut events).await;

            match decide_on_close(reason, &self.reconnect) {
                CloseDecision::Terminate => {
                    handle.set_state(LifecycleState::Terminated);
                    let err = BridgeError::LoggedOut {
                        session_id: session_id.clone(),
                        location: self.store.location(&session_id).display().to_string(),
                    };
                    error!(session = %session_id, error = %err, "session terminated");
                    break;
                }
                CloseDecision::ResetAndReconnect => {
                    warn!(session = %session_id, "bad session; clearing stored credentials before pairing again");
                    if let Err(e) = self.store.clear(&session_id).await {
                        error!(session = %session_id, error = %e, "failed to clear credentials");
                    }
                }
                CloseDecision::Reconnect => {}
            }

            handle.set_state(LifecycleState::Reconnecting);
            info!(session = %session_id, %reason, "reconnecting session");
            if self.reconnect.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.reconnect.delay_ms)).await;
            }

            match self.reestablish(&handle).await {
                Some(next) => events = next,
                None => break,
            }
        }
        handle.release();
    }

    /// Re-run the establishment sequence, applying the failure policy.
    async fn reestablish(&self, handle: &ConnectionHandle) -> Option<EventStream> {
        loop {
            match self.establish(handle).await {
                Ok(events) => return Some(events),
                Err(e) => match self.reconnect.on_failure {
                    FailurePolicy::GiveUp => {
                        handle.set_state(LifecycleState::Disconnected);
                        error!(
                            session = %handle.id(),
                            error = %e,
                            "reconnect failed; session stays disconnected until it is created again"
                        );
                        return None;
                    }
                    FailurePolicy::Retry => {
                        warn!(
                            session = %handle.id(),
                            error = %e,
                            retry_in_ms = self.reconnect.failure_retry_delay_ms,
                            "reconnect failed; retrying"
                        );
                        tokio::time::sleep(Duration::from_millis(
                            self.reconnect.failure_retry_delay_ms,
                        ))
                        .await;
                    }
                },
            }
        }
    }

    /// Handle events until the connection closes. Returns the close reason.
    async fn pump(&self, handle: &ConnectionHandle, events: &mut EventStream) -> DisconnectReason {
        let session_id = handle.id();
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::PairingChallenge(payload) => {
                    handle.set_state(LifecycleState::PairingRequired);
                    match self.renderer.render(&payload) {
                        Ok(qr) => info!(session = %session_id, "pairing required; scan the QR code\n{qr}"),
                        Err(e) => warn!(
                            session = %session_id,
                            error = %e,
                            payload = %payload,
                            "pairing required but the QR code could not be rendered"
                        ),
                    }
                }
                TransportEvent::Connected => {
                    handle.set_state(LifecycleState::Connected);
                    info!(session = %session_id, generation = handle.generation(), "session connected");
                }
                TransportEvent::CredentialsUpdated(update) => {
                    if let Err(e) = self.store.save(session_id, &update).await {
                        warn!(session = %session_id, error = %e, "failed to persist credentials");
                    }
                }
                TransportEvent::Messages { kind, messages } => {
                    for raw in &messages {
                        self.sink.ingest(session_id, kind, raw);
                    }
                }
                TransportEvent::Closed { reason, detail } => {
                    warn!(
                        session = %session_id,
                        %reason,
                        detail = detail.as_deref(),
                        "session disconnected"
                    );
                    return reason;
                }
            }
        }
        warn!(session = %session_id, "transport event stream ended without a close event");
        DisconnectReason::Unknown
    }
}
