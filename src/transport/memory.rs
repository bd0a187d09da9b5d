// ABOUTME: In-process transport driver with a controller for injecting lifecycle and message events.
// ABOUTME: Used by the binary when no network driver is linked, and as the fake in tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::{Notify, mpsc};
use tracing::debug;

use super::types::{
    ConnectOptions, DeliveryReceipt, DisconnectReason, ProtocolVersion, RawMessage,
    TransportEvent, UpsertKind,
};
use super::{TransportClient, TransportConnection, TransportFactory};
use crate::credentials::CredentialUpdate;
use crate::error::{BridgeError, Result};

/// Version advertised by the in-process driver.
pub const MEMORY_PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion([2, 3000, 1]);

/// A message accepted by a memory connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: String,
    pub to: String,
    pub text: String,
}

#[derive(Default)]
struct SessionSlot {
    opens: usize,
    paired_on_open: Vec<bool>,
    events: Option<mpsc::UnboundedSender<TransportEvent>>,
    closed: Option<Arc<AtomicBool>>,
    sent: Vec<SentMessage>,
}

#[derive(Default)]
struct MemoryState {
    slots: HashMap<String, SessionSlot>,
    refused: HashSet<String>,
    next_message_id: u64,
}

struct Shared {
    state: Mutex<MemoryState>,
    opened: Notify,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory transport state poisoned")
    }
}

/// Transport factory whose connections live entirely in memory.
///
/// Opening a connection emits `PairingChallenge` when the session has no
/// credentials and `Connected` otherwise. Everything after that is driven
/// through the [`MemoryController`].
pub struct MemoryTransport {
    shared: Arc<Shared>,
}

impl MemoryTransport {
    pub fn new() -> (Self, MemoryController) {
        let shared = Arc::new(Shared {
            state: Mutex::new(MemoryState::default()),
            opened: Notify::new(),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            MemoryController { shared },
        )
    }
}

#[async_trait]
impl TransportFactory for MemoryTransport {
    async fn resolve_version(&self) -> Result<ProtocolVersion> {
        Ok(MEMORY_PROTOCOL_VERSION)
    }

    async fn open(&self, options: ConnectOptions) -> Result<TransportConnection> {
        let session_id = options.session_id.clone();
        let paired = options.auth.is_paired();

        let client = {
            let mut state = self.shared.lock();
            if state.refused.contains(&session_id) {
                return Err(BridgeError::Transport(format!(
                    "connection refused for session {session_id}"
                )));
            }

            let slot = state.slots.entry(session_id.clone()).or_default();
            slot.opens += 1;
            slot.paired_on_open.push(paired);

            let (tx, rx) = mpsc::unbounded_channel();
            let first = if paired {
                TransportEvent::Connected
            } else {
                TransportEvent::PairingChallenge(format!("2@{session_id},{}", slot.opens))
            };
            let _ = tx.send(first);
            slot.events = Some(tx);

            let closed = Arc::new(AtomicBool::new(false));
            if let Some(previous) = slot.closed.replace(Arc::clone(&closed)) {
                previous.store(true, Ordering::SeqCst);
            }

            debug!(session = %session_id, opens = slot.opens, paired, "memory connection opened");
            (
                Arc::new(MemoryClient {
                    session_id,
                    closed,
                    shared: Arc::clone(&self.shared),
                }),
                rx,
            )
        };
        self.shared.opened.notify_waiters();

        let (client, events) = client;
        Ok(TransportConnection { client, events })
    }
}

struct MemoryClient {
    session_id: String,
    closed: Arc<AtomicBool>,
    shared: Arc<Shared>,
}

#[async_trait]
impl TransportClient for MemoryClient {
    async fn send_text(&self, to: &str, text: &str) -> Result<DeliveryReceipt> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BridgeError::Transport("connection closed".to_string()));
        }

        let mut state = self.shared.lock();
        state.next_message_id += 1;
        let message_id = format!("MEM{:08X}", state.next_message_id);
        let sent = SentMessage {
            message_id: message_id.clone(),
            to: to.to_string(),
            text: text.to_string(),
        };
        state
            .slots
            .entry(self.session_id.clone())
            .or_default()
            .sent
            .push(sent);

        Ok(DeliveryReceipt {
            message_id,
            to: to.to_string(),
            timestamp: Utc::now(),
        })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Drives memory connections from the outside and inspects what they did.
#[derive(Clone)]
pub struct MemoryController {
    shared: Arc<Shared>,
}

impl MemoryController {
    /// Emit an event on the session's current connection. Returns false if none is open.
    pub fn emit(&self, session_id: &str, event: TransportEvent) -> bool {
        let mut state = self.shared.lock();
        let Some(slot) = state.slots.get_mut(session_id) else {
            return false;
        };
        let closing = matches!(event, TransportEvent::Closed { .. });
        let delivered = slot
            .events
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok());
        if closing {
            slot.events = None;
            if let Some(flag) = &slot.closed {
                flag.store(true, Ordering::SeqCst);
            }
        }
        delivered
    }

    /// Complete pairing: persist fresh credentials and report the connection open.
    pub fn pair(&self, session_id: &str) -> bool {
        let creds = json!({
            "me": { "id": format!("{session_id}@memory") },
            "registered": true,
        });
        self.emit(
            session_id,
            TransportEvent::CredentialsUpdated(CredentialUpdate::creds(creds)),
        ) && self.emit(session_id, TransportEvent::Connected)
    }

    /// Close the session's current connection with `reason`.
    pub fn disconnect(&self, session_id: &str, reason: DisconnectReason) -> bool {
        self.emit(
            session_id,
            TransportEvent::Closed {
                reason,
                detail: None,
            },
        )
    }

    /// Deliver a live plain-text message to the session.
    pub fn deliver_text(&self, session_id: &str, sender: &str, text: &str) -> bool {
        self.emit(
            session_id,
            TransportEvent::Messages {
                kind: UpsertKind::Notify,
                messages: vec![RawMessage::text(sender, text)],
            },
        )
    }

    /// Make every future open for the session fail (or succeed again).
    pub fn refuse_opens(&self, session_id: &str, refuse: bool) {
        let mut state = self.shared.lock();
        if refuse {
            state.refused.insert(session_id.to_string());
        } else {
            state.refused.remove(session_id);
        }
    }

    /// How many connections have been opened for the session.
    pub fn open_count(&self, session_id: &str) -> usize {
        self.shared
            .lock()
            .slots
            .get(session_id)
            .map_or(0, |slot| slot.opens)
    }

    /// For each open, whether the session already had credentials.
    pub fn paired_on_open(&self, session_id: &str) -> Vec<bool> {
        self.shared
            .lock()
            .slots
            .get(session_id)
            .map(|slot| slot.paired_on_open.clone())
            .unwrap_or_default()
    }

    /// Messages sent through the session's connections.
    pub fn sent(&self, session_id: &str) -> Vec<SentMessage> {
        self.shared
            .lock()
            .slots
            .get(session_id)
            .map(|slot| slot.sent.clone())
            .unwrap_or_default()
    }

    /// Wait until at least `count` connections were opened for the session.
    pub async fn wait_for_opens(&self, session_id: &str, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let opened = self.shared.opened.notified();
            if self.open_count(session_id) >= count {
                return true;
            }
            if tokio::time::timeout_at(deadline, opened).await.is_err() {
                return self.open_count(session_id) >= count;
            }
        }
    }
}
