// ABOUTME: SessionRegistry — process-wide map from session id to its ConnectionHandle.
// ABOUTME: Idempotent create, lookup, listing, delegated sends, and shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::handle::ConnectionHandle;
use super::lifecycle::Lifecycle;
use super::state::LifecycleState;
use crate::error::{BridgeError, Result, validate_session_id};
use crate::transport::DeliveryReceipt;

/// One registered session as reported to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub state: LifecycleState,
    pub generation: u64,
}

/// Owns every session's handle. Built once at startup and shared by `Arc`.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<ConnectionHandle>>>,
    lifecycle: Arc<Lifecycle>,
    /// Set by `shutdown`; only changed while `sessions` is locked.
    closed: AtomicBool,
}

impl SessionRegistry {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            lifecycle: Arc::new(lifecycle),
            closed: AtomicBool::new(false),
        }
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// Create a session, or return the live handle already registered for `id`.
    ///
    /// A dormant handle (logged out, or reconnect given up) is restarted in
    /// place. Errors while opening the first connection are returned to the
    /// caller; later failures are handled by the session's supervisor.
    pub async fn create_session(&self, id: &str) -> Result<Arc<ConnectionHandle>> {
        validate_session_id(id)?;

        let (handle, fresh) = {
            let mut sessions = self.sessions.lock().await;
            if self.closed.load(Ordering::SeqCst) {
                return Err(BridgeError::ShuttingDown);
            }
            match sessions.get(id) {
                Some(existing) if !existing.claim() => {
                    warn!(session = %id, state = %existing.state(), "session is already active");
                    return Ok(Arc::clone(existing));
                }
                Some(existing) => {
                    info!(session = %id, previous = %existing.state(), "restarting dormant session");
                    (Arc::clone(existing), false)
                }
                None => {
                    let handle = Arc::new(ConnectionHandle::new(id));
                    handle.claim();
                    sessions.insert(id.to_string(), Arc::clone(&handle));
                    (handle, true)
                }
            }
        };

        if !fresh {
            handle.set_state(LifecycleState::Disconnected);
        }

        match self.lifecycle.establish(&handle).await {
            Ok(events) => {
                let sessions = self.sessions.lock().await;
                if self.closed.load(Ordering::SeqCst) {
                    drop(sessions);
                    warn!(session = %id, "registry shut down while the session was opening");
                    handle.stop().await;
                    return Err(BridgeError::ShuttingDown);
                }
                handle.spawn_supervisor(
                    Arc::clone(&self.lifecycle).supervise(Arc::clone(&handle), events),
                );
                drop(sessions);
                info!(session = %id, "session created");
                Ok(handle)
            }
            Err(e) => {
                handle.release();
                if fresh {
                    let mut sessions = self.sessions.lock().await;
                    if sessions.get(id).is_some_and(|h| Arc::ptr_eq(h, &handle)) {
                        sessions.remove(id);
                    }
                }
                Err(e)
            }
        }
    }

    pub async fn get(&self, id: &str) -> Option<Arc<ConnectionHandle>> {
        self.sessions.lock().await.get(id).cloned()
    }

    /// Registered session ids, sorted, whatever their state.
    pub async fn list_active(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Id, state, and generation of every registered session, sorted by id.
    pub async fn snapshot(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .lock()
            .await
            .values()
            .map(|h| SessionSummary {
                id: h.id().to_string(),
                state: h.state(),
                generation: h.generation(),
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// Send a text message through a session's current connection.
    ///
    /// A reconnecting session still attempts delivery; whatever the transport
    /// reports is returned.
    pub async fn send(&self, id: &str, to: &str, text: &str) -> Result<DeliveryReceipt> {
        let handle = self
            .get(id)
            .await
            .ok_or_else(|| BridgeError::SessionNotFound(id.to_string()))?;
        let client = handle.client().ok_or_else(|| {
            BridgeError::Transport(format!("session {id} has no open connection"))
        })?;
        debug!(session = %id, to, state = %handle.state(), "sending message");
        client.send_text(to, text).await
    }

    /// Stop every supervisor, close every client, and empty the registry.
    ///
    /// Creates still opening their first connection are stopped by their
    /// caller; creates after this point fail with `ShuttingDown`.
    pub async fn shutdown(&self) {
        let handles: Vec<Arc<ConnectionHandle>> = {
            let mut sessions = self.sessions.lock().await;
            self.closed.store(true, Ordering::SeqCst);
            sessions.drain().map(|(_, handle)| handle).collect()
        };
        let count = handles.len();
        for handle in handles {
            handle.stop().await;
        }
        info!(count, "sessions shut down");
    }
}
