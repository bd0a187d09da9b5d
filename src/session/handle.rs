// ABOUTME: ConnectionHandle — the registry's per-session slot holding the current client and state.
// ABOUTME: The client is swapped in place on reconnect; the handle itself lives until shutdown.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::state::LifecycleState;
use crate::transport::TransportClient;

pub struct ConnectionHandle {
    id: String,
    state: watch::Sender<LifecycleState>,
    client: RwLock<Option<Arc<dyn TransportClient>>>,
    generation: AtomicU64,
    /// Set while a lifecycle is starting or its supervisor is running.
    active: AtomicBool,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionHandle {
    pub(crate) fn new(id: &str) -> Self {
        let (state, _) = watch::channel(LifecycleState::Disconnected);
        Self {
            id: id.to_string(),
            state,
            client: RwLock::new(None),
            generation: AtomicU64::new(0),
            active: AtomicBool::new(false),
            supervisor: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Number of transport clients opened for this handle so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// The current transport client, if one was ever opened.
    pub fn client(&self) -> Option<Arc<dyn TransportClient>> {
        self.client.read().expect("client lock poisoned").clone()
    }

    /// Whether a lifecycle is running. Dormant handles (logged out, or given up)
    /// are restarted by an explicit create.
    pub fn is_live(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait until the handle reaches `target`. Returns false on timeout.
    pub async fn wait_for_state(&self, target: LifecycleState, timeout: Duration) -> bool {
        let mut rx = self.subscribe();
        matches!(
            tokio::time::timeout(timeout, rx.wait_for(|s| *s == target)).await,
            Ok(Ok(_))
        )
    }

    pub(crate) fn set_state(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(session = %self.id, from = %previous, to = %next, "lifecycle transition");
        }
    }

    /// Replace the transport client and return the new generation.
    pub(crate) fn install_client(&self, client: Arc<dyn TransportClient>) -> u64 {
        *self.client.write().expect("client lock poisoned") = Some(client);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Claim the right to start a lifecycle. False if one is already running.
    pub(crate) fn claim(&self) -> bool {
        !self.active.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn release(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Spawn the session's supervisor and keep its handle for `stop`.
    ///
    /// The slot stays locked from spawn to store, so a later lifecycle on the
    /// same handle always stores after this one.
    pub(crate) fn spawn_supervisor<F>(&self, supervisor: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.supervisor.lock().expect("supervisor lock poisoned");
        *slot = Some(tokio::spawn(supervisor));
    }

    #[cfg(test)]
    fn has_supervisor(&self) -> bool {
        self.supervisor
            .lock()
            .expect("supervisor lock poisoned")
            .is_some()
    }

    /// Stop the supervisor and close the client. Used on shutdown.
    pub(crate) async fn stop(&self) {
        if let Some(task) = self.supervisor.lock().expect("supervisor lock poisoned").take() {
            task.abort();
        }
        let client = self.client.write().expect("client lock poisoned").take();
        if let Some(client) = client {
            client.close().await;
        }
        self.release();
        self.set_state(LifecycleState::Disconnected);
    }
}
