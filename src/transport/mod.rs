// ABOUTME: Transport boundary — the factory/client traits a protocol driver implements.
// ABOUTME: A connection hands back its client plus the event stream the session supervisor consumes.

pub mod memory;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

pub use memory::{MemoryController, MemoryTransport};
pub use types::*;

/// One open connection to the messaging network.
#[async_trait]
pub trait TransportClient: Send + Sync {
    /// Send a text message to `to` (a chat id).
    async fn send_text(&self, to: &str, text: &str) -> Result<DeliveryReceipt>;

    /// Close the connection without logging the device out.
    async fn close(&self);
}

/// Opens transport connections.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Resolve the protocol version to advertise for the next connection.
    async fn resolve_version(&self) -> Result<ProtocolVersion>;

    /// Open a connection. Its events arrive on the returned stream.
    async fn open(&self, options: ConnectOptions) -> Result<TransportConnection>;
}

/// A freshly opened connection.
pub struct TransportConnection {
    pub client: Arc<dyn TransportClient>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}
