// ABOUTME: Credential storage — the CredentialStore trait and its directory-per-session implementation.
// ABOUTME: A namespace's presence on disk means a session to restore at startup.

pub mod file;
pub mod types;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;

pub use file::FileCredentialStore;
pub use types::{AuthState, CredentialUpdate};

/// Persistence for per-session auth material.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Session ids that have a namespace, sorted.
    async fn list_namespaces(&self) -> Result<Vec<String>>;

    /// Load a namespace, creating it when missing. Malformed content is an error.
    async fn load(&self, session_id: &str) -> Result<AuthState>;

    /// Persist a credential delta for a namespace.
    async fn save(&self, session_id: &str, update: &CredentialUpdate) -> Result<()>;

    /// Remove a namespace and everything in it.
    async fn clear(&self, session_id: &str) -> Result<()>;

    /// Where a namespace lives, for operator-facing messages.
    fn location(&self, session_id: &str) -> PathBuf;
}
