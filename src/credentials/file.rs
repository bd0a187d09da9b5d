// ABOUTME: Multi-file credential store — one directory per session under a fixed root.
// ABOUTME: creds.json plus one JSON file per key, written atomically and serialized per session.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};

use super::types::{AuthState, CredentialUpdate};
use super::CredentialStore;
use crate::error::{BridgeError, Result, validate_session_id};

const CREDS_FILE: &str = "creds.json";

/// File name used for a key; `/` and `:` are not safe in file names.
pub fn key_file_name(key: &str) -> String {
    format!("{}.json", key.replace('/', "__").replace(':', "-"))
}

/// Stores each session's auth material in `<root>/<session_id>/`.
pub struct FileCredentialStore {
    root: PathBuf,
    write_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileCredentialStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    fn namespace_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    fn write_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.write_locks.lock().expect("write lock table poisoned");
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(root = %self.root.display(), "credential root does not exist yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!(name = ?raw, "skipping credential namespace with non-UTF-8 name"),
            }
        }
        names.sort();
        Ok(names)
    }

    async fn load(&self, session_id: &str) -> Result<AuthState> {
        validate_session_id(session_id)?;
        let dir = self.namespace_dir(session_id);
        fs::create_dir_all(&dir).await?;

        let mut state = AuthState::default();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };

            let bytes = fs::read(&path).await?;
            let value: Value =
                serde_json::from_slice(&bytes).map_err(|e| BridgeError::Credentials {
                    session_id: session_id.to_string(),
                    message: format!("{}: {e}", path.display()),
                })?;

            if name == CREDS_FILE {
                state.creds = Some(value);
            } else {
                state.keys.insert(stem.to_string(), value);
            }
        }

        if state.creds.as_ref().is_some_and(|c| !c.is_object()) {
            return Err(BridgeError::Credentials {
                session_id: session_id.to_string(),
                message: format!("{CREDS_FILE} is not a JSON object"),
            });
        }

        Ok(state)
    }

    async fn save(&self, session_id: &str, update: &CredentialUpdate) -> Result<()> {
        validate_session_id(session_id)?;
        let lock = self.write_lock(session_id);
        let _guard = lock.lock().await;

        let dir = self.namespace_dir(session_id);
        fs::create_dir_all(&dir).await?;

        if let Some(creds) = &update.creds {
            write_atomic(&dir.join(CREDS_FILE), creds).await?;
        }
        for (key, value) in &update.keys {
            let path = dir.join(key_file_name(key));
            match value {
                Some(v) => write_atomic(&path, v).await?,
                None => match fs::remove_file(&path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                },
            }
        }
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        validate_session_id(session_id)?;
        let lock = self.write_lock(session_id);
        let _guard = lock.lock().await;

        match fs::remove_dir_all(self.namespace_dir(session_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self, session_id: &str) -> PathBuf {
        self.namespace_dir(session_id)
    }
}

/// Write JSON via a temporary file and rename so readers never see partial content.
async fn write_atomic(path: &Path, value: &Value) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    let content = serde_json::to_vec_pretty(value)?;
    fs::write(&tmp_path, &content).await?;
    fs::rename(&tmp_path, path).await?;
    Ok(())
}
