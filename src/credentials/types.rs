// ABOUTME: Auth material types exchanged between the transport and the credential store.
// ABOUTME: AuthState is a loaded namespace; CredentialUpdate is a delta to persist.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything persisted for one session namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthState {
    /// Device identity and tokens. `None` until the session has been paired.
    pub creds: Option<Value>,
    /// Signal keys keyed by their file-safe name.
    #[serde(default)]
    pub keys: BTreeMap<String, Value>,
}

impl AuthState {
    /// Whether the namespace holds credentials that can resume a session without pairing.
    pub fn is_paired(&self) -> bool {
        self.creds.as_ref().is_some_and(|c| !c.is_null())
    }
}

/// A credential change reported by the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialUpdate {
    /// Replacement creds document, if it changed.
    pub creds: Option<Value>,
    /// Key writes; a `None` value deletes the key.
    #[serde(default)]
    pub keys: BTreeMap<String, Option<Value>>,
}

impl CredentialUpdate {
    /// An update that only replaces the creds document.
    pub fn creds(creds: Value) -> Self {
        Self {
            creds: Some(creds),
            keys: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_is_not_paired() {
        assert!(!AuthState::default().is_paired());
        let state = AuthState {
            creds: Some(Value::Null),
            keys: BTreeMap::new(),
        };
        assert!(!state.is_paired());
    }
}
