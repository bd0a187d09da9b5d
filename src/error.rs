// ABOUTME: Error taxonomy for the session orchestrator.
// ABOUTME: BridgeError covers registry, credential, transport, and rendering failures.

use thiserror::Error;

/// Errors surfaced by the session registry and its collaborators.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The session id cannot be used as a credential namespace.
    #[error("invalid session id '{0}'")]
    InvalidSessionId(String),

    /// An operation referenced a session that is not registered.
    #[error("session {0} does not exist")]
    SessionNotFound(String),

    /// The transport invalidated the session's credentials.
    #[error("session {session_id} logged out; delete {location} to pair again")]
    LoggedOut { session_id: String, location: String },

    /// The credential namespace could not be read or parsed.
    #[error("credentials for session {session_id} are unusable: {message}")]
    Credentials { session_id: String, message: String },

    /// The registry was shut down; no new sessions are started.
    #[error("session registry is shutting down")]
    ShuttingDown,

    /// The transport refused or failed an operation.
    #[error("transport error: {0}")]
    Transport(String),

    /// The pairing challenge could not be rendered.
    #[error("failed to render pairing challenge: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Validate that a session id is usable as a single directory name.
pub fn validate_session_id(id: &str) -> Result<()> {
    let bad = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\', '\0']);
    if bad {
        return Err(BridgeError::InvalidSessionId(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ids_are_valid() {
        assert!(validate_session_id("sales").is_ok());
        assert!(validate_session_id("5491122334455").is_ok());
        assert!(validate_session_id("team.support-2").is_ok());
    }

    #[test]
    fn path_like_ids_are_rejected() {
        for id in ["", ".", "..", "a/b", "..\\x", "nul\0"] {
            assert!(
                matches!(validate_session_id(id), Err(BridgeError::InvalidSessionId(_))),
                "{id:?} should be rejected"
            );
        }
    }

    #[test]
    fn logged_out_message_names_location() {
        let err = BridgeError::LoggedOut {
            session_id: "a".to_string(),
            location: "./auth/a".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "session a logged out; delete ./auth/a to pair again"
        );
    }
}
