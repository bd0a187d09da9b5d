// ABOUTME: Close-event decision logic for the session supervisor.
// ABOUTME: Maps a DisconnectReason and the reconnect config to terminate / reconnect / reset.

use crate::config::ReconnectConfig;
use crate::transport::DisconnectReason;

/// What the supervisor does after a connection closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// Logged out: stop for good.
    Terminate,
    /// Re-establish with the stored credentials.
    Reconnect,
    /// Wipe the credential namespace, then re-establish (a new pairing follows).
    ResetAndReconnect,
}

/// Decide how to react to a close.
pub fn decide_on_close(reason: DisconnectReason, config: &ReconnectConfig) -> CloseDecision {
    // Rule 1: logout is terminal regardless of config.
    if reason == DisconnectReason::LoggedOut {
        return CloseDecision::Terminate;
    }

    // Rule 2: a corrupt session can optionally be reset.
    if reason == DisconnectReason::BadSession && config.reset_on_bad_session {
        return CloseDecision::ResetAndReconnect;
    }

    // Rule 3: everything else reconnects.
    CloseDecision::Reconnect
}
