// ABOUTME: Lifecycle states a session connection moves through.
// ABOUTME: Exactly one is current per handle; Terminated only ends by explicit re-create.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    /// No open connection (initial, or after a failed re-establishment).
    Disconnected,
    /// Waiting for an operator to scan the pairing QR.
    PairingRequired,
    Connected,
    /// The connection closed and a new one is being established.
    Reconnecting,
    /// The device was logged out; credentials are dead.
    Terminated,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::PairingRequired => "pairing-required",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Terminated => "terminated",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde_name() {
        for state in [
            LifecycleState::Disconnected,
            LifecycleState::PairingRequired,
            LifecycleState::Connected,
            LifecycleState::Reconnecting,
            LifecycleState::Terminated,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }
}
