// ABOUTME: Types crossing the transport boundary — lifecycle events, close reasons, receipts.
// ABOUTME: RawMessage mirrors the transport's inbound message shape closely enough to extract text.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credentials::{AuthState, CredentialUpdate};

/// Why a transport connection closed, classified from its status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The user unlinked the device; credentials are permanently invalid.
    LoggedOut,
    Forbidden,
    /// Network loss or a timed-out connection (including an expired QR).
    ConnectionLost,
    MultideviceMismatch,
    ConnectionClosed,
    /// Another client opened the same session.
    ConnectionReplaced,
    /// Stored session state could not be decrypted.
    BadSession,
    UnavailableService,
    RestartRequired,
    Other(u16),
    /// No status code was reported, e.g. the event stream ended.
    Unknown,
}

impl DisconnectReason {
    pub fn from_code(code: Option<u16>) -> Self {
        match code {
            Some(401) => Self::LoggedOut,
            Some(403) => Self::Forbidden,
            Some(408) => Self::ConnectionLost,
            Some(411) => Self::MultideviceMismatch,
            Some(428) => Self::ConnectionClosed,
            Some(440) => Self::ConnectionReplaced,
            Some(500) => Self::BadSession,
            Some(503) => Self::UnavailableService,
            Some(515) => Self::RestartRequired,
            Some(other) => Self::Other(other),
            None => Self::Unknown,
        }
    }

    pub fn code(self) -> Option<u16> {
        match self {
            Self::LoggedOut => Some(401),
            Self::Forbidden => Some(403),
            Self::ConnectionLost => Some(408),
            Self::MultideviceMismatch => Some(411),
            Self::ConnectionClosed => Some(428),
            Self::ConnectionReplaced => Some(440),
            Self::BadSession => Some(500),
            Self::UnavailableService => Some(503),
            Self::RestartRequired => Some(515),
            Self::Other(code) => Some(code),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(code) => write!(f, "{code} ({self:?})"),
            None => write!(f, "unknown"),
        }
    }
}

/// Key identifying an inbound message and its chat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    pub remote_jid: Option<String>,
    #[serde(default)]
    pub from_me: bool,
    pub id: Option<String>,
}

/// Rich-text message body (links, quotes, mentions).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedTextMessage {
    pub text: Option<String>,
}

/// Message content. Only the text-bearing variants are modelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContent {
    pub conversation: Option<String>,
    pub extended_text_message: Option<ExtendedTextMessage>,
}

/// An inbound message as delivered by the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    pub key: MessageKey,
    pub push_name: Option<String>,
    pub message: Option<MessageContent>,
}

impl RawMessage {
    /// A plain-text message from `sender`.
    pub fn text(sender: &str, text: &str) -> Self {
        Self {
            key: MessageKey {
                remote_jid: Some(sender.to_string()),
                ..MessageKey::default()
            },
            push_name: None,
            message: Some(MessageContent {
                conversation: Some(text.to_string()),
                extended_text_message: None,
            }),
        }
    }
}

/// How a batch of messages reached the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertKind {
    /// New messages arriving live.
    Notify,
    /// Messages replayed from history sync.
    Append,
}

/// Everything a transport connection reports to its session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A QR payload the operator must scan to pair the device.
    PairingChallenge(String),
    /// Authentication succeeded and the connection is open.
    Connected,
    /// Auth material changed and must be persisted.
    CredentialsUpdated(CredentialUpdate),
    /// Inbound messages.
    Messages {
        kind: UpsertKind,
        messages: Vec<RawMessage>,
    },
    /// The connection closed. No further events follow.
    Closed {
        reason: DisconnectReason,
        detail: Option<String>,
    },
}

/// Protocol version the client advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion(pub [u32; 3]);

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, patch] = self.0;
        write!(f, "{major}.{minor}.{patch}")
    }
}

/// Device description shown in the paired-devices list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserInfo {
    pub platform: String,
    pub browser: String,
    pub version: String,
}

impl Default for BrowserInfo {
    fn default() -> Self {
        Self {
            platform: "Chrome".to_string(),
            browser: "Linux".to_string(),
            version: "10.0".to_string(),
        }
    }
}

/// Everything needed to open one connection for a session.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub session_id: String,
    pub auth: AuthState,
    pub version: ProtocolVersion,
    pub browser: BrowserInfo,
    pub sync_full_history: bool,
    pub mark_online_on_connect: bool,
}

/// Result of a successful outbound send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub message_id: String,
    pub to: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_classify() {
        assert_eq!(DisconnectReason::from_code(Some(401)), DisconnectReason::LoggedOut);
        assert_eq!(DisconnectReason::from_code(Some(408)), DisconnectReason::ConnectionLost);
        assert_eq!(DisconnectReason::from_code(Some(500)), DisconnectReason::BadSession);
        assert_eq!(DisconnectReason::from_code(Some(515)), DisconnectReason::RestartRequired);
        assert_eq!(DisconnectReason::from_code(Some(499)), DisconnectReason::Other(499));
        assert_eq!(DisconnectReason::from_code(None), DisconnectReason::Unknown);
    }

    #[test]
    fn codes_survive_classification() {
        for code in [401, 403, 408, 411, 428, 440, 500, 503, 515, 999] {
            assert_eq!(DisconnectReason::from_code(Some(code)).code(), Some(code));
        }
    }

    #[test]
    fn raw_message_parses_transport_json() {
        let json = r#"{
            "key": {"remoteJid": "5491100000000@s.whatsapp.net", "fromMe": false, "id": "ABC"},
            "pushName": "Ana",
            "message": {"extendedTextMessage": {"text": "see https://example.com"}}
        }"#;
        let msg: RawMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.key.remote_jid.as_deref(), Some("5491100000000@s.whatsapp.net"));
        assert_eq!(msg.push_name.as_deref(), Some("Ana"));
        let content = msg.message.unwrap();
        assert!(content.conversation.is_none());
        assert_eq!(
            content.extended_text_message.unwrap().text.as_deref(),
            Some("see https://example.com")
        );
    }

    #[test]
    fn version_displays_dotted() {
        assert_eq!(ProtocolVersion([2, 3000, 1015901307]).to_string(), "2.3000.1015901307");
    }
}
