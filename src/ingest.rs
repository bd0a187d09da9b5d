// ABOUTME: Inbound message sink — extracts display text from raw transport messages and logs it.
// ABOUTME: Plain body first, then rich-text body, else null; nothing is stored.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

use crate::transport::{RawMessage, UpsertKind};

/// A received message reduced to what an operator needs to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundMessage {
    pub session_id: String,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub text: Option<String>,
}

/// Extract readable text: the plain body, else the extended-text body, else nothing.
/// Empty strings count as absent.
pub fn extract_text(message: &RawMessage) -> Option<String> {
    let content = message.message.as_ref()?;
    content
        .conversation
        .as_deref()
        .filter(|t| !t.is_empty())
        .or_else(|| {
            content
                .extended_text_message
                .as_ref()
                .and_then(|ext| ext.text.as_deref())
                .filter(|t| !t.is_empty())
        })
        .map(str::to_string)
}

const OBSERVER_CAPACITY: usize = 256;

/// Receives inbound messages from every session.
///
/// Each ingested message is logged and offered to any observers; with no
/// observers it is simply dropped.
#[derive(Debug, Clone)]
pub struct MessageIngestSink {
    observers: broadcast::Sender<InboundMessage>,
}

impl Default for MessageIngestSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageIngestSink {
    pub fn new() -> Self {
        let (observers, _) = broadcast::channel(OBSERVER_CAPACITY);
        Self { observers }
    }

    /// Observe messages ingested from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<InboundMessage> {
        self.observers.subscribe()
    }

    /// Ingest one message. Messages without any content are skipped.
    pub fn ingest(&self, session_id: &str, kind: UpsertKind, raw: &RawMessage) -> Option<InboundMessage> {
        raw.message.as_ref()?;

        let inbound = InboundMessage {
            session_id: session_id.to_string(),
            sender_id: raw.key.remote_jid.clone(),
            sender_name: raw.push_name.clone(),
            text: extract_text(raw),
        };

        info!(
            session = %inbound.session_id,
            sender = inbound.sender_id.as_deref().unwrap_or("unknown"),
            sender_name = inbound.sender_name.as_deref(),
            from_me = raw.key.from_me,
            kind = ?kind,
            text = inbound.text.as_deref(),
            "message received"
        );
        let _ = self.observers.send(inbound.clone());
        Some(inbound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ExtendedTextMessage, MessageContent, MessageKey};

    fn message(conversation: Option<&str>, extended: Option<&str>) -> RawMessage {
        RawMessage {
            key: MessageKey {
                remote_jid: Some("111@s.whatsapp.net".to_string()),
                from_me: false,
                id: Some("ID1".to_string()),
            },
            push_name: Some("Bea".to_string()),
            message: Some(MessageContent {
                conversation: conversation.map(str::to_string),
                extended_text_message: extended.map(|t| ExtendedTextMessage {
                    text: Some(t.to_string()),
                }),
            }),
        }
    }

    #[test]
    fn plain_body_wins() {
        assert_eq!(
            extract_text(&message(Some("plain"), Some("rich"))).as_deref(),
            Some("plain")
        );
    }

    #[test]
    fn extended_body_is_fallback() {
        assert_eq!(
            extract_text(&message(None, Some("rich"))).as_deref(),
            Some("rich")
        );
    }

    #[test]
    fn empty_plain_body_falls_through() {
        assert_eq!(
            extract_text(&message(Some(""), Some("rich"))).as_deref(),
            Some("rich")
        );
    }

    #[test]
    fn neither_body_is_none() {
        assert_eq!(extract_text(&message(None, None)), None);
        let mut ext_without_text = message(None, None);
        ext_without_text.message.as_mut().unwrap().extended_text_message =
            Some(ExtendedTextMessage { text: None });
        assert_eq!(extract_text(&ext_without_text), None);
    }

    #[test]
    fn ingest_keeps_sender_and_null_text() {
        let sink = MessageIngestSink::new();
        let inbound = sink
            .ingest("s1", UpsertKind::Notify, &message(None, None))
            .unwrap();
        assert_eq!(inbound.session_id, "s1");
        assert_eq!(inbound.sender_id.as_deref(), Some("111@s.whatsapp.net"));
        assert_eq!(inbound.sender_name.as_deref(), Some("Bea"));
        assert_eq!(inbound.text, None);
    }

    #[test]
    fn ingest_skips_contentless_messages() {
        let sink = MessageIngestSink::new();
        let mut raw = message(Some("x"), None);
        raw.message = None;
        assert!(sink.ingest("s1", UpsertKind::Notify, &raw).is_none());
    }

    #[test]
    fn observers_receive_ingested_messages() {
        let sink = MessageIngestSink::new();
        let mut rx = sink.subscribe();
        sink.ingest("s1", UpsertKind::Notify, &message(Some("hello"), None));
        let seen = rx.try_recv().unwrap();
        assert_eq!(seen.text.as_deref(), Some("hello"));
        assert!(rx.try_recv().is_err());
    }
}
