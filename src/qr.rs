// ABOUTME: Pairing challenge rendering — turns a QR payload into terminal-displayable text.
// ABOUTME: The rendered string only goes to the log; there is no machine-readable channel.

use qrcode::QrCode;
use qrcode::render::unicode;

use crate::error::{BridgeError, Result};

/// Renders a pairing payload for an operator to scan.
pub trait QrRenderer: Send + Sync {
    fn render(&self, payload: &str) -> Result<String>;
}

/// Renders QR codes with half-height unicode blocks, inverted for dark terminals.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalQrRenderer;

impl QrRenderer for TerminalQrRenderer {
    fn render(&self, payload: &str) -> Result<String> {
        let code = QrCode::new(payload.as_bytes()).map_err(|e| BridgeError::Render(e.to_string()))?;
        Ok(code
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_multiline_block_text() {
        let rendered = TerminalQrRenderer
            .render("2@abc123,XYZ==,def456==,ghi789==")
            .unwrap();
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines.len() > 10, "expected a full QR block, got {} lines", lines.len());
        assert!(rendered.chars().any(|c| c == '█' || c == '▀' || c == '▄'));
    }

    #[test]
    fn oversized_payload_is_a_render_error() {
        let payload = "x".repeat(8000);
        assert!(matches!(
            TerminalQrRenderer.render(&payload),
            Err(BridgeError::Render(_))
        ));
    }
}
