//! Live Reload Message Protocol
//!
//! JSON messages sent over the WebSocket to browser clients.
//!
//! # Message Types
//!
//! - `connected`: handshake complete, carries the server version
//! - `reload`: full page reload
//! - `css`: swap the stylesheet whose href matches, no reload
//! - `error`: show the error overlay for a failed stage
//! - `clear_error`: hide the overlay after a successful run

use serde::{Deserialize, Serialize};

/// Live reload message sent over WebSocket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveReloadMessage {
    /// Connection established
    Connected {
        /// Server version for compatibility check
        version: String,
    },

    /// Full page reload
    Reload {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Stylesheet update
    Css {
        /// Path of the stylesheet relative to the project root, e.g. `assets/css/layout.css`
        href: String,
    },

    /// Stage failure (display overlay, no reload)
    Error {
        stage: String,
        error: String,
    },

    /// Clear error overlay
    ClearError,
}

impl LiveReloadMessage {
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn reload(reason: impl Into<String>) -> Self {
        Self::Reload {
            reason: Some(reason.into()),
        }
    }

    pub fn css(href: impl Into<String>) -> Self {
        Self::Css { href: href.into() }
    }

    pub fn error(stage: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Error {
            stage: stage.into(),
            error: error.into(),
        }
    }

    pub fn clear_error() -> Self {
        Self::ClearError
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }

    /// Parse from JSON string
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_message() {
        let json = LiveReloadMessage::reload("scripts changed").to_json();
        assert_eq!(json, r#"{"type":"reload","reason":"scripts changed"}"#);
    }

    #[test]
    fn test_reload_without_reason() {
        let json = LiveReloadMessage::Reload { reason: None }.to_json();
        assert_eq!(json, r#"{"type":"reload"}"#);
    }

    #[test]
    fn test_css_message() {
        let json = LiveReloadMessage::css("assets/css/layout.css").to_json();
        assert_eq!(json, r#"{"type":"css","href":"assets/css/layout.css"}"#);
    }

    #[test]
    fn test_error_messages() {
        let json = LiveReloadMessage::error("styles", "expected \";\".").to_json();
        assert!(json.starts_with(r#"{"type":"error","stage":"styles""#));
        assert_eq!(
            LiveReloadMessage::clear_error().to_json(),
            r#"{"type":"clear_error"}"#
        );
    }

    #[test]
    fn test_connected_roundtrip() {
        let msg = LiveReloadMessage::connected();
        let parsed = LiveReloadMessage::from_json(&msg.to_json()).unwrap();
        assert_eq!(parsed, msg);
        assert!(LiveReloadMessage::from_json(r#"{"type":"patch"}"#).is_none());
    }
}
