//! Actor Message Definitions
//!
//! Message types for inter-actor communication.
//!
//! ```text
//! FsActor --Run/Reload--> BuildActor --Reload/InjectCss/Error--> WsActor
//! ```

use std::net::TcpStream;

use crate::pipeline::StageSet;

// =============================================================================
// BuildActor Messages
// =============================================================================

/// Messages to Build Actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildMsg {
    /// Run these stages, then notify browsers
    Run { stages: StageSet },
    /// Nothing to build, reload browsers (e.g. a template changed)
    Reload { reason: String },
    /// `brisk.toml` changed: reload config, then run every stage
    ConfigChanged,
    /// Shutdown
    Shutdown,
}

// =============================================================================
// WsActor Messages
// =============================================================================

/// Messages to WebSocket Actor
#[derive(Debug)]
pub enum WsMsg {
    /// Reload every page
    Reload { reason: String },
    /// Swap a stylesheet in place
    InjectCss { href: String },
    /// Stage failure (display overlay, no reload)
    Error { stage: String, error: String },
    /// Clear error overlay (a later run succeeded)
    ClearError,
    /// Add client
    AddClient(TcpStream),
    /// Shutdown
    Shutdown,
}
