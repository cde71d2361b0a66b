//! Live reload plumbing shared by the actors and the dev server.
//!
//! - `message` - JSON messages pushed to browser clients
//! - `server` - WebSocket listener feeding new clients to `WsActor`

pub mod message;
pub mod server;
