use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use tungstenite::protocol::Message;

use super::{Clients, WsActor};
use crate::reload::message::LiveReloadMessage;

/// Longest a connection may take to send its upgrade request.
pub(super) const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

impl WsActor {
    /// Handshake a new connection and greet it.
    pub(super) fn add_client(&self, stream: TcpStream) {
        // Bounded blocking during the handshake, non-blocking for polling reads after
        if let Err(e) = stream
            .set_read_timeout(Some(HANDSHAKE_TIMEOUT))
            .and_then(|()| stream.set_write_timeout(Some(HANDSHAKE_TIMEOUT)))
        {
            crate::debug!("ws"; "dropping connection: {}", e);
            return;
        }
        let mut ws = match tungstenite::accept(stream) {
            Ok(ws) => ws,
            Err(e) => {
                crate::debug!("ws"; "handshake failed: {}", e);
                return;
            }
        };

        let greeting = std::iter::once(LiveReloadMessage::connected()).chain(self.pending_error.clone());
        for msg in greeting {
            if let Err(e) = ws.send(Message::Text(msg.to_json().into())) {
                crate::debug!("ws"; "client dropped during greeting: {}", e);
                return;
            }
        }
        let stream = ws.get_ref();
        let _ = stream.set_read_timeout(None);
        let _ = stream.set_write_timeout(None);
        let _ = stream.set_nonblocking(true);

        let mut clients = self.clients.lock();
        clients.push(ws);
        crate::debug!("ws"; "client connected (total: {})", clients.len());
    }
}

/// Poll clients for close frames so dead tabs are dropped promptly.
///
/// Exits once the actor is gone.
pub(super) fn reader_loop(clients: Clients) {
    while Arc::strong_count(&clients) > 1 {
        std::thread::sleep(Duration::from_millis(100));

        clients.lock().retain_mut(|ws| match ws.read() {
            Ok(Message::Close(_)) => false,
            Ok(_) => true,
            Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => true,
            Err(_) => false,
        });
    }
}
