use tungstenite::protocol::Message;

use super::WsActor;
use crate::reload::message::LiveReloadMessage;

impl WsActor {
    /// Send a message to all connected clients, dropping any that fail.
    pub(super) fn broadcast(&self, msg: &LiveReloadMessage) {
        let frame = Message::Text(msg.to_json().into());
        let mut clients = self.clients.lock();
        let count = clients.len();

        if count == 0 {
            crate::debug!("ws"; "no clients connected");
            return;
        }

        clients.retain_mut(|ws| match ws.send(frame.clone()) {
            Ok(()) => true,
            Err(e) => {
                crate::debug!("ws"; "client disconnected: {}", e);
                false
            }
        });
        crate::debug!("ws"; "broadcast to {} clients", clients.len());
    }
}
