//! WebSocket Actor - Browser Notification
//!
//! - Performs the handshake for clients accepted by the reload listener
//! - Broadcasts reload / css / error messages to every connected tab
//! - Remembers the last stage error and replays it to tabs that connect
//!   while the build is broken
//!
//! ```text
//! BuildActor --[Reload/InjectCss/Error]--> WsActor --[broadcast]--> Clients
//! ```

mod client_io;
mod delivery;

use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tungstenite::WebSocket;

use super::messages::WsMsg;
use crate::reload::message::LiveReloadMessage;

/// Connected clients, shared with the reader thread.
type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// WebSocket Actor - manages client connections and broadcasts
pub struct WsActor {
    rx: mpsc::Receiver<WsMsg>,
    clients: Clients,
    /// Last error, replayed to new clients until cleared
    pending_error: Option<LiveReloadMessage>,
}

impl WsActor {
    pub fn new(rx: mpsc::Receiver<WsMsg>) -> Self {
        Self {
            rx,
            clients: Arc::new(Mutex::new(Vec::new())),
            pending_error: None,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        let clients_for_reader = Arc::clone(&self.clients);
        std::thread::spawn(move || client_io::reader_loop(clients_for_reader));

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::Reload { reason } => {
                    crate::debug!("ws"; "sending reload: {}", reason);
                    self.broadcast(&LiveReloadMessage::reload(reason));
                }

                WsMsg::InjectCss { href } => {
                    crate::debug!("ws"; "injecting {}", href);
                    self.broadcast(&LiveReloadMessage::css(href));
                }

                WsMsg::Error { stage, error } => {
                    let msg = LiveReloadMessage::error(stage, error);
                    self.broadcast(&msg);
                    self.pending_error = Some(msg);
                }

                WsMsg::ClearError => {
                    if self.pending_error.take().is_some() {
                        self.broadcast(&LiveReloadMessage::clear_error());
                    }
                }

                WsMsg::AddClient(stream) => self.add_client(stream),

                WsMsg::Shutdown => {
                    crate::debug!("ws"; "shutting down");
                    for mut client in self.clients.lock().drain(..) {
                        let _ = client.close(None);
                    }
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use tungstenite::Message;

    /// Connect a real client to the actor through a loopback socket.
    fn connect(ws_tx: &mpsc::Sender<WsMsg>) -> WebSocket<tungstenite::stream::MaybeTlsStream<TcpStream>> {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::thread::spawn(move || {
            tungstenite::connect(format!("ws://{addr}/")).unwrap().0
        });
        let (stream, _) = listener.accept().unwrap();
        ws_tx.blocking_send(WsMsg::AddClient(stream)).unwrap();
        client.join().unwrap()
    }

    fn read_json(ws: &mut WebSocket<tungstenite::stream::MaybeTlsStream<TcpStream>>) -> LiveReloadMessage {
        match ws.read().unwrap() {
            Message::Text(text) => LiveReloadMessage::from_json(&text).unwrap(),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    fn spawn_actor() -> (mpsc::Sender<WsMsg>, std::thread::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(8);
        let handle = std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            rt.block_on(WsActor::new(rx).run());
        });
        (tx, handle)
    }

    #[test]
    fn test_broadcast_and_error_replay() {
        let (tx, actor) = spawn_actor();

        let mut first = connect(&tx);
        assert!(matches!(read_json(&mut first), LiveReloadMessage::Connected { .. }));

        tx.blocking_send(WsMsg::InjectCss {
            href: "assets/css/layout.css".into(),
        })
        .unwrap();
        assert_eq!(read_json(&mut first), LiveReloadMessage::css("assets/css/layout.css"));

        tx.blocking_send(WsMsg::Error {
            stage: "styles".into(),
            error: "expected \";\".".into(),
        })
        .unwrap();
        assert!(matches!(read_json(&mut first), LiveReloadMessage::Error { .. }));

        // A tab opened while broken sees the overlay right away
        let mut second = connect(&tx);
        assert!(matches!(read_json(&mut second), LiveReloadMessage::Connected { .. }));
        assert_eq!(
            read_json(&mut second),
            LiveReloadMessage::error("styles", "expected \";\".")
        );

        tx.blocking_send(WsMsg::ClearError).unwrap();
        assert_eq!(read_json(&mut first), LiveReloadMessage::ClearError);
        assert_eq!(read_json(&mut second), LiveReloadMessage::ClearError);

        tx.blocking_send(WsMsg::Shutdown).unwrap();
        actor.join().unwrap();
    }

    #[test]
    fn test_silent_connection_does_not_block_clients() {
        let (tx, actor) = spawn_actor();

        // A socket that never sends an upgrade request
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let _silent = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (stream, _) = listener.accept().unwrap();
        tx.blocking_send(WsMsg::AddClient(stream)).unwrap();

        let started = std::time::Instant::now();
        let mut client = connect(&tx);
        assert!(matches!(read_json(&mut client), LiveReloadMessage::Connected { .. }));
        assert!(started.elapsed() < client_io::HANDSHAKE_TIMEOUT * 5);

        tx.blocking_send(WsMsg::Reload {
            reason: "header.php changed".into(),
        })
        .unwrap();
        assert_eq!(read_json(&mut client), LiveReloadMessage::reload("header.php changed"));

        tx.blocking_send(WsMsg::Shutdown).unwrap();
        actor.join().unwrap();
    }
}
