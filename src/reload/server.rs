//! WebSocket listener for live reload.
//!
//! The listener is bound up front so the dev server knows the actual port
//! before any HTML is served. Accepted streams are handed to the `WsActor`
//! through its channel; the actor performs the handshake, giving up on
//! connections that stay silent past a short timeout.

use std::net::{IpAddr, TcpListener};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::mpsc;

use crate::actor::messages::WsMsg;

/// Maximum port retry attempts
pub const MAX_PORT_RETRIES: u16 = 10;

/// A bound but not yet accepting WebSocket listener.
pub struct ReloadListener {
    listener: TcpListener,
    port: u16,
}

impl ReloadListener {
    /// Bind on `interface`, trying `base_port` and the following ports.
    pub fn bind(interface: IpAddr, base_port: u16) -> Result<Self> {
        let (listener, port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Spawn the acceptor thread, forwarding clients to the actor.
    pub fn spawn_acceptor(self, ws_tx: mpsc::Sender<WsMsg>) -> Result<()> {
        let listener = self.listener;
        listener.set_nonblocking(true)?;

        std::thread::spawn(move || {
            loop {
                match listener.accept() {
                    Ok((stream, addr)) => {
                        crate::debug!("reload"; "client connected: {}", addr);

                        // Blocking mode for the handshake
                        let _ = stream.set_nonblocking(false);

                        if ws_tx.blocking_send(WsMsg::AddClient(stream)).is_err() {
                            break;
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        if ws_tx.is_closed() {
                            break;
                        }
                        std::thread::sleep(Duration::from_millis(100));
                    }
                    Err(e) => {
                        crate::log!("reload"; "accept error: {}", e);
                        std::thread::sleep(Duration::from_millis(100));
                    }
                }
            }
            crate::debug!("reload"; "acceptor stopped");
        });

        Ok(())
    }
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind((interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                if offset > 0 {
                    crate::debug!("reload"; "port {} in use, using {}", base_port, actual_port);
                }
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "failed to bind websocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}
