//! Development server with live reload support.
//!
//! Static mode serves files from the project root; proxy mode forwards to
//! the configured upstream. Either way HTML responses carry the live-reload
//! client, which connects back to the WebSocket listener bound here.

mod inject;
mod lifecycle;
mod path;
mod proxy;
mod response;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel;
use tiny_http::{Request, Server};

use crate::config::ConfigHandle;
use crate::embed::serve::LIVERELOAD_PATH;
use crate::reload::server::ReloadListener;
use crate::{debug, log};
use proxy::Proxy;

/// Request handler threads.
const POOL_THREADS: usize = 4;

/// State shared by request handlers.
struct ServeContext {
    config: ConfigHandle,
    ws_port: u16,
    /// `host:port` the browser reaches us at, for link rewriting.
    public_host: String,
    proxy: Proxy,
}

/// Bound server ready to accept requests.
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
    listener: ReloadListener,
    shutdown_rx: channel::Receiver<()>,
}

/// Bind the HTTP server and the live-reload listener.
pub fn bind_server(config: &ConfigHandle) -> Result<BoundServer> {
    let current = config.load();
    let interface = current.serve.interface;

    let (server, addr) = lifecycle::bind_with_retry(interface, current.serve.port)?;
    let server = Arc::new(server);

    let listener = ReloadListener::bind(interface, current.serve.ws_port)?;
    debug!("reload"; "ws://{}", SocketAddr::new(interface, listener.port()));

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    lifecycle::register_server_for_shutdown(Arc::clone(&server), shutdown_tx);

    log!("serve"; "http://{}", addr);
    if let Some(upstream) = current.serve.proxy_url() {
        log!("serve"; "proxying {}", upstream);
    }

    Ok(BoundServer {
        server,
        addr,
        listener,
        shutdown_rx,
    })
}

impl BoundServer {
    /// Start the actors and the request loop (blocking).
    pub fn run(self, config: ConfigHandle) -> Result<()> {
        let ctx = Arc::new(ServeContext {
            config: config.clone(),
            ws_port: self.listener.port(),
            public_host: browser_host(self.addr),
            proxy: Proxy::new(),
        });

        let actor_handle = lifecycle::spawn_actors(config, self.listener, self.shutdown_rx);

        let current = ctx.config.load();
        if current.serve.open {
            let start_path = current
                .serve
                .proxy_url()
                .map_or_else(|| "/".to_string(), |url| url.path().to_string());
            let url = format!("http://{}{}", ctx.public_host, start_path);
            if let Err(e) = open::that_detached(&url) {
                debug!("serve"; "failed to open browser: {}", e);
            }
        }

        run_request_loop(&self.server, &ctx)?;
        lifecycle::wait_for_shutdown(actor_handle);
        Ok(())
    }
}

/// `host:port` for links; wildcard binds are reached through localhost.
fn browser_host(addr: SocketAddr) -> String {
    let ip = match addr.ip() {
        ip if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, addr.port()).to_string()
}

fn run_request_loop(server: &Server, ctx: &Arc<ServeContext>) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(POOL_THREADS)
        .thread_name(|i| format!("brisk-http-{i}"))
        .build()?;

    for request in server.incoming_requests() {
        let ctx = Arc::clone(ctx);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &ctx) {
                debug!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request.
fn handle_request(request: Request, ctx: &ServeContext) -> Result<()> {
    if crate::core::is_shutdown() {
        return response::respond_unavailable(request);
    }

    let path = request.url().split('?').next().unwrap_or_default();
    if path == LIVERELOAD_PATH {
        return response::respond_livereload_js(request, ctx.ws_port);
    }

    let config = ctx.config.load();
    if let Some(upstream) = config.serve.proxy_url() {
        return ctx.proxy.forward(request, &upstream, &ctx.public_host);
    }

    match path::resolve_path(request.url(), &config.root) {
        Some(file) => response::respond_file(request, &file),
        None => response::respond_not_found(request),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_host_for_wildcard_bind() {
        let addr: SocketAddr = "0.0.0.0:3000".parse().unwrap();
        assert_eq!(browser_host(addr), "127.0.0.1:3000");

        let addr: SocketAddr = "192.168.1.20:3001".parse().unwrap();
        assert_eq!(browser_host(addr), "192.168.1.20:3001");
    }
}
