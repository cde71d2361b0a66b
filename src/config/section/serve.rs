//! `[serve]` section configuration.
//!
//! Contains development server settings.
//!
//! ```toml
//! [serve]
//! proxy = "localhost:8080/evos"   # Upstream dev server (omit to serve files)
//! interface = "127.0.0.1"         # Network interface (127.0.0.1 = localhost only)
//! port = 3000                     # HTTP port number
//! ws_port = 35729                 # Live-reload WebSocket port
//! open = true                     # Open a browser tab on startup
//! inject_css = true               # Swap stylesheets without a full reload
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use url::Url;

/// Development server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Upstream server to proxy. Scheme defaults to `http://`.
    pub proxy: Option<String>,

    /// Network interface to bind.
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Preferred WebSocket port; the next free one is used if taken.
    pub ws_port: u16,

    pub open: bool,

    /// Push changed stylesheets to the page instead of reloading it.
    pub inject_css: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 3000,
            ws_port: 35729,
            open: true,
            inject_css: true,
        }
    }
}

impl ServeConfig {
    const PROXY: FieldPath = FieldPath::new("serve.proxy");

    /// Parsed proxy target, if one is configured and valid.
    pub fn proxy_url(&self) -> Option<Url> {
        self.proxy.as_deref().and_then(|p| parse_proxy_target(p).ok())
    }

    pub(crate) fn validate(&self, diag: &mut ConfigDiagnostics) {
        if let Some(proxy) = &self.proxy
            && let Err(e) = parse_proxy_target(proxy)
        {
            diag.error_with_hint(
                Self::PROXY,
                format!("invalid proxy target `{proxy}`: {e}"),
                "use host:port[/path], e.g. \"localhost:8080/site\"",
            );
        }
    }
}

/// Parse a proxy target, accepting a bare `host:port/path`.
pub fn parse_proxy_target(target: &str) -> Result<Url, url::ParseError> {
    let url = if target.contains("://") {
        Url::parse(target)?
    } else {
        Url::parse(&format!("http://{target}"))?
    };
    if url.host_str().is_none() {
        return Err(url::ParseError::EmptyHost);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_serve_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.serve.interface, IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)));
        assert_eq!(config.serve.port, 3000);
        assert_eq!(config.serve.ws_port, 35729);
        assert!(config.serve.open);
        assert!(config.serve.inject_css);
        assert!(config.serve.proxy.is_none());
    }

    #[test]
    fn test_serve_partial_override() {
        let config = test_parse_config("[serve]\nport = 8000\nproxy = \"localhost:8080/evos\"");
        assert_eq!(config.serve.port, 8000);
        assert_eq!(config.serve.ws_port, 35729);

        let url = config.serve.proxy_url().unwrap();
        assert_eq!(url.host_str(), Some("localhost"));
        assert_eq!(url.port(), Some(8080));
        assert_eq!(url.path(), "/evos");
    }

    #[test]
    fn test_parse_proxy_target_with_scheme() {
        let url = parse_proxy_target("https://dev.example.test").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn test_parse_proxy_target_invalid() {
        assert!(parse_proxy_target("http://").is_err());
        assert!(parse_proxy_target("local host:80").is_err());
    }
}
