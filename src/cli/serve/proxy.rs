//! Proxy mode: forward requests to an upstream development server.
//!
//! Absolute links to the upstream (`http://localhost:8080/...`, also the
//! JSON-escaped `http:\/\/localhost:8080` form) are rewritten to point back
//! at the dev server, so navigation stays inside the live-reload session.

use std::borrow::Cow;
use std::io::Read;
use std::time::Duration;

use anyhow::Result;
use regex::{Captures, Regex};
use tiny_http::{Header, Request, Response, StatusCode};
use url::Url;

use super::inject::inject_script;
use super::response::{header, respond_bad_gateway};
use crate::embed::serve::script_tag;
use crate::utils::mime::{is_html, is_text};

/// Headers that describe a single connection and are never forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Request headers the agent sets itself.
const AGENT_OWNED: &[&str] = &["host", "accept-encoding", "content-length"];

/// Forwards requests through a shared HTTP agent.
pub struct Proxy {
    agent: ureq::Agent,
}

impl Default for Proxy {
    fn default() -> Self {
        Self::new()
    }
}

impl Proxy {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .redirects(0)
            .timeout_connect(Duration::from_secs(5))
            .timeout(Duration::from_secs(120))
            .build();
        Self { agent }
    }

    /// Forward `request` to `upstream`, rewriting upstream links to
    /// `fallback_host` unless the browser sent its own `Host`.
    pub fn forward(&self, mut request: Request, upstream: &Url, fallback_host: &str) -> Result<()> {
        let public_host = request
            .headers()
            .iter()
            .find(|h| h.field.equiv("Host"))
            .map_or_else(|| fallback_host.to_string(), |h| h.value.to_string());
        let rewriter = HostRewriter::new(upstream, &public_host);

        let target = match upstream.join(request.url()) {
            Ok(target) => target,
            Err(e) => return respond_bad_gateway(request, upstream.as_str(), &e.to_string()),
        };

        let mut outgoing = self.agent.request(request.method().as_str(), target.as_str());
        for h in request.headers() {
            let name = h.field.as_str().as_str();
            if is_hop_by_hop(name) || is_agent_owned(name) {
                continue;
            }
            let value = h.value.as_str();
            let points_back =
                name.eq_ignore_ascii_case("origin") || name.eq_ignore_ascii_case("referer");
            let value = if points_back {
                rewriter.to_upstream(value)
            } else {
                Cow::Borrowed(value)
            };
            outgoing = outgoing.set(name, &value);
        }
        outgoing = outgoing
            .set("X-Forwarded-Host", &public_host)
            .set("X-Forwarded-Proto", "http");

        let mut body = Vec::new();
        request.as_reader().read_to_end(&mut body)?;

        let result = if body.is_empty() {
            outgoing.call()
        } else {
            outgoing.send_bytes(&body)
        };

        let upstream_response = match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(e) => {
                crate::debug!("proxy"; "{} {}: {}", request.method(), target, e);
                return respond_bad_gateway(request, upstream.as_str(), &e.to_string());
            }
        };

        relay(request, upstream_response, &rewriter)
    }
}

/// Copy an upstream response back to the browser.
fn relay(request: Request, upstream: ureq::Response, rewriter: &HostRewriter) -> Result<()> {
    let status = StatusCode(upstream.status());
    let content_type = upstream.content_type().to_string();
    let headers = response_headers(&upstream, rewriter);

    if !is_text(&content_type) {
        let response = Response::new(status, headers, upstream.into_reader(), None, None);
        request.respond(response)?;
        return Ok(());
    }

    let mut body = Vec::new();
    upstream.into_reader().read_to_end(&mut body)?;

    let mut body = match String::from_utf8(body) {
        Ok(text) => rewriter.to_public(&text).into_owned().into_bytes(),
        Err(e) => e.into_bytes(),
    };
    if is_html(&content_type) {
        body = inject_script(&body, &script_tag());
    }

    let mut response = Response::from_data(body).with_status_code(status);
    for h in headers {
        response.add_header(h);
    }
    request.respond(response)?;
    Ok(())
}

/// Response headers to pass through.
///
/// Length and gzip encoding are dropped: the agent decodes gzip and the body
/// may be rewritten.
fn response_headers(upstream: &ureq::Response, rewriter: &HostRewriter) -> Vec<Header> {
    let mut headers = Vec::new();
    for name in upstream.headers_names() {
        if is_hop_by_hop(&name) || name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        for value in upstream.all(&name) {
            if name.eq_ignore_ascii_case("content-encoding") && value.eq_ignore_ascii_case("gzip") {
                continue;
            }
            let value = if name.eq_ignore_ascii_case("location") {
                rewriter.to_public(value)
            } else if name.eq_ignore_ascii_case("set-cookie") {
                Cow::Owned(strip_cookie_domain(value))
            } else {
                Cow::Borrowed(value)
            };
            if let Some(h) = header(&name, &value) {
                headers.push(h);
            }
        }
    }
    headers
}

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

fn is_agent_owned(name: &str) -> bool {
    AGENT_OWNED.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Drop the `Domain` attribute so the cookie binds to the dev server host.
fn strip_cookie_domain(cookie: &str) -> String {
    cookie
        .split(';')
        .filter(|attr| {
            !attr
                .trim_start()
                .get(..7)
                .is_some_and(|key| key.eq_ignore_ascii_case("domain="))
        })
        .collect::<Vec<_>>()
        .join(";")
}

// =============================================================================
// Host rewriting
// =============================================================================

/// Swaps the upstream authority for the public one in absolute URLs.
struct HostRewriter {
    upstream_pattern: Option<Regex>,
    public_pattern: Option<Regex>,
    upstream: String,
    public: String,
}

impl HostRewriter {
    fn new(upstream: &Url, public: &str) -> Self {
        let upstream_authority = authority(upstream);
        Self {
            upstream_pattern: url_pattern(&upstream_authority),
            public_pattern: url_pattern(public),
            upstream: upstream_authority,
            public: public.to_string(),
        }
    }

    /// Upstream links in a response, pointed at the dev server.
    fn to_public<'a>(&self, text: &'a str) -> Cow<'a, str> {
        replace_authority(self.upstream_pattern.as_ref(), text, &self.public, "http:")
    }

    /// Dev server links in a request header, pointed at the upstream.
    fn to_upstream<'a>(&self, text: &'a str) -> Cow<'a, str> {
        replace_authority(self.public_pattern.as_ref(), text, &self.upstream, "")
    }
}

/// `host[:port]` as it appears in absolute URLs.
fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Match `[scheme:]//authority` (slashes optionally JSON-escaped), followed by
/// a character that cannot continue the authority.
fn url_pattern(authority: &str) -> Option<Regex> {
    if authority.is_empty() {
        return None;
    }
    let pattern = format!(
        r"(https?:)?(\\?/\\?/){}([^A-Za-z0-9_.:-]|$)",
        regex::escape(authority)
    );
    Regex::new(&pattern).ok()
}

/// Replace matched authorities. `scheme` overrides a matched scheme; an empty
/// `scheme` keeps the original one.
fn replace_authority<'a>(
    pattern: Option<&Regex>,
    text: &'a str,
    replacement: &str,
    scheme: &str,
) -> Cow<'a, str> {
    let Some(pattern) = pattern else {
        return Cow::Borrowed(text);
    };
    pattern.replace_all(text, |caps: &Captures| {
        let matched_scheme = caps.get(1).map_or("", |m| m.as_str());
        let scheme = match (matched_scheme, scheme) {
            ("", _) => "",
            (original, "") => original,
            (_, forced) => forced,
        };
        let slashes = caps.get(2).map_or("//", |m| m.as_str());
        let end = caps.get(3).map_or("", |m| m.as_str());
        format!("{scheme}{slashes}{replacement}{end}")
    })
}
