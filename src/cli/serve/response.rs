//! HTTP response handlers for static mode.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::inject::inject_script;
use crate::embed::serve::{LIVERELOAD_JS, LiveReloadVars, script_tag};
use crate::utils::mime::{self, is_html, types};

/// Respond with a file from disk, injecting the live-reload client into HTML.
pub fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    if let Some(range) = range_header(&request) {
        return respond_range(request, path, content_type, &range);
    }

    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let body = if is_html(content_type) {
        inject_script(&body, &script_tag())
    } else {
        body
    };

    send_body(request, 200, content_type, body)
}

/// Stream a byte range (video/audio seeking).
fn respond_range(
    request: Request,
    path: &Path,
    content_type: &'static str,
    range: &str,
) -> Result<()> {
    let file_size = fs::metadata(path)?.len();
    if file_size == 0 {
        return send_body(request, 200, content_type, Vec::new());
    }

    let spec = range.strip_prefix("bytes=").unwrap_or(range);
    let Some((start, end)) = parse_range(spec, file_size) else {
        let mut response = Response::empty(StatusCode(416));
        add_header(&mut response, "Content-Range", &format!("bytes */{file_size}"));
        request.respond(response)?;
        return Ok(());
    };

    let length = end - start + 1;
    let mut file = fs::File::open(path)?;
    file.seek(SeekFrom::Start(start))?;

    let response = Response::new(
        StatusCode(206),
        [
            header("Content-Type", content_type),
            header("Content-Range", &format!("bytes {start}-{end}/{file_size}")),
            header("Accept-Ranges", "bytes"),
        ]
        .into_iter()
        .flatten()
        .collect(),
        file.take(length),
        usize::try_from(length).ok(),
        None,
    );
    request.respond(response)?;
    Ok(())
}

/// Parse `start-end`, `start-` or `-suffix` against a non-empty file.
fn parse_range(spec: &str, file_size: u64) -> Option<(u64, u64)> {
    let last = file_size - 1;
    let (start, end) = spec.trim().split_once('-')?;
    let (start, end) = match (start.trim(), end.trim()) {
        ("", suffix) => {
            let suffix: u64 = suffix.parse().ok()?;
            (file_size.saturating_sub(suffix), last)
        }
        (start, "") => (start.parse().ok()?, last),
        (start, end) => (start.parse().ok()?, end.parse::<u64>().ok()?.min(last)),
    };
    (start <= end && start <= last).then_some((start, end))
}

fn range_header(request: &Request) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Range"))
        .map(|h| h.value.to_string())
}

/// Respond with 404.
pub fn respond_not_found(request: Request) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 404, types::PLAIN);
    }
    send_body(request, 404, types::PLAIN, b"404 Not Found".to_vec())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(
        request,
        503,
        types::PLAIN,
        b"503 Service Unavailable".to_vec(),
    )
}

/// Respond with 502 when the proxied upstream cannot be reached.
pub fn respond_bad_gateway(request: Request, upstream: &str, error: &str) -> Result<()> {
    let body = format!("502 Bad Gateway\n\nupstream {upstream} unreachable: {error}\n");
    send_body(request, 502, types::PLAIN, body.into_bytes())
}

/// Respond with the live-reload client, pointed at the bound WebSocket port.
pub fn respond_livereload_js(request: Request, ws_port: u16) -> Result<()> {
    let body = LIVERELOAD_JS.render(&LiveReloadVars { ws_port });
    send_body(request, 200, types::JAVASCRIPT, body.into_bytes())
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &str) -> Result<()> {
    let mut response = Response::empty(StatusCode(status));
    add_header(&mut response, "Content-Type", content_type);
    add_header(&mut response, "Cache-Control", "no-cache");
    request.respond(response)?;
    Ok(())
}

fn send_body(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> Result<()> {
    let mut response = Response::from_data(body).with_status_code(StatusCode(status));
    add_header(&mut response, "Content-Type", content_type);
    add_header(&mut response, "Cache-Control", "no-cache");
    request.respond(response)?;
    Ok(())
}

/// Header from a name/value pair; `None` for non-ASCII input.
pub fn header(key: &str, value: &str) -> Option<Header> {
    Header::from_bytes(key.as_bytes(), value.as_bytes()).ok()
}

/// Add a header, skipping it if it is not representable.
pub fn add_header<R: Read>(response: &mut Response<R>, key: &str, value: &str) {
    match header(key, value) {
        Some(h) => response.add_header(h),
        None => crate::debug!("serve"; "dropped invalid header {}", key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_explicit() {
        assert_eq!(parse_range("0-499", 1000), Some((0, 499)));
        assert_eq!(parse_range("500-5000", 1000), Some((500, 999)));
    }

    #[test]
    fn test_parse_range_open_ended() {
        assert_eq!(parse_range("900-", 1000), Some((900, 999)));
        assert_eq!(parse_range("-100", 1000), Some((900, 999)));
        assert_eq!(parse_range("-5000", 1000), Some((0, 999)));
    }

    #[test]
    fn test_parse_range_unsatisfiable() {
        assert_eq!(parse_range("1000-", 1000), None);
        assert_eq!(parse_range("600-500", 1000), None);
        assert_eq!(parse_range("abc", 1000), None);
    }

    #[test]
    fn test_header_valid() {
        let h = header("Content-Type", types::CSS).unwrap();
        assert!(h.field.equiv("content-type"));
        assert_eq!(h.value.as_str(), types::CSS);
        assert!(header("X-Name", "caf\u{e9}").is_none());
    }
}
