//! Live-reload client injection into HTML responses.

/// Insert `tag` before the last `</body>`, or append it when there is none.
pub fn inject_script(content: &[u8], tag: &str) -> Vec<u8> {
    const PATTERN: &[u8] = b"</body>";

    let tag = tag.as_bytes();
    let mut result = Vec::with_capacity(content.len() + tag.len());

    match content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        Some(pos) => {
            result.extend_from_slice(&content[..pos]);
            result.extend_from_slice(tag);
            result.extend_from_slice(&content[pos..]);
        }
        None => {
            result.extend_from_slice(content);
            result.extend_from_slice(tag);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG: &str = "<script src=\"/__brisk/livereload.js\" async></script>";

    #[test]
    fn test_inject_before_body_close() {
        let html = b"<html><body><p>hi</p></body></html>";
        let out = String::from_utf8(inject_script(html, TAG)).unwrap();
        assert_eq!(
            out,
            format!("<html><body><p>hi</p>{TAG}</body></html>")
        );
    }

    #[test]
    fn test_inject_uses_last_body_close() {
        let html = b"<body><script>var s = '</body>';</script></BODY>";
        let out = String::from_utf8(inject_script(html, TAG)).unwrap();
        assert!(out.ends_with(&format!("{TAG}</BODY>")));
        assert_eq!(out.matches(TAG).count(), 1);
    }

    #[test]
    fn test_inject_without_body_appends() {
        let out = String::from_utf8(inject_script(b"<p>fragment</p>", TAG)).unwrap();
        assert_eq!(out, format!("<p>fragment</p>{TAG}"));
    }
}
