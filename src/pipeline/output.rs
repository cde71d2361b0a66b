//! Output writer shared by every stage.
//!
//! Text outputs get their line endings normalized; all outputs are compared
//! with what is already on disk and only rewritten when the bytes differ, so
//! an unchanged rebuild leaves mtimes (and browser caches) alone.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;

use crate::config::LineEnding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

#[derive(Debug, Clone, Copy)]
pub struct OutputWriter {
    line_ending: LineEnding,
}

impl OutputWriter {
    pub const fn new(line_ending: LineEnding) -> Self {
        Self { line_ending }
    }

    /// Write text with normalized line endings.
    pub fn write_text(&self, path: &Path, content: &str) -> io::Result<WriteOutcome> {
        let content = normalize_line_endings(content, self.line_ending);
        self.write_bytes(path, content.as_bytes())
    }

    /// Write bytes verbatim, creating parent directories as needed.
    pub fn write_bytes(&self, path: &Path, bytes: &[u8]) -> io::Result<WriteOutcome> {
        if fs::read(path).is_ok_and(|existing| existing == bytes) {
            return Ok(WriteOutcome::Unchanged);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(WriteOutcome::Written)
    }
}

/// Convert every `\r\n`, lone `\r` or `\n` to the configured line ending.
pub fn normalize_line_endings(text: &str, ending: LineEnding) -> Cow<'_, str> {
    let already_normal = match ending {
        LineEnding::Lf => !text.contains('\r'),
        LineEnding::Crlf => !text
            .char_indices()
            .any(|(i, c)| match c {
                '\n' => i == 0 || text.as_bytes()[i - 1] != b'\r',
                '\r' => text.as_bytes().get(i + 1) != Some(&b'\n'),
                _ => false,
            }),
    };
    if already_normal {
        return Cow::Borrowed(text);
    }

    let eol = ending.as_str();
    let mut out = String::with_capacity(text.len() + text.len() / 32);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str(eol);
            }
            '\n' => out.push_str(eol),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}
