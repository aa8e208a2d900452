//! Request framing and parsing.
//!
//! The protocol is a small subset of HTTP/1.1: one request per connection,
//! request line + headers + optional body.  [`RequestBuffer`] accumulates
//! bytes until a request is complete; [`parse`] splits the text into
//! method, path and body.
//!
//! Headers other than `Content-Length` are ignored.

use std::borrow::Cow;

/// Largest request the server buffers.  Anything beyond is dropped and the
/// buffered prefix is parsed as-is.
pub const MAX_REQUEST_BYTES: usize = 1024;

const HEADER_END: &[u8] = b"\r\n\r\n";

// ── Parse errors ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// No bytes at all.
    Empty,
    /// The request line lacks a method or a path.
    MalformedRequestLine,
}

impl core::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty request"),
            Self::MalformedRequestLine => write!(f, "malformed request line"),
        }
    }
}

// ── Parsed request ───────────────────────────────────────────

/// Borrowed view of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub body: &'a str,
}

/// Split raw request text into method, path and body.
///
/// The body is everything after the blank line, cut to `Content-Length`
/// when that header is present and shorter.
pub fn parse(text: &str) -> Result<Request<'_>, ProtocolError> {
    if text.is_empty() {
        return Err(ProtocolError::Empty);
    }

    let (head, body) = text.split_once("\r\n\r\n").unwrap_or((text, ""));
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();

    let mut parts = request_line.split(' ');
    let method = parts
        .next()
        .filter(|m| !m.is_empty())
        .ok_or(ProtocolError::MalformedRequestLine)?;
    let path = parts
        .next()
        .filter(|p| !p.is_empty())
        .ok_or(ProtocolError::MalformedRequestLine)?;

    let body = match lines.find_map(content_length) {
        Some(len) if len < body.len() => body.get(..len).unwrap_or(body),
        _ => body,
    };

    Ok(Request { method, path, body })
}

/// Value of a `Content-Length` header line, if `line` is one.
fn content_length(line: &str) -> Option<usize> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse().ok()
}

// ── Framing ──────────────────────────────────────────────────

/// Bounded accumulator for one inbound request.
pub struct RequestBuffer {
    buf: heapless::Vec<u8, MAX_REQUEST_BYTES>,
}

impl Default for RequestBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuffer {
    pub fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
        }
    }

    /// Append bytes, dropping whatever does not fit.  Returns the number of
    /// bytes kept.
    pub fn feed(&mut self, data: &[u8]) -> usize {
        let room = MAX_REQUEST_BYTES - self.buf.len();
        let take = data.len().min(room);
        // Cannot fail: `take` never exceeds the remaining capacity.
        let _ = self.buf.extend_from_slice(&data[..take]);
        take
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.is_full()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Headers have ended and the declared body (if any) has arrived.
    pub fn is_complete(&self) -> bool {
        let Some(header_end) = self
            .buf
            .windows(HEADER_END.len())
            .position(|w| w == HEADER_END)
        else {
            return false;
        };

        let head = String::from_utf8_lossy(&self.buf[..header_end]);
        let declared = head.split("\r\n").skip(1).find_map(content_length).unwrap_or(0);
        let received = self.buf.len() - (header_end + HEADER_END.len());
        received >= declared
    }

    /// Buffered bytes as text; invalid UTF-8 is replaced, not rejected.
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buf)
    }

    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get_without_body() {
        let req = parse("GET /status HTTP/1.1\r\nHost: relay\r\n\r\n").unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/status");
        assert_eq!(req.body, "");
    }

    #[test]
    fn parses_post_body() {
        let req = parse("POST /mode HTTP/1.1\r\nContent-Length: 8\r\n\r\noverride").unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/mode");
        assert_eq!(req.body, "override");
    }

    #[test]
    fn body_is_cut_to_content_length() {
        let req = parse("POST /mode HTTP/1.1\r\ncontent-length: 6\r\n\r\nbypassGARBAGE").unwrap();
        assert_eq!(req.body, "bypass");
    }

    #[test]
    fn request_line_without_headers_still_parses() {
        let req = parse("GET /").unwrap();
        assert_eq!((req.method, req.path), ("GET", "/"));
    }

    #[test]
    fn rejects_empty_and_single_token_lines() {
        assert_eq!(parse(""), Err(ProtocolError::Empty));
        assert_eq!(parse("GET"), Err(ProtocolError::MalformedRequestLine));
        assert_eq!(parse("\r\n\r\n"), Err(ProtocolError::MalformedRequestLine));
        assert_eq!(parse(" /status"), Err(ProtocolError::MalformedRequestLine));
    }

    #[test]
    fn buffer_waits_for_header_terminator() {
        let mut b = RequestBuffer::new();
        b.feed(b"GET /status HTTP/1.1\r\n");
        assert!(!b.is_complete());
        b.feed(b"\r\n");
        assert!(b.is_complete());
    }

    #[test]
    fn buffer_waits_for_declared_body() {
        let mut b = RequestBuffer::new();
        b.feed(b"POST /mode HTTP/1.1\r\nContent-Length: 6\r\n\r\nbyp");
        assert!(!b.is_complete());
        b.feed(b"ass");
        assert!(b.is_complete());
        assert_eq!(parse(&b.as_text()).unwrap().body, "bypass");
    }

    #[test]
    fn buffer_truncates_at_capacity() {
        let mut b = RequestBuffer::new();
        let big = vec![b'a'; MAX_REQUEST_BYTES + 100];
        assert_eq!(b.feed(&big), MAX_REQUEST_BYTES);
        assert!(b.is_full());
        assert_eq!(b.feed(b"more"), 0);
        b.reset();
        assert!(b.is_empty());
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut b = RequestBuffer::new();
        b.feed(b"GET /\xff HTTP/1.1\r\n\r\n");
        let text = b.as_text();
        let req = parse(&text).unwrap();
        assert_eq!(req.method, "GET");
        assert_ne!(req.path, "/");
    }
}
