//! Fuzz target: request framing, parsing and routing
//!
//! Splits arbitrary input into two chunks, feeds both through the bounded
//! request buffer, then parses and routes the result.  None of it may
//! panic, and the buffer must never grow past its capacity.
//!
//! cargo fuzz run fuzz_request_parser

#![no_main]

use hvacrelay::http::request::{MAX_REQUEST_BYTES, RequestBuffer, parse};
use hvacrelay::http::router::route;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let split = data.first().map_or(0, |&b| usize::from(b)).min(data.len());
    let (a, b) = data.split_at(split);

    let mut buf = RequestBuffer::new();
    buf.feed(a);
    let _ = buf.is_complete();
    buf.feed(b);
    assert!(buf.len() <= MAX_REQUEST_BYTES, "buffer exceeded capacity");

    let text = buf.as_text();
    if let Ok(req) = parse(&text) {
        assert!(!req.method.is_empty() && !req.path.is_empty());
        assert!(req.body.len() <= text.len());
    }
    let _ = route(&text);
});
