//! Static control page served at `/`.

/// Embedded at build time; polls `/status` and posts to `/mode`.
pub const INDEX_HTML: &str = include_str!("../../assets/index.html");
