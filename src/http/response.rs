//! Response formatting.
//!
//! Every response carries an exact `Content-Length` and `Connection: close`;
//! the server closes the socket after writing it.

use std::borrow::Cow;

/// Status codes the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    InternalServerError,
}

impl Status {
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::InternalServerError => 500,
        }
    }

    pub const fn reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
            Self::InternalServerError => "Internal Server Error",
        }
    }
}

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub content_type: &'static str,
    pub body: Cow<'static, str>,
}

impl Response {
    pub fn text(status: Status, body: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            body: body.into(),
        }
    }

    pub fn html(body: &'static str) -> Self {
        Self {
            status: Status::Ok,
            content_type: TEXT_HTML,
            body: Cow::Borrowed(body),
        }
    }

    /// Wire bytes: status line, headers, blank line, body.
    pub fn encode(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status.code(),
            self.status.reason(),
            self.content_type,
            self.body.len(),
            self.body,
        )
        .into_bytes()
    }
}
