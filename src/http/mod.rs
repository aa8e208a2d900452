//! Plain-text HTTP request server.
//!
//! | Module     | Role                                              |
//! |------------|---------------------------------------------------|
//! | `request`  | Bounded request buffer and request-line parsing   |
//! | `response` | Status codes and response encoding                |
//! | `router`   | Method/path routing and dispatch to the controller|
//! | `page`     | Embedded control page                             |
//! | `server`   | Listener, worker pool, per-connection I/O         |

pub mod page;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use server::HttpServer;
