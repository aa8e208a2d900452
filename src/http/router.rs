//! Request routing and dispatch.
//!
//! | Method | Path      | Result                                        |
//! |--------|-----------|-----------------------------------------------|
//! | GET    | `/`       | 200 control page                              |
//! | GET    | `/status` | 200 `bypass` / `override`                     |
//! | POST   | `/mode`   | 200 `OK`, 400 `Invalid mode`, 500 `Relay fault` |
//! | other  | other     | 404 `Not Found`                               |
//!
//! A request line that cannot be parsed gets 400 `Bad Request`.

use log::{info, warn};

use crate::app::control::ControlHandle;
use crate::fsm::Mode;

use super::page::INDEX_HTML;
use super::request;
use super::response::{Response, Status};

/// Outcome of routing one request, before any shared state is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Page,
    Status,
    SetMode(Mode),
    InvalidMode,
    Malformed,
    NotFound,
}

/// Decide what a raw request asks for.  Pure; never blocks.
pub fn route(raw: &str) -> Route {
    let Ok(req) = request::parse(raw) else {
        return Route::Malformed;
    };

    match (req.method, req.path) {
        ("GET", "/") => Route::Page,
        ("GET", "/status") => Route::Status,
        ("POST", "/mode") => req
            .body
            .trim_matches(|c: char| c.is_ascii_whitespace())
            .parse()
            .map_or(Route::InvalidMode, Route::SetMode),
        _ => Route::NotFound,
    }
}

/// Execute a route against the control task and build the response.
///
/// `SetMode` waits for the full transition, settle delay included.
pub async fn dispatch(route: Route, control: &ControlHandle) -> Response {
    match route {
        Route::Page => Response::html(INDEX_HTML),
        Route::Status => Response::text(Status::Ok, control.status().await.as_str()),
        Route::SetMode(mode) => match control.set_mode(mode).await {
            Ok(mode) => {
                info!("HTTP: mode set to {}", mode);
                Response::text(Status::Ok, "OK")
            }
            Err(e) => {
                warn!("HTTP: mode change to {} failed: {}", mode, e);
                Response::text(Status::InternalServerError, "Relay fault")
            }
        },
        Route::InvalidMode => Response::text(Status::BadRequest, "Invalid mode"),
        Route::Malformed => Response::text(Status::BadRequest, "Bad Request"),
        Route::NotFound => Response::text(Status::NotFound, "Not Found"),
    }
}
