//! End-to-end request handling over loopback TCP.
//!
//! Each test binds its own server on an ephemeral port, backed by a control
//! task over recorded hardware.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use hvacrelay::adapters::log_sink::LogEventSink;
use hvacrelay::app::control::ControlTask;
use hvacrelay::app::controller::ModeController;
use hvacrelay::config::SystemConfig;
use hvacrelay::fsm::{Level, Mode};
use hvacrelay::http::HttpServer;
use hvacrelay::pins::RELAY_COUNT;

use crate::mock_hw::Recorder;

struct Reply {
    status: u16,
    head: String,
    body: String,
}

fn start(config: SystemConfig, real_sleep: bool) -> (SocketAddr, Recorder) {
    let rec = Recorder::new();
    let mut c = ModeController::new(
        rec.make_relays(),
        rec.make_delay(real_sleep),
        LogEventSink::new(),
    );
    c.init().unwrap();
    rec.clear();
    let (task, handle) = ControlTask::new(c);
    task.spawn().unwrap();

    let server = HttpServer::bind(&config).unwrap();
    let port = server.local_addr().unwrap().port();
    server.spawn(handle).unwrap();
    (SocketAddr::from(([127, 0, 0, 1], port)), rec)
}

fn ephemeral() -> SystemConfig {
    SystemConfig {
        http_port: 0,
        ..SystemConfig::default()
    }
}

fn send(addr: SocketAddr, raw: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    stream.write_all(raw).unwrap();
    let mut out = String::new();
    stream.read_to_string(&mut out).unwrap();
    out
}

fn request(addr: SocketAddr, raw: &str) -> Reply {
    let text = send(addr, raw.as_bytes());
    let (head, body) = text.split_once("\r\n\r\n").expect("no header terminator");
    let status = head
        .split(' ')
        .nth(1)
        .and_then(|s| s.parse().ok())
        .expect("no status code");
    Reply {
        status,
        head: head.to_owned(),
        body: body.to_owned(),
    }
}

fn get(addr: SocketAddr, path: &str) -> Reply {
    request(addr, &format!("GET {path} HTTP/1.1\r\nHost: relay\r\n\r\n"))
}

fn post_mode(addr: SocketAddr, body: &str) -> Reply {
    request(
        addr,
        &format!(
            "POST /mode HTTP/1.1\r\nHost: relay\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        ),
    )
}

// ── Routing ───────────────────────────────────────────────────

#[test]
fn root_serves_control_page() {
    let (addr, _) = start(ephemeral(), false);
    let r = get(addr, "/");
    assert_eq!(r.status, 200);
    assert!(r.head.contains("Content-Type: text/html"));
    assert!(r.body.contains("<title>HVAC Relay Controller</title>"));
    assert!(r.head.contains(&format!("Content-Length: {}", r.body.len())));
    assert!(r.head.contains("Connection: close"));
}

#[test]
fn status_starts_in_bypass() {
    let (addr, _) = start(ephemeral(), false);
    let r = get(addr, "/status");
    assert_eq!(r.status, 200);
    assert!(r.head.contains("Content-Type: text/plain"));
    assert_eq!(r.body, "bypass");
}

#[test]
fn override_then_bypass() {
    let (addr, rec) = start(ephemeral(), false);

    let r = post_mode(addr, "override");
    assert_eq!((r.status, r.body.as_str()), (200, "OK"));
    assert_eq!(get(addr, "/status").body, "override");
    assert_eq!(
        rec.snapshots([Level::Low; RELAY_COUNT]).last(),
        Some(&Mode::Override.levels())
    );

    let r = post_mode(addr, "bypass");
    assert_eq!((r.status, r.body.as_str()), (200, "OK"));
    assert_eq!(get(addr, "/status").body, "bypass");
    assert!(rec.all_snapshots_valid([Level::Low; RELAY_COUNT]));
}

#[test]
fn mode_body_whitespace_is_ignored() {
    let (addr, _) = start(ephemeral(), false);
    assert_eq!(post_mode(addr, "  override\r\n").status, 200);
    assert_eq!(get(addr, "/status").body, "override");
}

#[test]
fn invalid_mode_is_rejected_without_side_effects() {
    let (addr, rec) = start(ephemeral(), false);
    for body in ["sideways", "Override", ""] {
        let r = post_mode(addr, body);
        assert_eq!((r.status, r.body.as_str()), (400, "Invalid mode"));
    }
    assert!(rec.calls().is_empty());
    assert_eq!(get(addr, "/status").body, "bypass");
}

#[test]
fn unknown_routes_are_not_found() {
    let (addr, _) = start(ephemeral(), false);
    for raw in [
        "GET /unknown HTTP/1.1\r\n\r\n",
        "POST /status HTTP/1.1\r\n\r\n",
        "GET /mode HTTP/1.1\r\n\r\n",
    ] {
        let r = request(addr, raw);
        assert_eq!((r.status, r.body.as_str()), (404, "Not Found"));
    }
}

#[test]
fn malformed_request_line_is_bad_request() {
    let (addr, _) = start(ephemeral(), false);
    let r = request(addr, "GARBAGE\r\n\r\n");
    assert_eq!((r.status, r.body.as_str()), (400, "Bad Request"));
}

// ── Framing and timeouts ──────────────────────────────────────

#[test]
fn silent_client_is_closed_without_response() {
    let cfg = SystemConfig {
        request_timeout_ms: 300,
        ..ephemeral()
    };
    let (addr, _) = start(cfg, false);

    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    assert!(out.is_empty());

    // The worker is free again afterwards.
    assert_eq!(get(addr, "/status").status, 200);
}

#[test]
fn silent_clients_do_not_starve_new_connections() {
    let (addr, _) = start(ephemeral(), false);
    let _idle: Vec<TcpStream> = (0..2).map(|_| TcpStream::connect(addr).unwrap()).collect();
    thread::sleep(Duration::from_millis(150));

    let started = Instant::now();
    let r = get(addr, "/status");
    assert_eq!((r.status, r.body.as_str()), (200, "bypass"));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn partial_request_is_parsed_at_deadline() {
    let cfg = SystemConfig {
        request_timeout_ms: 300,
        ..ephemeral()
    };
    let (addr, _) = start(cfg, false);

    // No header terminator ever arrives.
    let r = request(addr, "GET /status HTTP/1.1\r\nHost: relay\r\n");
    assert_eq!((r.status, r.body.as_str()), (200, "bypass"));
}

// ── Concurrency ───────────────────────────────────────────────

#[test]
fn status_during_transition_waits_for_commit() {
    let (addr, rec) = start(ephemeral(), true);

    let setter = thread::spawn(move || post_mode(addr, "override"));
    // Well inside the 200 ms settle.
    thread::sleep(Duration::from_millis(100));
    assert_eq!(get(addr, "/status").body, "override");

    assert_eq!(setter.join().unwrap().status, 200);
    assert!(rec.all_snapshots_valid([Level::Low; RELAY_COUNT]));
}

#[test]
fn concurrent_mode_changes_keep_outputs_valid() {
    let (addr, rec) = start(ephemeral(), true);

    let clients: Vec<_> = ["override", "bypass", "override", "bypass", "override"]
        .into_iter()
        .map(|m| thread::spawn(move || post_mode(addr, m)))
        .collect();
    for c in clients {
        assert_eq!(c.join().unwrap().status, 200);
    }

    assert!(rec.all_snapshots_valid([Level::Low; RELAY_COUNT]));
    let mode: Mode = get(addr, "/status").body.parse().unwrap();
    assert_eq!(
        rec.snapshots([Level::Low; RELAY_COUNT]).last(),
        Some(&mode.levels())
    );
}
