//! Request server: reactor-driven worker pool over one TCP listener.
//!
//! Runs in a dedicated thread using `edge-executor` for cooperative
//! scheduling and `async-io-mini` timers for polling back-off.  Each of the
//! `http_workers` tasks owns one connection at a time:
//!
//! 1. **Accept**: polls the non-blocking listener every 50ms
//! 2. **Read**: accumulates up to 1024 bytes until the request is complete
//!    or the per-connection deadline passes
//! 3. **Dispatch**: routes, then awaits the control task's reply
//! 4. **Write**: sends the response and closes the connection
//!
//! A worker blocked on a mode change only parks its own future; the other
//! workers keep serving status reads meanwhile (those queue behind the
//! transition on the control task and see the committed mode).
//!
//! ```text
//!  ┌────────────────────────────────────────────────────┐
//!  │  http-io thread                                    │
//!  │  ┌──────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                │  │
//!  │  │  ┌──────────┐ ┌──────────┐                   │  │
//!  │  │  │ worker 0 │ │ worker 1 │  ...  (N ≤ 8)     │  │
//!  │  │  └────┬─────┘ └────┬─────┘                   │  │
//!  │  └───────┼────────────┼─────────────────────────┘  │
//!  └──────────┼────────────┼────────────────────────────┘
//!             └─────┬──────┘
//!                   ▼  ControlHandle
//!             control thread
//! ```

use core::time::Duration;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::rc::Rc;
use std::time::Instant;

use log::{debug, info, warn};

use crate::app::control::ControlHandle;
use crate::config::{MAX_HTTP_WORKERS, SystemConfig};
use crate::drivers::task_pin::{self, Core};
use crate::error::CommsError;

use super::request::RequestBuffer;
use super::router;

const ACCEPT_POLL: Duration = Duration::from_millis(50);
const IO_POLL: Duration = Duration::from_millis(5);
const READ_CHUNK: usize = 256;

pub struct HttpServer {
    listener: TcpListener,
    workers: u8,
    request_timeout: Duration,
}

impl HttpServer {
    /// Bind the listening socket on all interfaces at `config.http_port`.
    ///
    /// Port 0 picks an ephemeral port; see [`local_addr`](Self::local_addr).
    pub fn bind(config: &SystemConfig) -> Result<Self, CommsError> {
        let listener = listen(config.http_port, config.listen_backlog)?;
        listener.set_nonblocking(true).map_err(|e| {
            warn!("HTTP: set_nonblocking failed: {}", e);
            CommsError::BindFailed
        })?;

        Ok(Self {
            listener,
            workers: config.http_workers.clamp(1, MAX_HTTP_WORKERS),
            request_timeout: Duration::from_millis(config.request_timeout_ms.into()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, CommsError> {
        self.listener
            .local_addr()
            .map_err(|_| CommsError::BindFailed)
    }

    /// Serve forever on the calling thread.
    pub fn run(self, control: ControlHandle) {
        let executor: edge_executor::LocalExecutor<'_, { MAX_HTTP_WORKERS as usize }> =
            edge_executor::LocalExecutor::new();

        let listener = Rc::new(self.listener);
        for id in 0..self.workers {
            executor
                .spawn(worker(
                    id,
                    listener.clone(),
                    control.clone(),
                    self.request_timeout,
                ))
                .detach();
        }

        info!(
            "HTTP server started ({} workers, {}ms request timeout)",
            self.workers,
            self.request_timeout.as_millis()
        );

        futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
    }

    /// Spawn the server thread on Core 0 (PRO_CPU), next to lwIP.
    pub fn spawn(self, control: ControlHandle) -> std::io::Result<std::thread::JoinHandle<()>> {
        task_pin::spawn_on_core(Core::Pro, 12, 16, "http-io\0", move || self.run(control))
    }
}

// ── Worker ───────────────────────────────────────────────────

async fn worker(id: u8, listener: Rc<TcpListener>, control: ControlHandle, timeout: Duration) {
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!("HTTP[{}]: connection from {}", id, peer);
                if let Err(e) = serve_connection(stream, &control, timeout).await {
                    warn!("HTTP[{}]: {} ({})", id, e, peer);
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                async_io_mini::Timer::after(ACCEPT_POLL).await;
            }
            Err(e) => {
                warn!("HTTP[{}]: accept failed: {}", id, e);
                async_io_mini::Timer::after(ACCEPT_POLL).await;
            }
        }
    }
}

/// Handle exactly one request on `stream`, then close it.
async fn serve_connection(
    mut stream: TcpStream,
    control: &ControlHandle,
    timeout: Duration,
) -> Result<(), CommsError> {
    stream
        .set_nonblocking(true)
        .map_err(|_| CommsError::AcceptFailed)?;

    let mut request = RequestBuffer::new();
    read_request(&mut stream, &mut request, timeout).await?;
    if request.is_empty() {
        debug!("HTTP: peer closed without sending a request");
        return Ok(());
    }

    let route = router::route(&request.as_text());
    debug!("HTTP: {:?}", route);
    let response = router::dispatch(route, control).await;

    write_all(&mut stream, &response.encode(), timeout).await?;
    let _ = stream.shutdown(Shutdown::Both);
    Ok(())
}

/// Fill `buf` until the request is complete, the buffer is full, the peer
/// closes, or the deadline passes.  Only a deadline with nothing received
/// is an error; a partial request is handed to the parser as-is.
async fn read_request(
    stream: &mut TcpStream,
    buf: &mut RequestBuffer,
    timeout: Duration,
) -> Result<(), CommsError> {
    let deadline = Instant::now() + timeout;
    let mut chunk = [0u8; READ_CHUNK];

    while !buf.is_complete() && !buf.is_full() {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.feed(&chunk[..n]);
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    if buf.is_empty() {
                        return Err(CommsError::Timeout);
                    }
                    debug!("HTTP: deadline hit with {} bytes buffered", buf.len());
                    break;
                }
                async_io_mini::Timer::after(IO_POLL).await;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(_) => return Err(CommsError::ReadFailed),
        }
    }
    Ok(())
}

async fn write_all(
    stream: &mut TcpStream,
    mut data: &[u8],
    timeout: Duration,
) -> Result<(), CommsError> {
    let deadline = Instant::now() + timeout;

    while !data.is_empty() {
        match stream.write(data) {
            Ok(0) => return Err(CommsError::WriteFailed),
            Ok(n) => data = &data[n..],
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(CommsError::Timeout);
                }
                async_io_mini::Timer::after(IO_POLL).await;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(_) => return Err(CommsError::WriteFailed),
        }
    }
    let _ = stream.flush();
    Ok(())
}

// ── Listener setup ───────────────────────────────────────────

/// lwIP listener with an explicit accept backlog.
#[cfg(target_os = "espidf")]
fn listen(port: u16, backlog: u8) -> Result<TcpListener, CommsError> {
    use std::os::fd::FromRawFd;

    use esp_idf_svc::sys::{
        AF_INET, SOCK_STREAM, in_addr, lwip_bind, lwip_close, lwip_htons, lwip_listen,
        lwip_socket, sockaddr_in,
    };

    // SAFETY: lwIP socket call with valid domain/type/protocol.
    let fd = unsafe { lwip_socket(AF_INET as _, SOCK_STREAM as _, 0) };
    if fd < 0 {
        warn!("HTTP: lwip_socket failed ({})", fd);
        return Err(CommsError::BindFailed);
    }

    let addr = sockaddr_in {
        sin_len: 0,
        sin_family: AF_INET as _,
        // SAFETY: lwip_htons takes a u16 and returns the network-byte-order value.
        sin_port: unsafe { lwip_htons(port) },
        sin_addr: in_addr { s_addr: 0 }, // INADDR_ANY
        sin_zero: [0u8; 8],
    };

    // SAFETY: `addr` is valid for the bind() call; errors are checked.
    let rc = unsafe {
        lwip_bind(
            fd,
            core::ptr::addr_of!(addr).cast(),
            core::mem::size_of::<sockaddr_in>() as _,
        )
    };
    if rc < 0 {
        // SAFETY: fd was opened above and is closed exactly once.
        unsafe {
            lwip_close(fd);
        }
        warn!("HTTP: lwip_bind on port {} failed ({})", port, rc);
        return Err(CommsError::BindFailed);
    }

    // SAFETY: fd is a bound stream socket.
    let rc = unsafe { lwip_listen(fd, backlog.into()) };
    if rc < 0 {
        // SAFETY: as above.
        unsafe {
            lwip_close(fd);
        }
        warn!("HTTP: lwip_listen failed ({})", rc);
        return Err(CommsError::BindFailed);
    }

    info!("HTTP: listening on port {} (backlog {})", port, backlog);
    // SAFETY: fd is a listening socket owned by nobody else; the returned
    // listener takes over closing it.
    Ok(unsafe { TcpListener::from_raw_fd(fd) })
}

/// Host listener.  std picks its own backlog.
#[cfg(not(target_os = "espidf"))]
fn listen(port: u16, backlog: u8) -> Result<TcpListener, CommsError> {
    let listener = TcpListener::bind(("0.0.0.0", port)).map_err(|e| {
        warn!("HTTP: bind on port {} failed: {}", port, e);
        CommsError::BindFailed
    })?;
    info!(
        "HTTP: listening on {} (sim, backlog {} not applied)",
        listener.local_addr().map_err(|_| CommsError::BindFailed)?,
        backlog
    );
    Ok(listener)
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    fn ephemeral() -> SystemConfig {
        SystemConfig {
            http_port: 0,
            ..SystemConfig::default()
        }
    }

    #[test]
    fn binds_ephemeral_port() {
        let server = HttpServer::bind(&ephemeral()).unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
        assert_eq!(server.workers, 4);
    }

    #[test]
    fn second_bind_on_same_port_fails() {
        let first = HttpServer::bind(&ephemeral()).unwrap();
        let taken = SystemConfig {
            http_port: first.local_addr().unwrap().port(),
            ..SystemConfig::default()
        };
        assert_eq!(HttpServer::bind(&taken).err(), Some(CommsError::BindFailed));
    }

    #[test]
    fn worker_count_is_clamped_to_executor_capacity() {
        let cfg = SystemConfig {
            http_workers: 200,
            ..ephemeral()
        };
        let server = HttpServer::bind(&cfg).unwrap();
        assert_eq!(server.workers, MAX_HTTP_WORKERS);
    }
}
