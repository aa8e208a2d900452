//! Control task: single owner of the [`ModeController`].
//!
//! Every status read and mode change is a message on one bounded
//! `embassy-sync` channel, served in FIFO order by a dedicated thread.
//! Because exactly one thread owns the controller, a transition (including
//! its 200 ms settle) always completes before the next request is looked
//! at: two `set_mode` calls can never interleave their writes.
//!
//! ```text
//! ┌──────────────┐  ControlMsg   ┌────────────────────┐
//! │ HTTP workers │──────────────▶│  Control thread    │
//! │  (async)     │◀──────────────│  ModeController    │
//! └──────────────┘  Signal reply └────────────────────┘
//! ```

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embedded_hal::delay::DelayNs;
use log::info;

use crate::drivers::task_pin::{self, Core};
use crate::error::ActuatorError;
use crate::fsm::Mode;

use super::controller::ModeController;
use super::ports::{EventSink, RelayPort};

/// Pending requests the control task will queue before senders wait.
const CONTROL_DEPTH: usize = 8;

// ── Messages ─────────────────────────────────────────────────

/// Requests served by the control task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    GetStatus,
    SetMode(Mode),
}

/// Reply to a [`ControlCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlReply {
    /// Current mode (answer to `GetStatus`).
    Status(Mode),
    /// The requested mode is now in effect.
    ModeSet(Mode),
    /// The transition failed; outputs were released.
    Fault(ActuatorError),
}

type ReplySignal = Signal<CriticalSectionRawMutex, ControlReply>;

/// One queued request together with the signal its reply is posted on.
pub struct ControlMsg {
    pub cmd: ControlCommand,
    reply: Arc<ReplySignal>,
}

type ControlChannel = Channel<CriticalSectionRawMutex, ControlMsg, CONTROL_DEPTH>;

// ── Handle ───────────────────────────────────────────────────

/// Cloneable client side of the control task.
#[derive(Clone)]
pub struct ControlHandle {
    channel: Arc<ControlChannel>,
}

impl ControlHandle {
    /// Queue `cmd` and wait for its reply.
    pub async fn request(&self, cmd: ControlCommand) -> ControlReply {
        let reply = Arc::new(ReplySignal::new());
        self.channel
            .send(ControlMsg {
                cmd,
                reply: reply.clone(),
            })
            .await;
        reply.wait().await
    }

    pub async fn status(&self) -> Mode {
        match self.request(ControlCommand::GetStatus).await {
            ControlReply::Status(mode) | ControlReply::ModeSet(mode) => mode,
            // A status read never faults; Bypass is what a faulted
            // controller reports anyway.
            ControlReply::Fault(_) => Mode::Bypass,
        }
    }

    pub async fn set_mode(&self, mode: Mode) -> Result<Mode, ActuatorError> {
        match self.request(ControlCommand::SetMode(mode)).await {
            ControlReply::ModeSet(mode) | ControlReply::Status(mode) => Ok(mode),
            ControlReply::Fault(e) => Err(e),
        }
    }

    /// Blocking variant of [`status`](Self::status) for non-async callers.
    pub fn status_blocking(&self) -> Mode {
        futures_lite::future::block_on(self.status())
    }

    /// Blocking variant of [`set_mode`](Self::set_mode) for non-async callers.
    pub fn set_mode_blocking(&self, mode: Mode) -> Result<Mode, ActuatorError> {
        futures_lite::future::block_on(self.set_mode(mode))
    }
}

// ── Task ─────────────────────────────────────────────────────

/// Server side of the control task.  Owns the controller.
pub struct ControlTask<R, D, S> {
    controller: ModeController<R, D, S>,
    channel: Arc<ControlChannel>,
}

impl<R, D, S> ControlTask<R, D, S>
where
    R: RelayPort,
    D: DelayNs,
    S: EventSink,
{
    /// Wrap an initialised controller and return the task plus its handle.
    pub fn new(controller: ModeController<R, D, S>) -> (Self, ControlHandle) {
        let channel = Arc::new(ControlChannel::new());
        let handle = ControlHandle {
            channel: channel.clone(),
        };
        (
            Self {
                controller,
                channel,
            },
            handle,
        )
    }

    /// Serve one queued request, if any.  Returns `false` when idle.
    #[cfg(test)]
    fn poll_once(&mut self) -> bool {
        match self.channel.try_receive() {
            Ok(msg) => {
                self.handle(msg);
                true
            }
            Err(_) => false,
        }
    }

    /// Serve requests forever.
    pub fn run(mut self) -> ! {
        info!("Control task running (mode={})", self.controller.mode());
        loop {
            let msg = futures_lite::future::block_on(self.channel.receive());
            self.handle(msg);
        }
    }

    fn handle(&mut self, msg: ControlMsg) {
        let reply = match msg.cmd {
            ControlCommand::GetStatus => ControlReply::Status(self.controller.mode()),
            ControlCommand::SetMode(mode) => match self.controller.set_mode(mode) {
                Ok(()) => ControlReply::ModeSet(self.controller.mode()),
                Err(e) => ControlReply::Fault(e),
            },
        };
        msg.reply.signal(reply);
    }
}

impl<R, D, S> ControlTask<R, D, S>
where
    R: RelayPort + Send + 'static,
    D: DelayNs + Send + 'static,
    S: EventSink + Send + 'static,
{
    /// Spawn the control thread on the application core.
    pub fn spawn(self) -> std::io::Result<std::thread::JoinHandle<()>> {
        task_pin::spawn_on_core(Core::App, 10, 8, "control\0", move || self.run())
    }
}
