//! Mode controller: the only component that writes relay outputs.
//!
//! [`ModeController`] owns the authoritative [`Mode`], the relay bank and
//! the settling delay.  It runs transitions synchronously: `set_mode`
//! returns only after both steps and the 200 ms settle have completed.
//!
//! The controller itself is a plain `&mut self` state machine.  Exclusion
//! across execution contexts comes from its single owner, the control task
//! in [`super::control`].
//!
//! ```text
//!   RelayPort ◀── ┌──────────────────┐ ──▶ EventSink
//!                 │  ModeController  │
//!     DelayNs ◀── └──────────────────┘
//! ```

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::error::ActuatorError;
use crate::fsm::{self, Level, Mode, RelayPair, SETTLE_DELAY_MS, Transition};

use super::events::AppEvent;
use super::ports::{EventSink, RelayPort};

// ───────────────────────────────────────────────────────────────
// ModeController
// ───────────────────────────────────────────────────────────────

pub struct ModeController<R, D, S> {
    relays: R,
    delay: D,
    sink: S,
    mode: Mode,
}

impl<R, D, S> ModeController<R, D, S>
where
    R: RelayPort,
    D: DelayNs,
    S: EventSink,
{
    /// Construct the controller.  Does **not** touch the outputs; call
    /// [`init`](Self::init) before serving any request.
    pub fn new(relays: R, delay: D, sink: S) -> Self {
        Self {
            relays,
            delay,
            sink,
            mode: Mode::Bypass,
        }
    }

    /// Force every output low and the mode to Bypass, regardless of what
    /// the hardware held before.
    pub fn init(&mut self) -> Result<(), ActuatorError> {
        self.relays.set_all(Mode::Bypass.levels())?;
        self.mode = Mode::Bypass;
        self.sink.emit(&AppEvent::Started(self.mode));
        info!("Relays forced to safe state, mode={}", self.mode);
        Ok(())
    }

    /// Current mode.  Never reflects a half-finished transition.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Last levels written to the bank.
    pub fn levels(&self) -> [Level; crate::pins::RELAY_COUNT] {
        self.relays.levels()
    }

    /// Run the transition to `requested`, blocking for the settle delay.
    ///
    /// A no-op (zero writes, zero delay) when already in `requested`.
    /// On a write failure the release sequence is attempted, the mode falls
    /// back to Bypass and the original error is returned.
    pub fn set_mode(&mut self, requested: Mode) -> Result<(), ActuatorError> {
        let from = self.mode;
        let transition = Transition::between(from, requested);
        if transition.is_none() {
            return Ok(());
        }

        info!("Mode transition {} -> {} ({:?})", from, requested, transition);
        self.sink.emit(&AppEvent::TransitionStarted { from, to: requested });

        for (i, step) in transition.steps().iter().enumerate() {
            if i > 0 {
                self.delay.delay_ms(SETTLE_DELAY_MS);
            }
            if let Err(e) = self.relays.set_pair(step.pair, step.level) {
                error!("Relay write failed during {} -> {}: {}", from, requested, e);
                self.fail_safe(e);
                return Err(e);
            }
        }

        self.mode = requested;
        self.sink.emit(&AppEvent::ModeChanged { from, to: requested });
        info!(
            "Mode is now {} (relays={})",
            self.mode,
            fsm::format_levels(&self.relays.levels())
        );
        Ok(())
    }

    /// Best-effort release sequence after a failed write.
    fn fail_safe(&mut self, cause: ActuatorError) {
        let secondary = self.relays.set_pair(RelayPair::Secondary, Level::Low);
        self.delay.delay_ms(SETTLE_DELAY_MS);
        let primary = self.relays.set_pair(RelayPair::Primary, Level::Low);

        let recovered = secondary.is_ok()
            && primary.is_ok()
            && self.relays.levels() == Mode::Bypass.levels();
        if !recovered {
            warn!(
                "Safe-state release incomplete (relays={})",
                fsm::format_levels(&self.relays.levels())
            );
        }

        self.mode = Mode::Bypass;
        self.sink.emit(&AppEvent::RelayFault {
            error: cause,
            recovered,
        });
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
