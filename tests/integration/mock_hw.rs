//! Mock hardware for integration tests.
//!
//! Records every relay write and every settle delay, in order, into one
//! shared log so tests can replay the exact output history.  The log is
//! behind `Arc<Mutex<_>>` because the controller lives on the control
//! thread while tests inspect it from the test thread.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use hvacrelay::app::ports::RelayPort;
use hvacrelay::error::ActuatorError;
use hvacrelay::fsm::{Level, is_valid_snapshot};
use hvacrelay::pins::RELAY_COUNT;

// ── Hardware call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwCall {
    Set { channel: usize, level: Level },
    Delay { ms: u32 },
}

#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<HwCall>>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<HwCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn push(&self, call: HwCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Replay the log from `start` and return the output snapshot seen at
    /// every settle delay plus the final one.
    pub fn snapshots(&self, start: [Level; RELAY_COUNT]) -> Vec<[Level; RELAY_COUNT]> {
        let mut levels = start;
        let mut out = Vec::new();
        for call in self.calls() {
            match call {
                HwCall::Set { channel, level } => levels[channel] = level,
                HwCall::Delay { .. } => out.push(levels),
            }
        }
        out.push(levels);
        out
    }

    /// Every observable snapshot (during settles and at rest) is valid.
    pub fn all_snapshots_valid(&self, start: [Level; RELAY_COUNT]) -> bool {
        self.snapshots(start).iter().all(is_valid_snapshot)
    }

    pub fn make_relays(&self) -> MockRelays {
        MockRelays {
            recorder: self.clone(),
            levels: [Level::High; RELAY_COUNT],
            fail_on_write: None,
            writes: 0,
        }
    }

    pub fn make_delay(&self, real_sleep: bool) -> MockDelay {
        MockDelay {
            recorder: self.clone(),
            real_sleep,
        }
    }
}

// ── MockRelays ────────────────────────────────────────────────

/// Four recorded outputs.  Powers up all-high (stale state) so tests can
/// see the startup forcing.
pub struct MockRelays {
    recorder: Recorder,
    levels: [Level; RELAY_COUNT],
    fail_on_write: Option<usize>,
    writes: usize,
}

#[allow(dead_code)]
impl MockRelays {
    /// Fail the `n`th write (0-based, counted from now) once.
    pub fn fail_on_write(mut self, n: usize) -> Self {
        self.fail_on_write = Some(self.writes + n);
        self
    }
}

impl RelayPort for MockRelays {
    fn set(&mut self, channel: usize, level: Level) -> Result<(), ActuatorError> {
        assert!(channel < RELAY_COUNT, "relay channel {channel} out of range");
        let n = self.writes;
        self.writes += 1;
        if self.fail_on_write == Some(n) {
            return Err(ActuatorError::GpioWriteFailed);
        }
        self.levels[channel] = level;
        self.recorder.push(HwCall::Set { channel, level });
        Ok(())
    }

    fn levels(&self) -> [Level; RELAY_COUNT] {
        self.levels
    }
}

// ── MockDelay ─────────────────────────────────────────────────

pub struct MockDelay {
    recorder: Recorder,
    real_sleep: bool,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.delay_us(ns.div_ceil(1_000));
    }

    fn delay_us(&mut self, us: u32) {
        self.delay_ms(us.div_ceil(1_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.recorder.push(HwCall::Delay { ms });
        if self.real_sleep {
            std::thread::sleep(Duration::from_millis(u64::from(ms)));
        }
    }
}
