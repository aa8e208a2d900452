//! ModeController + control task against recorded hardware.

use std::thread;

use hvacrelay::adapters::log_sink::LogEventSink;
use hvacrelay::app::control::{ControlHandle, ControlTask};
use hvacrelay::app::controller::ModeController;
use hvacrelay::error::ActuatorError;
use hvacrelay::fsm::{Level, Mode, SETTLE_DELAY_MS};
use hvacrelay::pins::RELAY_COUNT;

use crate::mock_hw::{HwCall, MockDelay, MockRelays, Recorder};

use Level::{High, Low};

type Controller = ModeController<MockRelays, MockDelay, LogEventSink>;

fn controller(rec: &Recorder, real_sleep: bool) -> Controller {
    ModeController::new(rec.make_relays(), rec.make_delay(real_sleep), LogEventSink::new())
}

fn spawn_control(rec: &Recorder, real_sleep: bool) -> ControlHandle {
    let mut c = controller(rec, real_sleep);
    c.init().unwrap();
    rec.clear();
    let (task, handle) = ControlTask::new(c);
    task.spawn().unwrap();
    handle
}

fn set(channel: usize, level: Level) -> HwCall {
    HwCall::Set { channel, level }
}

const SETTLE: HwCall = HwCall::Delay {
    ms: SETTLE_DELAY_MS,
};

// ── Startup ───────────────────────────────────────────────────

#[test]
fn startup_forces_all_outputs_low_without_delay() {
    let rec = Recorder::new();
    let mut c = controller(&rec, false);
    c.init().unwrap();

    assert_eq!(c.mode(), Mode::Bypass);
    assert_eq!(c.levels(), [Low; RELAY_COUNT]);
    assert_eq!(
        rec.calls(),
        vec![set(0, Low), set(1, Low), set(2, Low), set(3, Low)]
    );
}

#[test]
fn startup_write_failure_is_reported() {
    let rec = Recorder::new();
    let mut c = ModeController::new(
        rec.make_relays().fail_on_write(2),
        rec.make_delay(false),
        LogEventSink::new(),
    );
    assert_eq!(c.init(), Err(ActuatorError::GpioWriteFailed));
}

// ── Transition ordering ───────────────────────────────────────

#[test]
fn full_cycle_write_and_delay_order() {
    let rec = Recorder::new();
    let mut c = controller(&rec, false);
    c.init().unwrap();
    rec.clear();

    c.set_mode(Mode::Override).unwrap();
    c.set_mode(Mode::Bypass).unwrap();

    assert_eq!(
        rec.calls(),
        vec![
            set(0, High),
            set(1, High),
            SETTLE,
            set(2, High),
            set(3, High),
            set(2, Low),
            set(3, Low),
            SETTLE,
            set(0, Low),
            set(1, Low),
        ]
    );
    assert!(rec.all_snapshots_valid([Low; RELAY_COUNT]));
}

#[test]
fn repeated_mode_is_silent() {
    let rec = Recorder::new();
    let mut c = controller(&rec, false);
    c.init().unwrap();
    rec.clear();

    c.set_mode(Mode::Bypass).unwrap();
    assert!(rec.calls().is_empty());

    c.set_mode(Mode::Override).unwrap();
    rec.clear();
    c.set_mode(Mode::Override).unwrap();
    assert!(rec.calls().is_empty());
}

#[test]
fn mid_transition_failure_releases_and_falls_back_to_bypass() {
    let rec = Recorder::new();
    let mut c = ModeController::new(
        // Four init writes, then the third transition write (channel 2) fails.
        rec.make_relays().fail_on_write(4 + 2),
        rec.make_delay(false),
        LogEventSink::new(),
    );
    c.init().unwrap();
    rec.clear();

    assert_eq!(c.set_mode(Mode::Override), Err(ActuatorError::GpioWriteFailed));
    assert_eq!(c.mode(), Mode::Bypass);
    assert_eq!(c.levels(), [Low; RELAY_COUNT]);
    assert!(rec.all_snapshots_valid([Low; RELAY_COUNT]));
}

// ── Serialisation through the control task ────────────────────

#[test]
fn control_task_reports_committed_mode() {
    let rec = Recorder::new();
    let handle = spawn_control(&rec, false);

    assert_eq!(handle.status_blocking(), Mode::Bypass);
    assert_eq!(handle.set_mode_blocking(Mode::Override), Ok(Mode::Override));
    assert_eq!(handle.status_blocking(), Mode::Override);
}

#[test]
fn concurrent_requests_never_interleave() {
    let rec = Recorder::new();
    let handle = spawn_control(&rec, true);

    let threads: Vec<_> = [Mode::Override, Mode::Bypass, Mode::Override, Mode::Bypass]
        .into_iter()
        .map(|mode| {
            let h = handle.clone();
            thread::spawn(move || h.set_mode_blocking(mode))
        })
        .collect();
    for t in threads {
        assert!(t.join().unwrap().is_ok());
    }

    // Each transition is exactly pair, settle, pair, with nothing in between.
    let calls = rec.calls();
    assert_eq!(calls.len() % 5, 0);
    for block in calls.chunks(5) {
        assert_eq!(block[2], SETTLE);
        let first: Vec<usize> = block[..2]
            .iter()
            .map(|c| match c {
                HwCall::Set { channel, .. } => *channel,
                HwCall::Delay { .. } => panic!("settle inside a pair"),
            })
            .collect();
        assert!(first == [0, 1] || first == [2, 3]);
    }
    assert!(rec.all_snapshots_valid([Low; RELAY_COUNT]));

    let final_mode = handle.status_blocking();
    let expected = final_mode.levels();
    assert_eq!(rec.snapshots([Low; RELAY_COUNT]).last(), Some(&expected));
}

#[test]
fn status_reads_during_transition_see_committed_mode() {
    let rec = Recorder::new();
    let handle = spawn_control(&rec, true);

    let h = handle.clone();
    let setter = thread::spawn(move || h.set_mode_blocking(Mode::Override));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let h = handle.clone();
            thread::spawn(move || h.status_blocking())
        })
        .collect();

    for r in readers {
        let seen = r.join().unwrap();
        assert!(seen == Mode::Bypass || seen == Mode::Override);
    }
    assert_eq!(setter.join().unwrap(), Ok(Mode::Override));
    assert_eq!(handle.status_blocking(), Mode::Override);
}
