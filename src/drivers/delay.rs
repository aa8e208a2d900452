//! Blocking delay provider for the settle pause between transition steps.
//!
//! On ESP-IDF the controller uses `esp_idf_hal::delay::FreeRtos`, which
//! yields to the scheduler.  On host targets [`StdDelay`] sleeps the
//! calling thread.

use core::time::Duration;

use embedded_hal::delay::DelayNs;

/// `std::thread::sleep`-backed [`DelayNs`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
