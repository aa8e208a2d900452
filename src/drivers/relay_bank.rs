//! Four-channel relay output bank.
//!
//! Wraps four `embedded-hal` [`OutputPin`]s and remembers the last level
//! written to each.  This is a dumb actuator: sequencing and the snapshot
//! invariant are enforced by the
//! [`ModeController`](crate::app::controller::ModeController).
//!
//! ## Dual-target design
//!
//! On ESP-IDF: [`device_pins`] claims the relay GPIOs as `PinDriver`
//! outputs.  On host/test: [`SimPin`] tracks the level in memory.

use core::convert::Infallible;

use embedded_hal::digital::{Error as _, ErrorType, OutputPin};
use log::{trace, warn};

use crate::app::ports::RelayPort;
use crate::error::ActuatorError;
use crate::fsm::Level;
use crate::pins::{RELAY_COUNT, RELAY_GPIOS};

// ───────────────────────────────────────────────────────────────
// RelayBank
// ───────────────────────────────────────────────────────────────

pub struct RelayBank<P> {
    pins: [P; RELAY_COUNT],
    levels: [Level; RELAY_COUNT],
}

impl<P: OutputPin> RelayBank<P> {
    /// Take ownership of the pins.  Nothing is written; the recorded levels
    /// start at Low until the controller forces the safe pattern.
    pub fn new(pins: [P; RELAY_COUNT]) -> Self {
        Self {
            pins,
            levels: [Level::Low; RELAY_COUNT],
        }
    }

    #[cfg(test)]
    fn pins(&self) -> &[P; RELAY_COUNT] {
        &self.pins
    }
}

impl<P: OutputPin> RelayPort for RelayBank<P> {
    fn set(&mut self, channel: usize, level: Level) -> Result<(), ActuatorError> {
        assert!(channel < RELAY_COUNT, "relay channel {channel} out of range");

        let pin = &mut self.pins[channel];
        let result = if level.is_high() {
            pin.set_high()
        } else {
            pin.set_low()
        };
        result.map_err(|e| {
            warn!("Relay ch{}: write {:?} failed ({:?})", channel, level, e.kind());
            ActuatorError::GpioWriteFailed
        })?;

        self.levels[channel] = level;
        trace!("Relay ch{} (GPIO {}) -> {}", channel, RELAY_GPIOS[channel], level.bit());
        Ok(())
    }

    fn levels(&self) -> [Level; RELAY_COUNT] {
        self.levels
    }
}

// ───────────────────────────────────────────────────────────────
// Simulated pin (host)
// ───────────────────────────────────────────────────────────────

/// In-memory output pin used on host builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimPin {
    gpio: i32,
    high: bool,
}

impl SimPin {
    /// A pin that powers up holding `high` (models stale hardware state).
    pub fn with_level(gpio: i32, high: bool) -> Self {
        Self { gpio, high }
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    pub fn is_set_high(&self) -> bool {
        self.high
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}

/// One simulated pin per relay GPIO, all starting at `high`.
pub fn sim_pins(high: bool) -> [SimPin; RELAY_COUNT] {
    RELAY_GPIOS.map(|gpio| SimPin::with_level(gpio, high))
}

// ───────────────────────────────────────────────────────────────
// Device pins (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub type DevicePin = esp_idf_hal::gpio::PinDriver<
    'static,
    esp_idf_hal::gpio::AnyOutputPin,
    esp_idf_hal::gpio::Output,
>;

/// Claim the relay GPIOs as push-pull outputs.
#[cfg(target_os = "espidf")]
pub fn device_pins() -> Result<[DevicePin; RELAY_COUNT], ActuatorError> {
    use esp_idf_hal::gpio::{AnyOutputPin, PinDriver};

    let mut pins: heapless::Vec<DevicePin, RELAY_COUNT> = heapless::Vec::new();
    for gpio in RELAY_GPIOS {
        // SAFETY: each relay GPIO is claimed exactly once, here, at boot,
        // and is not referenced by any other driver.
        let pin = unsafe { AnyOutputPin::new(gpio) };
        let driver = PinDriver::output(pin).map_err(|e| {
            warn!("Relay GPIO {}: output config failed ({})", gpio, e);
            ActuatorError::PinConfigFailed
        })?;
        pins.push(driver)
            .map_err(|_| ActuatorError::PinConfigFailed)?;
    }
    pins.into_array()
        .map_err(|_| ActuatorError::PinConfigFailed)
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
