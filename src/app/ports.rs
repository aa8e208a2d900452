//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ModeController (domain)
//! ```
//!
//! Driven adapters (relay bank, event sinks, config storage) implement these
//! traits.  The [`ModeController`](super::controller::ModeController)
//! consumes them via generics, so the domain core never touches hardware
//! directly.

use crate::config::SystemConfig;
use crate::error::ActuatorError;
use crate::fsm::{Level, RelayPair};
use crate::pins::RELAY_COUNT;

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the four relay outputs.
///
/// Channel indices are `0..RELAY_COUNT`.  An index outside that range is a
/// programming error and implementations panic on it.
pub trait RelayPort {
    /// Drive one channel.
    fn set(&mut self, channel: usize, level: Level) -> Result<(), ActuatorError>;

    /// Drive both channels of a pair back to back.
    fn set_pair(&mut self, pair: RelayPair, level: Level) -> Result<(), ActuatorError> {
        for channel in pair.channels() {
            self.set(channel, level)?;
        }
        Ok(())
    }

    /// Drive every channel, in channel order 0, 1, 2, 3.
    fn set_all(&mut self, levels: [Level; RELAY_COUNT]) -> Result<(), ActuatorError> {
        for (channel, level) in levels.into_iter().enumerate() {
            self.set(channel, level)?;
        }
        Ok(())
    }

    /// Last level written to each channel.
    fn levels(&self) -> [Level; RELAY_COUNT];
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
