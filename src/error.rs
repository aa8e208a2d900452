//! Unified error types for the relay controller firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level startup path uniform. All variants are `Copy` so they can be
//! passed through the control channel and into HTTP responses without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A relay output could not be driven.
    Actuator(ActuatorError),
    /// A network subsystem failed.
    Comms(CommsError),
    /// Peripheral or task initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed.
    GpioWriteFailed,
    /// An output pin could not be configured.
    PinConfigFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::PinConfigFailed => write!(f, "GPIO output config failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// The listening socket could not be created or bound.
    BindFailed,
    /// Accepting a client connection failed.
    AcceptFailed,
    /// Reading the request failed or the peer reset the connection.
    ReadFailed,
    /// The client did not finish its request in time.
    Timeout,
    /// Writing the response failed.
    WriteFailed,
    /// The control task is gone and cannot serve requests.
    ControlUnavailable,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BindFailed => write!(f, "listener bind failed"),
            Self::AcceptFailed => write!(f, "accept failed"),
            Self::ReadFailed => write!(f, "request read failed"),
            Self::Timeout => write!(f, "request timed out"),
            Self::WriteFailed => write!(f, "response write failed"),
            Self::ControlUnavailable => write!(f, "control task unavailable"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
