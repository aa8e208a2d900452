//! Outbound application events.
//!
//! The [`ModeController`](super::controller::ModeController) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them.

use crate::error::ActuatorError;
use crate::fsm::Mode;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Outputs were forced to the safe pattern; carries the initial mode.
    Started(Mode),

    /// A two-step transition began.
    TransitionStarted { from: Mode, to: Mode },

    /// A transition completed and the mode was committed.
    ModeChanged { from: Mode, to: Mode },

    /// A relay write failed mid-transition.  `recovered` is true when the
    /// release sequence brought every output back low.
    RelayFault { error: ActuatorError, recovered: bool },
}
