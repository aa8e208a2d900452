//! Two-step transition sequences between steady modes.
//!
//! ```text
//!   Bypass ──Engage──▶ Override        Override ──Release──▶ Bypass
//!     1. Primary   → High                1. Secondary → Low
//!     2. settle 200 ms                   2. settle 200 ms
//!     3. Secondary → High                3. Primary   → Low
//! ```
//!
//! The pairing and ordering encode the wiring of the protected path: the
//! primary pair is asserted first and released last.  The plan is pure
//! data; [`ModeController`](crate::app::controller::ModeController)
//! executes it against the relay bank.

use super::{Level, Mode, RelayPair};

/// Settling time between the two steps of a transition.
///
/// Physical constraint of the relay hardware.  Not configurable.
pub const SETTLE_DELAY_MS: u32 = 200;

/// One bank write: drive both channels of `pair` to `level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub pair: RelayPair,
    pub level: Level,
}

/// Derived transition for a `(current, requested)` mode pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Modes are equal: no writes, no delay.
    None,
    /// Bypass → Override.
    Engage,
    /// Override → Bypass.
    Release,
}

const ENGAGE_STEPS: [Step; 2] = [
    Step { pair: RelayPair::Primary, level: Level::High },
    Step { pair: RelayPair::Secondary, level: Level::High },
];

const RELEASE_STEPS: [Step; 2] = [
    Step { pair: RelayPair::Secondary, level: Level::Low },
    Step { pair: RelayPair::Primary, level: Level::Low },
];

impl Transition {
    pub const fn between(from: Mode, to: Mode) -> Self {
        match (from, to) {
            (Mode::Bypass, Mode::Override) => Self::Engage,
            (Mode::Override, Mode::Bypass) => Self::Release,
            _ => Self::None,
        }
    }

    /// Ordered bank writes.  A settle delay separates consecutive steps.
    pub const fn steps(self) -> &'static [Step] {
        match self {
            Self::None => &[],
            Self::Engage => &ENGAGE_STEPS,
            Self::Release => &RELEASE_STEPS,
        }
    }

    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}
