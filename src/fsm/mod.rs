//! Operating-mode model for the relay bank.
//!
//! Two steady modes and the relay pattern each one implies:
//!
//! ```text
//!   channel      0    1    2    3
//!   ─────────── ──── ──── ──── ────
//!   Bypass       0    0    0    0     (safe default)
//!   Override     1    1    1    1
//!   engaging     1    1    0    0     (held for SETTLE_DELAY_MS only)
//!   releasing    0    0    1    1     (held for SETTLE_DELAY_MS only)
//! ```
//!
//! Moving between the steady modes is never a single write: see
//! [`transition::Transition`] for the two-step sequences.

pub mod transition;

use core::fmt;
use core::str::FromStr;

use crate::pins::RELAY_COUNT;

pub use transition::{SETTLE_DELAY_MS, Step, Transition};

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Operating mode of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// All outputs de-energised.
    #[default]
    Bypass,
    /// All outputs energised.
    Override,
}

impl Mode {
    /// Wire name used by the request protocol.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bypass => "bypass",
            Self::Override => "override",
        }
    }

    /// Steady relay pattern for this mode.
    pub const fn levels(self) -> [Level; RELAY_COUNT] {
        match self {
            Self::Bypass => [Level::Low; RELAY_COUNT],
            Self::Override => [Level::High; RELAY_COUNT],
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mode name that is neither `"bypass"` nor `"override"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidMode;

impl fmt::Display for InvalidMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid mode")
    }
}

impl FromStr for Mode {
    type Err = InvalidMode;

    /// Exact, case-sensitive match on the wire names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bypass" => Ok(Self::Bypass),
            "override" => Ok(Self::Override),
            _ => Err(InvalidMode),
        }
    }
}

// ---------------------------------------------------------------------------
// Output level
// ---------------------------------------------------------------------------

/// Binary level of one relay output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }

    /// Numeric form (0 or 1).
    pub const fn bit(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

// ---------------------------------------------------------------------------
// Relay pairs
// ---------------------------------------------------------------------------

/// The two channel pairs that are always written together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayPair {
    /// Channels 0 and 1: asserted first, released last.
    Primary,
    /// Channels 2 and 3: asserted last, released first.
    Secondary,
}

impl RelayPair {
    pub const fn channels(self) -> [usize; 2] {
        match self {
            Self::Primary => [0, 1],
            Self::Secondary => [2, 3],
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot invariant
// ---------------------------------------------------------------------------

/// The only relay combinations the bank may ever hold.
pub const VALID_SNAPSHOTS: [[u8; RELAY_COUNT]; 4] = [
    [0, 0, 0, 0],
    [1, 1, 1, 1],
    [1, 1, 0, 0],
    [0, 0, 1, 1],
];

/// Whether `levels` is one of [`VALID_SNAPSHOTS`].
pub fn is_valid_snapshot(levels: &[Level; RELAY_COUNT]) -> bool {
    let bits = levels.map(Level::bit);
    VALID_SNAPSHOTS.contains(&bits)
}

/// Compact `0000`-style rendering used in log lines.
pub fn format_levels(levels: &[Level; RELAY_COUNT]) -> heapless::String<RELAY_COUNT> {
    let mut s = heapless::String::new();
    for level in levels {
        let _ = s.push(if level.is_high() { '1' } else { '0' });
    }
    s
}
