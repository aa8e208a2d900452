//! GPIO pin assignments for the relay controller board.
//!
//! Single source of truth: the relay bank references this module rather
//! than hard-coding pin numbers.  Channel order matters: channel 0 is the
//! first entry of [`RELAY_GPIOS`], and the transition sequencing in
//! [`crate::fsm`] addresses channels, never raw GPIO numbers.

/// Number of relay channels on the board.
pub const RELAY_COUNT: usize = 4;

/// Relay output 1 (channel 0, primary pair).
pub const RELAY_1_GPIO: i32 = 23;
/// Relay output 2 (channel 1, primary pair).
pub const RELAY_2_GPIO: i32 = 22;
/// Relay output 3 (channel 2, secondary pair).
pub const RELAY_3_GPIO: i32 = 21;
/// Relay output 4 (channel 3, secondary pair).
pub const RELAY_4_GPIO: i32 = 19;

/// Relay GPIOs indexed by channel.
pub const RELAY_GPIOS: [i32; RELAY_COUNT] = [RELAY_1_GPIO, RELAY_2_GPIO, RELAY_3_GPIO, RELAY_4_GPIO];
