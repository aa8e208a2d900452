//! Relay output bank, settle delay, and thread spawning helpers.

pub mod delay;
pub mod relay_bank;
pub mod task_pin;
