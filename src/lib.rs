//! HVAC relay controller firmware library.
//!
//! Exposes every module for integration testing.  All ESP-IDF-specific code
//! is guarded by `#[cfg(target_os = "espidf")]` within each module; other
//! targets get simulation backends.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod http;
pub mod pins;

mod esp_link_shims;
