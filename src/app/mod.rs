//! Application core: pure domain logic, zero I/O.
//!
//! The business rules of the relay controller: the ordered, settled mode
//! transition ([`controller`]) and the single-owner task that serialises
//! access to it ([`control`]).  All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod control;
pub mod controller;
pub mod events;
pub mod ports;
