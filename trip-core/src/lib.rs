#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

// Shared logic for the SaarthiMitra ride-safety beacon.
//
// The trip lifecycle, alerting and SOS state machines live here without the
// Rust standard library so the firmware and the host emulator drive exactly
// the same code against their own clocks and audio outputs.

pub mod alert;
pub mod dispatch;
pub mod events;
pub mod phases;
pub mod random;
pub mod repl;
pub mod scope;
pub mod session;
pub mod sos;
pub mod time;
pub mod trip;
