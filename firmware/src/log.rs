#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Mirrors the session event ring to the debug probe.
//!
//! The session keeps its own fixed-capacity [`EventLog`]; the beacon only
//! remembers the id after the last record it printed and emits anything newer
//! through defmt (or stdout on host builds).

use trip_core::events::{EventId, EventLog, EventRecord};

use crate::clock::BeaconInstant;
use crate::input::BeaconInput;

/// Cursor over an [`EventLog`] that prints each record once.
#[derive(Debug, Default)]
pub struct EventMirror {
    next: EventId,
}

impl EventMirror {
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Prints records added since the previous call and returns how many.
    pub fn flush(&mut self, log: &EventLog<BeaconInstant>) -> usize {
        let mut printed = 0;
        for record in log.since(self.next) {
            emit_event(record);
            printed += 1;
        }
        self.next = log.next_id();
        printed
    }

    /// Rewinds the cursor for a freshly built session's log.
    pub fn reset(&mut self) {
        self.next = 0;
    }

    #[must_use]
    pub const fn cursor(&self) -> EventId {
        self.next
    }
}

/// Logs an input accepted by the trip task.
pub fn log_input(input: BeaconInput, rejected: Option<&dyn core::fmt::Display>) {
    match rejected {
        Some(reason) => emit_input_rejected(input.as_str(), reason),
        None => emit_input(input.as_str()),
    }
}

#[cfg(target_os = "none")]
fn emit_event(record: &EventRecord<BeaconInstant>) {
    defmt::info!(
        "trip:event #{} t={}ms {}",
        record.id,
        record.timestamp.as_millis(),
        defmt::Display2Format(&record.event)
    );
}

#[cfg(not(target_os = "none"))]
fn emit_event(record: &EventRecord<BeaconInstant>) {
    println!(
        "trip:event #{} t={}ms {}",
        record.id,
        record.timestamp.as_millis(),
        record.event
    );
}

#[cfg(target_os = "none")]
fn emit_input(input: &'static str) {
    defmt::info!("trip:input {}", input);
}

#[cfg(not(target_os = "none"))]
fn emit_input(input: &'static str) {
    println!("trip:input {input}");
}

#[cfg(target_os = "none")]
fn emit_input_rejected(input: &'static str, reason: &dyn core::fmt::Display) {
    defmt::warn!(
        "trip:input {} ignored ({})",
        input,
        defmt::Display2Format(&reason)
    );
}

#[cfg(not(target_os = "none"))]
fn emit_input_rejected(input: &'static str, reason: &dyn core::fmt::Display) {
    println!("trip:input {input} ignored ({reason})");
}
