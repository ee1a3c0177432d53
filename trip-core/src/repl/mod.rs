//! Operator console shared between the beacon and the emulator.
//!
//! Lines are lexed and parsed by [`grammar`] against the declarative
//! [`catalog`], executed by [`commands`], and rendered by [`status`]. The
//! pipeline stays `no_std`.

pub mod catalog;
pub mod commands;
pub mod completion;
pub mod grammar;
pub mod status;
