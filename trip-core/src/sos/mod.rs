//! SOS confirmation flow.
//!
//! A press only asks for confirmation; the alarm sounds and responders are
//! contacted on confirm. An active emergency clears itself after
//! [`SosConfig::auto_resolve`] and cannot be cancelled in the meantime.

use core::fmt;
use core::time::Duration;

use crate::scope::{CancelScope, Deadline};
use crate::time::TripInstant;

/// How long an active emergency stays raised.
pub const SOS_AUTO_RESOLVE: Duration = Duration::from_millis(3_000);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SosConfig {
    pub auto_resolve: Duration,
}

impl SosConfig {
    pub const STANDARD: SosConfig = SosConfig {
        auto_resolve: SOS_AUTO_RESOLVE,
    };
}

impl Default for SosConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SosState {
    Idle,
    ConfirmPending,
    Active,
}

impl SosState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SosState::Idle => "idle",
            SosState::ConfirmPending => "confirm-pending",
            SosState::Active => "active",
        }
    }
}

impl fmt::Display for SosState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an SOS input was ignored.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SosRejection {
    /// Confirm or cancel without a pending request.
    NotPending,
    /// A press while confirmation is already pending.
    AlreadyPending,
    /// Any input while the emergency is active.
    EmergencyActive,
    /// The flow was closed by session teardown.
    Closed,
}

impl fmt::Display for SosRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SosRejection::NotPending => f.write_str("no sos request pending"),
            SosRejection::AlreadyPending => f.write_str("sos confirmation already pending"),
            SosRejection::EmergencyActive => f.write_str("emergency already active"),
            SosRejection::Closed => f.write_str("sos flow closed"),
        }
    }
}

/// Three-state SOS machine with its auto-resolve timer.
#[derive(Copy, Clone, Debug)]
pub struct SosFlow<I> {
    config: SosConfig,
    state: SosState,
    scope: CancelScope,
    resolve: Deadline<I>,
    activations: u32,
}

impl<I: TripInstant> SosFlow<I> {
    #[must_use]
    pub const fn new(config: SosConfig) -> Self {
        Self {
            config,
            state: SosState::Idle,
            scope: CancelScope::new(),
            resolve: Deadline::new(),
            activations: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SosState {
        self.state
    }

    /// Number of times the flow has gone active.
    #[must_use]
    pub const fn activations(&self) -> u32 {
        self.activations
    }

    /// `Idle → ConfirmPending`.
    ///
    /// # Errors
    ///
    /// Rejected while a request is pending or active, or after close.
    pub fn press(&mut self) -> Result<SosState, SosRejection> {
        self.ensure_open()?;
        match self.state {
            SosState::Idle => {
                self.state = SosState::ConfirmPending;
                Ok(self.state)
            }
            SosState::ConfirmPending => Err(SosRejection::AlreadyPending),
            SosState::Active => Err(SosRejection::EmergencyActive),
        }
    }

    /// `ConfirmPending → Active`, arming the auto-resolve timer.
    ///
    /// The caller sounds the alarm and contacts responders only when this
    /// returns `Ok`.
    ///
    /// # Errors
    ///
    /// Rejected outside `ConfirmPending`.
    pub fn confirm(&mut self, now: I) -> Result<SosState, SosRejection> {
        self.ensure_open()?;
        match self.state {
            SosState::ConfirmPending => {
                let token = self.scope.renew().ok_or(SosRejection::Closed)?;
                self.state = SosState::Active;
                self.activations = self.activations.saturating_add(1);
                self.resolve.arm(now + self.config.auto_resolve, token);
                Ok(self.state)
            }
            SosState::Idle => Err(SosRejection::NotPending),
            SosState::Active => Err(SosRejection::EmergencyActive),
        }
    }

    /// `ConfirmPending → Idle`.
    ///
    /// # Errors
    ///
    /// Rejected while idle or active.
    pub fn cancel(&mut self) -> Result<SosState, SosRejection> {
        self.ensure_open()?;
        match self.state {
            SosState::ConfirmPending => {
                self.state = SosState::Idle;
                Ok(self.state)
            }
            SosState::Idle => Err(SosRejection::NotPending),
            SosState::Active => Err(SosRejection::EmergencyActive),
        }
    }

    /// Pending auto-resolve instant.
    #[must_use]
    pub fn next_deadline(&self) -> Option<I> {
        self.resolve.pending(&self.scope)
    }

    /// Resolves the emergency if its timer is due. Returns `true` on resolve.
    pub fn step(&mut self, now: I) -> bool {
        if self.resolve.fire(now, &self.scope).is_none() {
            return false;
        }

        self.state = SosState::Idle;
        true
    }

    /// Cancels the timer and refuses further input.
    pub fn close(&mut self) {
        self.scope.close();
        self.resolve.disarm();
        self.state = SosState::Idle;
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.scope.is_closed()
    }

    fn ensure_open(&self) -> Result<(), SosRejection> {
        if self.scope.is_closed() {
            Err(SosRejection::Closed)
        } else {
            Ok(())
        }
    }
}

impl<I: TripInstant> Default for SosFlow<I> {
    fn default() -> Self {
        Self::new(SosConfig::STANDARD)
    }
}
