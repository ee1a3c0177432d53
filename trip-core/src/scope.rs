//! Cancellation scopes and scope-bound timer slots.
//!
//! Every deadline in the crate is armed together with a [`ScopeToken`]. A slot
//! only reports itself due while the owning [`CancelScope`] still admits that
//! token, so cancelling or closing a scope makes every timer it handed out
//! inert even if a deadline value is still sitting in a slot.

use core::time::Duration;

use crate::time::TripInstant;

/// Generation stamp captured when a timer is armed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScopeToken {
    generation: u32,
}

/// Owner of a timer generation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CancelScope {
    generation: u32,
    closed: bool,
}

impl CancelScope {
    /// Creates an open scope.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            generation: 0,
            closed: false,
        }
    }

    /// Starts a new generation and returns its token.
    ///
    /// Tokens issued before the call stop being admitted. Returns `None` once
    /// the scope has been closed.
    pub fn renew(&mut self) -> Option<ScopeToken> {
        if self.closed {
            return None;
        }

        self.generation = self.generation.wrapping_add(1);
        Some(self.current())
    }

    /// Returns a token for the current generation, if the scope is open.
    #[must_use]
    pub fn token(&self) -> Option<ScopeToken> {
        if self.closed {
            None
        } else {
            Some(self.current())
        }
    }

    /// Invalidates every outstanding token while keeping the scope usable.
    pub fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Invalidates every outstanding token and refuses to issue new ones.
    pub fn close(&mut self) {
        self.cancel();
        self.closed = true;
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns `true` when `token` belongs to the live generation.
    #[must_use]
    pub const fn admits(&self, token: ScopeToken) -> bool {
        !self.closed && token.generation == self.generation
    }

    const fn current(&self) -> ScopeToken {
        ScopeToken {
            generation: self.generation,
        }
    }
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot timer slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Deadline<I> {
    slot: Option<(I, ScopeToken)>,
}

impl<I: TripInstant> Deadline<I> {
    /// Creates a disarmed slot.
    #[must_use]
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Arms (or re-arms) the slot for `at`.
    pub fn arm(&mut self, at: I, token: ScopeToken) {
        self.slot = Some((at, token));
    }

    /// Clears the slot.
    pub fn disarm(&mut self) {
        self.slot = None;
    }

    /// Returns `true` when a deadline is stored, regardless of scope.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    /// Returns the deadline while its token is still admitted by `scope`.
    #[must_use]
    pub fn pending(&self, scope: &CancelScope) -> Option<I> {
        match self.slot {
            Some((at, token)) if scope.admits(token) => Some(at),
            _ => None,
        }
    }

    /// Consumes the deadline if it is live and due at `now`.
    pub fn fire(&mut self, now: I, scope: &CancelScope) -> Option<I> {
        let at = self.pending(scope).filter(|at| *at <= now)?;
        self.slot = None;
        Some(at)
    }
}

impl<I: TripInstant> Default for Deadline<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic timer slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Interval<I> {
    period: Duration,
    next: Option<(I, ScopeToken)>,
}

impl<I: TripInstant> Interval<I> {
    /// Creates a stopped interval with the given period.
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    /// Returns the configured period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Starts ticking; the first tick lands one period after `from`.
    pub fn start(&mut self, from: I, token: ScopeToken) {
        self.next = Some((from + self.period, token));
    }

    /// Stops the interval.
    pub fn stop(&mut self) {
        self.next = None;
    }

    /// Returns `true` when a tick is scheduled, regardless of scope.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.next.is_some()
    }

    /// Returns the next tick while its token is still admitted by `scope`.
    #[must_use]
    pub fn pending(&self, scope: &CancelScope) -> Option<I> {
        match self.next {
            Some((at, token)) if scope.admits(token) => Some(at),
            _ => None,
        }
    }

    /// Consumes the next tick if it is live and due at `now`, scheduling the
    /// following one a period later.
    pub fn fire(&mut self, now: I, scope: &CancelScope) -> Option<I> {
        let (at, token) = self.next?;
        if !scope.admits(token) || at > now {
            return None;
        }

        self.next = Some((at + self.period, token));
        Some(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::mock::MockInstant;

    #[test]
    fn renewed_scope_rejects_earlier_tokens() {
        let mut scope = CancelScope::new();
        let first = scope.renew().expect("open scope issues tokens");
        assert!(scope.admits(first));

        let second = scope.renew().expect("open scope issues tokens");
        assert!(!scope.admits(first));
        assert!(scope.admits(second));
    }

    #[test]
    fn closed_scope_never_admits_or_issues() {
        let mut scope = CancelScope::new();
        let token = scope.renew().expect("open scope issues tokens");
        scope.close();

        assert!(scope.is_closed());
        assert!(!scope.admits(token));
        assert!(scope.renew().is_none());
        assert!(scope.token().is_none());
    }

    #[test]
    fn deadline_fires_once_when_due() {
        let mut scope = CancelScope::new();
        let token = scope.renew().expect("token");
        let mut deadline = Deadline::new();
        deadline.arm(MockInstant::millis(100), token);

        assert_eq!(deadline.fire(MockInstant::millis(99), &scope), None);
        assert_eq!(
            deadline.fire(MockInstant::millis(150), &scope),
            Some(MockInstant::millis(100))
        );
        assert_eq!(deadline.fire(MockInstant::millis(200), &scope), None);
    }

    #[test]
    fn cancelled_deadline_stays_inert() {
        let mut scope = CancelScope::new();
        let token = scope.renew().expect("token");
        let mut deadline = Deadline::new();
        deadline.arm(MockInstant::millis(100), token);

        scope.cancel();

        assert!(deadline.is_armed());
        assert_eq!(deadline.pending(&scope), None);
        assert_eq!(deadline.fire(MockInstant::millis(1_000), &scope), None);
    }

    #[test]
    fn interval_catches_up_one_tick_at_a_time() {
        let mut scope = CancelScope::new();
        let token = scope.renew().expect("token");
        let mut interval = Interval::new(Duration::from_millis(500));
        interval.start(MockInstant::millis(0), token);

        let now = MockInstant::millis(1_200);
        assert_eq!(interval.fire(now, &scope), Some(MockInstant::millis(500)));
        assert_eq!(interval.fire(now, &scope), Some(MockInstant::millis(1_000)));
        assert_eq!(interval.fire(now, &scope), None);
        assert_eq!(interval.pending(&scope), Some(MockInstant::millis(1_500)));
    }
}
