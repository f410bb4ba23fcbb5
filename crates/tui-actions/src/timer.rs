//! One-shot sequence timer.
//!
//! The matcher owns exactly one of these, so at most one deadline can be
//! outstanding. Each arm hands out a fresh [`TimerToken`]; a callback
//! carrying an older token is stale and must be ignored.

use std::time::{Duration, Instant};

/// Identifies one arming of a [`SequenceTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

/// A single deferred deadline.
#[derive(Debug, Default)]
pub struct SequenceTimer {
    pending: Option<(TimerToken, Instant)>,
    next_id: u64,
}

impl SequenceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the deadline, replacing any outstanding one.
    pub fn arm(&mut self, now: Instant, after: Duration) -> TimerToken {
        self.next_id += 1;
        let token = TimerToken(self.next_id);
        self.pending = Some((token, now + after));
        token
    }

    /// Drop the outstanding deadline. Returns whether one was armed.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn token(&self) -> Option<TimerToken> {
        self.pending.map(|(token, _)| token)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, deadline)| deadline)
    }

    /// Time left until the deadline, zero if it has passed.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline().map(|d| d.saturating_duration_since(now))
    }

    /// Disarm and return the token if the deadline has been reached.
    pub fn take_due(&mut self, now: Instant) -> Option<TimerToken> {
        match self.pending {
            Some((token, deadline)) if deadline <= now => {
                self.pending = None;
                Some(token)
            }
            _ => None,
        }
    }

    /// Disarm if `token` is the outstanding one. Returns whether it was.
    pub fn take_if_current(&mut self, token: TimerToken) -> bool {
        if self.token() == Some(token) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_and_fire() {
        let start = Instant::now();
        let mut timer = SequenceTimer::new();
        timer.arm(start, Duration::from_millis(100));

        assert!(timer.is_armed());
        assert_eq!(timer.take_due(start + Duration::from_millis(50)), None);
        assert_eq!(timer.remaining(start + Duration::from_millis(40)), Some(Duration::from_millis(60)));
        assert!(timer.take_due(start + Duration::from_millis(100)).is_some());
        assert!(!timer.is_armed());
        assert_eq!(timer.take_due(start + Duration::from_millis(200)), None);
    }

    #[test]
    fn test_rearm_replaces() {
        let start = Instant::now();
        let mut timer = SequenceTimer::new();
        let first = timer.arm(start, Duration::from_millis(100));
        let second = timer.arm(start, Duration::from_millis(300));

        assert_ne!(first, second);
        assert_eq!(timer.deadline(), Some(start + Duration::from_millis(300)));
        assert!(!timer.take_if_current(first));
        assert!(timer.is_armed());
        assert!(timer.take_if_current(second));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_cancel() {
        let mut timer = SequenceTimer::new();
        assert!(!timer.cancel());
        let token = timer.arm(Instant::now(), Duration::from_millis(10));
        assert!(timer.cancel());
        assert!(!timer.take_if_current(token));
    }
}
