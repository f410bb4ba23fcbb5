//! Multi-key sequence matching.
//!
//! [`SequenceMatcher`] consumes one key at a time and tracks every keymap
//! entry that is still consistent with the keys buffered so far.
//!
//! ```text
//!            key starts a pattern            candidate completes,
//!  ┌──────┐ ───────────────────────▶ ┌────────────┐  nothing partial  ┌──────────┐
//!  │ Idle │                          │ Collecting │ ────────────────▶ │ Resolved │
//!  └──────┘ ◀─────────────────────── └────────────┘                   └──────────┘
//!            cancel key, timeout,        │   ▲
//!            backspace to empty          └───┘ key extends a candidate
//! ```
//!
//! Time is passed in by the caller. The matcher never sleeps; a host loop
//! either calls [`SequenceMatcher::tick`] or schedules its own callback
//! for [`SequenceMatcher::deadline`] and hands the token back through
//! [`SequenceMatcher::on_timer`].

use crate::binding::{KeyCombo, KeySeq};
use crate::keymap::{ActionId, Keymap};
use crate::matcher::{replay, SeqMatchState, Step};
use crate::scheme::{SequenceScheme, TimeoutBehavior};
use crate::timer::{SequenceTimer, TimerToken};
use std::time::Instant;
use tracing::{debug, trace, warn};

/// A resolved binding, ready to dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Canonical binding string
    pub binding: String,
    /// Actions bound to it
    pub actions: Vec<ActionId>,
    /// Integers captured by `\d` / `\d+` positions, in order
    pub captures: Vec<u32>,
}

/// Why a pending sequence was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Cancel key or [`SequenceMatcher::cancel`]
    Explicit,
    /// Timer fired
    Timeout,
    /// Undo key emptied the buffer
    Undo,
    /// Nothing to commit, or the key that ended the attempt matched nothing
    NoMatch,
}

/// What a key (or timer) did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not consumed; the host may handle the key itself
    Ignored,
    /// Waiting for more keys
    Pending {
        /// Keys buffered so far
        buffered: usize,
        /// Candidates still alive
        candidates: usize,
        /// Whether the commit key would run something now
        completable: bool,
    },
    /// Run these actions
    Execute(Match),
    /// The pending sequence was dropped
    Cancelled(CancelReason),
}

impl KeyOutcome {
    /// Whether the key belonged to the matcher.
    pub fn is_consumed(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Matcher phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Nothing buffered
    Idle,
    /// At least one key buffered and one candidate alive
    Collecting,
}

#[derive(Debug, Clone)]
struct Candidate {
    id: String,
    seq: KeySeq,
    actions: Vec<ActionId>,
}

#[derive(Debug, Clone)]
struct Live {
    candidate: usize,
    state: SeqMatchState,
}

/// Incremental matcher for single keys, chords and sequences.
#[derive(Debug)]
pub struct SequenceMatcher {
    scheme: SequenceScheme,
    /// Keymap entries in declaration order
    candidates: Vec<Candidate>,
    buffer: Vec<KeyCombo>,
    /// Alive candidates, kept in `candidates` order
    live: Vec<Live>,
    timer: SequenceTimer,
    /// Outcome of a timer that was already due when the last key arrived
    expired: Option<KeyOutcome>,
}

impl SequenceMatcher {
    /// Create a matcher over a keymap.
    pub fn new(keymap: &Keymap, scheme: SequenceScheme) -> Self {
        let mut matcher = Self {
            scheme,
            candidates: Vec::new(),
            buffer: Vec::new(),
            live: Vec::new(),
            timer: SequenceTimer::new(),
            expired: None,
        };
        matcher.set_keymap(keymap);
        matcher
    }

    /// Replace the keymap. Any pending sequence is dropped.
    pub fn set_keymap(&mut self, keymap: &Keymap) {
        self.reset();
        self.candidates = keymap
            .active()
            .map(|b| Candidate {
                id: b.id(),
                seq: b.seq.clone(),
                actions: b.actions.clone(),
            })
            .collect();
    }

    pub fn scheme(&self) -> &SequenceScheme {
        &self.scheme
    }

    /// Replace the scheme. Any pending sequence is dropped.
    pub fn set_scheme(&mut self, scheme: SequenceScheme) {
        self.reset();
        self.scheme = scheme;
    }

    pub fn phase(&self) -> MatchPhase {
        if self.buffer.is_empty() {
            MatchPhase::Idle
        } else {
            MatchPhase::Collecting
        }
    }

    /// Keys pressed in the current attempt.
    pub fn buffer(&self) -> &[KeyCombo] {
        &self.buffer
    }

    /// Canonical ids of the candidates still alive.
    pub fn live_candidates(&self) -> Vec<&str> {
        self.live
            .iter()
            .map(|l| self.candidates[l.candidate].id.as_str())
            .collect()
    }

    /// Canonical ids the commit key would choose between, in priority order.
    pub fn completable(&self) -> Vec<&str> {
        self.live
            .iter()
            .filter(|l| l.state.clone().finalize())
            .map(|l| self.candidates[l.candidate].id.as_str())
            .collect()
    }

    /// When the outstanding timer fires, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Token of the outstanding timer, for hosts that schedule callbacks.
    pub fn timer_token(&self) -> Option<TimerToken> {
        self.timer.token()
    }

    /// Feed one key.
    ///
    /// A timer whose deadline passed before `now` fires first; its outcome
    /// is kept for [`SequenceMatcher::take_expired`].
    pub fn handle_key(&mut self, key: KeyCombo, now: Instant) -> KeyOutcome {
        self.expired = match self.timer.take_due(now) {
            Some(token) => {
                debug!(?token, "sequence timer overdue at next key");
                Some(self.fire())
            }
            None => None,
        };

        if key.is_modifier_key() {
            return KeyOutcome::Ignored;
        }

        self.cancel_timer();
        let collecting = !self.buffer.is_empty();

        if collecting && key == self.scheme.commit_key {
            return self.resolve_commit(CancelReason::NoMatch);
        }

        if key == self.scheme.cancel_key {
            if !collecting {
                return KeyOutcome::Ignored;
            }
            debug!(buffered = self.buffer.len(), "sequence cancelled");
            self.reset();
            return KeyOutcome::Cancelled(CancelReason::Explicit);
        }

        if collecting && key == self.scheme.undo_key && !self.accepts(&key) {
            return self.undo(now);
        }

        self.input(key, now)
    }

    /// Outcome of an overdue timer fired by the last [`SequenceMatcher::handle_key`].
    ///
    /// It happened before the key, so hosts should act on it first.
    pub fn take_expired(&mut self) -> Option<KeyOutcome> {
        self.expired.take()
    }

    /// Run the first completed candidate, or cancel if there is none.
    pub fn commit(&mut self) -> KeyOutcome {
        self.cancel_timer();
        if self.buffer.is_empty() {
            return KeyOutcome::Ignored;
        }
        self.resolve_commit(CancelReason::NoMatch)
    }

    /// Drop the pending sequence.
    pub fn cancel(&mut self) -> KeyOutcome {
        self.cancel_timer();
        if self.buffer.is_empty() {
            return KeyOutcome::Ignored;
        }
        self.reset();
        KeyOutcome::Cancelled(CancelReason::Explicit)
    }

    /// Fire the timer if its deadline has passed.
    pub fn tick(&mut self, now: Instant) -> KeyOutcome {
        match self.timer.take_due(now) {
            Some(_) => self.fire(),
            None => KeyOutcome::Ignored,
        }
    }

    /// Host-scheduled timer callback.
    pub fn on_timer(&mut self, token: TimerToken) -> KeyOutcome {
        if !self.timer.take_if_current(token) {
            warn!(?token, "ignoring stale sequence timer");
            return KeyOutcome::Ignored;
        }
        self.fire()
    }

    fn fire(&mut self) -> KeyOutcome {
        if self.buffer.is_empty() {
            return KeyOutcome::Ignored;
        }
        debug!(buffered = self.buffer.len(), behavior = ?self.scheme.on_timeout, "sequence timed out");
        match self.scheme.on_timeout {
            TimeoutBehavior::Submit => self.resolve_commit(CancelReason::Timeout),
            TimeoutBehavior::Cancel => {
                self.reset();
                KeyOutcome::Cancelled(CancelReason::Timeout)
            }
        }
    }

    fn accepts(&self, key: &KeyCombo) -> bool {
        self.live
            .iter()
            .any(|l| l.state.accepts(&self.candidates[l.candidate].seq, key))
    }

    fn input(&mut self, key: KeyCombo, now: Instant) -> KeyOutcome {
        if self.buffer.is_empty() {
            return self.start(key, now);
        }

        let advanced: Vec<Live> = self
            .live
            .iter()
            .filter_map(|l| {
                let mut state = l.state.clone();
                let step = state.advance(&self.candidates[l.candidate].seq, &key);
                (step != Step::Failed).then_some(Live {
                    candidate: l.candidate,
                    state,
                })
            })
            .collect();

        if advanced.is_empty() {
            debug!(
                buffered = self.buffer.len(),
                key = %key,
                "no candidate accepts key, restarting sequence"
            );
            self.reset();
            return match self.start(key, now) {
                KeyOutcome::Ignored => KeyOutcome::Cancelled(CancelReason::NoMatch),
                outcome => outcome,
            };
        }

        self.buffer.push(key);
        self.live = advanced;
        self.settle(now)
    }

    /// Treat `key` as the first key of a new attempt.
    fn start(&mut self, key: KeyCombo, now: Instant) -> KeyOutcome {
        let live: Vec<Live> = self
            .candidates
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                let mut state = SeqMatchState::new(&c.seq);
                let step = state.advance(&c.seq, &key);
                (step != Step::Failed).then_some(Live {
                    candidate: i,
                    state,
                })
            })
            .collect();

        if live.is_empty() {
            trace!(key = %key, "key matches no binding");
            return KeyOutcome::Ignored;
        }

        self.buffer.push(key);
        self.live = live;
        self.settle(now)
    }

    /// Execute if nothing is left to wait for, otherwise keep collecting.
    fn settle(&mut self, now: Instant) -> KeyOutcome {
        let waiting = self.live.iter().any(|l| !l.state.is_complete());
        if !waiting {
            let found = self.live.first().map(|l| self.to_match(l));
            self.reset();
            return match found {
                Some(m) => {
                    debug!(binding = %m.binding, captures = ?m.captures, "sequence resolved");
                    KeyOutcome::Execute(m)
                }
                None => KeyOutcome::Ignored,
            };
        }

        self.arm_timer(now);
        let outcome = self.pending();
        trace!(?outcome, "sequence pending");
        outcome
    }

    fn undo(&mut self, now: Instant) -> KeyOutcome {
        self.buffer.pop();
        if self.buffer.is_empty() {
            debug!("sequence undone to empty");
            self.reset();
            return KeyOutcome::Cancelled(CancelReason::Undo);
        }

        self.live = self
            .candidates
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                replay(&c.seq, &self.buffer).map(|state| Live {
                    candidate: i,
                    state,
                })
            })
            .collect();

        if self.live.is_empty() {
            self.reset();
            return KeyOutcome::Cancelled(CancelReason::NoMatch);
        }

        self.arm_timer(now);
        self.pending()
    }

    fn resolve_commit(&mut self, reason: CancelReason) -> KeyOutcome {
        let found = self.live.iter().find_map(|l| {
            let mut state = l.state.clone();
            state.finalize().then(|| self.to_match(&Live {
                candidate: l.candidate,
                state,
            }))
        });
        self.reset();

        match found {
            Some(m) => {
                debug!(binding = %m.binding, captures = ?m.captures, "sequence committed");
                KeyOutcome::Execute(m)
            }
            None => {
                debug!(?reason, "nothing to commit");
                KeyOutcome::Cancelled(reason)
            }
        }
    }

    fn pending(&self) -> KeyOutcome {
        KeyOutcome::Pending {
            buffered: self.buffer.len(),
            candidates: self.live.len(),
            completable: self.live.iter().any(|l| l.state.clone().finalize()),
        }
    }

    fn to_match(&self, live: &Live) -> Match {
        let candidate = &self.candidates[live.candidate];
        Match {
            binding: candidate.id.clone(),
            actions: candidate.actions.clone(),
            captures: live.state.captures(),
        }
    }

    fn arm_timer(&mut self, now: Instant) {
        if let Some(after) = self.scheme.timeout() {
            let token = self.timer.arm(now, after);
            trace!(?token, ?after, "sequence timer armed");
        }
    }

    fn cancel_timer(&mut self) {
        if self.timer.cancel() {
            trace!("sequence timer cancelled");
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.live.clear();
        self.timer.cancel();
    }
}
