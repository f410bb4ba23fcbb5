//! Per-candidate matching state.
//!
//! A [`SeqMatchState`] tracks how far one pattern has been matched by the
//! keys pressed so far. `\d+` positions collect digits without advancing;
//! the first non-digit finalizes the run and is then tried against the
//! next position.

use crate::binding::{KeyCombo, KeySeq, SeqElem};
use crate::parser::is_shifted_symbol;

/// Whether a pressed key satisfies a literal pattern combo.
///
/// Ctrl, Alt and Meta must match exactly. Shift is ignored for shifted
/// symbols unless the pattern asks for it, since `?` cannot be typed
/// without Shift anyway.
pub fn combo_matches(pattern: &KeyCombo, input: &KeyCombo) -> bool {
    if pattern.key != input.key
        || pattern.has_ctrl() != input.has_ctrl()
        || pattern.has_alt() != input.has_alt()
        || pattern.has_meta() != input.has_meta()
    {
        return false;
    }

    if is_shifted_symbol(&input.key) && !pattern.has_shift() {
        return true;
    }
    pattern.has_shift() == input.has_shift()
}

/// Whether two pattern elements are equal under the per-element rule.
///
/// Shift is not compared on shifted symbols, so `?` equals `shift+?`.
pub fn elems_equal(a: &SeqElem, b: &SeqElem) -> bool {
    match (a, b) {
        (SeqElem::Key(x), SeqElem::Key(y)) => {
            x.key == y.key
                && x.has_ctrl() == y.has_ctrl()
                && x.has_alt() == y.has_alt()
                && x.has_meta() == y.has_meta()
                && (x.has_shift() == y.has_shift() || is_shifted_symbol(&x.key))
        }
        (SeqElem::Digit, SeqElem::Digit) | (SeqElem::Digits, SeqElem::Digits) => true,
        _ => false,
    }
}

/// Progress at one pattern position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeqElemState {
    Key { matched: bool },
    Digit { value: Option<u32> },
    Digits { partial: Option<String>, value: Option<u32> },
}

impl SeqElemState {
    fn initial(elem: &SeqElem) -> Self {
        match elem {
            SeqElem::Key(_) => Self::Key { matched: false },
            SeqElem::Digit => Self::Digit { value: None },
            SeqElem::Digits => Self::Digits {
                partial: None,
                value: None,
            },
        }
    }

    /// The captured integer, once finalized.
    pub fn capture(&self) -> Option<u32> {
        match self {
            Self::Key { .. } => None,
            Self::Digit { value } | Self::Digits { value, .. } => *value,
        }
    }
}

/// Result of feeding one key to a [`SeqMatchState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Accepted; more keys are needed
    Partial,
    /// Accepted; every position is now satisfied
    Complete,
    /// Rejected; the candidate is dead
    Failed,
}

/// Progress of one candidate pattern.
///
/// Always has one element per pattern position. Positions before
/// `position` are final and never change within an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqMatchState {
    elems: Vec<SeqElemState>,
    position: usize,
}

impl SeqMatchState {
    /// Fresh state for a pattern.
    pub fn new(pattern: &KeySeq) -> Self {
        Self {
            elems: pattern.elems().iter().map(SeqElemState::initial).collect(),
            position: 0,
        }
    }

    pub fn elems(&self) -> &[SeqElemState] {
        &self.elems
    }

    /// Number of finalized positions.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_complete(&self) -> bool {
        self.position == self.elems.len()
    }

    /// Whether a `\d+` run is open at the current position.
    pub fn is_collecting_digits(&self) -> bool {
        matches!(
            self.elems.get(self.position),
            Some(SeqElemState::Digits { partial: Some(_), .. })
        )
    }

    /// Captured integers, in pattern order.
    pub fn captures(&self) -> Vec<u32> {
        self.elems.iter().filter_map(SeqElemState::capture).collect()
    }

    /// Close an open `\d+` run. Returns whether the pattern is now complete.
    pub fn finalize(&mut self) -> bool {
        if let Some(SeqElemState::Digits { partial, value }) = self.elems.get_mut(self.position) {
            if let Some(digits) = partial.take() {
                *value = Some(digits.parse().unwrap_or(u32::MAX));
                self.position += 1;
            }
        }
        self.is_complete()
    }

    /// Feed one key.
    pub fn advance(&mut self, pattern: &KeySeq, key: &KeyCombo) -> Step {
        if self.is_collecting_digits() {
            if let Some(digit) = key.digit() {
                if let Some(SeqElemState::Digits {
                    partial: Some(digits),
                    ..
                }) = self.elems.get_mut(self.position)
                {
                    digits.push(char::from_digit(digit, 10).unwrap_or('0'));
                }
                return Step::Partial;
            }
            self.finalize();
        }

        let Some(elem) = pattern.elems().get(self.position) else {
            return Step::Failed;
        };

        let Some(state) = self.elems.get_mut(self.position) else {
            return Step::Failed;
        };

        match (elem, state) {
            (SeqElem::Key(expected), SeqElemState::Key { matched }) => {
                if !combo_matches(expected, key) {
                    return Step::Failed;
                }
                *matched = true;
                self.position += 1;
            }
            (SeqElem::Digit, SeqElemState::Digit { value }) => {
                let Some(digit) = key.digit() else {
                    return Step::Failed;
                };
                *value = Some(digit);
                self.position += 1;
            }
            (SeqElem::Digits, SeqElemState::Digits { partial, .. }) => {
                let Some(digit) = key.digit() else {
                    return Step::Failed;
                };
                *partial = Some(digit.to_string());
                return Step::Partial;
            }
            _ => return Step::Failed,
        }

        if self.is_complete() {
            Step::Complete
        } else {
            Step::Partial
        }
    }

    /// Whether `key` would be accepted, without changing this state.
    pub fn accepts(&self, pattern: &KeySeq, key: &KeyCombo) -> bool {
        self.clone().advance(pattern, key) != Step::Failed
    }
}

/// Rebuild a candidate's state from scratch by feeding every key.
///
/// Returns `None` if any key is rejected.
pub fn replay(pattern: &KeySeq, keys: &[KeyCombo]) -> Option<SeqMatchState> {
    if pattern.is_empty() {
        return None;
    }
    let mut state = SeqMatchState::new(pattern);
    for key in keys {
        if state.advance(pattern, key) == Step::Failed {
            return None;
        }
    }
    Some(state)
}
