//! Sequence matching configuration.

use crate::binding::KeyCombo;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happens when a pending sequence times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutBehavior {
    /// Close any open digit run and run a completed candidate, else cancel
    #[default]
    Submit,
    /// Drop the pending keys
    Cancel,
}

/// Keys and timing that drive the sequence matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceScheme {
    /// Timeout in milliseconds; 0 waits indefinitely
    pub timeout_ms: u64,
    /// Behavior when the timeout fires
    pub on_timeout: TimeoutBehavior,
    /// Runs the first completed candidate
    pub commit_key: KeyCombo,
    /// Abandons the pending sequence
    pub cancel_key: KeyCombo,
    /// Drops the last pending key
    pub undo_key: KeyCombo,
}

impl Default for SequenceScheme {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            on_timeout: TimeoutBehavior::Submit,
            commit_key: KeyCombo::key("enter"),
            cancel_key: KeyCombo::key("escape"),
            undo_key: KeyCombo::key("backspace"),
        }
    }
}

impl SequenceScheme {
    /// Set the timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the timeout behavior.
    pub fn with_timeout_behavior(mut self, behavior: TimeoutBehavior) -> Self {
        self.on_timeout = behavior;
        self
    }

    pub fn with_commit_key(mut self, key: KeyCombo) -> Self {
        self.commit_key = key;
        self
    }

    pub fn with_cancel_key(mut self, key: KeyCombo) -> Self {
        self.cancel_key = key;
        self
    }

    pub fn with_undo_key(mut self, key: KeyCombo) -> Self {
        self.undo_key = key;
        self
    }

    /// The timeout, if sequences time out at all.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}
