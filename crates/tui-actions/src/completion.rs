//! Sequence completion hints.
//!
//! Given the keys pressed so far, lists which bindings are already
//! satisfied and which still need keys, for a "which key" style popup.

use crate::binding::{KeyCombo, KeySeq};
use crate::display::KeyDisplayConfig;
use crate::keymap::{ActionId, Keymap};
use crate::matcher::replay;

/// A binding still reachable from the pressed keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Canonical binding string
    pub binding: String,
    /// Actions bound to it
    pub actions: Vec<ActionId>,
    /// Whether the pressed keys already satisfy the whole pattern
    pub complete: bool,
    /// Integers captured so far
    pub captures: Vec<u32>,
    /// Pattern positions still to be typed
    pub remaining: KeySeq,
    /// `remaining`, formatted for display
    pub next_keys: String,
}

/// Enumerate bindings consistent with `pressed`.
///
/// Complete entries sort before incomplete ones; each group is ordered by
/// canonical binding string.
pub fn complete(pressed: &[KeyCombo], keymap: &Keymap, display: &KeyDisplayConfig) -> Vec<Completion> {
    let mut completions: Vec<Completion> = keymap
        .active()
        .filter_map(|binding| {
            let mut state = replay(&binding.seq, pressed)?;
            // A `\d+` run still open at the end of the prefix counts as typed.
            let complete = state.finalize();
            let remaining = binding.seq.suffix(state.position());
            Some(Completion {
                binding: binding.id(),
                actions: binding.actions.clone(),
                complete,
                captures: state.captures(),
                next_keys: display.format_seq(&remaining),
                remaining,
            })
        })
        .collect();

    completions.sort_by(|a, b| {
        b.complete
            .cmp(&a.complete)
            .then_with(|| a.binding.cmp(&b.binding))
    });
    completions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_combo;

    fn keys(s: &str) -> Vec<KeyCombo> {
        s.split_whitespace().map(parse_combo).collect()
    }

    fn keymap() -> Keymap {
        [
            ("g t", "nav:table"),
            ("g c", "nav:canvas"),
            ("g", "nav:top"),
            ("g \\d+ j", "nav:down"),
            ("x", "close"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_after_prefix() {
        let display = KeyDisplayConfig::text();
        let result = complete(&keys("g"), &keymap(), &display);

        let ids: Vec<&str> = result.iter().map(|c| c.binding.as_str()).collect();
        assert_eq!(ids, vec!["g", "g \\d+ j", "g c", "g t"]);
        assert!(result[0].complete);
        assert!(result[1..].iter().all(|c| !c.complete));
        assert_eq!(result[3].next_keys, "T");
        assert_eq!(result[1].next_keys, "\u{27e8}##\u{27e9} J");
    }

    #[test]
    fn test_digits_absorb_many_keys() {
        let display = KeyDisplayConfig::text();
        let result = complete(&keys("g 1 2"), &keymap(), &display);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].binding, "g \\d+ j");
        assert!(!result[0].complete);
        assert_eq!(result[0].captures, vec![12]);
        assert_eq!(result[0].remaining.to_string(), "j");
    }

    #[test]
    fn test_complete_with_captures() {
        let display = KeyDisplayConfig::text();
        let result = complete(&keys("g 4 j"), &keymap(), &display);

        assert_eq!(result.len(), 1);
        assert!(result[0].complete);
        assert_eq!(result[0].captures, vec![4]);
        assert!(result[0].remaining.is_empty());
        assert_eq!(result[0].next_keys, "");
    }

    #[test]
    fn test_empty_prefix_lists_everything_incomplete() {
        let display = KeyDisplayConfig::text();
        let result = complete(&[], &keymap(), &display);
        assert_eq!(result.len(), 5);
        assert!(result.iter().all(|c| !c.complete));
    }

    #[test]
    fn test_no_match() {
        let display = KeyDisplayConfig::text();
        assert!(complete(&keys("q"), &keymap(), &display).is_empty());
        assert!(complete(&keys("x x"), &keymap(), &display).is_empty());
    }
}
