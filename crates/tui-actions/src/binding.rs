//! Key binding types.

use crate::parser::{normalize_key, parse_seq};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, ModifierKeyCode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single physical press (key + held modifiers).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCombo {
    /// Normalized key identifier (`"k"`, `"enter"`, `"f5"`, `"!"`)
    pub key: String,
    /// Modifier keys (Ctrl, Alt, Shift, Meta)
    #[serde(default = "default_modifiers")]
    pub modifiers: KeyModifiers,
}

fn default_modifiers() -> KeyModifiers {
    KeyModifiers::NONE
}

/// Reduce a crossterm modifier set to the four bits bindings care about.
///
/// SUPER (the Cmd key under the kitty protocol) is folded into META.
pub(crate) fn fold_modifiers(modifiers: KeyModifiers) -> KeyModifiers {
    let mut folded = KeyModifiers::NONE;
    if modifiers.contains(KeyModifiers::CONTROL) {
        folded |= KeyModifiers::CONTROL;
    }
    if modifiers.contains(KeyModifiers::ALT) {
        folded |= KeyModifiers::ALT;
    }
    if modifiers.contains(KeyModifiers::SHIFT) {
        folded |= KeyModifiers::SHIFT;
    }
    if modifiers.intersects(KeyModifiers::META | KeyModifiers::SUPER) {
        folded |= KeyModifiers::META;
    }
    folded
}

impl KeyCombo {
    /// Create a key combination. The key is normalized.
    pub fn new(key: &str, modifiers: KeyModifiers) -> Self {
        Self {
            key: normalize_key(key),
            modifiers: fold_modifiers(modifiers),
        }
    }

    /// Create a key combination with no modifiers.
    pub fn key(key: &str) -> Self {
        Self::new(key, KeyModifiers::NONE)
    }

    /// Create a Ctrl+key combination.
    pub fn ctrl(c: char) -> Self {
        Self::new(&c.to_string(), KeyModifiers::CONTROL)
    }

    /// Create an Alt+key combination.
    pub fn alt(c: char) -> Self {
        Self::new(&c.to_string(), KeyModifiers::ALT)
    }

    /// Create a Shift+key combination.
    pub fn shift(key: &str) -> Self {
        Self::new(key, KeyModifiers::SHIFT)
    }

    pub fn has_ctrl(&self) -> bool {
        self.modifiers.contains(KeyModifiers::CONTROL)
    }

    pub fn has_alt(&self) -> bool {
        self.modifiers.contains(KeyModifiers::ALT)
    }

    pub fn has_shift(&self) -> bool {
        self.modifiers.contains(KeyModifiers::SHIFT)
    }

    pub fn has_meta(&self) -> bool {
        self.modifiers.contains(KeyModifiers::META)
    }

    /// The digit value if this is a plain `0`-`9` press with no modifiers.
    pub fn digit(&self) -> Option<u32> {
        if !self.modifiers.is_empty() {
            return None;
        }
        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => c.to_digit(10),
            _ => None,
        }
    }

    /// Whether this press is a bare modifier key (Shift, Ctrl, ...).
    pub fn is_modifier_key(&self) -> bool {
        matches!(
            self.key.as_str(),
            "shift" | "control" | "alt" | "meta" | "hyper" | "altgr"
        )
    }
}

impl fmt::Display for KeyCombo {
    /// Canonical form: modifiers in ctrl, meta, alt, shift order, key last.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_ctrl() {
            f.write_str("ctrl+")?;
        }
        if self.has_meta() {
            f.write_str("meta+")?;
        }
        if self.has_alt() {
            f.write_str("alt+")?;
        }
        if self.has_shift() {
            f.write_str("shift+")?;
        }
        f.write_str(&self.key)
    }
}

fn modifier_key_name(code: ModifierKeyCode) -> &'static str {
    match code {
        ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift => "shift",
        ModifierKeyCode::LeftControl | ModifierKeyCode::RightControl => "control",
        ModifierKeyCode::LeftAlt | ModifierKeyCode::RightAlt => "alt",
        ModifierKeyCode::LeftSuper
        | ModifierKeyCode::RightSuper
        | ModifierKeyCode::LeftMeta
        | ModifierKeyCode::RightMeta => "meta",
        ModifierKeyCode::LeftHyper | ModifierKeyCode::RightHyper => "hyper",
        ModifierKeyCode::IsoLevel3Shift | ModifierKeyCode::IsoLevel5Shift => "altgr",
    }
}

impl From<KeyEvent> for KeyCombo {
    fn from(event: KeyEvent) -> Self {
        let mut modifiers = fold_modifiers(event.modifiers);
        let key = match event.code {
            KeyCode::Char(c) if c.is_ascii_uppercase() => {
                modifiers |= KeyModifiers::SHIFT;
                c.to_ascii_lowercase().to_string()
            }
            KeyCode::Char(c) => normalize_key(&c.to_string()),
            KeyCode::BackTab => {
                modifiers |= KeyModifiers::SHIFT;
                "tab".to_string()
            }
            KeyCode::Enter => "enter".to_string(),
            KeyCode::Esc => "escape".to_string(),
            KeyCode::Tab => "tab".to_string(),
            KeyCode::Backspace => "backspace".to_string(),
            KeyCode::Delete => "delete".to_string(),
            KeyCode::Insert => "insert".to_string(),
            KeyCode::Up => "up".to_string(),
            KeyCode::Down => "down".to_string(),
            KeyCode::Left => "left".to_string(),
            KeyCode::Right => "right".to_string(),
            KeyCode::Home => "home".to_string(),
            KeyCode::End => "end".to_string(),
            KeyCode::PageUp => "pageup".to_string(),
            KeyCode::PageDown => "pagedown".to_string(),
            KeyCode::F(n) => format!("f{}", n),
            KeyCode::Modifier(code) => modifier_key_name(code).to_string(),
            other => normalize_key(&format!("{:?}", other)),
        };

        Self { key, modifiers }
    }
}

/// One position in a binding pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SeqElem {
    /// A literal key combination
    Key(KeyCombo),
    /// Exactly one unmodified digit (`\d`)
    Digit,
    /// One or more consecutive unmodified digits (`\d+`)
    Digits,
}

impl SeqElem {
    /// Whether this element matches a class of keys rather than one key.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Digit | Self::Digits)
    }
}

impl fmt::Display for SeqElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(combo) => write!(f, "{}", combo),
            Self::Digit => f.write_str("\\d"),
            Self::Digits => f.write_str("\\d+"),
        }
    }
}

impl From<KeyCombo> for SeqElem {
    fn from(combo: KeyCombo) -> Self {
        Self::Key(combo)
    }
}

/// A binding pattern: an ordered list of elements (for sequences like `g g` or `\d+ j`).
///
/// Serializes as its canonical id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct KeySeq {
    /// The elements of this pattern
    pub elems: Vec<SeqElem>,
}

impl KeySeq {
    /// Create an empty pattern.
    pub fn new() -> Self {
        Self { elems: Vec::new() }
    }

    /// Create a pattern from a single key.
    pub fn single(key: KeyCombo) -> Self {
        Self {
            elems: vec![SeqElem::Key(key)],
        }
    }

    /// Create a pattern from elements.
    pub fn from_elems(elems: Vec<SeqElem>) -> Self {
        Self { elems }
    }

    /// Append an element.
    pub fn push(&mut self, elem: impl Into<SeqElem>) {
        self.elems.push(elem.into());
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn elems(&self) -> &[SeqElem] {
        &self.elems
    }

    /// Whether any position is a digit placeholder.
    pub fn has_placeholders(&self) -> bool {
        self.elems.iter().any(SeqElem::is_placeholder)
    }

    /// Canonical id: the keymap key and the persisted override format.
    pub fn id(&self) -> String {
        self.to_string()
    }

    /// The elements from `position` onwards.
    pub fn suffix(&self, position: usize) -> KeySeq {
        Self {
            elems: self.elems.get(position..).unwrap_or_default().to_vec(),
        }
    }
}

impl fmt::Display for KeySeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, elem) in self.elems.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", elem)?;
        }
        Ok(())
    }
}

impl From<KeyCombo> for KeySeq {
    fn from(key: KeyCombo) -> Self {
        Self::single(key)
    }
}

impl From<Vec<SeqElem>> for KeySeq {
    fn from(elems: Vec<SeqElem>) -> Self {
        Self { elems }
    }
}

impl From<String> for KeySeq {
    fn from(s: String) -> Self {
        parse_seq(&s)
    }
}

impl From<KeySeq> for String {
    fn from(seq: KeySeq) -> Self {
        seq.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combo_canonical_order() {
        let combo = KeyCombo::new(
            "k",
            KeyModifiers::SHIFT | KeyModifiers::ALT | KeyModifiers::CONTROL | KeyModifiers::META,
        );
        assert_eq!(combo.to_string(), "ctrl+meta+alt+shift+k");

        assert_eq!(KeyCombo::ctrl('S').to_string(), "ctrl+s");
        assert_eq!(KeyCombo::key("Enter").to_string(), "enter");
    }

    #[test]
    fn test_super_folds_into_meta() {
        let combo = KeyCombo::new("p", KeyModifiers::SUPER);
        assert!(combo.has_meta());
        assert_eq!(combo.to_string(), "meta+p");
    }

    #[test]
    fn test_digit() {
        assert_eq!(KeyCombo::key("7").digit(), Some(7));
        assert_eq!(KeyCombo::ctrl('7').digit(), None);
        assert_eq!(KeyCombo::key("a").digit(), None);
        assert_eq!(KeyCombo::key("f1").digit(), None);
    }

    #[test]
    fn test_from_key_event() {
        let combo = KeyCombo::from(KeyEvent::new(KeyCode::Char('N'), KeyModifiers::NONE));
        assert_eq!(combo, KeyCombo::shift("n"));

        let combo = KeyCombo::from(KeyEvent::new(KeyCode::Char(' '), KeyModifiers::CONTROL));
        assert_eq!(combo.to_string(), "ctrl+space");

        let combo = KeyCombo::from(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT));
        assert_eq!(combo.to_string(), "shift+tab");

        let combo = KeyCombo::from(KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE));
        assert_eq!(combo.key, "f5");

        let combo = KeyCombo::from(KeyEvent::new(
            KeyCode::Modifier(ModifierKeyCode::LeftShift),
            KeyModifiers::SHIFT,
        ));
        assert!(combo.is_modifier_key());
    }

    #[test]
    fn test_seq_display() {
        let mut seq = KeySeq::new();
        seq.push(SeqElem::Digits);
        seq.push(KeyCombo::key("j"));
        assert_eq!(seq.to_string(), "\\d+ j");
        assert_eq!(seq.len(), 2);
        assert!(seq.has_placeholders());
        assert_eq!(seq.suffix(1).to_string(), "j");
        assert!(seq.suffix(5).is_empty());
    }

    #[test]
    fn test_seq_serde_as_string() {
        let seq = KeySeq::from_elems(vec![
            SeqElem::Key(KeyCombo::key("g")),
            SeqElem::Key(KeyCombo::ctrl('t')),
        ]);
        let value: String = seq.clone().into();
        assert_eq!(value, "g ctrl+t");
        assert_eq!(KeySeq::from(value), seq);
    }
}
