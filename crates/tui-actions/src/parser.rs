//! Binding string parser.

use crate::binding::{KeyCombo, KeySeq, SeqElem};
use crossterm::event::KeyModifiers;
use thiserror::Error;

/// Characters that need Shift on a US keyboard.
///
/// When one of these is pressed, the shift bit only matters if the pattern
/// asks for it. Other layouts are not handled.
pub const SHIFTED_SYMBOLS: &str = "!@#$%^&*()_+{}|:\"<>?~";

/// Whether a normalized key is one of the [`SHIFTED_SYMBOLS`].
pub fn is_shifted_symbol(key: &str) -> bool {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => SHIFTED_SYMBOLS.contains(c),
        _ => false,
    }
}

/// Map a raw key token to its canonical lowercase identifier.
///
/// Unrecognized tokens are lowercased as-is.
pub fn normalize_key(raw: &str) -> String {
    if raw == " " {
        return "space".to_string();
    }

    let lower = raw.trim().to_lowercase();
    let canonical = match lower.as_str() {
        "space" | "spacebar" => "space",
        "escape" | "esc" => "escape",
        "enter" | "return" | "cr" => "enter",
        "tab" => "tab",
        "backspace" | "bs" => "backspace",
        "delete" | "del" => "delete",
        "insert" | "ins" => "insert",

        // Arrow keys
        "up" | "arrowup" => "up",
        "down" | "arrowdown" => "down",
        "left" | "arrowleft" => "left",
        "right" | "arrowright" => "right",

        // Navigation
        "home" => "home",
        "end" => "end",
        "pageup" | "pgup" => "pageup",
        "pagedown" | "pgdn" | "pgdown" => "pagedown",

        // Modifier keys pressed on their own
        "shift" => "shift",
        "control" | "ctrl" => "control",
        "alt" | "option" => "alt",
        "meta" | "cmd" | "command" | "super" => "meta",

        _ => return lower,
    };
    canonical.to_string()
}

/// Error parsing a binding string in strict mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Empty input
    #[error("empty key binding")]
    Empty,
    /// Modifiers with no key after them (`"ctrl+"`)
    #[error("key binding '{0}' has no key")]
    MissingKey(String),
    /// Unknown modifier
    #[error("unknown modifier: {0}")]
    UnknownModifier(String),
}

/// Split a combo into its modifier part and key part.
///
/// A trailing `+` is the plus key: `"+"`, `"ctrl++"`.
fn split_combo(s: &str) -> (Option<&str>, &str) {
    if s == "+" {
        return (None, "+");
    }
    if let Some(rest) = s.strip_suffix("++") {
        return (Some(rest), "+");
    }
    match s.rfind('+') {
        Some(i) => (Some(&s[..i]), &s[i + 1..]),
        None => (None, s),
    }
}

/// Parse a single combo (`"ctrl+shift+k"`), reporting malformed input.
///
/// Supported formats:
/// - `"ctrl+s"`, `"control+s"` - Ctrl+S
/// - `"alt+x"`, `"option+x"` - Alt+X
/// - `"meta+p"`, `"cmd+p"`, `"command+p"` - Meta+P
/// - `"K"` - Shift+K (bare uppercase letter)
/// - `"enter"`, `"escape"`, `"space"`, `"up"`, `"f5"` - Named keys
pub fn try_parse_combo(s: &str) -> Result<KeyCombo, ParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ParseError::Empty);
    }

    let (modifier_part, key_part) = split_combo(s);
    if key_part.is_empty() {
        return Err(ParseError::MissingKey(s.to_string()));
    }

    let mut modifiers = KeyModifiers::NONE;
    if let Some(part) = modifier_part {
        for token in part.split('+') {
            match token.to_lowercase().as_str() {
                "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
                "alt" | "option" => modifiers |= KeyModifiers::ALT,
                "shift" => modifiers |= KeyModifiers::SHIFT,
                "meta" | "cmd" | "command" => modifiers |= KeyModifiers::META,
                other => return Err(ParseError::UnknownModifier(other.to_string())),
            }
        }
    }

    let mut chars = key_part.chars();
    let key = match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() => {
            modifiers |= KeyModifiers::SHIFT;
            c.to_ascii_lowercase().to_string()
        }
        _ => normalize_key(key_part),
    };

    Ok(KeyCombo { key, modifiers })
}

/// Parse a single combo, falling back to a literal key on malformed input.
///
/// Bindings often come from live key recording, so a half-typed string
/// must still produce something usable.
pub fn parse_combo(s: &str) -> KeyCombo {
    try_parse_combo(s).unwrap_or_else(|_| KeyCombo {
        key: normalize_key(s),
        modifiers: KeyModifiers::NONE,
    })
}

fn parse_elem(token: &str) -> SeqElem {
    match token {
        "\\d" => SeqElem::Digit,
        "\\d+" => SeqElem::Digits,
        _ => SeqElem::Key(parse_combo(token)),
    }
}

/// Parse a whitespace-separated sequence (`"g t"`, `"\d+ j"`).
///
/// Never fails; an empty string yields an empty pattern.
pub fn parse_seq(s: &str) -> KeySeq {
    KeySeq::from_elems(s.split_whitespace().map(parse_elem).collect())
}

/// Parse a sequence, reporting the first malformed combo.
pub fn try_parse_seq(s: &str) -> Result<KeySeq, ParseError> {
    let mut elems = Vec::new();
    for token in s.split_whitespace() {
        elems.push(match token {
            "\\d" => SeqElem::Digit,
            "\\d+" => SeqElem::Digits,
            _ => SeqElem::Key(try_parse_combo(token)?),
        });
    }

    if elems.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(KeySeq::from_elems(elems))
}

/// Canonicalize a binding string (`"Control+K  g"` -> `"ctrl+shift+k g"`).
pub fn canonicalize(s: &str) -> String {
    parse_seq(s).to_string()
}
