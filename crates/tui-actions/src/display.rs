//! Key display configuration.

use crate::binding::{KeyCombo, KeySeq, SeqElem};
use serde::{Deserialize, Serialize};

/// Shown in place of a `\d` placeholder.
pub const DIGIT_GLYPH: &str = "\u{27e8}#\u{27e9}";
/// Shown in place of a `\d+` placeholder.
pub const DIGITS_GLYPH: &str = "\u{27e8}##\u{27e9}";

/// Platform, for picking a display format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    MacOS,
    Windows,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOS
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }
}

/// Format for displaying key bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDisplayFormat {
    /// Unicode symbols: ⌘S, ⌃P, ⇧⇥
    Symbolic,
    /// Text labels: Ctrl+S, Alt+P, Shift+Tab
    #[default]
    Text,
}

/// Configuration for key display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDisplayConfig {
    /// Display format
    pub format: KeyDisplayFormat,
}

impl Default for KeyDisplayConfig {
    fn default() -> Self {
        Self::for_platform(Platform::current())
    }
}

impl KeyDisplayConfig {
    /// Glyphs on macOS, words elsewhere.
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::MacOS => Self::symbolic(),
            Platform::Windows | Platform::Linux => Self::text(),
        }
    }

    /// Create a symbolic display config.
    pub fn symbolic() -> Self {
        Self {
            format: KeyDisplayFormat::Symbolic,
        }
    }

    /// Create a text display config.
    pub fn text() -> Self {
        Self {
            format: KeyDisplayFormat::Text,
        }
    }

    /// Format a modifier key.
    pub fn format_modifier(&self, name: &str) -> &'static str {
        match (self.format, name) {
            (KeyDisplayFormat::Symbolic, "ctrl") => "\u{2303}",
            (KeyDisplayFormat::Symbolic, "alt") => "\u{2325}",
            (KeyDisplayFormat::Symbolic, "shift") => "\u{21e7}",
            (KeyDisplayFormat::Symbolic, "meta") => "\u{2318}",
            (_, "ctrl") => "Ctrl",
            (_, "alt") => "Alt",
            (_, "shift") => "Shift",
            (_, "meta") => "Meta",
            _ => "",
        }
    }

    /// Format a normalized key name.
    pub fn format_key(&self, key: &str) -> String {
        match self.format {
            KeyDisplayFormat::Symbolic => match key {
                "enter" => "\u{23ce}".to_string(),
                "escape" => "\u{238b}".to_string(),
                "tab" => "\u{21e5}".to_string(),
                "backspace" => "\u{232b}".to_string(),
                "delete" => "\u{2326}".to_string(),
                "space" => "\u{2423}".to_string(),
                "up" => "\u{2191}".to_string(),
                "down" => "\u{2193}".to_string(),
                "left" => "\u{2190}".to_string(),
                "right" => "\u{2192}".to_string(),
                "home" => "\u{21f1}".to_string(),
                "end" => "\u{21f2}".to_string(),
                "pageup" => "\u{21de}".to_string(),
                "pagedown" => "\u{21df}".to_string(),
                _ => key.to_uppercase(),
            },
            KeyDisplayFormat::Text => match key {
                "enter" => "Enter".to_string(),
                "escape" => "Escape".to_string(),
                "tab" => "Tab".to_string(),
                "backspace" => "Backspace".to_string(),
                "delete" => "Delete".to_string(),
                "insert" => "Insert".to_string(),
                "space" => "Space".to_string(),
                "up" => "Up".to_string(),
                "down" => "Down".to_string(),
                "left" => "Left".to_string(),
                "right" => "Right".to_string(),
                "home" => "Home".to_string(),
                "end" => "End".to_string(),
                "pageup" => "PageUp".to_string(),
                "pagedown" => "PageDown".to_string(),
                _ => key.to_uppercase(),
            },
        }
    }

    /// Format one key combination.
    pub fn format_combo(&self, combo: &KeyCombo) -> String {
        let mut parts: Vec<String> = Vec::new();

        if combo.has_ctrl() {
            parts.push(self.format_modifier("ctrl").to_string());
        }
        if combo.has_alt() {
            parts.push(self.format_modifier("alt").to_string());
        }
        if combo.has_shift() {
            parts.push(self.format_modifier("shift").to_string());
        }
        if combo.has_meta() {
            parts.push(self.format_modifier("meta").to_string());
        }
        parts.push(self.format_key(&combo.key));

        match self.format {
            KeyDisplayFormat::Symbolic => parts.concat(),
            KeyDisplayFormat::Text => parts.join("+"),
        }
    }

    /// Format one pattern element.
    pub fn format_elem(&self, elem: &SeqElem) -> String {
        match elem {
            SeqElem::Key(combo) => self.format_combo(combo),
            SeqElem::Digit => DIGIT_GLYPH.to_string(),
            SeqElem::Digits => DIGITS_GLYPH.to_string(),
        }
    }

    /// Format a whole pattern, elements separated by a space.
    pub fn format_seq(&self, seq: &KeySeq) -> String {
        seq.elems()
            .iter()
            .map(|e| self.format_elem(e))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Format keys already pressed.
    pub fn format_keys(&self, keys: &[KeyCombo]) -> String {
        keys.iter()
            .map(|k| self.format_combo(k))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
