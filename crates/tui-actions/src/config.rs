//! Keybinding configuration file.

use crate::binding::KeyCombo;
use crate::keymap::Keymap;
use crate::parser::{parse_combo, try_parse_combo};
use crate::scheme::{SequenceScheme, TimeoutBehavior};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error loading or saving keybinding configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// User keybinding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeybindConfig {
    /// Sequence timeout in milliseconds; 0 waits for commit or cancel.
    #[serde(default = "default_sequence_timeout")]
    pub sequence_timeout_ms: u64,
    /// What a timeout does to a pending sequence.
    #[serde(default)]
    pub on_timeout: TimeoutBehavior,
    #[serde(default = "default_commit_key")]
    pub commit_key: String,
    #[serde(default = "default_cancel_key")]
    pub cancel_key: String,
    #[serde(default = "default_undo_key")]
    pub undo_key: String,
    /// Binding overrides; an empty action list unbinds.
    #[serde(default)]
    pub bindings: Keymap,
}

fn default_sequence_timeout() -> u64 {
    1000
}

fn default_commit_key() -> String {
    "enter".to_string()
}

fn default_cancel_key() -> String {
    "escape".to_string()
}

fn default_undo_key() -> String {
    "backspace".to_string()
}

impl Default for KeybindConfig {
    fn default() -> Self {
        Self {
            sequence_timeout_ms: default_sequence_timeout(),
            on_timeout: TimeoutBehavior::default(),
            commit_key: default_commit_key(),
            cancel_key: default_cancel_key(),
            undo_key: default_undo_key(),
            bindings: Keymap::new(),
        }
    }
}

fn control_key(field: &str, value: &str) -> KeyCombo {
    if let Err(err) = try_parse_combo(value) {
        tracing::warn!(field, value, error = %err, "malformed control key");
    }
    parse_combo(value)
}

impl KeybindConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), overrides = config.bindings.len(), "loaded keybinds");
        Ok(config)
    }

    /// Load from default location, or defaults when no file exists.
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    /// Get default config path.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "tui-actions")
            .map(|d| d.config_dir().join("keybinds.toml"))
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml_string()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Matcher settings described by this configuration.
    pub fn scheme(&self) -> SequenceScheme {
        SequenceScheme {
            timeout_ms: self.sequence_timeout_ms,
            on_timeout: self.on_timeout,
            commit_key: control_key("commit_key", &self.commit_key),
            cancel_key: control_key("cancel_key", &self.cancel_key),
            undo_key: control_key("undo_key", &self.undo_key),
        }
    }

    /// The override map, keyed by canonical binding string.
    pub fn overrides(&self) -> &Keymap {
        &self.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::ActionId;

    #[test]
    fn test_default_config() {
        let config = KeybindConfig::default();
        assert_eq!(config.sequence_timeout_ms, 1000);
        assert_eq!(config.on_timeout, TimeoutBehavior::Submit);
        assert_eq!(config.scheme(), SequenceScheme::default());
        assert!(config.overrides().is_empty());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = KeybindConfig::from_toml_str("on_timeout = \"cancel\"\n").unwrap();
        assert_eq!(config.on_timeout, TimeoutBehavior::Cancel);
        assert_eq!(config.sequence_timeout_ms, 1000);
        assert_eq!(config.commit_key, "enter");
    }

    #[test]
    fn test_full_file() {
        let source = r#"
sequence_timeout_ms = 750
on_timeout = "submit"
commit_key = "space"
cancel_key = "ctrl+g"
undo_key = "backspace"

[bindings]
"g t" = "nav:table"
"ctrl+k" = ["palette:open", "palette:focus"]
"shift+n" = []
"#;
        let config = KeybindConfig::from_toml_str(source).unwrap();
        let scheme = config.scheme();
        assert_eq!(scheme.timeout_ms, 750);
        assert_eq!(scheme.commit_key, KeyCombo::key("space"));
        assert_eq!(scheme.cancel_key, KeyCombo::ctrl('g'));

        let overrides = config.overrides();
        assert_eq!(overrides.actions_for("g t"), &[ActionId::new("nav:table")]);
        assert_eq!(overrides.actions_for("ctrl+k").len(), 2);
        assert!(overrides.get("N").is_some_and(|b| b.is_unbound()));
    }

    #[test]
    fn test_invalid_toml() {
        let result = KeybindConfig::from_toml_str("on_timeout = \"later\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_malformed_control_key_falls_back() {
        let config = KeybindConfig {
            cancel_key: "hyper+q".to_string(),
            ..KeybindConfig::default()
        };
        assert_eq!(config.scheme().cancel_key.key, "hyper+q");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("keybinds.toml");

        let mut config = KeybindConfig::default();
        config.sequence_timeout_ms = 0;
        config.bindings.bind("g c", "nav:canvas");
        config.bindings.set("x", Vec::new());
        config.save(&path).unwrap();

        let loaded = KeybindConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.scheme().timeout(), None);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = KeybindConfig::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
