//! Keymap and action identifiers.

use crate::binding::KeySeq;
use crate::parser::{parse_seq, try_parse_seq};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identifier of a bindable action (`"nav:table"`, `"palette.open"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ActionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One keymap entry: a parsed pattern and the actions bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// The parsed pattern
    pub seq: KeySeq,
    /// Actions bound to the pattern, in binding order
    pub actions: Vec<ActionId>,
}

impl Binding {
    /// Canonical binding string.
    pub fn id(&self) -> String {
        self.seq.to_string()
    }

    /// An entry with no actions marks an explicit unbind in an override map.
    pub fn is_unbound(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Persisted shape of an entry: one action id or a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ActionList {
    One(ActionId),
    Many(Vec<ActionId>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
struct KeymapRepr(IndexMap<String, ActionList>);

/// Mapping from canonical binding string to action ids.
///
/// Keys are canonicalized on insert, so `"control+K"` and `"ctrl+shift+k"`
/// land on the same entry. Iteration follows declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "KeymapRepr", into = "KeymapRepr")]
pub struct Keymap {
    bindings: IndexMap<String, Binding>,
}

impl Keymap {
    /// Create a new empty keymap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an action to a binding string.
    ///
    /// Binding a second action to the same string keeps both; that is a
    /// duplicate the conflict detector reports.
    pub fn bind(&mut self, binding: &str, action: impl Into<ActionId>) {
        let seq = parse_seq(binding);
        if seq.is_empty() {
            tracing::warn!(binding, "ignoring empty key binding");
            return;
        }
        self.bind_seq(seq, action);
    }

    /// Bind an action to an already parsed pattern.
    pub fn bind_seq(&mut self, seq: KeySeq, action: impl Into<ActionId>) {
        let action = action.into();
        let binding = self.bindings.entry(seq.to_string()).or_insert_with(|| Binding {
            seq,
            actions: Vec::new(),
        });
        if !binding.actions.contains(&action) {
            binding.actions.push(action);
        }
    }

    /// Replace the actions of a binding. An empty list records an unbind.
    pub fn set(&mut self, binding: &str, actions: Vec<ActionId>) {
        let seq = parse_seq(binding);
        if seq.is_empty() {
            tracing::warn!(binding, "ignoring empty key binding");
            return;
        }
        let mut deduped = Vec::with_capacity(actions.len());
        for action in actions {
            if !deduped.contains(&action) {
                deduped.push(action);
            }
        }
        self.bindings.insert(
            seq.to_string(),
            Binding {
                seq,
                actions: deduped,
            },
        );
    }

    /// Look up a binding by any spelling of its string.
    pub fn get(&self, binding: &str) -> Option<&Binding> {
        self.bindings.get(&parse_seq(binding).to_string())
    }

    /// Actions bound to a binding string.
    pub fn actions_for(&self, binding: &str) -> &[ActionId] {
        self.get(binding).map(|b| b.actions.as_slice()).unwrap_or(&[])
    }

    /// Bindings that trigger an action.
    pub fn bindings_for_action(&self, action: &str) -> Vec<&Binding> {
        self.bindings
            .values()
            .filter(|b| b.actions.iter().any(|a| a.as_str() == action))
            .collect()
    }

    /// All entries in declaration order, including explicit unbinds.
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    /// Entries that have at least one action.
    pub fn active(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values().filter(|b| !b.is_unbound())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Apply a user override map on top of this keymap.
    ///
    /// Any action named in `overrides` loses its bindings here first, so
    /// rebinding moves an action instead of adding a second shortcut. Entries
    /// with no actions remove the binding.
    pub fn with_overrides(&self, overrides: &Keymap) -> Keymap {
        let rebound: HashSet<&str> = overrides
            .iter()
            .flat_map(|b| b.actions.iter().map(ActionId::as_str))
            .collect();

        let mut merged = self.clone();
        for binding in merged.bindings.values_mut() {
            binding.actions.retain(|a| !rebound.contains(a.as_str()));
        }
        merged.bindings.retain(|_, b| !b.is_unbound());

        for (id, binding) in &overrides.bindings {
            if binding.is_unbound() {
                merged.bindings.shift_remove(id);
            } else {
                merged.bindings.insert(id.clone(), binding.clone());
            }
        }
        merged
    }
}

impl From<KeymapRepr> for Keymap {
    fn from(repr: KeymapRepr) -> Self {
        let mut keymap = Keymap::new();
        for (binding, actions) in repr.0 {
            if let Err(err) = try_parse_seq(&binding) {
                tracing::warn!(binding = %binding, error = %err, "malformed key binding");
            }
            let actions = match actions {
                ActionList::One(action) => vec![action],
                ActionList::Many(actions) => actions,
            };
            // Two spellings of the same binding merge into one entry.
            let existing = keymap.get(&binding).map(|b| b.actions.clone());
            match existing {
                Some(mut merged) => {
                    merged.extend(actions);
                    keymap.set(&binding, merged);
                }
                None => keymap.set(&binding, actions),
            }
        }
        keymap
    }
}

impl From<Keymap> for KeymapRepr {
    fn from(keymap: Keymap) -> Self {
        KeymapRepr(
            keymap
                .bindings
                .into_iter()
                .map(|(id, binding)| {
                    let list = match <[ActionId; 1]>::try_from(binding.actions) {
                        Ok([action]) => ActionList::One(action),
                        Err(actions) => ActionList::Many(actions),
                    };
                    (id, list)
                })
                .collect(),
        )
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Keymap {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut keymap = Keymap::new();
        for (binding, action) in iter {
            keymap.bind(binding, action);
        }
        keymap
    }
}
