//! Action and handler registries.
//!
//! Hosts register actions explicitly by id and remove them the same way;
//! a component's mount/unmount hooks should simply call
//! [`ActionRegistry::register`] and [`ActionRegistry::unregister`].

use crate::display::KeyDisplayConfig;
use crate::fuzzy::{rank, FieldMatches, Searchable};
use crate::keymap::{ActionId, Keymap};
use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

/// Error type for action dispatch.
#[derive(Debug, Error)]
pub enum ActionError {
    /// No handler is registered for the action
    #[error("action not found: {0}")]
    NotFound(String),

    /// The handler ran and failed
    #[error("action failed: {0}")]
    Failed(String),
}

/// A searchable, bindable action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDef {
    /// Unique identifier (`"nav:table"`)
    pub id: ActionId,
    /// Label shown in the palette
    pub label: String,
    pub description: Option<String>,
    /// Palette section
    pub group: Option<String>,
    /// Extra search terms
    pub keywords: Vec<String>,
    /// Disabled actions are kept but hidden from search
    pub enabled: bool,
}

impl ActionDef {
    pub fn new(id: impl Into<ActionId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            group: None,
            keywords: Vec::new(),
            enabled: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl Searchable for ActionDef {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

/// Registered actions, in registration order.
#[derive(Debug, Default, Clone)]
pub struct ActionRegistry {
    actions: IndexMap<ActionId, ActionDef>,
}

impl ActionRegistry {
    /// Create a new empty action registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action, replacing any with the same id.
    pub fn register(&mut self, action: ActionDef) -> Option<ActionDef> {
        self.actions.insert(action.id.clone(), action)
    }

    pub fn unregister(&mut self, id: &str) -> Option<ActionDef> {
        self.actions.shift_remove(&ActionId::new(id))
    }

    pub fn get(&self, id: &str) -> Option<&ActionDef> {
        self.actions.get(&ActionId::new(id))
    }

    /// Enable or disable an action. Returns false if it is not registered.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        match self.actions.get_mut(&ActionId::new(id)) {
            Some(action) => {
                action.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionDef> {
        self.actions.values()
    }

    /// Enabled actions only.
    pub fn enabled(&self) -> impl Iterator<Item = &ActionDef> {
        self.actions.values().filter(|a| a.enabled)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Callback run when an action fires. Receives the captured integers.
pub type Handler = Box<dyn FnMut(&[u32]) -> Result<(), ActionError>>;

/// Action id to callback lookup.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: IndexMap<ActionId, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the id.
    pub fn register<F>(&mut self, id: impl Into<ActionId>, handler: F)
    where
        F: FnMut(&[u32]) -> Result<(), ActionError> + 'static,
    {
        self.handlers.insert(id.into(), Box::new(handler));
    }

    /// Remove a handler. Returns whether one was registered.
    pub fn unregister(&mut self, id: &str) -> bool {
        self.handlers.shift_remove(&ActionId::new(id)).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(&ActionId::new(id))
    }

    /// Run the handler for an action.
    pub fn dispatch(&mut self, id: &str, captures: &[u32]) -> Result<(), ActionError> {
        let handler = self
            .handlers
            .get_mut(&ActionId::new(id))
            .ok_or_else(|| ActionError::NotFound(id.into()))?;
        handler(captures)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("actions", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// One search result.
#[derive(Debug, Clone)]
pub struct ActionHit<'a> {
    pub action: &'a ActionDef,
    pub score: f64,
    /// Matched ranges per field
    pub matches: FieldMatches,
    /// Formatted bindings that trigger the action, in keymap order
    pub shortcuts: Vec<String>,
}

/// Rank enabled actions against a query and attach their shortcuts.
///
/// An empty query returns every enabled action in registration order.
pub fn search_actions<'a>(
    query: &str,
    registry: &'a ActionRegistry,
    keymap: &Keymap,
    display: &KeyDisplayConfig,
) -> Vec<ActionHit<'a>> {
    rank(query, registry.enabled())
        .into_iter()
        .map(|ranked| ActionHit {
            action: ranked.item,
            score: ranked.score,
            matches: ranked.matches,
            shortcuts: keymap
                .bindings_for_action(ranked.item.id.as_str())
                .into_iter()
                .map(|b| display.format_seq(&b.seq))
                .collect(),
        })
        .collect()
}
