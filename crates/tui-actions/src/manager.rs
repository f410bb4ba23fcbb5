//! Keybind manager.

use crate::binding::KeyCombo;
use crate::completion::{complete, Completion};
use crate::config::KeybindConfig;
use crate::conflict::{detect_conflicts, ConflictReport};
use crate::display::KeyDisplayConfig;
use crate::keymap::{ActionId, Keymap};
use crate::registry::{search_actions, ActionDef, ActionError, ActionHit, ActionRegistry, HandlerRegistry};
use crate::scheme::SequenceScheme;
use crate::sequence::{KeyOutcome, Match, MatchPhase, SequenceMatcher};
use crate::timer::TimerToken;

use crossterm::event::{KeyEvent, KeyEventKind};
use std::time::Instant;

/// Keybind manager.
///
/// Owns the default keymap, user overrides, the sequence matcher and the
/// action registries. Executed bindings are dispatched to the registered
/// handlers before the outcome is returned.
#[derive(Debug)]
pub struct KeybindManager {
    /// Application defaults
    defaults: Keymap,
    /// User overrides
    overrides: Keymap,
    /// Defaults with overrides applied
    effective: Keymap,
    matcher: SequenceMatcher,
    /// Display configuration
    display: KeyDisplayConfig,
    /// Searchable actions
    pub actions: ActionRegistry,
    /// Callbacks by action id
    pub handlers: HandlerRegistry,
}

impl KeybindManager {
    /// Create a new keybind manager.
    pub fn new(defaults: Keymap, scheme: SequenceScheme) -> Self {
        let effective = defaults.clone();
        let matcher = SequenceMatcher::new(&effective, scheme);

        Self {
            defaults,
            overrides: Keymap::new(),
            effective,
            matcher,
            display: KeyDisplayConfig::default(),
            actions: ActionRegistry::new(),
            handlers: HandlerRegistry::new(),
        }
    }

    /// Create a manager configured from a user config file.
    pub fn from_config(defaults: Keymap, config: &KeybindConfig) -> Self {
        let mut manager = Self::new(defaults, config.scheme());
        manager.set_overrides(config.overrides().clone());
        manager
    }

    /// Apply a reloaded configuration. Any pending sequence is dropped.
    pub fn apply_config(&mut self, config: &KeybindConfig) {
        self.matcher.set_scheme(config.scheme());
        self.set_overrides(config.overrides().clone());
    }

    fn rebuild(&mut self) {
        self.effective = self.defaults.with_overrides(&self.overrides);
        self.matcher.set_keymap(&self.effective);
    }

    /// Add a default keybinding.
    pub fn bind(&mut self, binding: &str, action: impl Into<ActionId>) {
        self.defaults.bind(binding, action);
        self.rebuild();
    }

    /// Unbind a key sequence through the override map.
    pub fn unbind(&mut self, binding: &str) {
        self.overrides.set(binding, Vec::new());
        self.rebuild();
    }

    /// Replace the user overrides.
    pub fn set_overrides(&mut self, overrides: Keymap) {
        self.overrides = overrides;
        self.rebuild();
    }

    pub fn defaults(&self) -> &Keymap {
        &self.defaults
    }

    pub fn overrides(&self) -> &Keymap {
        &self.overrides
    }

    /// The keymap the matcher runs against.
    pub fn effective_keymap(&self) -> &Keymap {
        &self.effective
    }

    pub fn scheme(&self) -> &SequenceScheme {
        self.matcher.scheme()
    }

    /// Set the sequence scheme. Any pending sequence is dropped.
    pub fn set_scheme(&mut self, scheme: SequenceScheme) {
        self.matcher.set_scheme(scheme);
    }

    pub fn display(&self) -> &KeyDisplayConfig {
        &self.display
    }

    /// Set the display configuration.
    pub fn set_display(&mut self, config: KeyDisplayConfig) {
        self.display = config;
    }

    /// Register an action and its handler together.
    pub fn register<F>(&mut self, action: ActionDef, handler: F)
    where
        F: FnMut(&[u32]) -> Result<(), ActionError> + 'static,
    {
        self.handlers.register(action.id.clone(), handler);
        self.actions.register(action);
    }

    /// Remove an action and its handler.
    pub fn unregister(&mut self, id: &str) {
        self.actions.unregister(id);
        self.handlers.unregister(id);
    }

    /// Handle a terminal key event.
    ///
    /// Release events are not consumed.
    pub fn handle_event(&mut self, event: KeyEvent, now: Instant) -> KeyOutcome {
        if event.kind == KeyEventKind::Release {
            return KeyOutcome::Ignored;
        }
        self.handle_key(KeyCombo::from(event), now)
    }

    /// Handle an already converted key.
    ///
    /// A sequence timeout that was already due is dispatched before the key.
    pub fn handle_key(&mut self, key: KeyCombo, now: Instant) -> KeyOutcome {
        let outcome = self.matcher.handle_key(key, now);
        if let Some(expired) = self.matcher.take_expired() {
            self.dispatch(expired);
        }
        self.dispatch(outcome)
    }

    /// Fire the sequence timer if it is due.
    pub fn tick(&mut self, now: Instant) -> KeyOutcome {
        let outcome = self.matcher.tick(now);
        self.dispatch(outcome)
    }

    /// Host-scheduled timer callback.
    pub fn on_timer(&mut self, token: TimerToken) -> KeyOutcome {
        let outcome = self.matcher.on_timer(token);
        self.dispatch(outcome)
    }

    /// Run the first completed candidate of the pending sequence.
    pub fn commit(&mut self) -> KeyOutcome {
        let outcome = self.matcher.commit();
        self.dispatch(outcome)
    }

    /// Drop the pending sequence.
    pub fn cancel(&mut self) -> KeyOutcome {
        self.matcher.cancel()
    }

    /// When the pending sequence times out, for `crossterm::event::poll`.
    pub fn deadline(&self) -> Option<Instant> {
        self.matcher.deadline()
    }

    pub fn phase(&self) -> MatchPhase {
        self.matcher.phase()
    }

    /// Keys buffered so far, formatted for a status line.
    pub fn pending_keys(&self) -> String {
        self.display.format_keys(self.matcher.buffer())
    }

    fn dispatch(&mut self, outcome: KeyOutcome) -> KeyOutcome {
        if let KeyOutcome::Execute(m) = &outcome {
            self.run(m);
        }
        outcome
    }

    fn run(&mut self, m: &Match) {
        for action in &m.actions {
            let id = action.as_str();
            if self.actions.get(id).is_some_and(|a| !a.enabled) {
                tracing::debug!(action = id, "skipping disabled action");
                continue;
            }
            match self.handlers.dispatch(id, &m.captures) {
                Ok(()) => {
                    tracing::debug!(action = id, binding = %m.binding, captures = ?m.captures, "action dispatched");
                }
                Err(err) => {
                    tracing::warn!(action = id, binding = %m.binding, error = %err, "action dispatch failed");
                }
            }
        }
    }

    /// Check the effective keymap for conflicts.
    pub fn conflicts(&self) -> ConflictReport {
        detect_conflicts(&self.effective)
    }

    /// Bindings still reachable from the keys buffered so far.
    pub fn completions(&self) -> Vec<Completion> {
        complete(self.matcher.buffer(), &self.effective, &self.display)
    }

    /// Search enabled actions, with their shortcuts attached.
    pub fn search(&self, query: &str) -> Vec<ActionHit<'_>> {
        search_actions(query, &self.actions, &self.effective, &self.display)
    }

    /// Formatted bindings that trigger an action.
    pub fn bindings_for(&self, action: &str) -> Vec<String> {
        self.effective
            .bindings_for_action(action)
            .into_iter()
            .map(|b| self.display.format_seq(&b.seq))
            .collect()
    }
}

impl Default for KeybindManager {
    fn default() -> Self {
        Self::new(Keymap::new(), SequenceScheme::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::CancelReason;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    type Log = Rc<RefCell<Vec<(String, Vec<u32>)>>>;

    fn press(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn manager(bindings: &[(&str, &str)]) -> (KeybindManager, Log) {
        let keymap: Keymap = bindings.iter().copied().collect();
        let mut manager = KeybindManager::new(keymap, SequenceScheme::default());
        manager.set_display(KeyDisplayConfig::text());

        let log: Log = Rc::new(RefCell::new(Vec::new()));
        for (_, action) in bindings {
            let sink = Rc::clone(&log);
            let id = action.to_string();
            manager.register(ActionDef::new(*action, *action), move |captures: &[u32]| {
                sink.borrow_mut().push((id.clone(), captures.to_vec()));
                Ok(())
            });
        }
        (manager, log)
    }

    fn fired(log: &Log) -> Vec<String> {
        log.borrow().iter().map(|(id, _)| id.clone()).collect()
    }

    #[test]
    fn test_single_key_dispatch() {
        let (mut manager, log) = manager(&[("ctrl+q", "quit")]);
        let now = Instant::now();

        let event = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(matches!(manager.handle_event(event, now), KeyOutcome::Execute(_)));
        assert_eq!(fired(&log), vec!["quit"]);
    }

    #[test]
    fn test_prefix_disambiguation() {
        let (mut manager, log) = manager(&[("g", "navG"), ("g t", "navGT")]);
        let now = Instant::now();

        let outcome = manager.handle_event(press('g'), now);
        assert!(matches!(outcome, KeyOutcome::Pending { completable: true, .. }));
        assert!(fired(&log).is_empty());

        manager.handle_event(press('t'), now);
        assert_eq!(fired(&log), vec!["navGT"]);
        assert_eq!(manager.phase(), MatchPhase::Idle);
    }

    #[test]
    fn test_digits_capture_dispatch() {
        let (mut manager, log) = manager(&[("\\d+ j", "downN"), ("j", "down")]);
        let now = Instant::now();

        manager.handle_event(press('5'), now);
        manager.handle_event(press('2'), now);
        assert_eq!(manager.pending_keys(), "5 2");
        manager.handle_event(press('j'), now);

        assert_eq!(*log.borrow(), vec![("downN".to_string(), vec![52])]);
    }

    #[test]
    fn test_shift_sensitivity() {
        let (mut manager, log) = manager(&[("n", "sortAsc"), ("shift+n", "sortDesc")]);
        let now = Instant::now();

        manager.handle_event(KeyEvent::new(KeyCode::Char('N'), KeyModifiers::SHIFT), now);
        assert_eq!(fired(&log), vec!["sortDesc"]);
    }

    #[test]
    fn test_release_and_modifier_events_ignored() {
        let (mut manager, log) = manager(&[("x", "close")]);
        let now = Instant::now();

        let release = KeyEvent::new_with_kind(KeyCode::Char('x'), KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(manager.handle_event(release, now), KeyOutcome::Ignored);

        let shift = KeyEvent::new(
            KeyCode::Modifier(crossterm::event::ModifierKeyCode::LeftShift),
            KeyModifiers::SHIFT,
        );
        assert_eq!(manager.handle_event(shift, now), KeyOutcome::Ignored);
        assert!(fired(&log).is_empty());
    }

    #[test]
    fn test_timeout_submits() {
        let (mut manager, log) = manager(&[("g", "navG"), ("g t", "navGT")]);
        let now = Instant::now();

        manager.handle_event(press('g'), now);
        assert_eq!(manager.deadline(), Some(now + Duration::from_millis(1000)));
        assert_eq!(manager.tick(now + Duration::from_millis(999)), KeyOutcome::Ignored);

        manager.tick(now + Duration::from_millis(1000));
        assert_eq!(fired(&log), vec!["navG"]);
        assert!(manager.deadline().is_none());
    }

    #[test]
    fn test_overdue_timeout_dispatched_before_key() {
        let (mut manager, log) = manager(&[("g", "navG"), ("g t", "navGT"), ("x", "close")]);
        let now = Instant::now();

        manager.handle_event(press('g'), now);
        let outcome = manager.handle_event(press('x'), now + Duration::from_secs(5));
        assert!(matches!(outcome, KeyOutcome::Execute(_)));
        assert_eq!(fired(&log), vec!["navG", "close"]);
    }

    #[test]
    fn test_escape_cancels() {
        let (mut manager, log) = manager(&[("g t", "navGT")]);
        let now = Instant::now();

        manager.handle_event(press('g'), now);
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(
            manager.handle_event(esc, now),
            KeyOutcome::Cancelled(CancelReason::Explicit)
        );
        assert!(manager.deadline().is_none());
        assert_eq!(manager.handle_event(esc, now), KeyOutcome::Ignored);
        assert!(fired(&log).is_empty());
    }

    #[test]
    fn test_overrides_move_action() {
        let (mut manager, log) = manager(&[("ctrl+p", "palette"), ("ctrl+s", "save")]);
        let now = Instant::now();

        let mut overrides = Keymap::new();
        overrides.bind("ctrl+k", "palette");
        manager.set_overrides(overrides);

        let ctrl_p = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::CONTROL);
        assert_eq!(manager.handle_event(ctrl_p, now), KeyOutcome::Ignored);

        let ctrl_k = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::CONTROL);
        manager.handle_event(ctrl_k, now);
        assert_eq!(fired(&log), vec!["palette"]);
        assert_eq!(manager.bindings_for("palette"), vec!["Ctrl+K"]);
    }

    #[test]
    fn test_apply_config() {
        let (mut manager, _) = manager(&[("g t", "navGT"), ("x", "close")]);
        let config = KeybindConfig::from_toml_str(
            r#"
sequence_timeout_ms = 0

[bindings]
"x" = []
"#,
        )
        .unwrap();
        manager.apply_config(&config);

        assert!(manager.effective_keymap().get("x").is_none());
        assert_eq!(manager.scheme().timeout(), None);

        manager.handle_event(press('g'), Instant::now());
        assert!(manager.deadline().is_none());
        assert_eq!(manager.phase(), MatchPhase::Collecting);
    }

    #[test]
    fn test_disabled_action_not_dispatched() {
        let (mut manager, log) = manager(&[("x", "close")]);
        manager.actions.set_enabled("close", false);

        let outcome = manager.handle_event(press('x'), Instant::now());
        assert!(matches!(outcome, KeyOutcome::Execute(_)));
        assert!(fired(&log).is_empty());
    }

    #[test]
    fn test_failing_handler_keeps_matcher_usable() {
        let (mut manager, log) = manager(&[("x", "close")]);
        manager.bind("y", "broken");
        manager
            .handlers
            .register("broken", |_: &[u32]| Err(ActionError::Failed("boom".into())));
        let now = Instant::now();

        assert!(matches!(manager.handle_event(press('y'), now), KeyOutcome::Execute(_)));
        manager.handle_event(press('x'), now);
        assert_eq!(fired(&log), vec!["close"]);
    }

    #[test]
    fn test_completions_follow_buffer() {
        let (mut manager, _) = manager(&[("g t", "navGT"), ("g c", "navGC"), ("x", "close")]);
        manager.handle_event(press('g'), Instant::now());

        let next: Vec<String> = manager.completions().into_iter().map(|c| c.next_keys).collect();
        assert_eq!(next, vec!["C", "T"]);
    }

    #[test]
    fn test_conflicts_and_search() {
        let (mut manager, _) = manager(&[("g", "navG"), ("g t", "navGT")]);
        assert!(manager.conflicts().get("g").is_some());

        manager.unbind("g");
        assert!(!manager.conflicts().has_conflicts());

        let hits = manager.search("navgt");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].shortcuts, vec!["G T"]);
    }
}
