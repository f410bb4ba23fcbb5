//! # tui-actions
//!
//! Keyboard-driven action dispatch for the TUI Suite.
//!
//! ## Features
//!
//! - Binding grammar with chords, multi-key sequences and digit placeholders (`"g \d+ j"`)
//! - Incremental sequence matching with commit, cancel, undo and timeout
//! - Conflict detection (duplicates, prefixes, placeholder overlaps)
//! - "Which key" completion hints for a pending sequence
//! - Fuzzy action search for command palettes
//! - Platform-aware shortcut display
//!
//! ## Example
//!
//! ```ignore
//! let mut keymap = Keymap::new();
//! keymap.bind("g t", "nav:table");
//! keymap.bind("\\d+ j", "nav:down");
//!
//! let mut manager = KeybindManager::new(keymap, SequenceScheme::default());
//! manager.register(ActionDef::new("nav:down", "Move Down"), |captures: &[u32]| {
//!     let count = captures.first().copied().unwrap_or(1);
//!     // move `count` rows...
//!     Ok(())
//! });
//!
//! if let Event::Key(event) = crossterm::event::read()? {
//!     manager.handle_event(event, Instant::now());
//! }
//! ```

mod binding;
mod completion;
mod config;
mod conflict;
mod display;
mod fuzzy;
mod keymap;
mod manager;
mod matcher;
mod parser;
mod registry;
mod scheme;
mod sequence;
mod timer;

pub use binding::{KeyCombo, KeySeq, SeqElem};
pub use completion::{complete, Completion};
pub use config::{ConfigError, KeybindConfig};
pub use conflict::{detect_conflicts, ConflictEntry, ConflictReport, ConflictSeverity, Relation};
pub use display::{KeyDisplayConfig, KeyDisplayFormat, Platform, DIGITS_GLYPH, DIGIT_GLYPH};
pub use fuzzy::{fuzzy_match, rank, FieldMatches, FuzzyMatch, Ranked, Searchable};
pub use keymap::{ActionId, Binding, Keymap};
pub use manager::KeybindManager;
pub use matcher::{combo_matches, replay, SeqElemState, SeqMatchState, Step};
pub use parser::{
    canonicalize, is_shifted_symbol, normalize_key, parse_combo, parse_seq, try_parse_combo,
    try_parse_seq, ParseError,
};
pub use registry::{
    search_actions, ActionDef, ActionError, ActionHit, ActionRegistry, Handler, HandlerRegistry,
};
pub use scheme::{SequenceScheme, TimeoutBehavior};
pub use sequence::{CancelReason, KeyOutcome, Match, MatchPhase, SequenceMatcher};
pub use timer::{SequenceTimer, TimerToken};
