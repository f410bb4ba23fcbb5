//! Conflict detection for keybindings.

use crate::binding::{KeySeq, SeqElem};
use crate::keymap::{ActionId, Binding, Keymap};
use crate::matcher::elems_equal;
use std::collections::BTreeMap;
use std::fmt;

/// Severity of a keybinding conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConflictSeverity {
    /// Reachable through the commit key or an ordering rule
    Warning,
    /// Several actions on one binding
    Error,
}

/// How a binding relates to another one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    /// Two or more actions share this binding
    Duplicate,
    /// This binding is a strict prefix of the named one
    PrefixOf(String),
    /// The named binding is a strict prefix of this one
    HasPrefix(String),
    /// Same length, and placeholders let both match the same keys
    OverlapsWith(String),
}

impl Relation {
    pub fn severity(&self) -> ConflictSeverity {
        match self {
            Self::Duplicate => ConflictSeverity::Error,
            _ => ConflictSeverity::Warning,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate => write!(f, "duplicate"),
            Self::PrefixOf(other) => write!(f, "prefix of: {}", other),
            Self::HasPrefix(other) => write!(f, "has prefix: {}", other),
            Self::OverlapsWith(other) => write!(f, "overlaps: {}", other),
        }
    }
}

/// Everything implicated in conflicts on one binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictEntry {
    /// The conflicting binding
    pub binding: String,
    /// Actions on this binding and on the bindings it conflicts with
    pub actions: Vec<ActionId>,
    /// Relationships, deduplicated
    pub relations: Vec<Relation>,
}

impl ConflictEntry {
    fn new(binding: String) -> Self {
        Self {
            binding,
            actions: Vec::new(),
            relations: Vec::new(),
        }
    }

    fn add_actions<'a>(&mut self, actions: impl IntoIterator<Item = &'a ActionId>) {
        for action in actions {
            if !self.actions.contains(action) {
                self.actions.push(action.clone());
            }
        }
    }

    fn add_relation(&mut self, relation: Relation) {
        if !self.relations.contains(&relation) {
            self.relations.push(relation);
        }
    }

    /// Human-readable relationship tags (`"prefix of: g t"`).
    pub fn tags(&self) -> Vec<String> {
        self.relations.iter().map(Relation::to_string).collect()
    }

    /// The worst severity among the relations.
    pub fn severity(&self) -> ConflictSeverity {
        self.relations
            .iter()
            .map(Relation::severity)
            .max()
            .unwrap_or(ConflictSeverity::Warning)
    }
}

/// Report of all conflicts found in a keymap.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConflictReport {
    entries: BTreeMap<String, ConflictEntry>,
}

impl ConflictReport {
    /// Create an empty conflict report.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, this: &Binding, other: Option<&Binding>, relation: Relation) {
        let entry = self
            .entries
            .entry(this.id())
            .or_insert_with_key(|id| ConflictEntry::new(id.clone()));
        entry.add_actions(&this.actions);
        if let Some(other) = other {
            entry.add_actions(&other.actions);
        }
        entry.add_relation(relation);
    }

    /// Check if there are any conflicts.
    pub fn has_conflicts(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Check if there are any error-level conflicts.
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Entries with at least one error-level relation.
    pub fn errors(&self) -> impl Iterator<Item = &ConflictEntry> {
        self.entries
            .values()
            .filter(|e| e.severity() == ConflictSeverity::Error)
    }

    /// Entries with only warning-level relations.
    pub fn warnings(&self) -> impl Iterator<Item = &ConflictEntry> {
        self.entries
            .values()
            .filter(|e| e.severity() == ConflictSeverity::Warning)
    }

    /// Conflict details for one binding string (canonical form).
    pub fn get(&self, binding: &str) -> Option<&ConflictEntry> {
        self.entries.get(binding)
    }

    /// All entries, ordered by binding string.
    pub fn iter(&self) -> impl Iterator<Item = &ConflictEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bindings a "disable conflicting bindings" policy would switch off.
    pub fn conflicting_bindings(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "No conflicts detected");
        }

        for entry in self.entries.values() {
            let severity = match entry.severity() {
                ConflictSeverity::Error => "ERROR",
                ConflictSeverity::Warning => "WARNING",
            };
            writeln!(f, "[{}] Key '{}':", severity, entry.binding)?;
            for tag in entry.tags() {
                writeln!(f, "  - {}", tag)?;
            }
            let actions: Vec<&str> = entry.actions.iter().map(ActionId::as_str).collect();
            writeln!(f, "  actions: {}", actions.join(", "))?;
        }

        Ok(())
    }
}

/// Whether `short` matches the start of `long` element by element.
fn is_strict_prefix(short: &KeySeq, long: &KeySeq) -> bool {
    short.len() < long.len()
        && short
            .elems()
            .iter()
            .zip(long.elems())
            .all(|(a, b)| elems_equal(a, b))
}

fn is_digit_key(elem: &SeqElem) -> bool {
    matches!(elem, SeqElem::Key(combo) if combo.digit().is_some())
}

/// Whether one concrete key could satisfy both positions.
fn positions_overlap(a: &SeqElem, b: &SeqElem) -> bool {
    if elems_equal(a, b) {
        return true;
    }
    match (a, b) {
        (x, y) if x.is_placeholder() && y.is_placeholder() => true,
        (x, y) if x.is_placeholder() => is_digit_key(y),
        (x, y) if y.is_placeholder() => is_digit_key(x),
        _ => false,
    }
}

fn patterns_overlap(a: &KeySeq, b: &KeySeq) -> bool {
    a.len() == b.len()
        && a.elems()
            .iter()
            .zip(b.elems())
            .all(|(x, y)| positions_overlap(x, y))
}

/// Find duplicates, prefix relationships and placeholder overlaps.
///
/// Every pairwise relationship is recorded on both bindings.
pub fn detect_conflicts(keymap: &Keymap) -> ConflictReport {
    let mut report = ConflictReport::new();
    let bindings: Vec<&Binding> = keymap.active().collect();

    for binding in &bindings {
        if binding.actions.len() > 1 {
            report.record(binding, None, Relation::Duplicate);
        }
    }

    for (i, a) in bindings.iter().enumerate() {
        for b in &bindings[i + 1..] {
            if is_strict_prefix(&a.seq, &b.seq) {
                report.record(a, Some(b), Relation::PrefixOf(b.id()));
                report.record(b, Some(a), Relation::HasPrefix(a.id()));
            } else if is_strict_prefix(&b.seq, &a.seq) {
                report.record(b, Some(a), Relation::PrefixOf(a.id()));
                report.record(a, Some(b), Relation::HasPrefix(b.id()));
            } else if patterns_overlap(&a.seq, &b.seq) {
                report.record(a, Some(b), Relation::OverlapsWith(b.id()));
                report.record(b, Some(a), Relation::OverlapsWith(a.id()));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(entry: &ConflictEntry) -> Vec<&str> {
        entry.actions.iter().map(ActionId::as_str).collect()
    }

    #[test]
    fn test_empty_keymap() {
        let report = detect_conflicts(&Keymap::new());
        assert!(!report.has_conflicts());
        assert_eq!(report.to_string(), "No conflicts detected");
    }

    #[test]
    fn test_duplicate() {
        let mut keymap = Keymap::new();
        keymap.bind("ctrl+s", "save");
        keymap.bind("control+s", "sync");

        let report = detect_conflicts(&keymap);
        let entry = report.get("ctrl+s").unwrap();
        assert_eq!(ids(entry), vec!["save", "sync"]);
        assert_eq!(entry.relations, vec![Relation::Duplicate]);
        assert!(report.has_errors());
    }

    #[test]
    fn test_prefix_is_symmetric() {
        let keymap: Keymap = [("g", "navG"), ("g t", "navGT")].into_iter().collect();
        let report = detect_conflicts(&keymap);

        let short = report.get("g").unwrap();
        let long = report.get("g t").unwrap();
        assert_eq!(short.tags(), vec!["prefix of: g t"]);
        assert_eq!(long.tags(), vec!["has prefix: g"]);
        assert_eq!(ids(short), vec!["navG", "navGT"]);
        assert_eq!(ids(long), vec!["navGT", "navG"]);
        assert!(!report.has_errors());
        assert_eq!(report.warnings().count(), 2);
    }

    #[test]
    fn test_prefix_declared_after() {
        let keymap: Keymap = [("g t", "navGT"), ("g", "navG")].into_iter().collect();
        let report = detect_conflicts(&keymap);
        assert_eq!(report.get("g").unwrap().tags(), vec!["prefix of: g t"]);
        assert_eq!(report.get("g t").unwrap().tags(), vec!["has prefix: g"]);
    }

    #[test]
    fn test_no_prefix_between_siblings() {
        let keymap: Keymap = [("g t", "a"), ("g c", "b"), ("ctrl+g", "c")].into_iter().collect();
        assert!(!detect_conflicts(&keymap).has_conflicts());
    }

    #[test]
    fn test_placeholder_overlaps() {
        let keymap: Keymap = [
            ("\\d j", "one"),
            ("\\d+ j", "many"),
            ("5 j", "five"),
            ("x j", "other"),
        ]
        .into_iter()
        .collect();
        let report = detect_conflicts(&keymap);

        let one = report.get("\\d j").unwrap();
        assert!(one.relations.contains(&Relation::OverlapsWith("\\d+ j".to_string())));
        assert!(one.relations.contains(&Relation::OverlapsWith("5 j".to_string())));

        let five = report.get("5 j").unwrap();
        assert!(five.relations.contains(&Relation::OverlapsWith("\\d+ j".to_string())));
        assert!(report.get("x j").is_none());
    }

    #[test]
    fn test_overlap_needs_every_position() {
        let keymap: Keymap = [("\\d j", "a"), ("\\d k", "b")].into_iter().collect();
        assert!(!detect_conflicts(&keymap).has_conflicts());
    }

    #[test]
    fn test_modified_digit_does_not_overlap() {
        let keymap: Keymap = [("\\d", "a"), ("ctrl+5", "b")].into_iter().collect();
        assert!(!detect_conflicts(&keymap).has_conflicts());
    }

    #[test]
    fn test_unbound_entries_skipped() {
        let mut keymap = Keymap::new();
        keymap.bind("g t", "navGT");
        keymap.set("g", Vec::new());
        assert!(!detect_conflicts(&keymap).has_conflicts());
    }

    #[test]
    fn test_conflicting_bindings() {
        let keymap: Keymap = [("g", "a"), ("g t", "b"), ("x", "c")].into_iter().collect();
        let report = detect_conflicts(&keymap);
        assert_eq!(report.conflicting_bindings(), vec!["g", "g t"]);
    }

    #[test]
    fn test_report_display() {
        let mut keymap = Keymap::new();
        keymap.bind("ctrl+s", "save");
        keymap.bind("ctrl+s", "sync");
        keymap.bind("g", "navG");
        keymap.bind("g t", "navGT");

        insta::assert_snapshot!(detect_conflicts(&keymap).to_string(), @r"
        [ERROR] Key 'ctrl+s':
          - duplicate
          actions: save, sync
        [WARNING] Key 'g':
          - prefix of: g t
          actions: navG, navGT
        [WARNING] Key 'g t':
          - has prefix: g
          actions: navGT, navG
        ");
    }

    fn keymap_strategy() -> impl Strategy<Value = Keymap> {
        let token = prop::sample::select(vec!["g", "t", "ctrl+g", "1", "7", "\\d", "\\d+"]);
        let binding = prop::collection::vec(token, 1..4).prop_map(|tokens| tokens.join(" "));
        let action = prop::sample::select(vec!["a", "b", "c", "d"]);
        prop::collection::vec((binding, action), 0..8).prop_map(|entries| {
            let mut keymap = Keymap::new();
            for (binding, action) in entries {
                keymap.bind(&binding, action);
            }
            keymap
        })
    }

    proptest! {
        #[test]
        fn test_relations_are_symmetric(keymap in keymap_strategy()) {
            let report = detect_conflicts(&keymap);
            for entry in report.iter() {
                for relation in &entry.relations {
                    let (other, mirror) = match relation {
                        Relation::Duplicate => continue,
                        Relation::PrefixOf(b) => (b, Relation::HasPrefix(entry.binding.clone())),
                        Relation::HasPrefix(b) => (b, Relation::PrefixOf(entry.binding.clone())),
                        Relation::OverlapsWith(b) => (b, Relation::OverlapsWith(entry.binding.clone())),
                    };
                    let back = report.get(other);
                    prop_assert!(back.is_some_and(|e| e.relations.contains(&mirror)));
                }
            }
        }
    }
}
