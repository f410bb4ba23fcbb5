//! Fuzzy subsequence scoring and ranking.
//!
//! A query matches a field when all of its characters appear in order,
//! case-insensitively. Hits are found greedily from the left; the score
//! rewards streaks, word starts and early positions.

use std::ops::Range;

const MATCH_SCORE: f64 = 1.0;
const STREAK_BONUS: f64 = 1.0;
const BOUNDARY_BONUS: f64 = 2.0;
const UPPERCASE_BONUS: f64 = 0.5;
const POSITION_PENALTY: f64 = 0.02;
const MIN_POSITION_FACTOR: f64 = 0.5;
const EXACT_BONUS: f64 = 10.0;
const PREFIX_BONUS: f64 = 5.0;

const LABEL_WEIGHT: f64 = 3.0;
const DESCRIPTION_WEIGHT: f64 = 1.5;
const GROUP_WEIGHT: f64 = 1.0;
const ID_WEIGHT: f64 = 0.5;
const KEYWORD_WEIGHT: f64 = 2.0;

/// Result of matching a query against one text.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub matched: bool,
    pub score: f64,
    /// Matched character positions as half-open char-index ranges, ascending
    pub ranges: Vec<Range<usize>>,
}

impl FuzzyMatch {
    fn miss() -> Self {
        Self {
            matched: false,
            score: 0.0,
            ranges: Vec::new(),
        }
    }
}

fn is_word_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '_' | '.' | '/')
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn merge_ranges(indices: &[usize]) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = Vec::new();
    for &idx in indices {
        match ranges.last_mut() {
            Some(last) if last.end == idx => last.end = idx + 1,
            _ => ranges.push(idx..idx + 1),
        }
    }
    ranges
}

/// Match `query` against `text`.
///
/// An empty query matches anything with a score of zero.
pub fn fuzzy_match(query: &str, text: &str) -> FuzzyMatch {
    let query: Vec<char> = query.chars().collect();
    if query.is_empty() {
        return FuzzyMatch {
            matched: true,
            score: 0.0,
            ranges: Vec::new(),
        };
    }

    let text: Vec<char> = text.chars().collect();
    let mut indices = Vec::with_capacity(query.len());
    let mut score = 0.0;
    let mut streak = 0usize;
    let mut q = 0;

    for (idx, &ch) in text.iter().enumerate() {
        if q == query.len() {
            break;
        }
        if !chars_eq_ignore_case(ch, query[q]) {
            continue;
        }

        if indices.last().is_some_and(|&prev| prev + 1 == idx) {
            streak += 1;
        } else {
            streak = 0;
        }

        let mut hit = MATCH_SCORE + STREAK_BONUS * streak as f64;
        if idx == 0 || is_word_separator(text[idx - 1]) {
            hit += BOUNDARY_BONUS;
        }
        if ch.is_uppercase() {
            hit += UPPERCASE_BONUS;
        }
        let factor = (1.0 - POSITION_PENALTY * idx as f64).max(MIN_POSITION_FACTOR);
        score += hit * factor;

        indices.push(idx);
        q += 1;
    }

    if q < query.len() {
        return FuzzyMatch::miss();
    }

    let is_prefix = text.len() >= query.len()
        && text
            .iter()
            .zip(&query)
            .all(|(&t, &c)| chars_eq_ignore_case(t, c));
    if is_prefix && text.len() == query.len() {
        score += EXACT_BONUS;
    } else if is_prefix {
        score += PREFIX_BONUS;
    }

    FuzzyMatch {
        matched: true,
        score,
        ranges: merge_ranges(&indices),
    }
}

/// A record the ranker can search.
pub trait Searchable {
    fn id(&self) -> &str;

    fn label(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    fn group(&self) -> Option<&str> {
        None
    }

    fn keywords(&self) -> &[String] {
        &[]
    }
}

/// Per-field matches, for highlighting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMatches {
    pub label: Option<FuzzyMatch>,
    pub description: Option<FuzzyMatch>,
    pub group: Option<FuzzyMatch>,
    pub id: Option<FuzzyMatch>,
    /// Index of the best matching keyword and its match
    pub keyword: Option<(usize, FuzzyMatch)>,
}

impl FieldMatches {
    fn any(&self) -> bool {
        self.label.is_some()
            || self.description.is_some()
            || self.group.is_some()
            || self.id.is_some()
            || self.keyword.is_some()
    }

    fn total(&self) -> f64 {
        let field = |m: &Option<FuzzyMatch>| m.as_ref().map_or(0.0, |m| m.score);
        field(&self.label) * LABEL_WEIGHT
            + field(&self.description) * DESCRIPTION_WEIGHT
            + field(&self.group) * GROUP_WEIGHT
            + field(&self.id) * ID_WEIGHT
            + self.keyword.as_ref().map_or(0.0, |(_, m)| m.score) * KEYWORD_WEIGHT
    }
}

/// A ranked record.
#[derive(Debug, Clone)]
pub struct Ranked<'a, T: ?Sized> {
    pub item: &'a T,
    /// Position in the input
    pub index: usize,
    pub score: f64,
    pub matches: FieldMatches,
}

fn matched(query: &str, text: &str) -> Option<FuzzyMatch> {
    let m = fuzzy_match(query, text);
    m.matched.then_some(m)
}

fn match_fields<T: Searchable + ?Sized>(query: &str, item: &T) -> FieldMatches {
    let mut keyword: Option<(usize, FuzzyMatch)> = None;
    for (i, k) in item.keywords().iter().enumerate() {
        if let Some(m) = matched(query, k) {
            if keyword.as_ref().map_or(true, |(_, best)| m.score > best.score) {
                keyword = Some((i, m));
            }
        }
    }

    FieldMatches {
        label: matched(query, item.label()),
        description: item.description().and_then(|d| matched(query, d)),
        group: item.group().and_then(|g| matched(query, g)),
        id: matched(query, item.id()),
        keyword,
    }
}

/// Rank records against a query, best first.
///
/// An empty query keeps every record with a score of zero. Ties keep
/// input order.
pub fn rank<'a, T, I>(query: &str, items: I) -> Vec<Ranked<'a, T>>
where
    T: Searchable + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let query = query.trim();

    let mut ranked: Vec<Ranked<'a, T>> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            if query.is_empty() {
                return Some(Ranked {
                    item,
                    index,
                    score: 0.0,
                    matches: FieldMatches::default(),
                });
            }
            let matches = match_fields(query, item);
            matches.any().then(|| Ranked {
                item,
                index,
                score: matches.total(),
                matches,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}
