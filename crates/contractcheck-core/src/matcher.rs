//! Expectation matcher: scores actual error entries against expected ones
//!
//! Matching is order-independent and recall-only: every expected error must
//! be satisfied by a distinct actual entry, extra actual entries are ignored.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::expected::ExpectedError;
use crate::outcome::ErrorEntry;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct MatchResult {
    pub all_expected_present: bool,
    /// Unsatisfied expectations, sorted by normalized message.
    pub missing: Vec<ExpectedError>,
}

/// Strip a leading field-path prefix such as `$.`, `$[0].` or
/// `body.items[2].` from `text`.
///
/// Equivalent to removing the match of
/// `^\$?\w*(\[\d+\])?(\.\w+(\[\d+\])?)*\.`, with ASCII word characters.
#[must_use]
pub fn strip_field_prefix(text: &str) -> &str {
    let bytes = text.as_bytes();
    let mut pos = usize::from(bytes.first() == Some(&b'$'));
    pos = skip_word(bytes, pos);
    pos = skip_index(bytes, pos);

    // Greedy repetition: the last group end followed by a '.' wins.
    let mut cut = (bytes.get(pos) == Some(&b'.')).then_some(pos);
    while bytes.get(pos) == Some(&b'.') {
        let word_end = skip_word(bytes, pos + 1);
        if word_end == pos + 1 {
            break;
        }
        pos = skip_index(bytes, word_end);
        if bytes.get(pos) == Some(&b'.') {
            cut = Some(pos);
        }
    }
    cut.map_or(text, |end| &text[end + 1..])
}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn skip_word(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).copied().is_some_and(is_word) {
        pos += 1;
    }
    pos
}

/// Skip one `[digits]`, or nothing if the bracket is malformed.
fn skip_index(bytes: &[u8], pos: usize) -> usize {
    if bytes.get(pos) != Some(&b'[') {
        return pos;
    }
    let mut end = pos + 1;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    if end > pos + 1 && bytes.get(end) == Some(&b']') {
        end + 1
    } else {
        pos
    }
}

/// Trimmed, prefix-stripped, lowercased title.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    strip_field_prefix(title.trim()).trim().to_lowercase()
}

struct NormalizedEntry {
    title: String,
    description: String,
    code: Option<String>,
}

impl NormalizedEntry {
    fn new(entry: &ErrorEntry) -> Self {
        Self {
            title: entry.title.as_deref().map(normalize_title).unwrap_or_default(),
            description: entry
                .description
                .as_deref()
                .map(|d| d.trim().to_lowercase())
                .unwrap_or_default(),
            code: entry.code.as_deref().map(|c| c.trim().to_string()),
        }
    }

    fn satisfies(&self, needle: &str, expected: &ExpectedError) -> bool {
        let text_matches = self.title.contains(needle) || self.description.contains(needle);
        let code_matches = match (&expected.code, &self.code) {
            (Some(want), Some(got)) => want.trim().eq_ignore_ascii_case(got),
            _ => true,
        };
        text_matches && code_matches
    }
}

/// Score `actual` against `expected` with a maximum bipartite matching.
#[must_use]
pub fn match_errors(actual: &[ErrorEntry], expected: &[ExpectedError]) -> MatchResult {
    let mut entries: Vec<NormalizedEntry> = actual.iter().map(NormalizedEntry::new).collect();
    entries.sort_by(|a, b| {
        (&a.title, &a.description, &a.code).cmp(&(&b.title, &b.description, &b.code))
    });

    let mut wanted: Vec<(String, &ExpectedError)> =
        expected.iter().map(|e| (e.needle(), e)).collect();
    wanted.sort_by(|(na, a), (nb, b)| {
        (na, &a.code, &a.field, &a.message).cmp(&(nb, &b.code, &b.field, &b.message))
    });

    let adjacency: Vec<Vec<usize>> = wanted
        .iter()
        .map(|(needle, exp)| {
            entries
                .iter()
                .enumerate()
                .filter(|(_, entry)| entry.satisfies(needle, exp))
                .map(|(index, _)| index)
                .collect()
        })
        .collect();

    let mut owner: Vec<Option<usize>> = vec![None; entries.len()];
    let mut matched = vec![false; wanted.len()];
    for (index, slot) in matched.iter_mut().enumerate() {
        let mut seen = vec![false; entries.len()];
        *slot = augment(index, &adjacency, &mut seen, &mut owner);
    }

    let missing: Vec<ExpectedError> = wanted
        .iter()
        .zip(&matched)
        .filter(|(_, ok)| !**ok)
        .map(|((_, exp), _)| (*exp).clone())
        .collect();

    MatchResult {
        all_expected_present: missing.is_empty(),
        missing,
    }
}

/// Kuhn's augmenting path step for expected error `want`.
fn augment(
    want: usize,
    adjacency: &[Vec<usize>],
    seen: &mut [bool],
    owner: &mut [Option<usize>],
) -> bool {
    for &entry in &adjacency[want] {
        if seen[entry] {
            continue;
        }
        seen[entry] = true;
        let free = match owner[entry] {
            None => true,
            Some(other) => augment(other, adjacency, seen, owner),
        };
        if free {
            owner[entry] = Some(want);
            return true;
        }
    }
    false
}
