//! Default Unicode Collation Element Table.
//!
//! [`WeightTable`] is the immutable map from a character sequence to its
//! ordered collation weight triples, loaded once from a UCA allkeys-format
//! file and shared by every [`crate::collation::Collation`] built over it.
//! The greedy longest-match resolver that turns arbitrary text into a
//! [`SortKey`] also lives here.
//!
//! # Invariants
//! - The table never changes after construction; callers share it through
//!   `Arc` and there is no process-wide cached instance.
//! - A failed load is the caller's choice: a hard `Err` from [`WeightTable::
//!   from_path`], or an empty table from [`WeightTable::from_path_or_empty`]
//!   against which every lookup simply misses.

use crate::sortkey::SortKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// One collation element: a (primary, secondary, tertiary) weight group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightTriple {
    pub primary: u32,
    pub secondary: u32,
    pub tertiary: u32,
}

/// Error raised by explicit weight-table initialization.
#[derive(Debug)]
pub enum TableError {
    /// The table file could not be read.
    Io(std::io::Error),
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::Io(err) => write!(f, "unable to read weight table: {}", err),
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableError::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for TableError {
    fn from(err: std::io::Error) -> Self {
        TableError::Io(err)
    }
}

/// Immutable character-sequence → weight-triples mapping.
#[derive(Debug, Default, Clone)]
pub struct WeightTable {
    entries: HashMap<String, Vec<WeightTriple>>,
}

impl WeightTable {
    /// Creates an empty table; every lookup misses.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads a table from an allkeys-format file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Loads a table from an allkeys-format file, degrading to an empty
    /// table (with a logged warning) when the file cannot be read.
    ///
    /// Callers relying on the empty table observe near-arbitrary ordering
    /// between tailored entries and never-matched raw text.
    pub fn from_path_or_empty(path: impl AsRef<Path>) -> Self {
        match Self::from_path(path.as_ref()) {
            Ok(table) => table,
            Err(err) => {
                log::warn!(
                    "unable to read weight table {}: {}",
                    path.as_ref().display(),
                    err
                );
                Self::empty()
            }
        }
    }

    /// Parses allkeys-format text.
    ///
    /// Each data line is `<hex codepoints> ; [.P.S.T][*P.S.T]... [# comment]`.
    /// Lines starting with `@` or `#`, and malformed lines, are skipped.
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for line in text.lines() {
            if let Some((key, weights)) = parse_line(line) {
                entries.insert(key, weights);
            }
        }
        Self { entries }
    }

    /// Weight triples for an exact character sequence.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&[WeightTriple]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// True when the exact sequence has an entry.
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of mapped sequences.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves `text` against this table alone, unscaled.
    #[inline]
    pub fn sort_key(&self, text: &str) -> SortKey {
        resolve(self, text, 1, |_| None)
    }
}

/// Parses one data line into a key string and its weight triples.
fn parse_line(line: &str) -> Option<(String, Vec<WeightTriple>)> {
    let line = line.trim_start();
    if line.starts_with('@') || line.starts_with('#') {
        return None;
    }
    let mut parts = line.splitn(2, ';');
    let codes = parts.next()?;
    let weights = parts.next()?;
    if codes.trim().is_empty() {
        return None;
    }

    let mut key = String::new();
    for token in codes.split_whitespace() {
        if token.len() < 4 || token.len() > 6 {
            return None;
        }
        let ch = u32::from_str_radix(token, 16)
            .ok()
            .and_then(char::from_u32)?;
        key.push(ch);
    }

    let triples = parse_weights(weights);
    if triples.is_empty() {
        return None;
    }
    Some((key, triples))
}

/// Extracts every `[.P.S.T]` / `[*P.S.T]` group from the value side.
fn parse_weights(text: &str) -> Vec<WeightTriple> {
    let mut triples = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        rest = &rest[open + 1..];
        let Some(close) = rest.find(']') else { break };
        let group = &rest[..close];
        rest = &rest[close + 1..];

        let body = match group.strip_prefix('.').or_else(|| group.strip_prefix('*')) {
            Some(body) => body,
            None => continue,
        };
        let fields: Vec<&str> = body.split('.').collect();
        if fields.len() != 3 {
            continue;
        }
        let parsed: Option<Vec<u32>> = fields
            .iter()
            .map(|f| {
                ((4..=6).contains(&f.len()))
                    .then(|| u32::from_str_radix(f, 16).ok())
                    .flatten()
            })
            .collect();
        if let Some(w) = parsed {
            triples.push(WeightTriple {
                primary: w[0],
                secondary: w[1],
                tertiary: w[2],
            });
        }
    }
    triples
}

/// Greedy longest-match resolution of `text` into a sort key.
///
/// For each unresolved suffix the longest prefix is tried first against
/// `override_key` (the tailored entries of the collation under
/// construction, already scaled), then against the table with weights
/// multiplied by `scale`. A character matching nothing at any length
/// contributes nothing. Keys from multi-character text drop their zero
/// weights; a single-character key keeps them, preserving explicit zero
/// primaries of combining marks.
pub fn resolve(
    table: &WeightTable,
    text: &str,
    scale: u64,
    override_key: impl Fn(&str) -> Option<SortKey>,
) -> SortKey {
    let chars: Vec<char> = text.chars().collect();
    let single_char = chars.len() == 1;
    let mut key = SortKey::new();

    let mut start = 0;
    while start < chars.len() {
        let mut matched = 0;
        for len in (1..=chars.len() - start).rev() {
            let prefix: String = chars[start..start + len].iter().collect();
            if let Some(found) = override_key(&prefix) {
                key.extend(&found);
                matched = len;
                break;
            }
            if let Some(triples) = table.get(&prefix) {
                for t in triples {
                    key.push_triple([
                        u64::from(t.primary) * scale,
                        u64::from(t.secondary) * scale,
                        u64::from(t.tertiary) * scale,
                    ]);
                }
                matched = len;
                break;
            }
        }
        // No match at any length: the character contributes nothing.
        start += matched.max(1);
    }

    if !single_char {
        key.strip_zeros();
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> WeightTable {
        WeightTable::parse(
            "# abridged test table\n\
             @version 15.1.0\n\
             0020 ; [*0201.0020.0002] # SPACE\n\
             0061 ; [.2100.0020.0002] # a\n\
             0041 ; [.2100.0020.0008] # A\n\
             0062 ; [.2110.0020.0002] # b\n\
             0301 ; [.0000.0024.0002] # COMBINING ACUTE\n\
             00E1 ; [.2100.0020.0002][.0000.0024.0002] # a-acute\n\
             0063 0068 ; [.2120.0020.0002] # contraction ch\n\
             0063 ; [.2120.0020.0002] # c\n\
             malformed line without semicolon\n\
             FFFF1 ; [.0001.0001.0001] # bad codepoint width is fine (5 hex)\n",
        )
    }

    #[test]
    fn header_and_malformed_lines_are_skipped() {
        let t = table();
        assert!(t.contains("a"));
        assert!(!t.contains("@version"));
        assert!(!t.contains("malformed"));
    }

    #[test]
    fn variable_weights_parse_like_normal_ones() {
        let t = table();
        assert_eq!(t.get(" ").unwrap()[0].primary, 0x0201);
    }

    #[test]
    fn contraction_resolves_as_one_unit() {
        let t = table();
        let ch = resolve(&t, "ch", 1, |_| None);
        assert_eq!(ch.level(1), &[0x2120]);
        // Without the contraction the two letters contribute two weights.
        let cb = resolve(&t, "cb", 1, |_| None);
        assert_eq!(cb.level(1), &[0x2120, 0x2110]);
    }

    #[test]
    fn single_char_keeps_zero_primary() {
        let t = table();
        let acute = resolve(&t, "\u{301}", 1, |_| None);
        assert_eq!(acute.level(1), &[0]);
        // In multi-character text the zero is stripped.
        let composed = resolve(&t, "a\u{301}", 1, |_| None);
        assert_eq!(composed.level(1), &[0x2100]);
        assert_eq!(composed.level(2), &[0x20, 0x24]);
    }

    #[test]
    fn precomposed_single_char_expands_to_two_elements() {
        let t = table();
        let a_acute = resolve(&t, "\u{E1}", 1, |_| None);
        assert_eq!(a_acute.level(1), &[0x2100, 0]);
        assert_eq!(a_acute.level(2), &[0x20, 0x24]);
    }

    #[test]
    fn overrides_win_over_table_entries() {
        let t = table();
        let tailored = SortKey::from_levels([vec![9], vec![9], vec![9]]);
        let got = resolve(&t, "ab", 1, |s| (s == "a").then(|| tailored.clone()));
        assert_eq!(got.level(1), &[9, 0x2110]);
    }

    #[test]
    fn unknown_characters_contribute_nothing() {
        let t = table();
        let got = resolve(&t, "a\u{3AB}b", 1, |_| None);
        assert_eq!(got.level(1), &[0x2100, 0x2110]);
    }

    #[test]
    fn scale_multiplies_table_weights() {
        let t = table();
        let got = resolve(&t, "b", 10, |_| None);
        assert_eq!(got.level(1), &[0x2110 * 10]);
    }

    #[test]
    fn missing_file_degrades_to_empty() {
        let t = WeightTable::from_path_or_empty("/nonexistent/allkeys.txt");
        assert!(t.is_empty());
        assert!(t.sort_key("a").is_empty());
    }
}
