//! Multi-level sort keys.
//!
//! A [`SortKey`] is three parallel weight sequences, one per comparison level
//! (primary, secondary, tertiary). Keys are built by the resolver from DUCET
//! weights plus tailoring increments, and compared with a level-sensitive,
//! trailing-zero-insensitive ordering.
//!
//! # Invariants
//! - Comparison strips trailing zeros per level before comparing; the first
//!   level that differs decides the ordering.
//! - Concatenation is positional: level `i` of one key extends level `i` of
//!   the other, never spilling across levels.
//! - Keys built from a single source character keep their zero weights
//!   (explicit zero primaries of combining marks must survive), keys built
//!   from longer text drop them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Number of comparison levels carried by a key.
pub const LEVELS: usize = 3;

/// A resolved multi-level sort key.
///
/// Weights are plain non-negative integers. The resolver multiplies table
/// weights by a per-pass scale factor so that "immediately after" increments
/// and "immediately before" shifts stay integral; see
/// [`crate::collation::Collation::resolve_keys`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SortKey {
    levels: [Vec<u64>; LEVELS],
}

/// Outcome of comparing two keys level by level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyOrdering {
    /// Lexicographic ordering of the first differing level.
    pub ordering: Ordering,
    /// Level (1-based) of the first difference; `None` when the stripped
    /// keys are equal at every level.
    pub level: Option<u8>,
}

impl SortKey {
    /// Creates an empty key (all levels empty).
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a key from explicit per-level weight sequences.
    #[inline]
    pub fn from_levels(levels: [Vec<u64>; LEVELS]) -> Self {
        Self { levels }
    }

    /// Creates a key with a single weight at the given 1-based level.
    pub fn single(level: u8, weight: u64) -> Self {
        let mut key = Self::new();
        key.levels[usize::from(level - 1)].push(weight);
        key
    }

    /// Returns the weight sequence of the given 1-based level.
    #[inline]
    pub fn level(&self, level: u8) -> &[u64] {
        &self.levels[usize::from(level - 1)]
    }

    /// True when every level is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(Vec::is_empty)
    }

    /// Appends one weight to the given 1-based level.
    pub fn push_weight(&mut self, level: u8, weight: u64) {
        self.levels[usize::from(level - 1)].push(weight);
    }

    /// Appends one weight triple, one weight per level.
    pub fn push_triple(&mut self, triple: [u64; LEVELS]) {
        for (seq, w) in self.levels.iter_mut().zip(triple) {
            seq.push(w);
        }
    }

    /// Extends this key with `other`, level by level.
    pub fn extend(&mut self, other: &SortKey) {
        for (seq, more) in self.levels.iter_mut().zip(&other.levels) {
            seq.extend_from_slice(more);
        }
    }

    /// Returns the positional concatenation `self ++ other`.
    pub fn concat(&self, other: &SortKey) -> SortKey {
        let mut out = self.clone();
        out.extend(other);
        out
    }

    /// Removes every zero weight from every level.
    ///
    /// Applied when a key is built from multi-character source text; a
    /// single-character key keeps its zeros.
    pub fn strip_zeros(&mut self) {
        for seq in &mut self.levels {
            seq.retain(|&w| w != 0);
        }
    }

    /// Adds `delta` to the last weight of the given 1-based level.
    ///
    /// An empty level gains the delta as its only weight; a negative delta
    /// saturates at zero. Both cases only arise when the base text resolved
    /// to nothing, where any stable ordering is acceptable.
    pub fn bump_last(&mut self, level: u8, delta: i64) {
        let seq = &mut self.levels[usize::from(level - 1)];
        match seq.last_mut() {
            Some(last) => {
                *last = if delta >= 0 {
                    last.saturating_add(delta as u64)
                } else {
                    last.saturating_sub(delta.unsigned_abs())
                };
            }
            None => seq.push(if delta >= 0 { delta as u64 } else { 0 }),
        }
    }

    /// Compares two keys and reports the level of the first difference.
    ///
    /// Trailing zeros are ignored on both sides, so sub-level noise from
    /// increment arithmetic never separates keys that agree on real weights.
    pub fn compare(&self, other: &SortKey) -> KeyOrdering {
        for (i, (a, b)) in self.levels.iter().zip(&other.levels).enumerate() {
            let a = stripped(a);
            let b = stripped(b);
            let ordering = a.cmp(b);
            if ordering != Ordering::Equal {
                return KeyOrdering {
                    ordering,
                    level: Some(i as u8 + 1),
                };
            }
        }
        KeyOrdering {
            ordering: Ordering::Equal,
            level: None,
        }
    }

    /// Level (1-based) of the first difference against `other`, if any.
    #[inline]
    pub fn diff_level(&self, other: &SortKey) -> Option<u8> {
        self.compare(other).level
    }
}

/// Slice with trailing zeros removed.
fn stripped(seq: &[u64]) -> &[u64] {
    let end = seq
        .iter()
        .rposition(|&w| w != 0)
        .map_or(0, |last| last + 1);
    &seq[..end]
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other).ordering == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other).ordering
    }
}
