//! The collation rule graph and its resolver.
//!
//! [`Collation`] is an ordered mapping from tailored strings to
//! [`CollElement`] nodes over a shared [`WeightTable`]. Population is the
//! parsers' job; this module owns the container, the unique-insertion map,
//! the recursive memoized key resolver, and the before-insertion pass.
//!
//! # Invariants
//! - Entries keep their insertion order; minimizer deletions preserve the
//!   order of the survivors.
//! - Inserting an already-present key is an internal invariant violation
//!   reported as [`DuplicateKeyError`], never a silent overwrite.
//! - Resolution is memoized per entry and recomputed only under `force`;
//!   a provisional placeholder bounds recursion on cyclic base references.

use crate::diff::{self, OpTag};
use crate::ducet::{resolve, WeightTable};
use crate::element::{CollElement, KeyState, IDENTICAL, PRIMARY};
use crate::sortkey::SortKey;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Attempt to define the same tailored string twice.
///
/// The parsers pre-disambiguate duplicate surface text with sentinel
/// trailing spaces, so this error signals an internal invariant violation
/// rather than bad user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKeyError {
    /// The offending key.
    pub key: String,
}

impl fmt::Display for DuplicateKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key {:?} already exists in collation", self.key)
    }
}

impl std::error::Error for DuplicateKeyError {}

/// Insertion-ordered map of tailored strings to their entries.
///
/// A thin wrapper over `IndexMap` whose insertion path makes the
/// uniqueness contract explicit.
#[derive(Debug, Default, Clone)]
pub struct RuleMap {
    inner: IndexMap<String, CollElement>,
}

impl RuleMap {
    /// Creates an empty map.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when no entries are defined.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// True when `key` is defined.
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// The entry for `key`, if defined.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&CollElement> {
        self.inner.get(key)
    }

    /// Mutable entry for `key`, if defined.
    #[inline]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut CollElement> {
        self.inner.get_mut(key)
    }

    /// Inserts a new entry, failing if the key is already present.
    pub fn insert_unique(
        &mut self,
        key: impl Into<String>,
        element: CollElement,
    ) -> Result<(), DuplicateKeyError> {
        let key = key.into();
        if self.inner.contains_key(&key) {
            return Err(DuplicateKeyError { key });
        }
        self.inner.insert(key, element);
        Ok(())
    }

    /// Inserts an entry the caller has already checked to be absent.
    pub(crate) fn insert_unchecked(&mut self, key: String, element: CollElement) {
        debug_assert!(!self.inner.contains_key(&key));
        self.inner.insert(key, element);
    }

    /// Removes `key`, preserving the order of the remaining entries.
    pub fn shift_remove(&mut self, key: &str) -> Option<CollElement> {
        self.inner.shift_remove(key)
    }

    /// Entries in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CollElement)> {
        self.inner.iter()
    }

    /// Mutable entries in insertion order.
    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut CollElement)> {
        self.inner.iter_mut()
    }

    /// Keys in insertion order.
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.inner.keys()
    }
}

/// Integer arithmetic of one resolution pass.
///
/// For `n` entries of which `nb` carry a before-flag, `beforeshift` is the
/// smallest power of ten exceeding `(nb+1)·n`, `scale = (nb+1)·beforeshift`
/// and `inc = nb+1`. Then `n·inc < beforeshift < scale`: accumulated
/// "immediately after" increments along any chain stay below one
/// before-shift, and no shifted key crosses into the preceding table
/// weight. This is the integer image of fractional increment arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolveParams {
    pub scale: u64,
    pub inc: u64,
    pub beforeshift: u64,
}

impl Default for ResolveParams {
    fn default() -> Self {
        Self {
            scale: 1,
            inc: 1,
            beforeshift: 1,
        }
    }
}

/// Smallest power of ten strictly greater than `x`.
fn pow10_above(x: u64) -> u64 {
    let mut p = 10;
    while p <= x {
        p *= 10;
    }
    p
}

/// An ordered rule graph over a shared weight table.
#[derive(Debug, Clone)]
pub struct Collation {
    table: Arc<WeightTable>,
    rules: RuleMap,
    skipped_blocks: u32,
    params: ResolveParams,
}

impl Collation {
    /// Creates an empty collation over the given table.
    pub fn new(table: Arc<WeightTable>) -> Self {
        Self {
            table,
            rules: RuleMap::new(),
            skipped_blocks: 0,
            params: ResolveParams::default(),
        }
    }

    /// The shared weight table.
    #[inline]
    pub fn table(&self) -> &WeightTable {
        &self.table
    }

    /// The rule graph.
    #[inline]
    pub fn rules(&self) -> &RuleMap {
        &self.rules
    }

    /// Mutable rule graph.
    #[inline]
    pub fn rules_mut(&mut self) -> &mut RuleMap {
        &mut self.rules
    }

    /// Number of reset blocks skipped by the tailoring parser because
    /// their `[before …]` header did not parse.
    #[inline]
    pub fn skipped_blocks(&self) -> u32 {
        self.skipped_blocks
    }

    pub(crate) fn note_skipped_block(&mut self) {
        self.skipped_blocks += 1;
    }

    /// Scale factor of the most recent resolution pass.
    pub(crate) fn scale(&self) -> u64 {
        self.params.scale
    }

    /// Sort key of raw text against the table alone, untailored.
    pub fn sort_key_of(&self, text: &str) -> SortKey {
        self.table.sort_key(text)
    }

    /// Splits text into collation units: the longest runs that still name
    /// a defined entry or a table sequence.
    pub fn itemise(&self, text: &str) -> Vec<String> {
        let mut units = Vec::new();
        let mut current = String::new();
        for ch in text.chars() {
            let mut longer = current.clone();
            longer.push(ch);
            if !self.rules.contains_key(&longer) && !self.table.contains(&longer) {
                if !current.is_empty() {
                    units.push(current);
                }
                current = String::new();
            }
            current.push(ch);
        }
        if !current.is_empty() {
            units.push(current);
        }
        units
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Computes tailored sort keys for every entry.
    ///
    /// Memoized: already-resolved entries are untouched unless `force`,
    /// which first resets every entry to [`KeyState::Unresolved`]. Must be
    /// forced after any in-place graph mutation.
    pub fn resolve_keys(&mut self, force: bool) {
        if self.rules.is_empty() {
            return;
        }
        if force {
            for (_, e) in self.rules.iter_mut() {
                e.state = KeyState::Unresolved;
            }
        } else if self.rules.iter().all(|(_, e)| e.state.is_resolved()) {
            return;
        }

        let n = self.rules.len() as u64;
        let nb = self.rules.iter().filter(|(_, e)| e.before > 0).count() as u64;
        let beforeshift = pow10_above((nb + 1) * n);
        self.params = ResolveParams {
            scale: (nb + 1) * beforeshift,
            inc: nb + 1,
            beforeshift,
        };

        let mut order: Vec<String> = self.rules.keys().cloned().collect();
        order.sort_by_key(|k| self.rules.get(k).map(|e| e.order).unwrap_or_default());
        for key in order {
            self.resolve_entry(&key);
        }
    }

    /// Full key of `key` if it is a resolved entry; used as the override
    /// source for expansion resolution.
    fn resolved_full_key(&self, key: &str) -> Option<SortKey> {
        self.rules.get(key).and_then(|e| match &e.state {
            KeyState::Resolved { key, .. } => Some(key.clone()),
            _ => None,
        })
    }

    /// Resolves one entry, returning its full key.
    ///
    /// A provisional DUCET-only key of the entry's base is installed
    /// before descending, so a cyclic base chain re-entering this entry
    /// uses the placeholder instead of recursing forever.
    fn resolve_entry(&mut self, key: &str) -> SortKey {
        match self.rules.get(key).map(|e| &e.state) {
            Some(KeyState::Resolved { key, .. }) => return key.clone(),
            Some(KeyState::Provisional(provisional)) => return provisional.clone(),
            Some(KeyState::Unresolved) => {}
            None => return SortKey::new(),
        }

        let (base, level, before, order, mut exp) = {
            let e = self.rules.get(key).map(|e| {
                (
                    e.base.clone(),
                    e.level,
                    e.before,
                    e.order,
                    e.exp.clone(),
                )
            });
            match e {
                Some(fields) => fields,
                None => return SortKey::new(),
            }
        };
        let ResolveParams {
            scale,
            inc,
            beforeshift,
        } = self.params;

        let provisional = resolve(&self.table, &base, scale, |_| None);
        if let Some(e) = self.rules.get_mut(key) {
            e.state = KeyState::Provisional(provisional.clone());
        }

        // A tailored base only applies when it was defined no later than
        // this entry; forward references fall back to the raw table key.
        let base_is_earlier = self
            .rules
            .get(&base)
            .is_some_and(|b| b.order <= order);
        let mut basekey = if base_is_earlier {
            self.resolve_base_short(&base)
        } else {
            provisional
        };

        if (PRIMARY..IDENTICAL).contains(&level) {
            let delta = if before != 0 && before == level {
                -(beforeshift as i64)
            } else {
                inc as i64
            };
            basekey.bump_last(level, delta);
        }

        // Expansion is inherited from the tailored base when absent.
        if exp.is_none() {
            exp = self.rules.get(&base).and_then(|b| b.exp.clone());
        }

        let (full, short) = match &exp {
            Some(exp_text) => {
                let expkey = resolve(&self.table, exp_text, scale, |s| {
                    self.resolved_full_key(s)
                });
                let short = if expkey > basekey {
                    expkey.concat(&SortKey::single(PRIMARY, 1))
                } else {
                    basekey.clone()
                };
                (basekey.concat(&expkey), short)
            }
            None => (basekey.clone(), basekey),
        };

        if let Some(e) = self.rules.get_mut(key) {
            e.exp = exp;
            e.state = KeyState::Resolved {
                key: full.clone(),
                short,
            };
        }
        full
    }

    /// Short key of a base entry, resolving it first; a base caught
    /// mid-resolution (cycle) contributes its provisional key.
    fn resolve_base_short(&mut self, base: &str) -> SortKey {
        self.resolve_entry(base);
        match self.rules.get(base).map(|e| &e.state) {
            Some(KeyState::Resolved { short, .. }) => short.clone(),
            Some(KeyState::Provisional(provisional)) => provisional.clone(),
            _ => resolve(&self.table, base, self.params.scale, |_| None),
        }
    }

    // ------------------------------------------------------------------
    // Before-insertion pass
    // ------------------------------------------------------------------

    /// Detects a tailored run positioned ahead of its nearest table-native
    /// neighbor and re-expresses it as an explicit level-1 before-reset.
    ///
    /// Alignment runs between the table-present subset of keys in raw
    /// table order and all keys in tailored order; only a difference at
    /// the very front (the case increment arithmetic cannot represent)
    /// triggers the rewrite. Keys are recomputed from scratch afterward.
    pub(crate) fn insert_before(&mut self) {
        self.resolve_keys(false);

        let mut outlist: Vec<String> = self.rules.keys().cloned().collect();
        let out_keys: IndexMap<String, SortKey> = outlist
            .iter()
            .map(|k| {
                let key = self
                    .rules
                    .get(k)
                    .and_then(|e| e.key().cloned())
                    .unwrap_or_default();
                (k.clone(), key)
            })
            .collect();
        outlist.sort_by(|a, b| out_keys[a].cmp(&out_keys[b]));

        let mut inlist: Vec<String> = self
            .rules
            .keys()
            .filter(|k| self.table.contains(k.as_str()))
            .cloned()
            .collect();
        let in_keys: IndexMap<String, SortKey> = inlist
            .iter()
            .map(|k| (k.clone(), self.table.sort_key(k)))
            .collect();
        inlist.sort_by(|a, b| in_keys[a].cmp(&in_keys[b]));

        let ops = diff::opcodes(&inlist, &outlist);
        if let Some(first) = ops.first() {
            if matches!(first.tag, OpTag::Insert | OpTag::Replace) && first.b_end < outlist.len() {
                let newbase = outlist[first.b_end].clone();
                let moved_base = self
                    .rules
                    .get(&outlist[first.b_start])
                    .map(|e| e.base.clone());
                if let Some(moved_base) = moved_base {
                    if self.rules.contains_key(&moved_base) {
                        if let Some(e) = self.rules.get_mut(&moved_base) {
                            e.before = 1;
                            e.base = newbase.clone();
                        }
                    } else {
                        self.rules
                            .insert_unchecked(moved_base, CollElement::new(newbase.clone(), PRIMARY, 1));
                    }
                    self.rules.shift_remove(&newbase);
                }
            }
        }

        self.resolve_keys(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::TERTIARY;
    use crate::testutil::abridged_table;

    #[test]
    fn duplicate_insertion_is_an_error() {
        let mut rules = RuleMap::new();
        rules
            .insert_unique("a", CollElement::new("b", PRIMARY, 0))
            .unwrap();
        let err = rules
            .insert_unique("a", CollElement::new("c", PRIMARY, 0))
            .unwrap_err();
        assert_eq!(err.key, "a");
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn pow10_above_is_strictly_greater() {
        assert_eq!(pow10_above(9), 10);
        assert_eq!(pow10_above(10), 100);
        assert_eq!(pow10_above(99), 100);
        assert_eq!(pow10_above(100), 1000);
    }

    #[test]
    fn basic_sort_key_ordering() {
        let coll = Collation::new(abridged_table());
        for (lo, hi) in [("a", "b"), ("a", "a\u{301}"), ("a", "A")] {
            assert!(
                coll.sort_key_of(lo) < coll.sort_key_of(hi),
                "{lo} < {hi}"
            );
        }
    }

    /// Scaled image of a raw table key, for comparing against resolved
    /// tailored keys of the same pass.
    fn scaled(coll: &Collation, text: &str) -> SortKey {
        let raw = coll.sort_key_of(text);
        let mut out = SortKey::new();
        for level in 1..=3u8 {
            for &w in raw.level(level) {
                out.push_weight(level, w * coll.scale());
            }
        }
        out
    }

    #[test]
    fn chain_resolution_orders_descendants_after_bases() {
        let mut coll = Collation::new(abridged_table());
        coll.rules_mut()
            .insert_unique("x", CollElement::with_order("b", PRIMARY, 0, (0, 1)))
            .unwrap();
        coll.rules_mut()
            .insert_unique("X", CollElement::with_order("x", TERTIARY, 0, (0, 2)))
            .unwrap();
        coll.resolve_keys(false);
        let b = scaled(&coll, "b");
        let x = coll.rules().get("x").unwrap().key().unwrap().clone();
        let cap = coll.rules().get("X").unwrap().key().unwrap().clone();
        // x sorts just after b at the primary level, X after x at the
        // tertiary level only.
        assert_eq!(b.diff_level(&x), Some(1));
        assert!(b < x);
        assert_eq!(x.diff_level(&cap), Some(3));
        assert!(x < cap);
    }

    #[test]
    fn before_entry_sorts_ahead_of_its_base_at_level_one() {
        let mut coll = Collation::new(abridged_table());
        coll.rules_mut()
            .insert_unique("x", CollElement::with_order("a", PRIMARY, 1, (0, 1)))
            .unwrap();
        coll.resolve_keys(false);
        let x = coll.rules().get("x").unwrap().key().unwrap().clone();
        let a = scaled(&coll, "a");
        assert_eq!(x.diff_level(&a), Some(1));
        assert!(x < a);
    }

    #[test]
    fn cyclic_bases_terminate_with_provisional_fallback() {
        let mut coll = Collation::new(abridged_table());
        // Equal orders defeat the forward-reference guard, so resolution
        // genuinely recurses into the cycle and must hit the placeholder.
        coll.rules_mut()
            .insert_unique("x", CollElement::with_order("y", PRIMARY, 0, (0, 1)))
            .unwrap();
        coll.rules_mut()
            .insert_unique("y", CollElement::with_order("x", PRIMARY, 0, (0, 1)))
            .unwrap();
        coll.resolve_keys(false);
        assert!(coll.rules().get("x").unwrap().state.is_resolved());
        assert!(coll.rules().get("y").unwrap().state.is_resolved());
    }

    #[test]
    fn self_referential_base_terminates() {
        let mut coll = Collation::new(abridged_table());
        coll.rules_mut()
            .insert_unique("x", CollElement::with_order("x", PRIMARY, 0, (0, 1)))
            .unwrap();
        coll.resolve_keys(true);
        assert!(coll.rules().get("x").unwrap().state.is_resolved());
    }

    #[test]
    fn itemise_groups_contractions() {
        let mut coll = Collation::new(abridged_table());
        coll.rules_mut()
            .insert_unique("ch", CollElement::with_order("c", PRIMARY, 0, (0, 1)))
            .unwrap();
        assert_eq!(coll.itemise("chab"), vec!["ch", "a", "b"]);
    }
}
