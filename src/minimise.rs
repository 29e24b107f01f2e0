//! DUCET-redundancy minimizer.
//!
//! Deletes every entry whose ordering effect the untailored table already
//! implies, keeping only genuine deviations. Entries that cannot be implied
//! — multi-character keys and before-resets — are retained verbatim, as is
//! every case/variant chain hanging off a retained entry. The rest are
//! grouped into chains, and chains whose position and level relative to
//! their neighbors match the raw table ordering are dropped.
//!
//! # Invariants
//! - Never deletes an entry that changes observable ordering.
//! - Idempotent: re-minimizing a minimized collation deletes nothing.
//! - Comparisons use the trailing-zero-tolerant level comparison, so
//!   sub-level noise from increment arithmetic cannot defeat minimization.

use crate::collation::Collation;
use crate::diff::{self, OpTag};
use crate::ducet::resolve;
use crate::element::SECONDARY;
use crate::sortkey::SortKey;
use std::collections::{HashMap, HashSet};

/// Where a candidate's chain walk ends.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChainTop {
    /// Top candidate of the chain: this key represents the chain in the
    /// alignment.
    Representative(String),
    /// The chain hangs off an always-retained entry; the whole chain
    /// survives without alignment.
    Anchored,
}

impl Collation {
    /// Strips every entry whose ordering the raw table already implies.
    pub fn minimise(&mut self) {
        self.resolve_keys(false);
        if self.rules().is_empty() {
            return;
        }

        // -------- classification --------
        let mut always_kept: HashSet<String> = HashSet::new();
        let mut candidates: Vec<String> = Vec::new();
        for (key, e) in self.rules().iter() {
            if key.chars().count() > 1 || e.before != 0 {
                always_kept.insert(key.clone());
            } else {
                candidates.push(key.clone());
            }
        }

        // -------- chain walk --------
        let tops: HashMap<String, ChainTop> = candidates
            .iter()
            .map(|k| (k.clone(), self.chain_top(k, &always_kept)))
            .collect();
        let representatives: HashSet<String> = tops
            .values()
            .filter_map(|t| match t {
                ChainTop::Representative(key) => Some(key.clone()),
                ChainTop::Anchored => None,
            })
            .collect();

        // -------- ordering items: representatives plus context --------
        let mut items: Vec<String> = representatives.iter().cloned().collect();
        for key in &always_kept {
            items.push(key.clone());
        }
        // Anchored candidates are retained regardless, but they stabilize
        // the alignment around their anchors.
        for (key, top) in &tops {
            if *top == ChainTop::Anchored {
                items.push(key.clone());
            }
        }
        // Base strings that are not entries position the tailored items
        // among their table-native neighbors.
        let raw_bases: HashSet<String> = self
            .rules()
            .iter()
            .map(|(_, e)| e.base.clone())
            .filter(|b| !self.rules().contains_key(b))
            .collect();
        items.extend(raw_bases.iter().cloned());
        items.sort_by_key(|k| self.definition_order(k));
        items.dedup();

        // -------- the two orderings and their labels --------
        let scale = self.scale();
        let ducet_keys: HashMap<String, SortKey> = items
            .iter()
            .map(|k| (k.clone(), self.table().sort_key(k)))
            .collect();
        let tailored_keys: HashMap<String, SortKey> = items
            .iter()
            .map(|k| {
                let key = match self.rules().get(k).and_then(|e| e.key()) {
                    Some(key) => key.clone(),
                    None => resolve(self.table(), k, scale, |_| None),
                };
                (k.clone(), key)
            })
            .collect();

        let mut ducet_order = items.clone();
        ducet_order.sort_by(|a, b| {
            ducet_keys[a]
                .cmp(&ducet_keys[b])
                .then_with(|| self.definition_order(a).cmp(&self.definition_order(b)))
                .then_with(|| a.cmp(b))
        });
        let mut tailored_order = items.clone();
        tailored_order.sort_by(|a, b| {
            tailored_keys[a]
                .cmp(&tailored_keys[b])
                .then_with(|| self.definition_order(a).cmp(&self.definition_order(b)))
                .then_with(|| a.cmp(b))
        });

        let ducet_labels = labels(&ducet_order, &ducet_keys);
        let tailored_labels = labels(&tailored_order, &tailored_keys);

        // -------- alignment --------
        let mut kept_reps: HashSet<&String> = HashSet::new();
        for op in diff::opcodes(&ducet_labels, &tailored_labels) {
            if matches!(op.tag, OpTag::Insert | OpTag::Replace) {
                for key in &tailored_order[op.b_start..op.b_end] {
                    if representatives.contains(key) {
                        kept_reps.insert(key);
                    }
                }
            }
        }

        // -------- sweep --------
        let doomed: Vec<String> = candidates
            .into_iter()
            .filter(|k| match &tops[k] {
                ChainTop::Anchored => false,
                ChainTop::Representative(rep) => !kept_reps.contains(rep),
            })
            .collect();
        for key in doomed {
            self.rules_mut().shift_remove(&key);
        }
    }

    /// Walks a candidate's base links through level-2+ relations to the top
    /// of its chain.
    ///
    /// A level-1 relation or a base that is not an entry ends the walk at
    /// the current candidate; reaching an always-retained entry anchors the
    /// whole chain.
    fn chain_top(&self, key: &str, always_kept: &HashSet<String>) -> ChainTop {
        let mut current = key.to_string();
        for _ in 0..=self.rules().len() {
            let Some(e) = self.rules().get(&current) else {
                return ChainTop::Representative(current);
            };
            if e.level < SECONDARY {
                return ChainTop::Representative(current);
            }
            if !self.rules().contains_key(&e.base) {
                return ChainTop::Representative(current);
            }
            if always_kept.contains(&e.base) {
                return ChainTop::Anchored;
            }
            current = e.base.clone();
        }
        ChainTop::Representative(current)
    }

    /// Definition order of an entry; context strings sort after all
    /// entries.
    fn definition_order(&self, key: &str) -> (u32, u32) {
        self.rules()
            .get(key)
            .map(|e| e.order)
            .unwrap_or((u32::MAX, u32::MAX))
    }
}

/// Label list for one ordering: each item's text plus a marker for the
/// level at which it first differs from its predecessor's key (0 for the
/// first item, 4 when the stripped keys are equal).
fn labels(order: &[String], keys: &HashMap<String, SortKey>) -> Vec<(String, u8)> {
    order
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let marker = if i == 0 {
                0
            } else {
                keys[&order[i - 1]].diff_level(&keys[key]).unwrap_or(4)
            };
            (key.clone(), marker)
        })
        .collect()
}
