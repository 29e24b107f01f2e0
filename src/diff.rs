//! Sequence alignment over ordered lists.
//!
//! One general-purpose diff shared by the before-insertion pass and the
//! minimizer: repeatedly find the longest contiguous matching block
//! (earliest block on ties), recurse on both sides, then report the
//! alignment as [`Opcode`] spans. This is the classic difflib algorithm
//! without the junk heuristics.
//!
//! # Invariants
//! - Opcodes partition both input lists: the `a` spans cover `0..a.len()`
//!   and the `b` spans cover `0..b.len()`, in order, without gaps.
//! - `Equal` spans have the same length on both sides; `Insert` spans are
//!   empty on the `a` side, `Delete` spans empty on the `b` side.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// Kind of an alignment span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpTag {
    /// `a[a_start..a_end]` equals `b[b_start..b_end]`.
    Equal,
    /// `b[b_start..b_end]` was inserted; the `a` span is empty.
    Insert,
    /// `a[a_start..a_end]` was deleted; the `b` span is empty.
    Delete,
    /// `a[a_start..a_end]` was replaced by `b[b_start..b_end]`.
    Replace,
}

/// One aligned span pair, with half-open index ranges into both lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opcode {
    pub tag: OpTag,
    pub a_start: usize,
    pub a_end: usize,
    pub b_start: usize,
    pub b_end: usize,
}

/// A maximal contiguous matching block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Match {
    a: usize,
    b: usize,
    len: usize,
}

/// Longest contiguous block of `a[alo..ahi]` matching inside `b[blo..bhi]`.
///
/// Ties resolve to the block starting earliest in `a`, then earliest in `b`,
/// matching the reference algorithm so callers relying on first-opcode
/// behavior see identical alignments.
fn longest_match<T: Eq + Hash>(
    a: &[T],
    b: &[T],
    b2j: &HashMap<&T, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> Match {
    let mut best = Match { a: alo, b: blo, len: 0 };
    // j2len[j] = length of the longest match ending at a[i], b[j].
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for i in alo..ahi {
        let mut new_j2len: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(&a[i]) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let len = j.checked_sub(1).and_then(|p| j2len.get(&p)).copied().unwrap_or(0) + 1;
                new_j2len.insert(j, len);
                if len > best.len {
                    best = Match {
                        a: i + 1 - len,
                        b: j + 1 - len,
                        len,
                    };
                }
            }
        }
        j2len = new_j2len;
    }
    best
}

/// All maximal matching blocks of `a` against `b`, in order.
fn matching_blocks<T: Eq + Hash>(a: &[T], b: &[T]) -> Vec<Match> {
    let mut b2j: HashMap<&T, Vec<usize>> = HashMap::new();
    for (j, item) in b.iter().enumerate() {
        b2j.entry(item).or_default().push(j);
    }

    let mut queue = vec![(0usize, a.len(), 0usize, b.len())];
    let mut blocks = Vec::new();
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let m = longest_match(a, b, &b2j, alo, ahi, blo, bhi);
        if m.len > 0 {
            blocks.push(m);
            if alo < m.a && blo < m.b {
                queue.push((alo, m.a, blo, m.b));
            }
            if m.a + m.len < ahi && m.b + m.len < bhi {
                queue.push((m.a + m.len, ahi, m.b + m.len, bhi));
            }
        }
    }
    blocks.sort_by_key(|m| (m.a, m.b));
    blocks
}

/// Aligns `a` and `b` and returns the opcode spans.
pub fn opcodes<T: Eq + Hash>(a: &[T], b: &[T]) -> Vec<Opcode> {
    let mut ops = Vec::new();
    let mut ai = 0usize;
    let mut bi = 0usize;
    let mut blocks = matching_blocks(a, b);
    // Sentinel terminator so the trailing non-match is emitted too.
    blocks.push(Match {
        a: a.len(),
        b: b.len(),
        len: 0,
    });
    for m in blocks {
        let tag = match (ai < m.a, bi < m.b) {
            (true, true) => Some(OpTag::Replace),
            (true, false) => Some(OpTag::Delete),
            (false, true) => Some(OpTag::Insert),
            (false, false) => None,
        };
        if let Some(tag) = tag {
            ops.push(Opcode {
                tag,
                a_start: ai,
                a_end: m.a,
                b_start: bi,
                b_end: m.b,
            });
        }
        if m.len > 0 {
            ops.push(Opcode {
                tag: OpTag::Equal,
                a_start: m.a,
                a_end: m.a + m.len,
                b_start: m.b,
                b_end: m.b + m.len,
            });
        }
        ai = m.a + m.len;
        bi = m.b + m.len;
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(ops: &[Opcode]) -> Vec<OpTag> {
        ops.iter().map(|o| o.tag).collect()
    }

    #[test]
    fn identical_lists_are_one_equal_span() {
        let a = ["a", "b", "c"];
        let ops = opcodes(&a, &a);
        assert_eq!(tags(&ops), vec![OpTag::Equal]);
        assert_eq!(ops[0].a_end, 3);
    }

    #[test]
    fn leading_insert() {
        let a = ["a", "b", "c"];
        let b = ["x", "a", "b", "c"];
        let ops = opcodes(&a, &b);
        assert_eq!(tags(&ops), vec![OpTag::Insert, OpTag::Equal]);
        assert_eq!((ops[0].b_start, ops[0].b_end), (0, 1));
    }

    #[test]
    fn crossing_element_becomes_insert_plus_delete() {
        // "B" moves from the middle of `a` to the front of `b`; the
        // alignment keeps the two long runs and treats B as moved.
        let a = ["a", "A", "á", "Á", "B", "c", "C", "d", "D"];
        let b = ["B", "a", "A", "á", "Á", "c", "C", "d", "D"];
        let ops = opcodes(&a, &b);
        assert_eq!(
            tags(&ops),
            vec![OpTag::Insert, OpTag::Equal, OpTag::Delete, OpTag::Equal]
        );
        // First opcode inserts exactly b[0..1].
        assert_eq!((ops[0].b_start, ops[0].b_end), (0, 1));
    }

    #[test]
    fn replace_span() {
        let a = ["a", "x", "c"];
        let b = ["a", "y", "c"];
        let ops = opcodes(&a, &b);
        assert_eq!(tags(&ops), vec![OpTag::Equal, OpTag::Replace, OpTag::Equal]);
    }

    #[test]
    fn opcodes_partition_both_lists() {
        let a = [1, 2, 3, 4, 9, 5];
        let b = [9, 1, 2, 5, 4];
        let ops = opcodes(&a, &b);
        let mut ai = 0;
        let mut bi = 0;
        for op in &ops {
            assert_eq!(op.a_start, ai);
            assert_eq!(op.b_start, bi);
            ai = op.a_end;
            bi = op.b_end;
        }
        assert_eq!(ai, a.len());
        assert_eq!(bi, b.len());
    }

    #[test]
    fn empty_sides() {
        let none: [i32; 0] = [];
        assert!(opcodes(&none, &none).is_empty());
        let ops = opcodes(&none, &[1, 2]);
        assert_eq!(tags(&ops), vec![OpTag::Insert]);
        let ops = opcodes(&[1, 2], &none);
        assert_eq!(tags(&ops), vec![OpTag::Delete]);
    }

    /// Ties between equally long blocks resolve to the earliest in `a`.
    #[test]
    fn tie_breaks_earliest_block() {
        let a = ["p", "q", "r", "s"];
        let b = ["r", "s", "p", "q"];
        let ops = opcodes(&a, &b);
        // "p q" (a[0..2]) wins the tie against "r s".
        let first_equal = ops.iter().find(|o| o.tag == OpTag::Equal).unwrap();
        assert_eq!((first_equal.a_start, first_equal.a_end), (0, 2));
    }
}
