//! Seamstress: a compiler for collation tailorings.
//!
//! Takes human-authored collation rules — full ICU/LDML reset syntax or a
//! simplified per-locale alphabet list — resolves them into a multi-level
//! sort-key model layered on the Default Unicode Collation Element Table,
//! and emits the minimal equivalent ICU tailoring text.
//!
//! # Name Origin: "Seamstress"
//!
//! A seamstress does not weave new cloth; she alters an existing garment
//! until it fits its wearer. This crate alters the default Unicode order
//! until it fits a locale, and, like good tailoring, removes every stitch
//! that was not actually needed.
//!
//! # Pipeline
//!
//! text → parser → rule graph → resolver (sort keys) → minimizer →
//! resolver → emitter → text. The rule graph is an ordered map of
//! [`CollElement`] nodes; resolution is recursive and memoized, with a
//! provisional-key placeholder bounding recursion on cyclic base
//! references.
//!
//! # Example
//!
//! ```
//! use seamstress::prelude::*;
//! use std::sync::Arc;
//!
//! let table = Arc::new(WeightTable::parse(
//!     "0061 ; [.2075.0020.0002] # a\n\
//!      0041 ; [.2075.0020.0008] # A\n\
//!      0062 ; [.2095.0020.0002] # b\n",
//! ));
//! let mut coll = Collation::new(table);
//! coll.parse("&b < x <<< X");
//! assert!(coll.sort_key_of("a") < coll.sort_key_of("b"));
//! assert_eq!(coll.to_icu(0), "&b < x <<< X");
//! ```

pub mod collation;
pub mod diff;
pub mod ducet;
pub mod element;
pub mod emit;
pub mod escape;
pub mod minimise;
pub mod parse;
pub mod simple;
pub mod sortkey;

pub use crate::collation::{Collation, DuplicateKeyError, RuleMap};
pub use crate::ducet::{resolve, TableError, WeightTable, WeightTriple};
pub use crate::element::{CollElement, KeyState};
pub use crate::escape::{escape, unescape};
pub use crate::sortkey::{KeyOrdering, SortKey};

/// Prelude for convenient usage.
pub mod prelude {
    pub use crate::collation::{Collation, DuplicateKeyError, RuleMap};
    pub use crate::diff::{opcodes, OpTag, Opcode};
    pub use crate::ducet::{resolve, TableError, WeightTable, WeightTriple};
    pub use crate::element::{CollElement, KeyState};
    pub use crate::escape::{escape, unescape};
    pub use crate::sortkey::{KeyOrdering, SortKey};
}


#[cfg(test)]
mod tests {
    use super::prelude::*;
    use crate::testutil::abridged_table;

    fn coll() -> Collation {
        Collation::new(abridged_table())
    }

    /// Reset clauses are newline-separated; flatten for comparison.
    fn flat(icu: &str) -> String {
        icu.split('\n').collect::<Vec<_>>().join(" ")
    }

    /// The relative order a collation gives a fixed set of strings:
    /// tailored entries by their resolved keys, raw strings by their
    /// scaled table keys.
    fn tailored_order(coll: &mut Collation, strings: &[&str]) -> Vec<String> {
        coll.resolve_keys(false);
        let scale = coll.scale();
        let mut keyed: Vec<(String, SortKey)> = strings
            .iter()
            .map(|s| {
                let key = match coll.rules().get(s).and_then(|e| e.key()) {
                    Some(key) => key.clone(),
                    None => resolve(coll.table(), s, scale, |_| None),
                };
                (s.to_string(), key)
            })
            .collect();
        keyed.sort_by(|a, b| a.1.cmp(&b.1));
        keyed.into_iter().map(|(s, _)| s).collect()
    }

    /// Simple list in, minimal ICU out.
    #[test]
    fn simple_list_compiles_to_minimal_icu() {
        let mut c = coll();
        let values: Vec<&str> = "b/B ; a/A ; á/Á ; c/C ; d/D"
            .split(';')
            .map(str::trim)
            .collect();
        c.convert_simple(&values, false);
        c.minimise();
        assert_eq!(flat(&c.to_icu(0)), "&[before 1]a < b <<< B &A < á <<< Á");
    }

    /// Entries absent from the table survive minimization untouched.
    #[test]
    fn before_tailoring_round_trips_unchanged() {
        let mut c = coll();
        c.parse("&[before 1]a < â < Å");
        c.minimise();
        assert_eq!(flat(&c.to_icu(0)), "&[before 1]a < â < Å");
    }

    /// parse → minimise → emit → re-parse preserves relative order.
    #[test]
    fn semantic_round_trip() {
        let alphabet = [
            "a", "A", "á", "Á", "b", "B", "c", "C", "d", "D", "e", "E",
        ];

        let mut original = coll();
        let values: Vec<&str> = "b/B ; a/A ; á/Á ; c/C ; d/D"
            .split(';')
            .map(str::trim)
            .collect();
        original.convert_simple(&values, false);
        original.minimise();
        let icu = original.to_icu(0);

        let mut reparsed = coll();
        reparsed.parse(&icu);
        assert_eq!(
            tailored_order(&mut original, &alphabet),
            tailored_order(&mut reparsed, &alphabet),
        );
    }

    /// `[before 1]X` sorts strictly below `X` at the primary level.
    #[test]
    fn before_contract() {
        let mut c = coll();
        c.parse("&[before 1]b < x");
        c.resolve_keys(false);
        let x = c.rules().get("x").unwrap().key().unwrap().clone();
        let scale = c.scale();
        let b = resolve(c.table(), "b", scale, |_| None);
        assert!(x < b);
        assert_eq!(x.diff_level(&b), Some(1));
        // And still above the previous letter.
        let a = resolve(c.table(), "a", scale, |_| None);
        assert!(a < x);
    }

    /// Minimizing twice changes nothing at the pipeline level.
    #[test]
    fn minimise_idempotence_end_to_end() {
        let mut c = coll();
        c.parse("&[before 1]a < â < Å < b <<< B < c");
        c.minimise();
        let first = c.to_icu(0);
        c.minimise();
        assert_eq!(c.to_icu(0), first);
    }
}
