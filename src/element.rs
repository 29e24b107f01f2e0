//! Rule-graph nodes.
//!
//! A [`CollElement`] is one tailored entry: the string it is positioned
//! relative to, the comparison level of that relation, the optional
//! before-flag, expansion and prefix text, its authoring order, and the
//! memoized resolution state.

use crate::sortkey::SortKey;
use serde::{Deserialize, Serialize};

/// Comparison level of the primary relation.
pub const PRIMARY: u8 = 1;
/// Comparison level of the secondary relation.
pub const SECONDARY: u8 = 2;
/// Comparison level of the tertiary relation.
pub const TERTIARY: u8 = 3;
/// Pseudo-level for `=`: no distinction from the base.
pub const IDENTICAL: u8 = 4;

/// Resolution state of one entry.
///
/// The provisional value is the cycle placeholder: it is installed before
/// the resolver descends into the entry's base, and a recursive visit that
/// finds it uses it instead of descending again. This bounds recursion to
/// the acyclic portion of the graph; malformed cyclic rule input resolves
/// without error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KeyState {
    /// Not yet visited in this pass.
    Unresolved,
    /// Mid-resolution placeholder: the DUCET-only key of the entry's base.
    Provisional(SortKey),
    /// Final memoized keys.
    Resolved {
        /// Full key, including the entry's own expansion weight.
        key: SortKey,
        /// Key without the expansion weight; descendants copy this as
        /// their base.
        short: SortKey,
    },
}

impl KeyState {
    /// The full key, if resolution reached at least the provisional stage.
    pub fn key(&self) -> Option<&SortKey> {
        match self {
            KeyState::Unresolved => None,
            KeyState::Provisional(key) => Some(key),
            KeyState::Resolved { key, .. } => Some(key),
        }
    }

    /// The short key of a fully resolved entry.
    pub fn short_key(&self) -> Option<&SortKey> {
        match self {
            KeyState::Resolved { short, .. } => Some(short),
            _ => None,
        }
    }

    /// True once the final keys are in place.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(self, KeyState::Resolved { .. })
    }
}

/// One tailored entry of a collation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollElement {
    /// Key string or raw character this entry is positioned relative to.
    pub base: String,
    /// 1–3: primary/secondary/tertiary relation; 4: equal to the base.
    pub level: u8,
    /// 0, or the level at which this entry sorts immediately *before*
    /// `base` instead of after.
    pub before: u8,
    /// Trailing text appended as extra weight after the base weight.
    pub exp: Option<String>,
    /// Literal text emitted verbatim before this entry's line.
    pub prefix: Option<String>,
    /// (reset-block index, position in block): authoring order and the
    /// canonical resolution/tie-break order. Synthesized before-entries
    /// use `(0, 0)`, which sorts ahead of every parsed entry.
    pub order: (u32, u32),
    /// Memoized resolver output.
    pub state: KeyState,
}

impl CollElement {
    /// Creates an entry with the given relation and default everything else.
    pub fn new(base: impl Into<String>, level: u8, before: u8) -> Self {
        Self {
            base: base.into(),
            level,
            before,
            exp: None,
            prefix: None,
            order: (0, 0),
            state: KeyState::Unresolved,
        }
    }

    /// Entry with an explicit authoring order.
    pub fn with_order(base: impl Into<String>, level: u8, before: u8, order: (u32, u32)) -> Self {
        Self {
            order,
            ..Self::new(base, level, before)
        }
    }

    /// Full resolved key, if any.
    #[inline]
    pub fn key(&self) -> Option<&SortKey> {
        self.state.key()
    }

    /// Short key (no own expansion weight), if fully resolved.
    #[inline]
    pub fn short_key(&self) -> Option<&SortKey> {
        self.state.short_key()
    }
}
