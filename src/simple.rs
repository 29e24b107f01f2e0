//! Simplified per-locale alphabet lists.
//!
//! The simple format is one line (or semicolon-separated value) per primary
//! slot: space-separated groups of slash-separated case variants, e.g.
//! `"a/A á/Á"` or `"ng Ng/NG"`. [`Collation::convert_simple`] turns such a
//! list into the rule graph; [`Collation::to_simple`] renders a graph back.
//!
//! Authoring tools feeding this format cannot always express what they
//! mean, so conversion applies two compensating heuristics (§ skipped in
//! strict mode): lone lowercase tokens grow their case permutations, and a
//! two-item value whose items differ only in case collapses to one group.

use crate::collation::Collation;
use crate::element::{CollElement, PRIMARY, SECONDARY, TERTIARY};
use indexmap::IndexMap;
use std::collections::HashMap;

impl Collation {
    /// Populates this collation from an ordered simple-format list.
    ///
    /// The first group head of each value is a level-1 anchor on the
    /// previous insertion; heads of subsequent space-separated groups are
    /// level-2; slash variants are level-3. Every inserted token becomes
    /// the base of the next. Duplicate tokens are skipped without
    /// advancing the base. The before-insertion pass runs afterwards.
    pub fn convert_simple<S: AsRef<str>>(&mut self, values: &[S], strict: bool) {
        let mut curr_base: Option<String> = None;
        let mut seq: u32 = 0;

        for value in values {
            let mut space_items: Vec<String> =
                value.as_ref().split(' ').map(str::to_string).collect();
            // Two items differing only in case mean x/X: some upstream
            // tools cannot write the slash.
            if space_items.len() == 2
                && space_items[0].to_lowercase() == space_items[1].to_lowercase()
            {
                space_items = vec![format!("{}/{}", space_items[0], space_items[1])];
            }

            let mut curr_level = PRIMARY;
            for space_item in &space_items {
                let mut slash_items: Vec<String> =
                    space_item.split('/').map(|s| s.trim().to_string()).collect();
                if !strict {
                    expand_case_variants(&mut slash_items);
                }
                for s in &slash_items {
                    if s.is_empty() {
                        continue;
                    }
                    if let Some(base) = &curr_base {
                        if self.rules().contains_key(s) {
                            continue;
                        }
                        seq += 1;
                        self.rules_mut().insert_unchecked(
                            s.clone(),
                            CollElement::with_order(base.clone(), curr_level, 0, (0, seq)),
                        );
                    }
                    curr_level = TERTIARY;
                    curr_base = Some(s.clone());
                }
                curr_level = SECONDARY;
            }
        }

        self.insert_before();
    }

    /// Renders the graph in the simple format: one line per primary
    /// bucket, groups space-joined, case variants slash-joined.
    pub fn to_simple(&mut self) -> String {
        self.resolve_keys(false);

        let mut ordered: Vec<String> = self.rules().keys().cloned().collect();
        let short_keys: HashMap<String, crate::sortkey::SortKey> = ordered
            .iter()
            .map(|k| {
                let key = self
                    .rules()
                    .get(k)
                    .and_then(|e| e.short_key().cloned())
                    .unwrap_or_default();
                (k.clone(), key)
            })
            .collect();
        ordered.sort_by(|a, b| short_keys[a].cmp(&short_keys[b]));

        // line head → groups of member keys
        let mut lines: IndexMap<String, Vec<Vec<String>>> = IndexMap::new();
        // member key → (line head, group index)
        let mut group_loc: HashMap<String, (String, usize)> = HashMap::new();

        for key in &ordered {
            let Some(e) = self.rules().get(key) else { continue };
            match e.level {
                PRIMARY => {
                    lines.insert(key.clone(), vec![vec![key.clone()]]);
                    group_loc.insert(key.clone(), (key.clone(), 0));
                }
                SECONDARY => {
                    let head = self.primary_anchor(&e.base);
                    let groups = lines.entry(head.clone()).or_insert_with(|| {
                        // Anchor is not a tailored entry: show it as the
                        // line opener so the bucket stays readable.
                        vec![vec![head.clone()]]
                    });
                    groups.push(vec![key.clone()]);
                    let gi = groups.len() - 1;
                    group_loc.insert(key.clone(), (head, gi));
                }
                _ => {
                    // Tertiary (and `=`) entries join their base's group.
                    if let Some((head, gi)) = group_loc.get(&e.base).cloned() {
                        if let Some(groups) = lines.get_mut(&head) {
                            groups[gi].push(key.clone());
                        }
                        group_loc.insert(key.clone(), (head, gi));
                    } else {
                        let head = self.primary_anchor(&e.base);
                        let anchor_is_base = head == e.base;
                        let groups = lines
                            .entry(head.clone())
                            .or_insert_with(|| vec![vec![head.clone()]]);
                        // A variant hanging directly off the raw anchor
                        // belongs in the opening group.
                        let gi = if anchor_is_base { 0 } else { groups.len() };
                        if gi == groups.len() {
                            groups.push(vec![key.clone()]);
                        } else {
                            groups[gi].push(key.clone());
                        }
                        group_loc.insert(key.clone(), (head, gi));
                    }
                }
            }
        }

        lines
            .values()
            .map(|groups| {
                groups
                    .iter()
                    .map(|members| {
                        members
                            .iter()
                            .map(|m| m.trim_end())
                            .collect::<Vec<_>>()
                            .join("/")
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Walks base links up to the level-1 entry (or raw string) anchoring
    /// the primary bucket.
    fn primary_anchor(&self, base: &str) -> String {
        let mut current = base;
        for _ in 0..=self.rules().len() {
            match self.rules().get(current) {
                None => return current.to_string(),
                Some(e) if e.level == PRIMARY => return current.to_string(),
                Some(e) => current = &e.base,
            }
        }
        current.to_string()
    }
}

/// Grows a lone lowercase token's case permutations.
///
/// `ngy` → `ngy/Ngy/NGy/NGY`, capitals first after the original; applies
/// when the head is all-lowercase and every explicit variant is
/// case-equal to it (or there are none).
fn expand_case_variants(slash_items: &mut Vec<String>) {
    let head = slash_items[0].clone();
    if head.to_lowercase() != head {
        return;
    }
    let applies = (head.chars().count() > 1
        && slash_items[1..]
            .iter()
            .all(|s| s.to_lowercase() == head))
        || slash_items.len() == 1;
    if !applies {
        return;
    }
    let chars: Vec<char> = head.chars().collect();
    for i in 1..=chars.len() {
        let upper: String = chars[..i].iter().collect::<String>().to_uppercase();
        let lower: String = chars[i..].iter().collect::<String>().to_lowercase();
        let variant = format!("{upper}{lower}");
        if !slash_items.contains(&variant) {
            slash_items.push(variant);
        }
    }
    let mut variants = slash_items.split_off(1);
    variants.sort_by(|a, b| b.cmp(a));
    slash_items.extend(variants);
}
