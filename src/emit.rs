//! ICU tailoring-text emitter.
//!
//! Renders a resolved rule graph back into `&[before N]anchor < key ...`
//! syntax. Entries are walked in short-key order; a new reset clause opens
//! whenever an entry's base no longer continues the running chain, and `=`
//! entries share their reset through the equality chain. Line wrapping, if
//! requested, happens only between entries.

use crate::collation::Collation;
use crate::element::IDENTICAL;
use crate::escape::escape;
use crate::sortkey::SortKey;
use std::collections::HashMap;

/// Output accumulator that tracks its length in characters, so the wrap
/// column counts what a reader sees rather than bytes.
#[derive(Default)]
struct Out {
    text: String,
    chars: usize,
}

impl Out {
    fn push(&mut self, s: &str) {
        self.text.push_str(s);
        self.chars += s.chars().count();
    }
}

impl Collation {
    /// Renders ICU tailoring syntax for this collation.
    ///
    /// `wrap` is an optional column width: 0 disables wrapping, otherwise
    /// lines break between entries once the column is exceeded.
    pub fn to_icu(&mut self, wrap: usize) -> String {
        self.resolve_keys(false);

        let mut ordered: Vec<String> = self.rules().keys().cloned().collect();
        let short_keys: HashMap<String, SortKey> = ordered
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

        let mut out = Out::default();
        let mut lastk: Option<String> = None;
        let mut eqchain: Option<String> = None;
        let mut loc = 0usize;

        for key in &ordered {
            let Some(e) = self.rules().get(key).cloned() else { continue };
            let visible = key.trim_end();

            if let Some(prefix) = &e.prefix {
                out.push(prefix);
            }

            let continues_chain = lastk.as_deref() == Some(e.base.as_str())
                || eqchain.as_deref() == Some(e.base.as_str());
            if !continues_chain || e.before != 0 {
                loc = out.chars + 1;
                out.push("\n&");
                if e.before != 0 {
                    out.push(&format!("[before {}]", e.before));
                }
                out.push(&escape(&e.base, false));
                eqchain = None;
            }

            if wrap > 0 && out.chars - loc > wrap {
                out.push("\n");
                loc = out.chars;
            } else {
                out.push(" ");
            }

            if e.level == IDENTICAL {
                out.push("= ");
                if eqchain.is_none() {
                    eqchain = Some(e.base.clone());
                }
            } else {
                out.push(&"<<<"[..usize::from(e.level.clamp(1, 3))]);
                out.push(" ");
                eqchain = None;
            }

            out.push(&escape(visible, false));
            if let Some(exp) = &e.exp {
                out.push("/");
                out.push(&escape(exp, false));
            }
            lastk = Some(visible.to_string());
        }

        out.text.strip_prefix('\n').unwrap_or(&out.text).to_string()
    }
}
