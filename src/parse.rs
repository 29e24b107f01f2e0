//! Tailoring-syntax parser.
//!
//! Parses ICU/LDML reset syntax — `&[before N]anchor <key <<key2 ... &...` —
//! into the rule graph. Parsing is deliberately lenient: legacy rule files
//! are often partially malformed, and callers rely on the salvageable
//! blocks still loading. A reset block whose `[before …]` header does not
//! parse is skipped and counted, never an error.

use crate::collation::Collation;
use crate::element::{CollElement, IDENTICAL};
use crate::escape::unescape;

impl Collation {
    /// Parses LDML/ICU sort tailoring text into this collation.
    ///
    /// Whole-line `#` comments are stripped first; the text then splits on
    /// `&` into reset blocks. Each block's header establishes the base
    /// (with an optional `[before N]` applying to the first item only);
    /// the remainder alternates operators (runs of `<`, or `=`) with keys.
    /// A key may carry a `/expansion` suffix and a trailing ` #comment`.
    /// Duplicate visible keys are disambiguated with sentinel trailing
    /// spaces so the map key stays unique.
    pub fn parse(&mut self, text: &str) {
        let text: String = text
            .lines()
            .map(|line| if line.starts_with('#') { "" } else { line })
            .collect::<Vec<_>>()
            .join("\n");

        for (n, run) in text.split('&').enumerate() {
            let bits = split_operators(run);
            let header = unescape(&bits[0]);
            let Some((mut before, mut base)) = parse_reset_header(&header) else {
                log::debug!("skipping reset block with malformed header: {:?}", bits[0]);
                self.note_skipped_block();
                continue;
            };

            let mut i = 1;
            while i + 1 < bits.len() {
                let op = strip_trailing_comment(&bits[i]);
                let level = if op.contains('<') {
                    (op.matches('<').count() as u8).min(IDENTICAL)
                } else {
                    IDENTICAL
                };

                let raw = strip_trailing_comment(&bits[i + 1]);
                let mut key = unescape(&raw);
                let mut exp = None;
                if let Some(slash) = key.find('/') {
                    if slash > 0 {
                        let tail = key[slash + 1..].trim().to_string();
                        key = key[..slash].trim().to_string();
                        if !tail.is_empty() {
                            exp = Some(tail);
                        }
                    }
                }

                while self.rules().contains_key(&key) {
                    key.push(' ');
                }

                let mut element =
                    CollElement::with_order(base, level, before, (n as u32, i as u32));
                element.exp = exp;
                self.rules_mut().insert_unchecked(key.clone(), element);

                base = key;
                before = 0;
                i += 2;
            }
        }
    }
}

/// Splits a reset block into alternating text and operator tokens.
///
/// Operators are maximal runs of `<` and `=`; every token is trimmed. The
/// first element is the (possibly empty) header text.
fn split_operators(run: &str) -> Vec<String> {
    let mut bits = Vec::new();
    let mut current = String::new();
    let mut in_op = false;
    for ch in run.chars() {
        let is_op = ch == '<' || ch == '=';
        if is_op != in_op {
            bits.push(current.trim().to_string());
            current = String::new();
            in_op = is_op;
        }
        current.push(ch);
    }
    bits.push(current.trim().to_string());
    if in_op {
        // A trailing operator still needs its (empty) key slot.
        bits.push(String::new());
    }
    bits
}

/// Parses `[before N] anchor` reset headers.
///
/// Returns `(before, anchor)`; `before` is 0 when the prefix is absent.
/// `None` means the header is malformed and the block must be skipped.
fn parse_reset_header(header: &str) -> Option<(u8, String)> {
    let header = header.trim();
    let Some(rest) = header.strip_prefix("[before") else {
        return Some((0, header.to_string()));
    };
    let rest = rest.trim_start();
    if rest.len() == header.len() - "[before".len() {
        // No whitespace after the keyword: not a before-prefix.
        return None;
    }
    let mut chars = rest.chars();
    let digit = chars.next()?;
    let before = digit.to_digit(10)? as u8;
    let rest = chars.as_str().trim_start();
    let rest = rest.strip_prefix(']')?;
    Some((before, rest.trim().to_string()))
}

/// Removes ` #comment` suffixes, per line within the token.
fn strip_trailing_comment(token: &str) -> String {
    token
        .split('\n')
        .map(|line| {
            let mut prev_ws: Option<usize> = None;
            for (idx, ch) in line.char_indices() {
                if ch == '#' {
                    if let Some(start) = prev_ws {
                        return &line[..start];
                    }
                }
                prev_ws = ch.is_whitespace().then_some(idx);
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
