//! Escaping codec for tailoring rule text.
//!
//! Bidirectional mapping between raw Unicode text and the escaped textual
//! form used by ICU tailoring syntax. This is a wire format: for the
//! supported character classes, [`unescape`] is the exact inverse of
//! [`escape`].
//!
//! Numeric escapes are emitted in uppercase hex and decoded
//! case-insensitively with no count limit, so escaped combining marks
//! survive a round trip.

use unicode_properties::{GeneralCategoryGroup, UnicodeGeneralCategory};

/// ASCII punctuation that is backslash-escaped on output.
const ESCAPED_PUNCT: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~";

/// Turns normal Unicode text into escaped tailoring syntax.
///
/// Characters in the fixed punctuation set are backslash-escaped and
/// apostrophes are doubled. Non-ASCII text passes through raw, except that
/// a combining mark appearing before any base character of the run is
/// rendered as `\uXXXX` (or `\UXXXXXXXX` beyond the BMP) when `all_chars`
/// is set. Once a base character has been emitted raw, the rest of the run
/// passes through untouched, so a mark never detaches from its base.
pub fn escape(text: &str, all_chars: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut lastbase = false;
    for ch in text.chars() {
        if ESCAPED_PUNCT.contains(ch) {
            out.push('\\');
            out.push(ch);
            continue;
        }
        if ch == '\'' {
            out.push_str("''");
            continue;
        }
        let code = ch as u32;
        if (0x21..0x7F).contains(&code) {
            out.push(ch);
        } else if lastbase || ch.general_category_group() != GeneralCategoryGroup::Mark {
            lastbase = true;
            out.push(ch);
        } else if all_chars && code > 0xFFFF {
            out.push_str(&format!("\\U{code:08X}"));
        } else if all_chars {
            out.push_str(&format!("\\u{code:04X}"));
        } else {
            out.push(ch);
        }
    }
    out
}

/// Parses escaped tailoring syntax back into normal Unicode text.
///
/// Numeric escapes are decoded first, then any remaining backslash-escaped
/// character is unescaped, then doubled apostrophes collapse to one.
pub fn unescape(text: &str) -> String {
    let decoded = decode_numeric(text);
    let mut out = String::with_capacity(decoded.len());
    let mut chars = decoded.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out.replace("''", "'")
}

/// Decodes `\uXXXX` and `\UXXXXXXXX` escapes, case-insensitive hex.
///
/// Ill-formed escapes (short digit runs, surrogate values) are left in
/// place for the later passes.
fn decode_numeric(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let digits = match (chars.get(i), chars.get(i + 1)) {
            (Some('\\'), Some('U')) => 8,
            (Some('\\'), Some('u')) => 4,
            _ => 0,
        };
        if digits > 0 && i + 2 + digits <= chars.len() {
            let run: String = chars[i + 2..i + 2 + digits].iter().collect();
            if run.chars().all(|c| c.is_ascii_hexdigit()) {
                if let Some(decoded) =
                    u32::from_str_radix(&run, 16).ok().and_then(char::from_u32)
                {
                    out.push(decoded);
                    i += 2 + digits;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}
