use std::borrow::Cow;

use crate::dialect::Dialect;

/// Escape character used in generated `LIKE ... ESCAPE` clauses.
pub const ESCAPE_CHAR: char = '\\';
/// Clause appended after every generated `LIKE` pattern.
pub const ESCAPE_CLAUSE: &str = " ESCAPE '\\'";

/// Prefix wildcard runes of `dialect` (and the escape character itself) with a backslash.
///
/// Returns a borrowed `Cow` when nothing needed escaping.
#[must_use]
pub fn escape_like<'a>(text: &'a str, dialect: &Dialect) -> Cow<'a, str> {
    let needs_escape = |c: char| c == ESCAPE_CHAR || dialect.is_wildcard(c);
    let Some(first) = text.find(needs_escape) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len() + 4);
    out.push_str(&text[..first]);
    for c in text[first..].chars() {
        if needs_escape(c) {
            out.push(ESCAPE_CHAR);
        }
        out.push(c);
    }
    Cow::Owned(out)
}

/// Sequences that must never be spliced into SQL text verbatim.
const PROHIBITED: &[(&str, &str)] = &[
    ("'", "single quote"),
    (";", "semicolon"),
    ("--", "line comment"),
    ("/*", "block comment start"),
    ("*/", "block comment end"),
];

/// Check a string destined for direct splicing; returns the reason of the first violation.
pub(crate) fn check_literal(text: &str) -> Result<(), &'static str> {
    match PROHIBITED.iter().find(|(seq, _)| text.contains(seq)) {
        Some((_, reason)) => Err(*reason),
        None => Ok(()),
    }
}
