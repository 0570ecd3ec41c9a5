//! Removal of the sample values that keep a template runnable as plain SQL.
//!
//! A directive may be followed by a literal that stands in for it when the file is run
//! directly: `id = /*% p "id" %*/42`, `name = /*% p "name" %*/'Alex'`,
//! `id IN /*% in "ids" %*/(1, 2)`. Those samples are dropped before evaluation.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::{NoExpand, Regex};

use crate::template::RIGHT_DELIM;

lazy_static! {
    static ref SAMPLE_STRING: Regex =
        Regex::new(r"%\*/'[^']*'").expect("sample string pattern is valid");
    static ref SAMPLE_LIST: Regex =
        Regex::new(r"%\*/\([^\(\)]*\)").expect("sample list pattern is valid");
    static ref SAMPLE_TOKEN: Regex =
        Regex::new(r"%\*/\S*").expect("sample token pattern is valid");
}

/// Drop the sample value directly after every closing delimiter.
///
/// Quoted samples go first, then parenthesised lists, then any run of non-whitespace.
/// Text right after `%*/` is always treated as a sample, so directives that must be
/// followed by SQL need a space in between. The same holds for two directives in a row:
/// `%*//*%` loses the second opening delimiter, so write `%*/ /*%`.
#[must_use]
pub fn strip_samples(text: &str) -> Cow<'_, str> {
    let mut out = Cow::Borrowed(text);
    for pattern in [&*SAMPLE_STRING, &*SAMPLE_LIST, &*SAMPLE_TOKEN] {
        let replaced = match pattern.replace_all(&out, NoExpand(RIGHT_DELIM)) {
            Cow::Owned(s) => Some(s),
            Cow::Borrowed(_) => None,
        };
        if let Some(s) = replaced {
            out = Cow::Owned(s);
        }
    }
    out
}
