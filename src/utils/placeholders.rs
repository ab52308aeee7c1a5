use std::collections::{HashMap, HashSet};
use regex::{Captures, Regex};
use lazy_static::lazy_static;

lazy_static! {
    static ref PLACEHOLDER_MATCH_RE: Regex = Regex::new(r"\{\[.*?\]\}").unwrap();
}

#[inline]
fn strip_format(key: &str) -> &str {
    //! Strips "{\[" and "\]}" for a string, which is algorithmically unsafe.
    //! Ensure the string is properly formatted like "{\[a\]}".
    &key[2..key.len() - 2]
}

/// Collects the names of all placeholders in a string.
///
/// A placeholder is written as `{[name]}`. Names may not contain line breaks.
pub fn get_placeholders(string: &str) -> HashSet<String> {
    PLACEHOLDER_MATCH_RE.captures_iter(string)
        .map(|captures| strip_format(&captures[0]).to_string())
        .collect()
}

/// Replaces every placeholder in `original` with its value from `mapping`.
///
/// Returns the names of the unbound placeholders, sorted, if any placeholder
/// in the string has no entry in the mapping. Nothing is replaced in that case.
pub fn replace_placeholders(original: &str, mapping: &HashMap<String, String>) -> Result<String, Vec<String>> {
    let mut unbound: Vec<String> = get_placeholders(original)
        .into_iter()
        .filter(|name| !mapping.contains_key(name))
        .collect();
    if !unbound.is_empty() {
        unbound.sort();
        return Err(unbound);
    }
    let replaced = PLACEHOLDER_MATCH_RE.replace_all(original, |captures: &Captures| {
        // every key is present, checked above
        mapping.get(strip_format(&captures[0])).unwrap()
    });
    Ok(replaced.into_owned())
}
