//! Substitution-token extraction.

use regex_lite::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// `${identifier}` where identifier is `[A-Za-z0-9_]+`.
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("token pattern is valid"));

/// Collect the unique field names referenced by `${...}` tokens in a form.
///
/// Pure and total: empty or token-free text yields an empty set. Callers
/// store the result whenever the form text is written; it is never
/// updated incrementally.
pub fn extract_fieldnames(form: &str) -> BTreeSet<String> {
    TOKEN
        .captures_iter(form)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
