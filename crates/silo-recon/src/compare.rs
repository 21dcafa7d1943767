//! Set comparison between recorded keys and manifest contents.
//!
//! Both sides are compared as de-duplicated, order-independent collections.
//! Order is irrelevant to equality, and duplicate manifest entries must not
//! cause false negatives. The verdict requires an empty symmetric
//! difference: a manifest key never uploaded and an uploaded key absent
//! from the manifest both count as not-yet-reconciled.

use std::collections::HashSet;

/// Parses a manifest body into its de-duplicated set of listed keys.
///
/// The body is newline-delimited. Lines are trimmed and blank lines are
/// ignored, so a trailing newline or Windows line endings never produce a
/// phantom entry.
#[must_use]
pub fn manifest_keys(body: &str) -> HashSet<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Returns true when the recorded keys equal the manifest keys as sets.
///
/// An empty manifest with zero recorded keys is vacuously equal.
#[must_use]
pub fn sets_match(recorded: &[String], manifest: &HashSet<String>) -> bool {
    let recorded: HashSet<&str> = recorded.iter().map(String::as_str).collect();
    recorded.len() == manifest.len() && manifest.iter().all(|key| recorded.contains(key.as_str()))
}
