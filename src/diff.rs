// src/diff.rs
//! Line-level change detection between two snapshots.

use std::collections::HashSet;

/// Lines present in `new` but absent from `old`, each reported once, in order of
/// first appearance in `new`.
///
/// Lines are opaque: comparison is exact (case and whitespace sensitive). A
/// modified line shows up as a wholly new line; there is no "changed" notion.
pub fn diff<S: AsRef<str>, T: AsRef<str>>(old: &[S], new: &[T]) -> Vec<String> {
    let old_set: HashSet<&str> = old.iter().map(AsRef::as_ref).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(new.len());
    let mut out = Vec::new();

    for line in new.iter().map(AsRef::as_ref) {
        if old_set.contains(line) || !seen.insert(line) {
            continue;
        }
        out.push(line.to_string());
    }
    out
}

/// Split fetched page text into snapshot lines (`\n` or `\r\n` separated).
pub fn split_lines(raw: &str) -> Vec<String> {
    raw.lines().map(str::to_string).collect()
}
