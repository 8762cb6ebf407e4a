//! The `deleted.txt` table: paths removed from the aggregation.
//!
//! One bag-relative path per line. A listed path is excluded from the
//! combined view even if some member bag still carries the file.

use std::collections::BTreeSet;

/// Parse `deleted.txt` content into a sorted set of paths
pub fn parse_deleted(text: &str) -> BTreeSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Serialize a deleted-path set, one path per line with a trailing newline
pub fn format_deleted(paths: &BTreeSet<String>) -> String {
    let mut out = String::new();
    for path in paths {
        out.push_str(path);
        out.push('\n');
    }
    out
}
