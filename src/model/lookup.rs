//! The `file-lookup.tsv` table: which member bag currently holds a path.
//!
//! One `PATH\tNAME` line per entry, spaces around either field stripped.
//! The table is advisory: a path's absence is not evidence of deletion, and
//! exhaustiveness over the payload is a validator concern, not an invariant.

use std::collections::BTreeMap;

use crate::error::{Result, tagdir};

/// Mapping from bag-relative path to the owning member bag's name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileLookup {
    entries: BTreeMap<String, String>,
}

impl FileLookup {
    /// Create an empty lookup
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `file-lookup.tsv` content. `file` gives error context.
    pub fn parse(text: &str, file: &str) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let Some((path, bagname)) = line.split_once('\t') else {
                return Err(tagdir::malformed(file, idx + 1, "missing bagname field"));
            };
            let path = path.trim();
            let bagname = bagname.trim();
            if path.is_empty() || bagname.is_empty() {
                return Err(tagdir::malformed(file, idx + 1, "empty field"));
            }
            entries.insert(path.to_string(), bagname.to_string());
        }
        Ok(Self { entries })
    }

    /// Serialize as `PATH\tNAME` lines with a trailing newline
    pub fn format(&self) -> String {
        let mut out = String::new();
        for (path, bagname) in &self.entries {
            out.push_str(path);
            out.push('\t');
            out.push_str(bagname);
            out.push('\n');
        }
        out
    }

    /// The member currently holding `path`, if recorded
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    /// Record (or override) the member holding `path`
    pub fn insert(&mut self, path: impl Into<String>, bagname: impl Into<String>) {
        self.entries.insert(path.into(), bagname.into());
    }

    /// Drop the entry for `path`, if present
    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.entries.remove(path)
    }

    /// Paths registered to the given member, in sorted order
    pub fn files_in_member(&self, bagname: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, b)| b.as_str() == bagname)
            .map(|(p, _)| p.as_str())
            .collect()
    }

    /// Iterate `(path, bagname)` entries in sorted path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, b)| (p.as_str(), b.as_str()))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the lookup holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
