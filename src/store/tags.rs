//! Ordered, repetition-preserving tag maps in BagIt `bag-info.txt` syntax.
//!
//! Both the bag's own info file and the head bag's `aggregation-info.txt`
//! use this format: `Name: value` lines, where a line beginning with
//! whitespace continues the previous value.

use crate::error::{Result, tagdir};

/// An ordered multimap of tag names to values.
///
/// Name order and value repetition are preserved across a parse/serialize
/// round trip. Lookups are case-sensitive, as in BagIt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap {
    entries: Vec<(String, Vec<String>)>,
}

impl TagMap {
    /// Create an empty tag map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse tag map text. `file` is used for error context only.
    pub fn parse(text: &str, file: &str) -> Result<Self> {
        let mut out = Self::new();
        let mut current: Option<(String, String)> = None;

        for (idx, raw) in text.lines().enumerate() {
            let lineno = idx + 1;
            if raw.trim().is_empty() {
                continue;
            }
            if raw.starts_with(' ') || raw.starts_with('\t') {
                // continuation of the previous value
                match current.as_mut() {
                    Some((_, value)) => {
                        value.push(' ');
                        value.push_str(raw.trim());
                    }
                    None => {
                        return Err(tagdir::malformed(
                            file,
                            lineno,
                            "continuation line with no preceding tag",
                        ));
                    }
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                out.add(&name, value);
            }
            let Some((name, value)) = raw.split_once(':') else {
                return Err(tagdir::malformed(file, lineno, "expected 'Name: value'"));
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(tagdir::malformed(file, lineno, "empty tag name"));
            }
            current = Some((name.to_string(), value.trim().to_string()));
        }
        if let Some((name, value)) = current {
            out.add(&name, value);
        }
        Ok(out)
    }

    /// Serialize to `bag-info.txt` syntax with a trailing newline
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (name, values) in &self.entries {
            for value in values {
                out.push_str(name);
                out.push_str(": ");
                out.push_str(value);
                out.push('\n');
            }
        }
        out
    }

    /// The last value recorded under `name`, if any
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.last())
            .map(String::as_str)
    }

    /// All values recorded under `name`, in order
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map_or(&[], |(_, v)| v.as_slice())
    }

    /// True if any value is recorded under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Replace all values under `name` with a single value, keeping the
    /// name's position if it already exists
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.set_all(name, vec![value.into()]);
    }

    /// Replace all values under `name`, keeping the name's position if it
    /// already exists
    pub fn set_all(&mut self, name: &str, values: Vec<String>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = values,
            None => self.entries.push((name.to_string(), values)),
        }
    }

    /// Append a value under `name`, creating the name if needed
    pub fn add(&mut self, name: &str, value: impl Into<String>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => v.push(value.into()),
            None => self.entries.push((name.to_string(), vec![value.into()])),
        }
    }

    /// Remove every value under `name`; returns true if anything was removed
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| n != name);
        before != self.entries.len()
    }

    /// Iterate `(name, values)` pairs in recorded order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// Tag names in recorded order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// True if the map holds no tags
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
