//! Member bag records and the `member-bags.tsv` table.
//!
//! One line per member, TAB-separated: `NAME[\tURL][\t...][\t# COMMENT]`.
//! Spaces around NAME are not part of the name; a field starting with `"# "`
//! opens a free-text comment running to the end of the line. Order is
//! load-bearing: it is the combine/override order, and the last record must
//! name the head bag itself.

use crate::error::{Result, name, tagdir};

/// One line of `member-bags.tsv`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecord {
    pub name: String,
    pub url: Option<String>,
    pub extra: Vec<String>,
    pub comment: Option<String>,
}

impl MemberRecord {
    /// Create a record for a bare name
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_bag_name(&name)?;
        Ok(Self {
            name,
            url: None,
            extra: Vec::new(),
            comment: None,
        })
    }

    /// Create a record carrying a retrieval URL
    pub fn with_url(name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        let mut record = Self::new(name)?;
        record.url = Some(url.into());
        Ok(record)
    }

    /// Parse one `member-bags.tsv` line. `file` and `lineno` give error context.
    pub fn parse_line(line: &str, file: &str, lineno: usize) -> Result<Self> {
        let mut fields: Vec<&str> = line.split('\t').collect();

        let comment = match fields.last() {
            Some(last) if last.trim_start().starts_with("# ") => {
                let text = fields.pop().unwrap_or_default();
                Some(text.trim_start().trim_start_matches("# ").to_string())
            }
            _ => None,
        };

        let name = fields.first().map(|f| f.trim()).unwrap_or_default();
        if name.is_empty() {
            return Err(tagdir::malformed(file, lineno, "missing bag name field"));
        }
        validate_bag_name(name)
            .map_err(|e| tagdir::malformed(file, lineno, e.to_string()))?;

        let url = fields.get(1).map(|f| f.trim().to_string()).filter(|f| !f.is_empty());
        let extra = fields
            .iter()
            .skip(2)
            .map(|f| (*f).to_string())
            .collect();

        Ok(Self {
            name: name.to_string(),
            url,
            extra,
            comment,
        })
    }

    /// Format as a `member-bags.tsv` line without the trailing newline.
    /// This is the exact reverse of [`MemberRecord::parse_line`].
    pub fn format_line(&self) -> String {
        let mut out = self.name.clone();
        if let Some(url) = &self.url {
            out.push('\t');
            out.push_str(url);
        }
        for field in &self.extra {
            out.push('\t');
            out.push_str(field);
        }
        if let Some(comment) = &self.comment {
            out.push_str("\t# ");
            out.push_str(comment);
        }
        out
    }
}

/// Check the profile's bag-name restrictions: no embedded TAB, no leading
/// or trailing whitespace, non-empty
pub fn validate_bag_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(name::invalid(name, "empty name"));
    }
    if name.contains('\t') {
        return Err(name::invalid(name, "embedded TAB character"));
    }
    if name.trim() != name {
        return Err(name::invalid(name, "leading or trailing whitespace"));
    }
    Ok(())
}

/// Parse a whole `member-bags.tsv` file; blank lines are ignored
pub fn parse_member_bags(text: &str, file: &str) -> Result<Vec<MemberRecord>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        out.push(MemberRecord::parse_line(line, file, idx + 1)?);
    }
    Ok(out)
}

/// Serialize records to `member-bags.tsv` content
pub fn format_member_bags(records: &[MemberRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&record.format_line());
        out.push('\n');
    }
    out
}
