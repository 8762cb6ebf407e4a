//! Profile compliance checks for head bags.
//!
//! The validator is a read-only consumer of the aggregation model; nothing
//! in the engine depends on its verdicts. Issues are graded, and only
//! `Error`-severity findings make a head bag non-compliant.

use std::collections::BTreeSet;

use tracing::debug;

use crate::constants::{
    DEFAULT_TAG_DIR, DELETED_FILE, MEMBER_BAGS_FILE, TAG_HEAD_VERSION, TAG_VERSION,
};
use crate::error::Result;
use crate::model::{HeadBag, validate_bag_name};
use crate::store::Bag;

/// How serious a validation finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// A should-fix: the profile recommends otherwise
    Recommendation,
    /// Tolerated by readers but likely to cause trouble
    Warning,
    /// The bag violates the profile
    Error,
}

/// One validation finding
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Stable machine-readable label, e.g. `head.version.missing`
    pub code: &'static str,
    pub message: String,
}

/// All findings from one validation pass
#[derive(Debug, Clone, Default)]
pub struct ValidationResults {
    issues: Vec<ValidationIssue>,
}

impl ValidationResults {
    /// Every finding, in discovery order
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Findings at exactly the given severity
    pub fn at(&self, severity: Severity) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    /// True if nothing `Error`-grade was found
    pub fn is_compliant(&self) -> bool {
        self.at(Severity::Error).next().is_none()
    }

    fn push(&mut self, severity: Severity, code: &'static str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity,
            code,
            message: message.into(),
        });
    }
}

/// Check a head bag's tags and tag-directory tables against the profile
pub fn validate_head_bag(head: &HeadBag) -> Result<ValidationResults> {
    let mut results = ValidationResults::default();
    let bag = head.bag();

    if !bag.info().contains(TAG_VERSION) {
        results.push(
            Severity::Recommendation,
            "head.profile-version.missing",
            format!("bag-info.txt does not declare {TAG_VERSION}"),
        );
    }
    if bag.info().get(TAG_HEAD_VERSION).is_none_or(str::is_empty) {
        results.push(
            Severity::Error,
            "head.version.missing",
            format!("{TAG_HEAD_VERSION} is missing or empty"),
        );
    }

    let tag_dir = head.tag_dir();
    if !bag.is_dir(tag_dir) {
        results.push(
            Severity::Error,
            "head.tag-dir.missing",
            format!("tag directory {tag_dir}/ does not exist"),
        );
        return Ok(results);
    }
    if tag_dir != DEFAULT_TAG_DIR {
        results.push(
            Severity::Recommendation,
            "head.tag-dir.nonstandard",
            format!("tag directory {tag_dir}/ is not the conventional {DEFAULT_TAG_DIR}/"),
        );
    }

    let member_names = check_member_bags(head, bag, &mut results);
    check_file_lookup(head, bag, &member_names, &mut results)?;
    check_deleted(head, tag_dir, bag, &mut results);

    debug!(
        bag = bag.name(),
        issues = results.issues().len(),
        compliant = results.is_compliant(),
        "head bag validated"
    );
    Ok(results)
}

fn check_member_bags(
    head: &HeadBag,
    bag: &Bag,
    results: &mut ValidationResults,
) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    match head.member_bags() {
        Err(err) => {
            results.push(
                Severity::Error,
                "members.table.unreadable",
                format!("{MEMBER_BAGS_FILE}: {err}"),
            );
        }
        Ok(records) if records.is_empty() => {
            results.push(
                Severity::Error,
                "members.table.empty",
                format!("{MEMBER_BAGS_FILE} lists no members"),
            );
        }
        Ok(records) => {
            for record in &records {
                if let Err(err) = validate_bag_name(&record.name) {
                    results.push(
                        Severity::Error,
                        "members.name.invalid",
                        format!("member {:?}: {err}", record.name),
                    );
                }
                names.insert(record.name.clone());
            }
            if records.last().map(|r| r.name.as_str()) != Some(bag.name()) {
                results.push(
                    Severity::Error,
                    "members.head.not-last",
                    format!("{MEMBER_BAGS_FILE} does not list the head bag ({}) last", bag.name()),
                );
            }
        }
    }
    names
}

fn check_file_lookup(
    head: &HeadBag,
    bag: &Bag,
    member_names: &BTreeSet<String>,
    results: &mut ValidationResults,
) -> Result<()> {
    let lookup = match head.file_lookup() {
        Ok(lookup) => lookup,
        Err(err) => {
            results.push(
                Severity::Error,
                "lookup.table.unreadable",
                err.to_string(),
            );
            return Ok(());
        }
    };
    for (path, bagname) in lookup.iter() {
        if !member_names.contains(bagname) {
            results.push(
                Severity::Error,
                "lookup.member.unknown",
                format!("{path} is registered to {bagname}, which is not a member"),
            );
        }
    }
    // the lookup is advisory; incomplete payload coverage is tolerated
    for path in bag.payload_files()? {
        if lookup.get(&path).is_none() {
            results.push(
                Severity::Warning,
                "lookup.payload.unregistered",
                format!("payload file {path} has no lookup entry"),
            );
        }
    }
    Ok(())
}

fn check_deleted(
    head: &HeadBag,
    tag_dir: &str,
    bag: &Bag,
    results: &mut ValidationResults,
) {
    let table = format!("{tag_dir}/{DELETED_FILE}");
    if !bag.is_file(&table) {
        return;
    }
    match head.deleted() {
        Ok(deleted) => {
            if deleted.is_empty() {
                results.push(
                    Severity::Recommendation,
                    "deleted.table.empty",
                    format!("{table} exists but lists no paths"),
                );
            }
        }
        Err(err) => {
            results.push(Severity::Error, "deleted.table.unreadable", err.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write_head(root: &Path, info: &str, members: &str) {
        fs::create_dir_all(root.join("data")).unwrap();
        fs::create_dir_all(root.join("multibag")).unwrap();
        fs::write(
            root.join("bagit.txt"),
            "BagIt-Version: 1.0\nTag-File-Character-Encoding: UTF-8\n",
        )
        .unwrap();
        fs::write(root.join("bag-info.txt"), info).unwrap();
        fs::write(root.join("multibag/member-bags.tsv"), members).unwrap();
    }

    #[test]
    fn test_compliant_head_bag() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("head");
        write_head(
            &root,
            "Multibag-Version: 0.4\nMultibag-Head-Version: 1\n",
            "head\n",
        );

        let head = HeadBag::open(&root).unwrap();
        let results = validate_head_bag(&head).unwrap();
        assert!(results.is_compliant(), "issues: {:?}", results.issues());
    }

    #[test]
    fn test_head_not_last_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("head");
        write_head(
            &root,
            "Multibag-Version: 0.4\nMultibag-Head-Version: 1\n",
            "head\nother\n",
        );

        let head = HeadBag::open(&root).unwrap();
        let results = validate_head_bag(&head).unwrap();
        assert!(!results.is_compliant());
        assert!(
            results
                .issues()
                .iter()
                .any(|i| i.code == "members.head.not-last")
        );
    }

    #[test]
    fn test_unregistered_payload_is_warning() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("head");
        write_head(
            &root,
            "Multibag-Version: 0.4\nMultibag-Head-Version: 1\n",
            "head\n",
        );
        fs::write(root.join("data/a.txt"), "hi").unwrap();

        let head = HeadBag::open(&root).unwrap();
        let results = validate_head_bag(&head).unwrap();
        assert!(results.is_compliant(), "coverage gaps are advisory");
        assert!(
            results
                .at(Severity::Warning)
                .any(|i| i.code == "lookup.payload.unregistered")
        );
    }

    #[test]
    fn test_unknown_lookup_member_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("head");
        write_head(
            &root,
            "Multibag-Version: 0.4\nMultibag-Head-Version: 1\n",
            "head\n",
        );
        fs::write(
            root.join("multibag/file-lookup.tsv"),
            "data/a.txt\tghost_bag\n",
        )
        .unwrap();

        let head = HeadBag::open(&root).unwrap();
        let results = validate_head_bag(&head).unwrap();
        assert!(!results.is_compliant());
        assert!(
            results
                .issues()
                .iter()
                .any(|i| i.code == "lookup.member.unknown")
        );
    }
}
