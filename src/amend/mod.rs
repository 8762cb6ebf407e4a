//! Non-destructive updates to an aggregation: a new head bag (and optional
//! new member bags) supersedes the previous version while every prior bag
//! stays untouched, and conversion of a standalone bag into a single-bag
//! aggregation head.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::{
    BAGIT_FILE, DEFAULT_TAG_DIR, DELETED_FILE, FILE_LOOKUP_FILE, MBAG_REFERENCE, MBAG_VERSION,
    MEMBER_BAGS_FILE, TAG_HEAD_DEPRECATES, TAG_HEAD_VERSION, TAG_REFERENCE, TAG_TAG_DIR,
    TAG_VERSION, is_reserved_tag,
};
use crate::error::{Result, plan as plan_error, version};
use crate::model::deleted::format_deleted;
use crate::model::{FileLookup, HeadBag, MemberRecord, member::format_member_bags};
use crate::store::{Bag, BagBuilder, TagMap};

mod single;

pub use single::SingleMultibagMaker;

/// The changes one update applies to an aggregation
#[derive(Debug, Clone, Default)]
pub struct Amendment {
    /// Bags joining the aggregation, in order; the last one becomes the
    /// new head bag
    pub new_members: Vec<PathBuf>,
    /// Paths to mark deleted from the aggregation
    pub deleted: BTreeSet<String>,
    /// Names of previous members to drop from the membership table
    pub drop_members: BTreeSet<String>,
    /// Version the new head bag will declare; must be new to the family
    pub new_version: String,
    /// Also carry the previous head's own deprecation entries forward, so
    /// the whole chain is readable from the newest head alone
    pub replicate_deprecation_chain: bool,
}

impl Amendment {
    /// An amendment introducing the given aggregation version
    pub fn new(new_version: impl Into<String>) -> Self {
        Self {
            new_version: new_version.into(),
            ..Self::default()
        }
    }

    /// Add a bag to the aggregation; the last added becomes the head
    pub fn with_member(mut self, path: impl Into<PathBuf>) -> Self {
        self.new_members.push(path.into());
        self
    }

    /// Mark a path deleted
    pub fn with_deleted(mut self, path: impl Into<String>) -> Self {
        self.deleted.insert(path.into());
        self
    }

    /// Drop a previous member from the membership table
    pub fn with_dropped_member(mut self, name: impl Into<String>) -> Self {
        self.drop_members.insert(name.into());
        self
    }

    /// Replicate the previous head's deprecation entries
    pub fn replicating_deprecation_chain(mut self) -> Self {
        self.replicate_deprecation_chain = true;
        self
    }
}

/// Applies amendments, producing each update's new head bag
pub struct Amender;

impl Amender {
    /// Write the new head bag for `amendment` under `out_dir` and return
    /// it opened. The previous aggregation's bags are never modified.
    pub fn amend(prev_head: &HeadBag, amendment: &Amendment, out_dir: &Path) -> Result<HeadBag> {
        let prev_version = prev_head.head_version()?.to_string();
        check_version_is_new(prev_head, &prev_version, &amendment.new_version)?;

        let new_bags = amendment
            .new_members
            .iter()
            .map(|p| Bag::open(p))
            .collect::<Result<Vec<_>>>()?;
        let head_name = match new_bags.last() {
            Some(bag) => bag.name().to_string(),
            None => format!(
                "{}_{}",
                family_name(prev_head.bag().name(), &prev_version),
                amendment.new_version
            ),
        };
        if out_dir.join(&head_name).exists() {
            return Err(plan_error::collision(&head_name));
        }

        let records = member_records(prev_head, amendment, &new_bags, &head_name)?;
        let lookup = carried_lookup(prev_head, amendment, &new_bags, &head_name)?;
        let deleted = carried_deleted(prev_head, amendment, &new_bags)?;

        let mut builder = BagBuilder::create(out_dir, &head_name)?;
        match new_bags.last() {
            Some(src) => copy_member_into(&mut builder, src)?,
            None => {
                builder.copy_file_from(prev_head.bag(), BAGIT_FILE)?;
            }
        }

        builder.set_info(head_info(prev_head, amendment, new_bags.last(), &prev_version));
        builder.write_tag_file(
            &format!("{DEFAULT_TAG_DIR}/{MEMBER_BAGS_FILE}"),
            &format_member_bags(&records),
        )?;
        builder.write_tag_file(
            &format!("{DEFAULT_TAG_DIR}/{FILE_LOOKUP_FILE}"),
            &lookup.format(),
        )?;
        if !deleted.is_empty() {
            builder.write_tag_file(
                &format!("{DEFAULT_TAG_DIR}/{DELETED_FILE}"),
                &format_deleted(&deleted),
            )?;
        }

        let bag = builder.finalize()?;
        debug!(head = %head_name, version = %amendment.new_version, "aggregation amended");
        HeadBag::from_bag(bag)
    }
}

/// The new version must not collide with any version already in the family
fn check_version_is_new(prev_head: &HeadBag, prev_version: &str, new_version: &str) -> Result<()> {
    if new_version.trim().is_empty() {
        return Err(version::invalid(new_version, "version must be non-empty"));
    }
    if new_version == prev_version {
        return Err(version::invalid(
            new_version,
            "version already used by the previous head bag",
        ));
    }
    if prev_head
        .deprecates()
        .iter()
        .any(|d| d.version == new_version)
    {
        return Err(version::invalid(
            new_version,
            "version already appears in the aggregation's deprecation chain",
        ));
    }
    Ok(())
}

/// The family base name: the previous head's name with its version suffix
/// removed, when it follows the `{family}_{version}` convention
fn family_name<'a>(prev_head_name: &'a str, prev_version: &str) -> &'a str {
    prev_head_name
        .strip_suffix(prev_version)
        .and_then(|rest| rest.strip_suffix('_'))
        .unwrap_or(prev_head_name)
}

/// Previous membership minus drops and reintroductions, then the new
/// members in caller order, the new head last
fn member_records(
    prev_head: &HeadBag,
    amendment: &Amendment,
    new_bags: &[Bag],
    head_name: &str,
) -> Result<Vec<MemberRecord>> {
    let new_names: BTreeSet<&str> = new_bags.iter().map(Bag::name).collect();
    let mut records: Vec<MemberRecord> = prev_head
        .member_bags()?
        .into_iter()
        .filter(|r| {
            !amendment.drop_members.contains(&r.name)
                && !new_names.contains(r.name.as_str())
                && r.name != head_name
        })
        .collect();
    for bag in new_bags {
        records.push(MemberRecord::new(bag.name())?);
    }
    if new_bags.is_empty() {
        records.push(MemberRecord::new(head_name)?);
    }
    Ok(records)
}

/// Previous lookup entries carried forward: pruned for dropped members,
/// overridden by the new members' payloads
fn carried_lookup(
    prev_head: &HeadBag,
    amendment: &Amendment,
    new_bags: &[Bag],
    head_name: &str,
) -> Result<FileLookup> {
    let mut lookup = FileLookup::new();
    for (path, bagname) in prev_head.file_lookup()?.iter() {
        if !amendment.drop_members.contains(bagname) {
            lookup.insert(path, bagname);
        }
    }
    for bag in new_bags {
        let owner = if bag.name() == head_name {
            head_name
        } else {
            bag.name()
        };
        for path in bag.payload_files()? {
            lookup.insert(path, owner);
        }
    }
    Ok(lookup)
}

/// Previous deleted set minus reintroduced paths, plus the newly deleted
fn carried_deleted(
    prev_head: &HeadBag,
    amendment: &Amendment,
    new_bags: &[Bag],
) -> Result<BTreeSet<String>> {
    let mut deleted = prev_head.deleted()?;
    for bag in new_bags {
        for path in bag.payload_files()? {
            deleted.remove(&path);
        }
    }
    deleted.extend(amendment.deleted.iter().cloned());
    Ok(deleted)
}

/// Replicate a member bag's content and manifests into the new head. A
/// stale tag directory in the source (a former head bag) is left behind,
/// since the new tables are written fresh.
fn copy_member_into(builder: &mut BagBuilder, src: &Bag) -> Result<()> {
    builder.copy_file_from(src, BAGIT_FILE)?;
    let tag_dir_prefix = format!("{DEFAULT_TAG_DIR}/");
    for path in src.non_special_files()? {
        if path == DEFAULT_TAG_DIR || path.starts_with(&tag_dir_prefix) {
            continue;
        }
        builder.copy_file_from(src, &path)?;
    }
    builder.set_payload_manifests(src.payload_manifests().clone());
    let mut tags = src.tag_manifests().clone();
    for entries in tags.values_mut() {
        entries.retain(|path, _| path != DEFAULT_TAG_DIR && !path.starts_with(&tag_dir_prefix));
    }
    builder.set_tag_manifests(tags);
    builder.set_fetch(src.fetch().to_vec());
    Ok(())
}

/// The new head's tag map: the source member's info (or the bare minimum
/// for a fresh head-only bag) plus the head tags and deprecation entries
fn head_info(
    prev_head: &HeadBag,
    amendment: &Amendment,
    src: Option<&Bag>,
    prev_version: &str,
) -> TagMap {
    let mut info = TagMap::new();
    info.set(TAG_VERSION, MBAG_VERSION);
    if let Some(src) = src {
        for (name, values) in src.info().iter() {
            if !is_reserved_tag(name) {
                info.set_all(name, values.to_vec());
            }
        }
    }
    info.set(TAG_TAG_DIR, DEFAULT_TAG_DIR);
    info.set(TAG_REFERENCE, MBAG_REFERENCE);
    info.set(TAG_HEAD_VERSION, amendment.new_version.clone());
    info.add(
        TAG_HEAD_DEPRECATES,
        format!("{prev_version},{}", prev_head.bag().name()),
    );
    if amendment.replicate_deprecation_chain {
        for dep in prev_head.deprecates() {
            let value = match &dep.head_bag {
                Some(head) => format!("{},{head}", dep.version),
                None => dep.version.clone(),
            };
            info.add(TAG_HEAD_DEPRECATES, value);
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_name() {
        assert_eq!(family_name("mybag_1", "1"), "mybag");
        assert_eq!(family_name("mybag_1.2", "1.2"), "mybag");
        assert_eq!(family_name("mybag", "1"), "mybag");
        assert_eq!(family_name("mybag_21", "1"), "mybag_21");
    }
}
