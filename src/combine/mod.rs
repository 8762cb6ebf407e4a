//! Recombining a multibag aggregation into the single bag it represents.
//!
//! Combination is strictly sequential over the membership order: each
//! member's files overlay the cumulative result, so a later member's
//! version of a path wins. Paths in the head bag's deleted set are never
//! materialized, and the profile's own metadata (the multibag tag
//! directory and `Multibag-*` tags) does not survive into the combined
//! bag.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Utc;
use tracing::debug;

use crate::constants::{BAGIT_FILE, MBAG_TAG_PREFIX, TAG_BAGGING_DATE, is_reserved_tag};
use crate::error::{Result, tagdir};
use crate::model::{Aggregation, HeadBag, MemberResolver, sibling_resolver, validate_bag_name};
use crate::store::{Bag, BagBuilder, FetchEntry, ManifestSet, TagMap};

/// Rebuilds the single bag described by a head bag's aggregation.
pub struct BagCombiner<'a> {
    head: &'a HeadBag,
    resolver: Box<dyn MemberResolver + 'a>,
}

impl<'a> BagCombiner<'a> {
    /// Combine the aggregation headed by `head`. Members are looked up
    /// next to the head bag unless a resolver is supplied.
    pub fn new(head: &'a HeadBag) -> Self {
        Self {
            head,
            resolver: Box::new(sibling_resolver(head)),
        }
    }

    /// Use a custom member resolver
    pub fn with_resolver(mut self, resolver: impl MemberResolver + 'a) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Write the combined bag as `dest_parent/dest_name`
    pub fn combine_into(&self, dest_parent: &Path, dest_name: &str) -> Result<Bag> {
        validate_bag_name(dest_name)?;

        // resolve everything up front so no write happens on a broken
        // aggregation
        let aggregation = Aggregation::resolve(self.head, self.resolver.as_ref())?;
        let tag_dir = self.head.tag_dir().to_string();
        let deleted = self.head.deleted()?;

        let mut builder = BagBuilder::create(dest_parent, dest_name)?;
        builder.copy_file_from(aggregation.head(), BAGIT_FILE)?;

        for member in aggregation.members() {
            self.overlay_member(&mut builder, member, &tag_dir, &deleted)?;
        }

        builder.set_info(self.merged_info(&aggregation)?);
        builder.set_fetch(merged_fetch(&aggregation, &deleted));

        let (payload, tags) = merged_manifests(&aggregation, &tag_dir, &deleted);
        builder.set_payload_manifests(payload);
        builder.set_tag_manifests(tags);

        let bag = builder.finalize()?;
        debug!(bag = dest_name, members = aggregation.members().len(), "aggregation combined");
        Ok(bag)
    }

    /// Copy one member's files over the staged result, later members
    /// overwriting earlier ones
    fn overlay_member(
        &self,
        builder: &mut BagBuilder,
        member: &Bag,
        tag_dir: &str,
        deleted: &BTreeSet<String>,
    ) -> Result<()> {
        for path in member.non_special_files()? {
            if in_tag_dir(&path, tag_dir) || is_deleted(&path, deleted) {
                continue;
            }
            builder.copy_file_from(member, &path)?;
        }
        Ok(())
    }

    /// The combined bag's tag map: the head's aggregation-info snapshot
    /// verbatim when it carries one, otherwise the members' maps merged in
    /// order with the profile's reserved names stripped afterwards
    fn merged_info(&self, aggregation: &Aggregation) -> Result<TagMap> {
        let mut info = match self.head.aggregation_info()? {
            Some(snapshot) => {
                // names the profile owns must not sneak back in through the
                // snapshot; size tags are recomputed over it at finalize
                if let Some(name) = snapshot
                    .names()
                    .find(|n| n.starts_with(MBAG_TAG_PREFIX) || *n == "Bag-Count")
                {
                    return Err(tagdir::reserved_conflict(name));
                }
                snapshot
            }
            None => {
                let mut merged = TagMap::new();
                for member in aggregation.members() {
                    for (name, values) in member.info().iter() {
                        merged.set_all(name, values.to_vec());
                    }
                }
                let reserved: Vec<String> = merged
                    .names()
                    .filter(|n| is_reserved_tag(n))
                    .map(ToString::to_string)
                    .collect();
                for name in &reserved {
                    merged.remove(name);
                }
                merged
            }
        };
        info.set(TAG_BAGGING_DATE, Utc::now().format("%Y-%m-%d").to_string());
        Ok(info)
    }
}

/// Open the head bag at `head_path` and combine its aggregation into
/// `dest_parent/dest_name`, resolving members as the head's siblings
pub fn combine_bag(head_path: &Path, dest_parent: &Path, dest_name: &str) -> Result<Bag> {
    let head = HeadBag::open(head_path)?;
    BagCombiner::new(&head).combine_into(dest_parent, dest_name)
}

/// True if the path is the multibag tag directory or inside it
fn in_tag_dir(path: &str, tag_dir: &str) -> bool {
    path == tag_dir || path.strip_prefix(tag_dir).is_some_and(|r| r.starts_with('/'))
}

/// True if the path is deleted, directly or under a deleted directory
fn is_deleted(path: &str, deleted: &BTreeSet<String>) -> bool {
    deleted.contains(path)
        || deleted
            .iter()
            .any(|d| path.strip_prefix(d.as_str()).is_some_and(|r| r.starts_with('/')))
}

/// Per-path override of fetch entries in member order, minus deleted paths
fn merged_fetch(aggregation: &Aggregation, deleted: &BTreeSet<String>) -> Vec<FetchEntry> {
    let mut merged: Vec<FetchEntry> = Vec::new();
    for member in aggregation.members() {
        for entry in member.fetch() {
            match merged.iter_mut().find(|e| e.path == entry.path) {
                Some(existing) => *existing = entry.clone(),
                None => merged.push(entry.clone()),
            }
        }
    }
    merged.retain(|e| !is_deleted(&e.path, deleted));
    merged
}

/// Last-writer-wins union of the members' manifests, minus deleted paths
/// and the profile's tag directory
fn merged_manifests(
    aggregation: &Aggregation,
    tag_dir: &str,
    deleted: &BTreeSet<String>,
) -> (ManifestSet, ManifestSet) {
    let mut payload = ManifestSet::new();
    let mut tags = ManifestSet::new();
    for member in aggregation.members() {
        for (alg, entries) in member.payload_manifests() {
            let merged = payload.entry(alg.clone()).or_default();
            for (path, digest) in entries {
                merged.insert(path.clone(), digest.clone());
            }
        }
        for (alg, entries) in member.tag_manifests() {
            let merged = tags.entry(alg.clone()).or_default();
            for (path, digest) in entries {
                if !in_tag_dir(path, tag_dir) {
                    merged.insert(path.clone(), digest.clone());
                }
            }
        }
    }
    for entries in payload.values_mut() {
        entries.retain(|path, _| !is_deleted(path, deleted));
    }
    for entries in tags.values_mut() {
        entries.retain(|path, _| !is_deleted(path, deleted));
    }
    (payload, tags)
}
