//! Lazy execution of a split plan: one finalized output bag per iterator
//! step, so the caller can serialize or relocate each bag before the next
//! one is written.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::constants::{
    AGGREGATION_INFO_FILE, BAG_INFO_FILE, BAGIT_FILE, DEFAULT_TAG_DIR, FILE_LOOKUP_FILE,
    MBAG_VERSION, MEMBER_BAGS_FILE, TAG_HEAD_DEPRECATES, TAG_HEAD_VERSION,
    TAG_INTERNAL_SENDER_ID, TAG_SOURCE_INTERNAL_SENDER_ID, TAG_TAG_DIR, TAG_VERSION,
    is_reserved_tag,
};
use crate::error::{Result, plan as plan_error};
use crate::model::{FileLookup, MemberRecord, member::format_member_bags};
use crate::split::naming::{BagNamer, SequentialNamer};
use crate::split::plan::SplitPlan;
use crate::store::{Bag, BagBuilder, TagMap};

/// Writes a plan's output bags under a destination directory.
///
/// Execution is resumable: an already finalized output bag whose contents
/// match its manifest is yielded as a success without any writes, while a
/// mismatched one fails with `NameCollision`. A failure mid-bag leaves
/// earlier bags untouched and the current bag's staging directory in place.
pub struct PlanExecutor<'a> {
    plan: &'a SplitPlan,
    progenitor: &'a Bag,
    out_dir: PathBuf,
    namer: Box<dyn BagNamer>,
}

impl<'a> PlanExecutor<'a> {
    /// Execute `plan` against `progenitor`, writing bags under `out_dir`.
    /// Bags are named `{progenitor}_{n}` unless a namer is supplied.
    pub fn new(plan: &'a SplitPlan, progenitor: &'a Bag, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            plan,
            progenitor,
            out_dir: out_dir.into(),
            namer: Box::new(SequentialNamer::new(progenitor.name())),
        }
    }

    /// Use a custom output-bag namer
    pub fn with_namer(mut self, namer: impl BagNamer + 'static) -> Self {
        self.namer = Box::new(namer);
        self
    }

    /// The lazy iterator over output bags, head bag last
    pub fn execute(self) -> ExecutedBags<'a> {
        ExecutedBags {
            plan: self.plan,
            progenitor: self.progenitor,
            out_dir: self.out_dir,
            namer: self.namer,
            names: Vec::new(),
            lookup: FileLookup::new(),
            index: 0,
            halted: false,
        }
    }

    /// Execute the whole plan at once, returning the output paths
    pub fn execute_all(self) -> Result<Vec<PathBuf>> {
        self.execute().collect()
    }
}

/// Iterator yielding one finalized output bag path per step
pub struct ExecutedBags<'a> {
    plan: &'a SplitPlan,
    progenitor: &'a Bag,
    out_dir: PathBuf,
    namer: Box<dyn BagNamer>,
    names: Vec<String>,
    lookup: FileLookup,
    index: usize,
    halted: bool,
}

impl ExecutedBags<'_> {
    fn write_next(&mut self) -> Result<PathBuf> {
        let manifests = self.plan.manifests();
        let manifest = &manifests[self.index];
        let is_head = self.index == manifests.len() - 1;

        let name = self.namer.next_name()?;
        self.names.push(name.clone());
        let final_path = self.out_dir.join(&name);

        if final_path.exists() {
            return self.resume_existing(&name, &final_path, &manifest.paths, is_head);
        }

        let mut builder = BagBuilder::create(&self.out_dir, &name)?;
        builder.copy_file_from(self.progenitor, BAGIT_FILE)?;

        for path in &manifest.paths {
            if !self.progenitor.exists(path) {
                warn!(bag = %name, path, "plan names a file the source bag lacks");
                continue;
            }
            builder.copy_file_from(self.progenitor, path)?;
            if self.progenitor.is_file(path) {
                self.carry_digests(&mut builder, path);
                self.lookup.insert(path.clone(), name.clone());
            }
        }

        builder.set_info(self.member_info(&name, is_head));

        if is_head {
            self.write_head_tables(&mut builder)?;
        }

        let bag = builder.finalize()?;
        debug!(bag = %name, head = is_head, "output bag finalized");
        Ok(bag.path().to_path_buf())
    }

    /// A finished bag already at the output path: accept it when its
    /// contents match the manifest, otherwise refuse the name
    fn resume_existing(
        &mut self,
        name: &str,
        final_path: &std::path::Path,
        planned: &BTreeSet<String>,
        is_head: bool,
    ) -> Result<PathBuf> {
        let existing = Bag::open(final_path).map_err(|_| plan_error::collision(name))?;

        let mut expected = planned.clone();
        if is_head {
            for file in [MEMBER_BAGS_FILE, FILE_LOOKUP_FILE, AGGREGATION_INFO_FILE] {
                let path = format!("{DEFAULT_TAG_DIR}/{file}");
                if existing.is_file(&path) {
                    expected.insert(path);
                }
            }
        }
        if existing.non_special_files()? != expected {
            return Err(plan_error::collision(name));
        }

        for path in planned {
            if self.progenitor.is_file(path) {
                self.lookup.insert(path.clone(), name.to_string());
            }
        }
        debug!(bag = %name, "output bag already complete; skipping");
        Ok(final_path.to_path_buf())
    }

    /// Carry the file's recorded digests over from the source manifests
    fn carry_digests(&self, builder: &mut BagBuilder, path: &str) {
        for manifests in [
            self.progenitor.payload_manifests(),
            self.progenitor.tag_manifests(),
        ] {
            for (algorithm, entries) in manifests {
                if let Some(digest) = entries.get(path) {
                    builder.record_checksum(path, algorithm, digest);
                }
            }
        }
    }

    /// Derive the output bag's info from the source bag's
    fn member_info(&self, bag_name: &str, is_head: bool) -> TagMap {
        let mut info = TagMap::new();
        info.set(TAG_VERSION, MBAG_VERSION);
        for (name, values) in self.progenitor.info().iter() {
            if is_reserved_tag(name) {
                continue;
            }
            if name == TAG_INTERNAL_SENDER_ID {
                info.set(name, bag_name);
                info.set_all(TAG_SOURCE_INTERNAL_SENDER_ID, values.to_vec());
            } else {
                info.set_all(name, values.to_vec());
            }
        }
        info.set(TAG_TAG_DIR, DEFAULT_TAG_DIR);
        if is_head {
            info.set(TAG_HEAD_VERSION, self.plan.head_version.clone());
            for dep in &self.plan.deprecates {
                let value = match &dep.head_bag {
                    Some(head) => format!("{},{head}", dep.version),
                    None => dep.version.clone(),
                };
                info.add(TAG_HEAD_DEPRECATES, value);
            }
        }
        info
    }

    fn write_head_tables(&self, builder: &mut BagBuilder) -> Result<()> {
        let records = self
            .names
            .iter()
            .map(MemberRecord::new)
            .collect::<Result<Vec<_>>>()?;
        builder.write_tag_file(
            &format!("{DEFAULT_TAG_DIR}/{MEMBER_BAGS_FILE}"),
            &format_member_bags(&records),
        )?;
        builder.write_tag_file(
            &format!("{DEFAULT_TAG_DIR}/{FILE_LOOKUP_FILE}"),
            &self.lookup.format(),
        )?;
        if self.progenitor.is_file(BAG_INFO_FILE) {
            builder.write_tag_file(
                &format!("{DEFAULT_TAG_DIR}/{AGGREGATION_INFO_FILE}"),
                &self.progenitor.read_text(BAG_INFO_FILE)?,
            )?;
        }
        Ok(())
    }
}

impl Iterator for ExecutedBags<'_> {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted || self.index >= self.plan.manifests().len() {
            return None;
        }
        let result = self.write_next();
        if result.is_err() {
            self.halted = true;
        }
        self.index += 1;
        Some(result)
    }
}
