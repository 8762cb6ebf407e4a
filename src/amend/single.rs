//! In-place conversion of a standard bag into the head bag of a
//! single-bag aggregation.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::constants::{
    BAG_INFO_FILE, DEFAULT_TAG_DIR, FILE_LOOKUP_FILE, MBAG_REFERENCE, MBAG_VERSION,
    MEMBER_BAGS_FILE, TAG_HEAD_VERSION, TAG_REFERENCE, TAG_TAG_DIR, TAG_VERSION,
};
use crate::error::{Result, store};
use crate::model::{FileLookup, MemberRecord, member::format_member_bags};
use crate::store::{Bag, format_bag_size};

const ABOUT_MBAG: &str = "This bag complies with the Multibag BagIt profile. For more \
     information, refer to the URL given by the Multibag-Reference tag.";

/// Turns the bag at a given directory into a single-bag aggregation head.
///
/// Unlike the other operations this one edits the bag in place: it gains
/// a tag directory describing an aggregation whose only member is itself.
pub struct SingleMultibagMaker {
    bag_dir: PathBuf,
    tag_dir: String,
}

impl SingleMultibagMaker {
    /// Convert the bag rooted at `bag_dir`
    pub fn new(bag_dir: impl Into<PathBuf>) -> Result<Self> {
        let bag_dir = bag_dir.into();
        Bag::open(&bag_dir)?;
        Ok(Self {
            bag_dir,
            tag_dir: DEFAULT_TAG_DIR.to_string(),
        })
    }

    /// Use a tag directory other than the default
    pub fn with_tag_dir(mut self, tag_dir: impl Into<String>) -> Self {
        self.tag_dir = tag_dir.into();
        self
    }

    /// Run the whole conversion: membership table, payload lookup, and
    /// head tags, declaring the given aggregation version
    pub fn convert(&self, head_version: &str, pid: Option<&str>) -> Result<()> {
        self.write_member_bags(pid)?;
        self.write_file_lookup(None, &[], true)?;
        // recomputes Bag-Size so it covers the new tag files
        self.update_info(head_version)?;
        debug!(bag = %self.bag_dir.display(), version = head_version, "converted to single-bag aggregation");
        Ok(())
    }

    /// Write a membership table whose only member is this bag, optionally
    /// recording a persistent identifier as its URL field
    pub fn write_member_bags(&self, pid: Option<&str>) -> Result<()> {
        let bag = Bag::open(&self.bag_dir)?;
        let record = match pid {
            Some(pid) => MemberRecord::with_url(bag.name(), pid)?,
            None => MemberRecord::new(bag.name())?,
        };
        self.write_tag_file(MEMBER_BAGS_FILE, &format_member_bags(&[record]))
    }

    /// Write (or extend) the payload lookup, registering every file under
    /// the `include` roots (payload only by default) to this bag. Paths in
    /// `exclude`, or under an excluded directory, are skipped.
    pub fn write_file_lookup(
        &self,
        include: Option<&[&str]>,
        exclude: &[&str],
        truncate: bool,
    ) -> Result<()> {
        let bag = Bag::open(&self.bag_dir)?;
        let include = include.unwrap_or(&["data"]);

        let mut lookup = FileLookup::new();
        if !truncate {
            let table = format!("{}/{FILE_LOOKUP_FILE}", self.tag_dir);
            if bag.is_file(&table) {
                lookup = FileLookup::parse(&bag.read_text(&table)?, &table)?;
            }
        }

        let excluded = |path: &str| {
            exclude
                .iter()
                .any(|e| path == *e || path.strip_prefix(*e).is_some_and(|r| r.starts_with('/')))
        };
        for root in include {
            if excluded(root) {
                continue;
            }
            if bag.is_file(root) {
                lookup.insert(*root, bag.name());
                continue;
            }
            for path in bag.files()? {
                if (path == *root || path.strip_prefix(*root).is_some_and(|r| r.starts_with('/')))
                    && bag.is_file(&path)
                    && !excluded(&path)
                {
                    lookup.insert(path, bag.name());
                }
            }
        }
        self.write_tag_file(FILE_LOOKUP_FILE, &lookup.format())
    }

    /// Add the head tags to the bag's info, recomputing `Bag-Size`
    pub fn update_info(&self, head_version: &str) -> Result<()> {
        let bag = Bag::open(&self.bag_dir)?;
        let mut info = bag.info().clone();
        info.set(TAG_VERSION, MBAG_VERSION);
        info.set(TAG_TAG_DIR, self.tag_dir.clone());
        info.set(TAG_HEAD_VERSION, head_version);
        info.set(TAG_REFERENCE, MBAG_REFERENCE);
        info.add("Internal-Sender-Description", ABOUT_MBAG);
        info.remove("Bag-Count");

        // two passes so the recorded size covers the final info file
        info.remove("Bag-Size");
        self.write_root_file(BAG_INFO_FILE, &info.serialize())?;
        info.set("Bag-Size", format_bag_size(self.total_size()?));
        self.write_root_file(BAG_INFO_FILE, &info.serialize())
    }

    fn total_size(&self) -> Result<u64> {
        let mut total = 0;
        for entry in WalkDir::new(&self.bag_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| store::io_error(e.to_string()))?;
            if entry.file_type().is_file() {
                let meta = entry.metadata().map_err(|e| store::io_error(e.to_string()))?;
                total += meta.len();
            }
        }
        Ok(total)
    }

    fn write_tag_file(&self, file: &str, content: &str) -> Result<()> {
        let dir = self.bag_dir.join(&self.tag_dir);
        fs::create_dir_all(&dir).map_err(|e| store::write_failed(&dir, &e))?;
        self.write_at(&dir.join(file), content)
    }

    fn write_root_file(&self, file: &str, content: &str) -> Result<()> {
        self.write_at(&self.bag_dir.join(file), content)
    }

    fn write_at(&self, path: &Path, content: &str) -> Result<()> {
        fs::write(path, content).map_err(|e| store::write_failed(path, &e))
    }
}
