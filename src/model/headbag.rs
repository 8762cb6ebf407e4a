//! Head-bag access: the one member that carries the aggregation's metadata.
//!
//! A head bag is an ordinary bag whose `bag-info.txt` declares
//! `Multibag-Head-Version`, plus a tag directory holding the membership
//! tables. `HeadBag` wraps an opened [`Bag`] and exposes typed readers for
//! those tables.

use std::collections::BTreeSet;
use std::path::Path;

use crate::constants::{
    AGGREGATION_INFO_FILE, DEFAULT_TAG_DIR, DELETED_FILE, FILE_LOOKUP_FILE, MBAG_VERSION,
    MEMBER_BAGS_FILE, TAG_HEAD_DEPRECATES, TAG_HEAD_VERSION, TAG_TAG_DIR, TAG_VERSION,
};
use crate::error::{Result, tagdir};
use crate::model::deleted::parse_deleted;
use crate::model::lookup::FileLookup;
use crate::model::member::{MemberRecord, parse_member_bags};
use crate::store::{Bag, TagMap};

/// A head version deprecated by the current one
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Deprecation {
    /// The superseded aggregation version
    pub version: String,
    /// Name of that version's head bag, when recorded
    pub head_bag: Option<String>,
}

/// True if the bag's info declares it a head bag
pub fn is_head_bag(bag: &Bag) -> bool {
    bag.info().contains(TAG_HEAD_VERSION)
}

/// A bag opened with its head-bag capabilities
#[derive(Debug)]
pub struct HeadBag {
    bag: Bag,
}

impl HeadBag {
    /// Open the bag at `path` and wrap it as a head bag
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_bag(Bag::open(path)?)
    }

    /// Wrap an already opened bag, requiring the head-version tag
    pub fn from_bag(bag: Bag) -> Result<Self> {
        if !is_head_bag(&bag) {
            return Err(tagdir::missing_tag(TAG_HEAD_VERSION));
        }
        Ok(Self { bag })
    }

    /// The wrapped bag
    pub fn bag(&self) -> &Bag {
        &self.bag
    }

    /// The aggregation version this head bag describes
    pub fn head_version(&self) -> Result<&str> {
        self.bag
            .info()
            .get(TAG_HEAD_VERSION)
            .ok_or_else(|| tagdir::missing_tag(TAG_HEAD_VERSION))
    }

    /// The declared profile version, defaulting to the current one
    pub fn profile_version(&self) -> &str {
        self.bag.info().get(TAG_VERSION).unwrap_or(MBAG_VERSION)
    }

    /// The tag directory holding the membership tables
    pub fn tag_dir(&self) -> &str {
        self.bag.info().get(TAG_TAG_DIR).unwrap_or(DEFAULT_TAG_DIR)
    }

    /// Head versions this one deprecates, in declaration order
    pub fn deprecates(&self) -> Vec<Deprecation> {
        self.bag
            .info()
            .get_all(TAG_HEAD_DEPRECATES)
            .iter()
            .map(|value| match value.split_once(',') {
                Some((version, name)) => Deprecation {
                    version: version.trim().to_string(),
                    head_bag: Some(name.trim().to_string()),
                },
                None => Deprecation {
                    version: value.trim().to_string(),
                    head_bag: None,
                },
            })
            .collect()
    }

    fn table_path(&self, file: &str) -> String {
        format!("{}/{}", self.tag_dir(), file)
    }

    /// The member-bag records, in aggregation order (head last)
    pub fn member_bags(&self) -> Result<Vec<MemberRecord>> {
        let path = self.table_path(MEMBER_BAGS_FILE);
        if !self.bag.is_file(&path) {
            return Err(tagdir::missing_file(&path));
        }
        parse_member_bags(&self.bag.read_text(&path)?, &path)
    }

    /// Member-bag names only, in aggregation order
    pub fn member_names(&self) -> Result<Vec<String>> {
        Ok(self.member_bags()?.into_iter().map(|m| m.name).collect())
    }

    /// The file-lookup table, empty if the table file is absent
    pub fn file_lookup(&self) -> Result<FileLookup> {
        let path = self.table_path(FILE_LOOKUP_FILE);
        if !self.bag.is_file(&path) {
            return Ok(FileLookup::new());
        }
        FileLookup::parse(&self.bag.read_text(&path)?, &path)
    }

    /// The member recorded as holding `path`, if any
    pub fn lookup_file(&self, path: &str) -> Result<Option<String>> {
        Ok(self.file_lookup()?.get(path).map(ToString::to_string))
    }

    /// Paths recorded against the given member
    pub fn files_in_member(&self, bagname: &str) -> Result<Vec<String>> {
        Ok(self
            .file_lookup()?
            .files_in_member(bagname)
            .into_iter()
            .map(ToString::to_string)
            .collect())
    }

    /// Paths removed from the aggregation, empty if the table is absent
    pub fn deleted(&self) -> Result<BTreeSet<String>> {
        let path = self.table_path(DELETED_FILE);
        if !self.bag.is_file(&path) {
            return Ok(BTreeSet::new());
        }
        Ok(parse_deleted(&self.bag.read_text(&path)?))
    }

    /// The aggregation-info tag snapshot, if the table is present
    pub fn aggregation_info(&self) -> Result<Option<TagMap>> {
        let path = self.table_path(AGGREGATION_INFO_FILE);
        if !self.bag.is_file(&path) {
            return Ok(None);
        }
        Ok(Some(TagMap::parse(&self.bag.read_text(&path)?, &path)?))
    }
}
