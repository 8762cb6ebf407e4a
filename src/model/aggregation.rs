//! Aggregation resolution: turning the head bag's membership table into a
//! set of opened, on-disk member bags ready for combination.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, member, tagdir};
use crate::model::headbag::HeadBag;
use crate::model::member::MemberRecord;
use crate::store::Bag;

/// Locates a member bag on disk by its recorded name.
///
/// The core never dereferences member URLs; a resolver that fetches remote
/// serializations can be supplied by the caller.
pub trait MemberResolver {
    /// The directory holding the member bag named `record.name`, or `None`
    /// if this resolver cannot locate it
    fn resolve(&self, record: &MemberRecord) -> Option<PathBuf>;
}

/// Resolves members as subdirectories of a single component directory
#[derive(Debug, Clone)]
pub struct DirResolver {
    component_dir: PathBuf,
}

impl DirResolver {
    /// Resolve members under `component_dir`
    pub fn new(component_dir: impl Into<PathBuf>) -> Self {
        Self {
            component_dir: component_dir.into(),
        }
    }
}

impl MemberResolver for DirResolver {
    fn resolve(&self, record: &MemberRecord) -> Option<PathBuf> {
        let candidate = self.component_dir.join(&record.name);
        candidate.is_dir().then_some(candidate)
    }
}

/// A fully resolved aggregation: every member opened, in merge order
#[derive(Debug)]
pub struct Aggregation {
    members: Vec<Bag>,
}

impl Aggregation {
    /// Resolve every member of `head`'s aggregation to an opened bag.
    ///
    /// The membership table lists members in merge order with the head bag
    /// last; a table whose final record is not the head bag itself fails
    /// before anything is opened.
    pub fn resolve(head: &HeadBag, resolver: &dyn MemberResolver) -> Result<Self> {
        let records = head.member_bags()?;
        match records.last() {
            Some(last) if last.name == head.bag().name() => {}
            _ => {
                return Err(tagdir::ordering_violation(format!(
                    "member-bags.tsv must list the head bag ({}) last",
                    head.bag().name()
                )));
            }
        }

        let mut members = Vec::with_capacity(records.len());
        for record in &records {
            let root = if record.name == head.bag().name() {
                head.bag().path().to_path_buf()
            } else {
                resolver
                    .resolve(record)
                    .ok_or_else(|| member::unresolvable(&record.name))?
            };
            debug!(member = %record.name, path = %root.display(), "resolved member bag");
            members.push(Bag::open(&root)?);
        }
        Ok(Self { members })
    }

    /// Member bags in merge order, head last
    pub fn members(&self) -> &[Bag] {
        &self.members
    }

    /// The head bag (the final member)
    pub fn head(&self) -> &Bag {
        // resolve() guarantees at least the head itself
        &self.members[self.members.len() - 1]
    }
}

/// Resolve members under the head bag's parent directory
pub fn sibling_resolver(head: &HeadBag) -> DirResolver {
    let parent = head
        .bag()
        .path()
        .parent()
        .map_or_else(|| Path::new(".").to_path_buf(), Path::to_path_buf);
    DirResolver::new(parent)
}
