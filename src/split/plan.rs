//! Split plans: the declarative output of a splitter, consumed by the
//! executor. A plan is a list of manifests, one per output bag, with the
//! head bag's manifest last. Plans serialize to JSON so a caller can
//! persist one between planning and execution.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::Deprecation;
use crate::store::Bag;

/// Size constraints driving a split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConstraints {
    /// Hard ceiling on an output bag's payload bytes. Only a single file
    /// larger than this may exceed it, alone in its own bag.
    pub max_size: u64,
    /// Preferred size: a bag closes once it passes this. Defaults to
    /// `max_size`.
    pub target_size: u64,
    /// Fail with `UnsatisfiableConstraint` instead of emitting an
    /// oversized single-file bag
    pub strict: bool,
    /// Paths to keep out of the member bags and place in the head bag
    pub reserve_for_head: Vec<String>,
}

impl SplitConstraints {
    /// Constraints with the given hard ceiling; target defaults to it
    pub fn new(max_size: u64) -> Self {
        Self {
            max_size,
            target_size: max_size,
            strict: false,
            reserve_for_head: Vec::new(),
        }
    }

    /// Set the preferred bag size
    pub fn with_target_size(mut self, target_size: u64) -> Self {
        self.target_size = target_size;
        self
    }

    /// Reject oversized single files instead of isolating them
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Reserve the given paths for the head bag
    pub fn with_reserved_for_head<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserve_for_head = paths.into_iter().map(Into::into).collect();
        self
    }
}

/// The prescribed contents of one output bag
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanManifest {
    /// Bag-relative paths assigned to this output bag
    pub paths: BTreeSet<String>,
    /// Total size in bytes of the assigned files
    pub total_size: u64,
}

impl PlanManifest {
    /// Assign a path of the given size to this manifest
    pub fn assign(&mut self, path: impl Into<String>, size: u64) {
        self.paths.insert(path.into());
        self.total_size += size;
    }

    /// True if the manifest holds the given path
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }
}

/// How to distribute a progenitor bag's files across output bags.
///
/// The last manifest describes the head bag. With a single manifest the one
/// output bag is simultaneously member and head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitPlan {
    manifests: Vec<PlanManifest>,
    /// Aggregation version the head bag will declare
    pub head_version: String,
    /// Prior head versions the new aggregation deprecates
    pub deprecates: Vec<Deprecation>,
}

impl SplitPlan {
    /// An empty plan at the default first version
    pub fn new() -> Self {
        Self {
            manifests: Vec::new(),
            head_version: "1".to_string(),
            deprecates: Vec::new(),
        }
    }

    /// Append an output-bag manifest; the last pushed is the head's
    pub fn push_manifest(&mut self, manifest: PlanManifest) {
        self.manifests.push(manifest);
    }

    /// The output-bag manifests, head last
    pub fn manifests(&self) -> &[PlanManifest] {
        &self.manifests
    }

    /// The head bag's manifest
    pub fn head_manifest(&self) -> Option<&PlanManifest> {
        self.manifests.last()
    }

    /// The manifest that will carry `path`, if any (the last one wins)
    pub fn find_destination(&self, path: &str) -> Option<&PlanManifest> {
        self.manifests.iter().rev().find(|m| m.contains(path))
    }

    /// Progenitor paths not yet assigned to any output bag
    pub fn missing(&self, progenitor: &Bag) -> Result<BTreeSet<String>> {
        let mut out = progenitor.non_special_files()?;
        for manifest in &self.manifests {
            for path in &manifest.paths {
                out.remove(path);
            }
        }
        Ok(out)
    }

    /// True if executing the plan replicates every progenitor file
    pub fn is_complete(&self, progenitor: &Bag) -> Result<bool> {
        Ok(self.missing(progenitor)?.is_empty())
    }

    /// Parse a plan from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the plan to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for SplitPlan {
    fn default() -> Self {
        Self::new()
    }
}
