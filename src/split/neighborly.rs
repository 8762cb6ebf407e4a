//! The neighborly strategy: like well-packed, but keeps files from the
//! same directory subtree together in the same output bag.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::split::{
    Candidate, PlanManifest, SplitConstraints, SplitPlan, Splitter, check_oversized,
    collect_candidates, finish_plan,
};
use crate::store::Bag;

/// Packs directory neighborhoods together while honoring the same size
/// rules as [`WellPackedSplitter`](crate::split::WellPackedSplitter).
///
/// Each new bag starts from the largest remaining file and is filled from
/// that file's directory first, then from the other directories in sorted
/// rotation starting just past it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeighborlySplitter;

impl NeighborlySplitter {
    pub fn new() -> Self {
        Self
    }

    fn pack(
        &self,
        mut candidates: Vec<Candidate>,
        constraints: &SplitConstraints,
    ) -> Result<Vec<PlanManifest>> {
        let mut manifests = Vec::new();

        while !candidates.is_empty() {
            let mut open = PlanManifest::default();
            for dir in dir_rotation(&candidates) {
                let closed = select_from_dir(&mut candidates, &mut open, &dir, constraints)?;
                if closed {
                    break;
                }
            }
            manifests.push(open);
        }
        Ok(manifests)
    }
}

impl Splitter for NeighborlySplitter {
    fn plan(&self, progenitor: &Bag, constraints: &SplitConstraints) -> Result<SplitPlan> {
        let candidates = collect_candidates(progenitor, constraints)?;
        let manifests = self.pack(candidates, constraints)?;
        finish_plan(progenitor, manifests, constraints)
    }
}

/// The directory of a bag-relative path, trailing slash included;
/// top-level paths map to the empty string
fn dir_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "",
    }
}

/// All candidate directories in sorted order, rotated so the directory of
/// the largest remaining file comes first
fn dir_rotation(candidates: &[Candidate]) -> Vec<String> {
    let ref_dir = dir_of(&candidates[0].path);
    let dirs: BTreeSet<&str> = candidates.iter().map(|c| dir_of(&c.path)).collect();
    let mut out: Vec<String> = dirs.into_iter().map(ToString::to_string).collect();
    if let Some(pos) = out.iter().position(|d| d == ref_dir) {
        out.rotate_left(pos);
    }
    out
}

/// Move files from `dir` into the open manifest until it closes or the
/// directory has nothing left that fits. Returns true when the manifest
/// closed.
fn select_from_dir(
    candidates: &mut Vec<Candidate>,
    open: &mut PlanManifest,
    dir: &str,
    constraints: &SplitConstraints,
) -> Result<bool> {
    let mut i = 0;
    while i < candidates.len() {
        if dir_of(&candidates[i].path) != dir {
            i += 1;
            continue;
        }
        let new_size = open.total_size + candidates[i].size;
        if new_size > constraints.max_size {
            if open.total_size == 0 {
                // the file alone exceeds the ceiling
                check_oversized(&candidates[i], constraints)?;
                let c = candidates.remove(i);
                open.assign(c.path, c.size);
                return Ok(true);
            }
            // look for a smaller file in the same directory
            i += 1;
        } else {
            let c = candidates.remove(i);
            open.assign(c.path, c.size);
            if new_size > constraints.target_size {
                return Ok(true);
            }
        }
    }
    Ok(false)
}
