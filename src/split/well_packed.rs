//! The well-packed strategy: minimize the number of output bags by
//! first-fit packing of the largest remaining files.

use crate::error::Result;
use crate::split::{
    Candidate, PlanManifest, SplitConstraints, SplitPlan, Splitter, check_oversized,
    collect_candidates, finish_plan,
};
use crate::store::Bag;

/// Packs files largest-first into as few bags as possible.
///
/// A bag accepts files until adding one would pass the target size, then
/// closes; a file that would break the hard ceiling is skipped in favor of
/// the next smaller one. A single file larger than the ceiling gets a bag
/// of its own (or fails the plan under strict constraints).
#[derive(Debug, Clone, Copy, Default)]
pub struct WellPackedSplitter;

impl WellPackedSplitter {
    pub fn new() -> Self {
        Self
    }

    fn pack(
        &self,
        mut candidates: Vec<Candidate>,
        constraints: &SplitConstraints,
    ) -> Result<Vec<PlanManifest>> {
        let mut manifests = Vec::new();
        let mut open = PlanManifest::default();
        let mut i = 0;

        while !candidates.is_empty() {
            if i >= candidates.len() {
                // nothing left fits in the open bag
                manifests.push(std::mem::take(&mut open));
                i = 0;
                continue;
            }

            let new_size = open.total_size + candidates[i].size;
            if new_size > constraints.max_size {
                if open.total_size == 0 {
                    // the file alone exceeds the ceiling
                    check_oversized(&candidates[i], constraints)?;
                    let c = candidates.remove(i);
                    open.assign(c.path, c.size);
                    manifests.push(std::mem::take(&mut open));
                    i = 0;
                } else {
                    // look for a smaller file
                    i += 1;
                }
            } else {
                let c = candidates.remove(i);
                open.assign(c.path, c.size);
                if new_size > constraints.target_size {
                    manifests.push(std::mem::take(&mut open));
                    i = 0;
                }
            }
        }
        if !open.paths.is_empty() {
            manifests.push(open);
        }
        Ok(manifests)
    }
}

impl Splitter for WellPackedSplitter {
    fn plan(&self, progenitor: &Bag, constraints: &SplitConstraints) -> Result<SplitPlan> {
        let candidates = collect_candidates(progenitor, constraints)?;
        let manifests = self.pack(candidates, constraints)?;
        finish_plan(progenitor, manifests, constraints)
    }
}
