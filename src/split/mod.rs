//! Splitting a bag that exceeds a size constraint into a multibag
//! aggregation: size-driven planning strategies, output-bag naming, and
//! lazy plan execution.
//!
//! Planning and execution are separate steps. A [`Splitter`] inspects the
//! progenitor bag and produces a [`SplitPlan`]; the [`PlanExecutor`] then
//! materializes the plan one bag at a time. Splitting never touches the
//! progenitor.

pub mod executor;
pub mod naming;
pub mod neighborly;
pub mod plan;
pub mod well_packed;

pub use executor::{ExecutedBags, PlanExecutor};
pub use naming::{BagNamer, SequentialNamer};
pub use neighborly::NeighborlySplitter;
pub use plan::{PlanManifest, SplitConstraints, SplitPlan};
pub use well_packed::WellPackedSplitter;

use tracing::debug;

use crate::error::{Result, plan as plan_error};
use crate::store::Bag;

/// A planning strategy: distribute a progenitor bag's files over output
/// bags within the given constraints.
pub trait Splitter {
    /// Produce a complete plan for splitting `progenitor`
    fn plan(&self, progenitor: &Bag, constraints: &SplitConstraints) -> Result<SplitPlan>;
}

/// A file (or empty directory) eligible for assignment to an output bag
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub path: String,
    pub size: u64,
}

/// Collect the progenitor's distributable paths, largest first, ties
/// broken by ascending path. Reserved head paths are excluded; empty
/// directories participate with size zero so they replicate.
pub(crate) fn collect_candidates(
    bag: &Bag,
    constraints: &SplitConstraints,
) -> Result<Vec<Candidate>> {
    let mut out = Vec::new();
    for path in bag.non_special_files()? {
        if constraints.reserve_for_head.iter().any(|p| *p == path) {
            continue;
        }
        let size = if bag.is_dir(&path) {
            0
        } else {
            bag.file_size(&path)?
        };
        out.push(Candidate { path, size });
    }
    out.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
    Ok(out)
}

/// Close out a plan: append the reserved head manifest unless a single
/// member manifest can double as the head (the single-multibag case).
pub(crate) fn finish_plan(
    bag: &Bag,
    manifests: Vec<PlanManifest>,
    constraints: &SplitConstraints,
) -> Result<SplitPlan> {
    let mut plan = SplitPlan::new();
    for manifest in manifests {
        plan.push_manifest(manifest);
    }

    if plan.manifests().len() == 1 && constraints.reserve_for_head.is_empty() {
        debug!("plan fits in a single bag; it doubles as the head");
        return Ok(plan);
    }

    let mut head = PlanManifest::default();
    for path in &constraints.reserve_for_head {
        let size = if bag.is_file(path) {
            bag.file_size(path)?
        } else {
            0
        };
        head.assign(path.clone(), size);
    }
    plan.push_manifest(head);
    debug!(
        bags = plan.manifests().len(),
        "plan closed with reserved head manifest"
    );
    Ok(plan)
}

/// The shared oversized-file rule: a file larger than the ceiling goes in
/// a bag by itself, unless the constraints are strict.
pub(crate) fn check_oversized(candidate: &Candidate, constraints: &SplitConstraints) -> Result<()> {
    if constraints.strict && candidate.size > constraints.max_size {
        return Err(plan_error::unsatisfiable(
            &candidate.path,
            candidate.size,
            constraints.max_size,
        ));
    }
    Ok(())
}
