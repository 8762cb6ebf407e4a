//! Multibag - split and recombine BagIt bags
//!
//! An implementation of the Multibag BagIt profile: a bag too large to
//! handle as one package is split into an aggregation of smaller member
//! bags, headed by a head bag that records the membership, a payload
//! lookup, and version history. The same aggregation can later be
//! recombined into the original bag, or superseded non-destructively by
//! an amended version.
//!
//! The pieces:
//! - [`store`]: directory-backed bags, read ([`store::Bag`]) and staged
//!   write ([`store::BagBuilder`])
//! - [`model`]: the head bag's tag-directory tables and aggregation
//!   resolution
//! - [`split`]: planning strategies, output naming, and lazy plan
//!   execution
//! - [`combine`]: sequential overlay of an aggregation into one bag
//! - [`amend`]: versioned updates and single-bag conversion
//! - [`validate`]: advisory profile compliance checks

pub mod amend;
pub mod combine;
pub mod constants;
pub mod error;
pub mod model;
pub mod split;
pub mod store;
pub mod validate;

pub use amend::{Amender, Amendment, SingleMultibagMaker};
pub use combine::{BagCombiner, combine_bag};
pub use error::{MultibagError, Result};
pub use model::{Aggregation, DirResolver, HeadBag, MemberRecord, MemberResolver, is_head_bag};
pub use split::{
    BagNamer, NeighborlySplitter, PlanExecutor, SequentialNamer, SplitConstraints, SplitPlan,
    Splitter, WellPackedSplitter,
};
pub use store::{Bag, BagBuilder};
pub use validate::{Severity, ValidationIssue, ValidationResults, validate_head_bag};
