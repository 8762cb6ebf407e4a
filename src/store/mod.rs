//! Package Store wrapper: uniform read/write access to a bag's files, its
//! tag metadata, and its checksum manifests.
//!
//! Only directory-backed bags are handled here; unpacking a serialized bag
//! is an outer concern and happens before [`Bag::open`] sees the path.

pub mod bag;
pub mod builder;
pub mod manifest;
pub mod tags;

pub use bag::{Bag, FetchEntry};
pub use builder::BagBuilder;
pub use manifest::{ManifestSet, compute_digest, format_bag_size, is_supported_algorithm};
pub use tags::TagMap;
