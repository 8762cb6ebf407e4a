//! The aggregation model: the entities recorded in a head bag's tag
//! directory and their parsing/serialization, plus aggregation resolution.

pub mod aggregation;
pub mod deleted;
pub mod headbag;
pub mod lookup;
pub mod member;

pub use aggregation::{Aggregation, DirResolver, MemberResolver, sibling_resolver};
pub use headbag::{Deprecation, HeadBag, is_head_bag};
pub use lookup::FileLookup;
pub use member::{MemberRecord, validate_bag_name};
