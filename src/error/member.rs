//! Member-resolution errors

use super::MultibagError;

/// Creates an unresolvable member error
pub fn unresolvable(name: impl Into<String>) -> MultibagError {
    MultibagError::UnresolvableMember { name: name.into() }
}
