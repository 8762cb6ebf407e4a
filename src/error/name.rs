//! Bag-name errors

use super::MultibagError;

/// Creates an invalid bag name error
pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> MultibagError {
    MultibagError::InvalidName {
        name: name.into(),
        reason: reason.into(),
    }
}
