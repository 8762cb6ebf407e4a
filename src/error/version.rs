//! Aggregation-version errors

use super::MultibagError;

/// Creates an invalid aggregation version error
pub fn invalid(version: impl Into<String>, reason: impl Into<String>) -> MultibagError {
    MultibagError::InvalidVersion {
        version: version.into(),
        reason: reason.into(),
    }
}
