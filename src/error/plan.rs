//! Split-planning and execution errors

use super::MultibagError;

/// Creates an unsatisfiable size-constraint error
pub fn unsatisfiable(path: impl Into<String>, size: u64, limit: u64) -> MultibagError {
    MultibagError::UnsatisfiableConstraint {
        path: path.into(),
        size,
        limit,
    }
}

/// Creates an output-name collision error
pub fn collision(name: impl Into<String>) -> MultibagError {
    MultibagError::NameCollision { name: name.into() }
}
