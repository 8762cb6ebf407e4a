//! Multibag tag-directory errors

use super::MultibagError;

/// Creates a malformed tag-directory file error with line context
pub fn malformed(
    file: impl Into<String>,
    line: usize,
    reason: impl Into<String>,
) -> MultibagError {
    MultibagError::MalformedTagDirectory {
        file: file.into(),
        line,
        reason: reason.into(),
    }
}

/// Creates a reserved tag conflict error
pub fn reserved_conflict(name: impl Into<String>) -> MultibagError {
    MultibagError::ReservedTagConflict { name: name.into() }
}

/// Creates a member ordering violation error
pub fn ordering_violation(message: impl Into<String>) -> MultibagError {
    MultibagError::OrderingViolation {
        message: message.into(),
    }
}

/// Creates a missing multibag tag file error
pub fn missing_file(file: impl Into<String>) -> MultibagError {
    MultibagError::MissingMultibagFile { file: file.into() }
}

/// Creates a missing required info tag error
pub fn missing_tag(name: impl Into<String>) -> MultibagError {
    MultibagError::MissingTag { name: name.into() }
}
