//! Package-store (file system) errors

use std::path::Path;

use super::MultibagError;

/// Creates a not-a-bag error for a path missing its bagit.txt declaration
pub fn not_a_bag(path: &Path) -> MultibagError {
    MultibagError::NotABag {
        path: path.display().to_string(),
    }
}

/// Creates a bag not found error
pub fn not_found(path: &Path) -> MultibagError {
    MultibagError::BagNotFound {
        path: path.display().to_string(),
    }
}

/// Creates a file read failure error
pub fn read_failed(path: &Path, err: &std::io::Error) -> MultibagError {
    MultibagError::FileReadFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Creates a file write failure error
pub fn write_failed(path: &Path, err: &std::io::Error) -> MultibagError {
    MultibagError::FileWriteFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Creates a generic IO error
pub fn io_error(message: impl Into<String>) -> MultibagError {
    MultibagError::IoError {
        message: message.into(),
    }
}
