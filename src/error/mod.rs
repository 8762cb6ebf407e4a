//! Error types and handling for Multibag
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`name`]: Bag-name errors
//! - [`plan`]: Split-planning and execution errors
//! - [`member`]: Member-resolution errors
//! - [`tagdir`]: Multibag tag-directory errors
//! - [`version`]: Aggregation-version errors
//! - [`store`]: Package-store (file system) errors

pub mod member;
pub mod name;
pub mod plan;
pub mod store;
pub mod tagdir;
pub mod version;

// Re-export convenience constructors from submodules
#[allow(unused_imports)]
pub use member::unresolvable as unresolvable_member;
#[allow(unused_imports)]
pub use name::invalid as invalid_name;
#[allow(unused_imports)]
pub use plan::{collision as name_collision, unsatisfiable as unsatisfiable_constraint};
#[allow(unused_imports)]
pub use store::{
    io_error, not_a_bag, not_found as bag_not_found, read_failed as file_read_failed,
    write_failed as file_write_failed,
};
#[allow(unused_imports)]
pub use tagdir::{
    malformed as malformed_tag_directory, missing_file as missing_multibag_file,
    ordering_violation, reserved_conflict as reserved_tag_conflict,
};
#[allow(unused_imports)]
pub use version::invalid as invalid_version;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for Multibag operations
#[derive(Error, Diagnostic, Debug)]
pub enum MultibagError {
    // Name errors
    #[error("Invalid bag name '{name}': {reason}")]
    #[diagnostic(
        code(multibag::name::invalid),
        help("Bag names must not contain TAB characters or leading/trailing whitespace")
    )]
    InvalidName { name: String, reason: String },

    // Planning errors
    #[error("File '{path}' ({size} bytes) exceeds the output bag size limit of {limit} bytes")]
    #[diagnostic(
        code(multibag::plan::unsatisfiable),
        help(
            "Raise the size limit, or disable strict mode to place the file alone in an oversized bag"
        )
    )]
    UnsatisfiableConstraint { path: String, size: u64, limit: u64 },

    #[error("Output bag '{name}' already exists with different contents")]
    #[diagnostic(
        code(multibag::plan::name_collision),
        help("Remove the conflicting bag or choose a different name basis")
    )]
    NameCollision { name: String },

    // Member errors
    #[error("Member bag '{name}' could not be resolved")]
    #[diagnostic(
        code(multibag::member::unresolvable),
        help("Check that the member bag exists in the component directory or provide a resolver that can retrieve it")
    )]
    UnresolvableMember { name: String },

    // Tag-directory errors
    #[error("Malformed line {line} in {file}: {reason}")]
    #[diagnostic(code(multibag::tagdir::malformed))]
    MalformedTagDirectory {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("Reserved tag '{name}' reintroduced by aggregation-info")]
    #[diagnostic(
        code(multibag::tagdir::reserved_conflict),
        help("Remove the reserved tag; it is recomputed for the combined bag")
    )]
    ReservedTagConflict { name: String },

    #[error("Member ordering violation: {message}")]
    #[diagnostic(
        code(multibag::tagdir::ordering_violation),
        help("The head bag must be the last entry in member-bags.tsv and preserved member order must not change")
    )]
    OrderingViolation { message: String },

    #[error("Missing multibag tag file: {file}")]
    #[diagnostic(code(multibag::tagdir::missing_file))]
    MissingMultibagFile { file: String },

    #[error("Missing required '{name}' info tag")]
    #[diagnostic(code(multibag::tagdir::missing_tag))]
    MissingTag { name: String },

    // Amendment errors
    #[error("Invalid head version '{version}': {reason}")]
    #[diagnostic(
        code(multibag::amend::invalid_version),
        help("Every head bag version must be unique across the aggregation's history")
    )]
    InvalidVersion { version: String, reason: String },

    // Package-store errors
    #[error("Not a bag (missing bagit.txt): {path}")]
    #[diagnostic(code(multibag::store::not_a_bag))]
    NotABag { path: String },

    #[error("Bag not found: {path}")]
    #[diagnostic(code(multibag::store::not_found))]
    BagNotFound { path: String },

    #[error("Failed to read file: {path}")]
    #[diagnostic(code(multibag::store::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}")]
    #[diagnostic(code(multibag::store::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(multibag::store::io_error))]
    IoError { message: String },
}

impl From<std::io::Error> for MultibagError {
    fn from(err: std::io::Error) -> Self {
        MultibagError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for MultibagError {
    fn from(err: serde_json::Error) -> Self {
        MultibagError::IoError {
            message: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, MultibagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MultibagError::UnresolvableMember {
            name: "samplebag_2".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Member bag 'samplebag_2' could not be resolved"
        );
    }

    #[test]
    fn test_error_code() {
        let err = invalid_name("bad\tname", "embedded TAB");
        assert_eq!(
            err.code().map(|c| c.to_string()),
            Some("multibag::name::invalid".to_string())
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MultibagError = io_err.into();
        assert!(matches!(err, MultibagError::IoError { .. }));
    }

    #[test]
    fn test_malformed_tag_directory_context() {
        let err = malformed_tag_directory("multibag/file-lookup.tsv", 7, "missing bagname field");
        let msg = err.to_string();
        assert!(msg.contains("line 7"));
        assert!(msg.contains("file-lookup.tsv"));
    }

    #[test]
    fn test_unsatisfiable_constraint() {
        let err = unsatisfiable_constraint("data/huge.dat", 5000, 2000);
        assert!(matches!(
            err,
            MultibagError::UnsatisfiableConstraint { size: 5000, .. }
        ));
        assert!(err.to_string().contains("data/huge.dat"));
    }

    #[test]
    fn test_name_collision() {
        let err = name_collision("samplebag_1");
        assert!(matches!(err, MultibagError::NameCollision { .. }));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_ordering_violation() {
        let err = ordering_violation("head bag is not the last member");
        assert!(matches!(err, MultibagError::OrderingViolation { .. }));
    }

    #[test]
    fn test_reserved_tag_conflict() {
        let err = reserved_tag_conflict("Payload-Oxum");
        assert!(err.to_string().contains("Payload-Oxum"));
    }
}
