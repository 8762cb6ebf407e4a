//! Profile constants: version strings, tag and file names, reserved tags.

/// The Multibag profile version this crate produces
pub const MBAG_VERSION: &str = "0.4";

/// Reference URL recorded in the `Multibag-Reference` tag
pub const MBAG_REFERENCE: &str =
    "https://github.com/usnistgov/multibag-py/blob/master/docs/multibag-profile-spec.md";

/// Default name of the multibag tag directory
pub const DEFAULT_TAG_DIR: &str = "multibag";

/// Member-bags table file name (within the tag directory)
pub const MEMBER_BAGS_FILE: &str = "member-bags.tsv";

/// File-lookup table file name (within the tag directory)
pub const FILE_LOOKUP_FILE: &str = "file-lookup.tsv";

/// Deleted-paths table file name (within the tag directory)
pub const DELETED_FILE: &str = "deleted.txt";

/// Aggregation-info tag map file name (within the tag directory)
pub const AGGREGATION_INFO_FILE: &str = "aggregation-info.txt";

/// The BagIt declaration file
pub const BAGIT_FILE: &str = "bagit.txt";

/// The BagIt tag map file
pub const BAG_INFO_FILE: &str = "bag-info.txt";

/// The BagIt fetch list file
pub const FETCH_FILE: &str = "fetch.txt";

/// The payload subtree
pub const DATA_DIR: &str = "data";

/// Head-bag tag names
pub const TAG_VERSION: &str = "Multibag-Version";
pub const TAG_REFERENCE: &str = "Multibag-Reference";
pub const TAG_TAG_DIR: &str = "Multibag-Tag-Directory";
pub const TAG_HEAD_VERSION: &str = "Multibag-Head-Version";
pub const TAG_HEAD_DEPRECATES: &str = "Multibag-Head-Deprecates";

/// Sender identity tags rewritten when a bag is split
pub const TAG_INTERNAL_SENDER_ID: &str = "Internal-Sender-Identifier";
pub const TAG_SOURCE_INTERNAL_SENDER_ID: &str = "Multibag-Source-Internal-Sender-Identifier";

/// The rebagging timestamp tag set on a combined bag
pub const TAG_BAGGING_DATE: &str = "Bagging-Date";

/// Tag names recomputed for a combined bag and therefore stripped after merging,
/// together with every name prefixed `Multibag-`.
pub const RESERVED_TAGS: &[&str] = &["Bag-Count", "Payload-Oxum", "Bag-Size"];

/// Prefix identifying profile-owned tag names
pub const MBAG_TAG_PREFIX: &str = "Multibag-";

/// Returns true if the tag name is reserved for recomputation (never merged through)
pub fn is_reserved_tag(name: &str) -> bool {
    RESERVED_TAGS.contains(&name) || name.starts_with(MBAG_TAG_PREFIX)
}

/// Returns true for the special BagIt files that are merged by rule rather than
/// overlaid: the declaration, the tag map, the fetch list, and the manifests.
pub fn is_special_file(path: &str) -> bool {
    match path {
        BAGIT_FILE | BAG_INFO_FILE | FETCH_FILE => true,
        _ => is_manifest_file(path) || is_tag_manifest_file(path),
    }
}

/// Returns true for `manifest-<alg>.txt` at the bag root
pub fn is_manifest_file(path: &str) -> bool {
    manifest_algorithm(path, "manifest-").is_some()
}

/// Returns true for `tagmanifest-<alg>.txt` at the bag root
pub fn is_tag_manifest_file(path: &str) -> bool {
    manifest_algorithm(path, "tagmanifest-").is_some()
}

/// Extracts the algorithm name from a root-level manifest file name with the
/// given prefix, e.g. `manifest_algorithm("manifest-sha256.txt", "manifest-")`
/// yields `Some("sha256")`.
pub fn manifest_algorithm<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    let alg = rest.strip_suffix(".txt")?;
    if alg.is_empty() || !alg.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(alg)
}
