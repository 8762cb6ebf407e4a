//! Common test utilities for Multibag integration tests

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::TempDir;

/// A sandbox directory holding the bags a test works with
#[allow(dead_code)]
pub struct TestStore {
    /// Temporary directory
    #[allow(dead_code)]
    pub temp: TempDir,
    /// Path to the store root
    pub path: PathBuf,
}

#[allow(dead_code)]
impl TestStore {
    /// Create a new empty store
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        Self { temp, path }
    }

    /// Path to a bag inside the store
    pub fn bag_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Create a complete bag with the given payload files, including a
    /// matching sha256 manifest and Payload-Oxum
    pub fn create_bag(&self, name: &str, payload: &[(&str, &[u8])]) -> PathBuf {
        let root = self.bag_path(name);
        fs::create_dir_all(root.join("data")).expect("Failed to create bag directories");
        fs::write(
            root.join("bagit.txt"),
            "BagIt-Version: 1.0\nTag-File-Character-Encoding: UTF-8\n",
        )
        .expect("Failed to write bagit.txt");

        let mut manifest = String::new();
        let mut octets = 0u64;
        for (path, bytes) in payload {
            assert!(path.starts_with("data/"), "payload paths live under data/");
            let native = root.join(path);
            if let Some(parent) = native.parent() {
                fs::create_dir_all(parent).expect("Failed to create payload directory");
            }
            fs::write(&native, bytes).expect("Failed to write payload file");
            manifest.push_str(&format!("{} {path}\n", sha256_hex(bytes)));
            octets += bytes.len() as u64;
        }
        fs::write(root.join("manifest-sha256.txt"), manifest)
            .expect("Failed to write manifest");
        fs::write(
            root.join("bag-info.txt"),
            format!(
                "Source-Organization: Example Research Institute\n\
                 Internal-Sender-Identifier: {name}\n\
                 Payload-Oxum: {octets}.{}\n",
                payload.len()
            ),
        )
        .expect("Failed to write bag-info.txt");
        root
    }

    /// Write a file inside a bag that already exists
    pub fn write_file(&self, bag: &str, path: &str, content: &str) {
        let native = self.bag_path(bag).join(path);
        if let Some(parent) = native.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&native, content).expect("Failed to write file");
    }

    /// Read a file from a bag
    pub fn read_file(&self, bag: &str, path: &str) -> String {
        fs::read_to_string(self.bag_path(bag).join(path)).expect("Failed to read file")
    }

    /// True if the path exists inside the bag
    pub fn file_exists(&self, bag: &str, path: &str) -> bool {
        self.bag_path(bag).join(path).exists()
    }
}

/// Promote an existing bag to the head of an aggregation: appends the
/// head tags to its info and writes the membership tables. `members`
/// must already list this bag last.
#[allow(dead_code)]
pub fn promote_to_head(
    bag_root: &Path,
    version: &str,
    members: &[&str],
    lookup: &[(&str, &str)],
    deleted: &[&str],
) {
    let info = bag_root.join("bag-info.txt");
    let mut text = fs::read_to_string(&info).unwrap_or_default();
    text.push_str(&format!(
        "Multibag-Version: 0.4\nMultibag-Tag-Directory: multibag\nMultibag-Head-Version: {version}\n"
    ));
    fs::write(&info, text).expect("Failed to update bag-info.txt");

    let tag_dir = bag_root.join("multibag");
    fs::create_dir_all(&tag_dir).expect("Failed to create tag directory");
    let member_lines: String = members.iter().map(|m| format!("{m}\n")).collect();
    fs::write(tag_dir.join("member-bags.tsv"), member_lines)
        .expect("Failed to write member-bags.tsv");
    let lookup_lines: String = lookup
        .iter()
        .map(|(path, bag)| format!("{path}\t{bag}\n"))
        .collect();
    fs::write(tag_dir.join("file-lookup.tsv"), lookup_lines)
        .expect("Failed to write file-lookup.tsv");
    if !deleted.is_empty() {
        let deleted_lines: String = deleted.iter().map(|p| format!("{p}\n")).collect();
        fs::write(tag_dir.join("deleted.txt"), deleted_lines)
            .expect("Failed to write deleted.txt");
    }
}

/// Hex sha256 of a byte string
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// A payload of `count` files of `size` bytes each, with distinct content
#[allow(dead_code)]
pub fn uniform_payload(count: usize, size: usize) -> Vec<(String, Vec<u8>)> {
    (0..count)
        .map(|i| {
            let path = format!("data/f{i:02}.bin");
            let byte = u8::try_from(i).expect("payload index fits a byte");
            (path, vec![byte; size])
        })
        .collect()
}

/// Borrow an owned payload in the shape `create_bag` takes
#[allow(dead_code)]
pub fn as_refs(payload: &[(String, Vec<u8>)]) -> Vec<(&str, &[u8])> {
    payload
        .iter()
        .map(|(p, b)| (p.as_str(), b.as_slice()))
        .collect()
}

/// Every `data/` file in the bag, with content, sorted by path
#[allow(dead_code)]
pub fn payload_snapshot(bag_root: &Path) -> Vec<(String, Vec<u8>)> {
    let data = bag_root.join("data");
    let mut out = Vec::new();
    if !data.is_dir() {
        return out;
    }
    for entry in walkdir::WalkDir::new(&data).sort_by_file_name() {
        let entry = entry.expect("Failed to walk payload");
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(bag_root)
            .expect("payload path under bag root")
            .to_string_lossy()
            .replace('\\', "/");
        let bytes = fs::read(entry.path()).expect("Failed to read payload file");
        out.push((rel, bytes));
    }
    out.sort();
    out
}
