//! Read access to a directory-backed bag.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::constants::{
    self, BAG_INFO_FILE, BAGIT_FILE, DATA_DIR, FETCH_FILE,
};
use crate::error::{Result, store};
use crate::store::manifest::{self, ManifestSet};
use crate::store::tags::TagMap;

/// One `fetch.txt` entry: `URL LENGTH PATH` (length may be `-`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchEntry {
    pub url: String,
    pub length: Option<u64>,
    pub path: String,
}

impl FetchEntry {
    /// Format as a `fetch.txt` line without the trailing newline
    pub fn format_line(&self) -> String {
        let length = self
            .length
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        format!("{} {} {}", self.url, length, self.path)
    }
}

/// A bag rooted at a local directory, opened read-only.
///
/// All bag-relative paths use `/` as the separator regardless of platform;
/// they are converted to native paths only at the file-system boundary.
#[derive(Debug, Clone)]
pub struct Bag {
    root: PathBuf,
    name: String,
    info: TagMap,
    payload_manifests: ManifestSet,
    tag_manifests: ManifestSet,
    fetch: Vec<FetchEntry>,
}

impl Bag {
    /// Open the bag rooted at `path`. The directory must exist and carry a
    /// `bagit.txt` declaration.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(store::not_found(path));
        }
        if !path.join(BAGIT_FILE).is_file() {
            return Err(store::not_a_bag(path));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| store::not_found(path))?;

        let info_path = path.join(BAG_INFO_FILE);
        let info = if info_path.is_file() {
            let text = read_text_at(&info_path)?;
            TagMap::parse(&text, BAG_INFO_FILE)?
        } else {
            TagMap::new()
        };

        let mut bag = Self {
            root: path.to_path_buf(),
            name,
            info,
            payload_manifests: ManifestSet::new(),
            tag_manifests: ManifestSet::new(),
            fetch: Vec::new(),
        };
        bag.load_manifests()?;
        bag.load_fetch()?;
        Ok(bag)
    }

    fn load_manifests(&mut self) -> Result<()> {
        for entry in fs::read_dir(&self.root).map_err(|e| store::read_failed(&self.root, &e))? {
            let entry = entry.map_err(|e| store::read_failed(&self.root, &e))?;
            if !entry.path().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if let Some(alg) = constants::manifest_algorithm(&file_name, "manifest-") {
                let text = read_text_at(&entry.path())?;
                self.payload_manifests
                    .insert(alg.to_string(), manifest::parse_manifest(&text, &file_name)?);
            } else if let Some(alg) = constants::manifest_algorithm(&file_name, "tagmanifest-") {
                let text = read_text_at(&entry.path())?;
                self.tag_manifests
                    .insert(alg.to_string(), manifest::parse_manifest(&text, &file_name)?);
            }
        }
        Ok(())
    }

    fn load_fetch(&mut self) -> Result<()> {
        let fetch_path = self.root.join(FETCH_FILE);
        if !fetch_path.is_file() {
            return Ok(());
        }
        for raw in read_text_at(&fetch_path)?.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let mut rest = line;
            let url = take_field(&mut rest).to_string();
            let length = take_field(&mut rest).parse().ok();
            let path = rest.to_string();
            if !path.is_empty() {
                self.fetch.push(FetchEntry { url, length, path });
            }
        }
        Ok(())
    }

    /// The bag's name: its root directory name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bag's root directory
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// The bag's tag map (`bag-info.txt`)
    pub fn info(&self) -> &TagMap {
        &self.info
    }

    /// Payload manifest entries, per algorithm
    pub fn payload_manifests(&self) -> &ManifestSet {
        &self.payload_manifests
    }

    /// Tag manifest entries, per algorithm
    pub fn tag_manifests(&self) -> &ManifestSet {
        &self.tag_manifests
    }

    /// The bag's fetch entries, in file order
    pub fn fetch(&self) -> &[FetchEntry] {
        &self.fetch
    }

    /// The recorded digest for a path under the given algorithm, from the
    /// payload manifest for `data/` paths and the tag manifest otherwise
    pub fn checksum(&self, path: &str, algorithm: &str) -> Option<&str> {
        let set = if is_payload_path(path) {
            &self.payload_manifests
        } else {
            &self.tag_manifests
        };
        set.get(algorithm)
            .and_then(|entries| entries.get(path))
            .map(String::as_str)
    }

    /// Every file in the bag, as sorted bag-relative paths
    pub fn files(&self) -> Result<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| store::io_error(e.to_string()))?;
            if entry.file_type().is_file() {
                if let Some(rel) = self.relativize(entry.path()) {
                    out.insert(rel);
                }
            }
        }
        Ok(out)
    }

    /// Every payload file (under `data/`), sorted
    pub fn payload_files(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .files()?
            .into_iter()
            .filter(|p| is_payload_path(p))
            .collect())
    }

    /// Every file that is not one of the special BagIt files, plus any empty
    /// directory (so it can be replicated into an output bag)
    pub fn non_special_files(&self) -> Result<BTreeSet<String>> {
        let mut out = BTreeSet::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| store::io_error(e.to_string()))?;
            let Some(rel) = self.relativize(entry.path()) else {
                continue;
            };
            if entry.file_type().is_file() {
                if !constants::is_special_file(&rel) {
                    out.insert(rel);
                }
            } else if entry.file_type().is_dir() && dir_is_empty(entry.path())? {
                out.insert(rel);
            }
        }
        Ok(out)
    }

    /// The size in bytes of the file at the bag-relative path
    pub fn file_size(&self, path: &str) -> Result<u64> {
        let native = self.native_path(path)?;
        let meta = fs::metadata(&native).map_err(|e| store::read_failed(&native, &e))?;
        Ok(meta.len())
    }

    /// True if the bag-relative path exists
    pub fn exists(&self, path: &str) -> bool {
        self.native_path(path).map(|p| p.exists()).unwrap_or(false)
    }

    /// True if the bag-relative path exists as a file
    pub fn is_file(&self, path: &str) -> bool {
        self.native_path(path).map(|p| p.is_file()).unwrap_or(false)
    }

    /// True if the bag-relative path exists as a directory
    pub fn is_dir(&self, path: &str) -> bool {
        self.native_path(path).map(|p| p.is_dir()).unwrap_or(false)
    }

    /// Read the file at the bag-relative path as UTF-8 text
    pub fn read_text(&self, path: &str) -> Result<String> {
        let native = self.native_path(path)?;
        read_text_at(&native)
    }

    /// Total payload octets and file count, the `Payload-Oxum` pair
    pub fn payload_oxum(&self) -> Result<(u64, usize)> {
        let mut octets = 0;
        let mut count = 0;
        for path in self.payload_files()? {
            octets += self.file_size(&path)?;
            count += 1;
        }
        Ok((octets, count))
    }

    /// Resolve a bag-relative `/`-delimited path into a native path,
    /// rejecting anything that would escape the bag root
    pub fn native_path(&self, path: &str) -> Result<PathBuf> {
        join_relative(&self.root, path)
            .ok_or_else(|| store::io_error(format!("path escapes bag root: {path}")))
    }

    fn relativize(&self, native: &Path) -> Option<String> {
        let rel = native.strip_prefix(&self.root).ok()?;
        if rel.as_os_str().is_empty() {
            return None;
        }
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

/// True if the path lies in the payload subtree
pub fn is_payload_path(path: &str) -> bool {
    path == DATA_DIR || path.starts_with("data/")
}

/// Join a `/`-delimited bag-relative path onto a root directory, refusing
/// absolute paths and parent-directory components
pub fn join_relative(root: &Path, path: &str) -> Option<PathBuf> {
    if path.starts_with('/') {
        return None;
    }
    let mut out = root.to_path_buf();
    for part in path.split('/') {
        if part.is_empty() || part == "." || part == ".." {
            return None;
        }
        out.push(part);
    }
    Some(out)
}

/// Split the leading whitespace-delimited field off `rest`, leaving the
/// remainder with its leading whitespace trimmed
fn take_field<'a>(rest: &mut &'a str) -> &'a str {
    let line = *rest;
    match line.find(char::is_whitespace) {
        Some(end) => {
            *rest = line[end..].trim_start();
            &line[..end]
        }
        None => {
            *rest = "";
            line
        }
    }
}

fn dir_is_empty(path: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(path).map_err(|e| store::read_failed(path, &e))?;
    Ok(entries.next().is_none())
}

pub(crate) fn read_text_at(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| store::read_failed(path, &e))
}
