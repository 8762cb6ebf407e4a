//! Staged construction of a new bag.
//!
//! A builder writes every file under `parent/.{name}.part` and only renames
//! the staging directory to its final name in [`BagBuilder::finalize`], so a
//! half-written bag can never be opened as a complete one. A failed build
//! leaves the staging directory in place for the caller to inspect or retry;
//! finished bags are never touched.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::{BAG_INFO_FILE, DATA_DIR, FETCH_FILE};
use crate::error::{Result, store};
use crate::store::bag::{Bag, FetchEntry, is_payload_path, join_relative};
use crate::store::manifest::{
    self, DEFAULT_ALGORITHM, ManifestSet, compute_digest, format_bag_size, is_supported_algorithm,
};
use crate::store::tags::TagMap;

/// Write half of the Package Store: builds one new bag under a staging name
#[derive(Debug)]
pub struct BagBuilder {
    staging: PathBuf,
    final_path: PathBuf,
    name: String,
    info: TagMap,
    payload_manifests: ManifestSet,
    tag_manifests: ManifestSet,
    fetch: Vec<FetchEntry>,
    /// tag files copied in verbatim; recorded digests stay valid
    copied_tag_files: BTreeSet<String>,
    /// tag files this builder wrote itself; digests must be recomputed
    rewritten_tag_files: BTreeSet<String>,
}

impl BagBuilder {
    /// Start building `parent/name`. Any stale staging directory from an
    /// earlier failed build of the same name is cleared first.
    pub fn create(parent: &Path, name: &str) -> Result<Self> {
        let staging = parent.join(format!(".{name}.part"));
        let final_path = parent.join(name);
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| store::write_failed(&staging, &e))?;
        }
        fs::create_dir_all(&staging).map_err(|e| store::write_failed(&staging, &e))?;
        debug!(bag = name, staging = %staging.display(), "staging new bag");
        Ok(Self {
            staging,
            final_path,
            name: name.to_string(),
            info: TagMap::new(),
            payload_manifests: ManifestSet::new(),
            tag_manifests: ManifestSet::new(),
            fetch: Vec::new(),
            copied_tag_files: BTreeSet::new(),
            rewritten_tag_files: BTreeSet::new(),
        })
    }

    /// The name the finished bag will carry
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The staging directory files are being written into
    pub fn staging_path(&self) -> &Path {
        &self.staging
    }

    /// Mutable access to the bag's tag map
    pub fn info_mut(&mut self) -> &mut TagMap {
        &mut self.info
    }

    /// Replace the bag's tag map
    pub fn set_info(&mut self, info: TagMap) {
        self.info = info;
    }

    /// Replace the bag's fetch entries
    pub fn set_fetch(&mut self, fetch: Vec<FetchEntry>) {
        self.fetch = fetch;
    }

    /// Replace all payload manifest entries
    pub fn set_payload_manifests(&mut self, manifests: ManifestSet) {
        self.payload_manifests = manifests;
    }

    /// Replace all tag manifest entries
    pub fn set_tag_manifests(&mut self, manifests: ManifestSet) {
        self.tag_manifests = manifests;
    }

    /// Record a digest for a path, routed to the payload manifest for
    /// `data/` paths and the tag manifest otherwise
    pub fn record_checksum(&mut self, path: &str, algorithm: &str, digest: &str) {
        let set = if is_payload_path(path) {
            &mut self.payload_manifests
        } else {
            &mut self.tag_manifests
        };
        set.entry(algorithm.to_string())
            .or_default()
            .insert(path.to_string(), digest.to_string());
    }

    /// Write bytes to a bag-relative path, creating parent directories
    pub fn put_file(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        let native = self.native(path)?;
        ensure_parent(&native)?;
        fs::write(&native, bytes).map_err(|e| store::write_failed(&native, &e))?;
        if !is_payload_path(path) {
            self.rewritten_tag_files.insert(path.to_string());
        }
        Ok(())
    }

    /// Write a tag file the builder owns (digests recomputed at finalize)
    pub fn write_tag_file(&mut self, path: &str, content: &str) -> Result<()> {
        self.put_file(path, content.as_bytes())
    }

    /// Replicate a file (or empty directory) from a source bag into the same
    /// bag-relative location, preserving directory structure
    pub fn copy_file_from(&mut self, src: &Bag, path: &str) -> Result<()> {
        let dest = self.native(path)?;
        if src.is_dir(path) {
            fs::create_dir_all(&dest).map_err(|e| store::write_failed(&dest, &e))?;
            return Ok(());
        }
        let src_native = src.native_path(path)?;
        ensure_parent(&dest)?;
        fs::copy(&src_native, &dest).map_err(|e| store::write_failed(&dest, &e))?;
        if !is_payload_path(path) {
            self.copied_tag_files.insert(path.to_string());
        }
        Ok(())
    }

    /// True if the staged bag already holds the given path
    pub fn has_file(&self, path: &str) -> bool {
        self.native(path).map(|p| p.exists()).unwrap_or(false)
    }

    /// Write the tag map, fetch list, and manifests, then atomically rename
    /// the staging directory to its final name and open the finished bag
    pub fn finalize(mut self) -> Result<Bag> {
        let (octets, count) = self.staged_payload_oxum()?;
        self.info.set("Payload-Oxum", format!("{octets}.{count}"));

        if !self.fetch.is_empty() {
            let lines: String = self
                .fetch
                .iter()
                .map(|e| format!("{}\n", e.format_line()))
                .collect();
            self.write_tag_file(FETCH_FILE, &lines)?;
        }

        // first pass so Bag-Size reflects a complete bag, second pass records it
        self.info.remove("Bag-Size");
        let info_text = self.info.serialize();
        self.write_tag_file(BAG_INFO_FILE, &info_text)?;
        let total = self.staged_total_size()?;
        self.info.set("Bag-Size", format_bag_size(total));
        let info_text = self.info.serialize();
        self.write_tag_file(BAG_INFO_FILE, &info_text)?;

        for (alg, entries) in self.payload_manifests.clone() {
            self.write_tag_file(&format!("manifest-{alg}.txt"), &manifest::format_manifest(&entries))?;
        }

        self.write_tag_manifests()?;

        fs::rename(&self.staging, &self.final_path)
            .map_err(|e| store::write_failed(&self.final_path, &e))?;
        debug!(bag = %self.name, path = %self.final_path.display(), "bag finalized");
        Bag::open(&self.final_path)
    }

    fn write_tag_manifests(&mut self) -> Result<()> {
        let mut algorithms: BTreeSet<String> = self.tag_manifests.keys().cloned().collect();
        if algorithms.is_empty() {
            algorithms.insert(DEFAULT_ALGORITHM.to_string());
        }

        let digest_targets: BTreeSet<String> = self
            .copied_tag_files
            .iter()
            .chain(self.rewritten_tag_files.iter())
            .cloned()
            .collect();

        let mut files = BTreeMap::new();
        for alg in &algorithms {
            let mut entries = self.tag_manifests.get(alg).cloned().unwrap_or_default();
            if is_supported_algorithm(alg) {
                for path in &digest_targets {
                    let native = self.native(path)?;
                    if let Some(digest) = compute_digest(&native, alg)? {
                        entries.insert(path.clone(), digest);
                    }
                }
            } else {
                // stale entries for files this builder rewrote cannot be
                // recomputed under an unsupported algorithm
                for path in &self.rewritten_tag_files {
                    entries.remove(path);
                }
            }
            // the tag manifests never list themselves
            for other in &algorithms {
                entries.remove(&format!("tagmanifest-{other}.txt"));
            }
            files.insert(format!("tagmanifest-{alg}.txt"), manifest::format_manifest(&entries));
        }

        for (name, content) in files {
            let native = self.native(&name)?;
            fs::write(&native, content).map_err(|e| store::write_failed(&native, &e))?;
        }
        Ok(())
    }

    fn staged_payload_oxum(&self) -> Result<(u64, usize)> {
        let data_root = self.staging.join(DATA_DIR);
        if !data_root.is_dir() {
            return Ok((0, 0));
        }
        let mut octets = 0;
        let mut count = 0;
        for entry in walkdir::WalkDir::new(&data_root).sort_by_file_name() {
            let entry = entry.map_err(|e| store::io_error(e.to_string()))?;
            if entry.file_type().is_file() {
                let meta = entry.metadata().map_err(|e| store::io_error(e.to_string()))?;
                octets += meta.len();
                count += 1;
            }
        }
        Ok((octets, count))
    }

    fn staged_total_size(&self) -> Result<u64> {
        let mut total = 0;
        for entry in walkdir::WalkDir::new(&self.staging).sort_by_file_name() {
            let entry = entry.map_err(|e| store::io_error(e.to_string()))?;
            if entry.file_type().is_file() {
                let meta = entry.metadata().map_err(|e| store::io_error(e.to_string()))?;
                total += meta.len();
            }
        }
        Ok(total)
    }

    fn native(&self, path: &str) -> Result<PathBuf> {
        join_relative(&self.staging, path)
            .ok_or_else(|| store::io_error(format!("path escapes bag root: {path}")))
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| store::write_failed(parent, &e))?;
    }
    Ok(())
}
