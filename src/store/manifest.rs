//! Checksum manifest files (`manifest-<alg>.txt`, `tagmanifest-<alg>.txt`)
//! and digest computation.
//!
//! Digests for sha256 and sha512 can be computed locally; entries under any
//! other algorithm are carried through opaquely when files are copied, never
//! recomputed.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256, Sha512};

use crate::error::{Result, store, tagdir};

/// Algorithms this crate can compute digests for
pub const SUPPORTED_ALGORITHMS: &[&str] = &["sha256", "sha512"];

/// Default algorithm for freshly written manifests
pub const DEFAULT_ALGORITHM: &str = "sha256";

/// Entries of one manifest file: bag-relative path to hex digest
pub type ManifestEntries = BTreeMap<String, String>;

/// Per-algorithm manifest entries
pub type ManifestSet = BTreeMap<String, ManifestEntries>;

/// True if digests under `algorithm` can be computed locally
pub fn is_supported_algorithm(algorithm: &str) -> bool {
    SUPPORTED_ALGORITHMS.contains(&algorithm)
}

/// Compute the hex digest of a file under a supported algorithm.
/// Returns `None` for algorithms this crate cannot compute.
pub fn compute_digest(path: &Path, algorithm: &str) -> Result<Option<String>> {
    match algorithm {
        "sha256" => digest_file::<Sha256>(path).map(Some),
        "sha512" => digest_file::<Sha512>(path).map(Some),
        _ => Ok(None),
    }
}

fn digest_file<D: Digest>(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| store::read_failed(path, &e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = D::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader
            .read(&mut buffer)
            .map_err(|e| store::read_failed(path, &e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Parse a manifest file: one `DIGEST PATH` pair per line, separated by
/// one or more spaces. Paths may themselves contain spaces.
pub fn parse_manifest(text: &str, file: &str) -> Result<ManifestEntries> {
    let mut out = ManifestEntries::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let Some((digest, path)) = line.split_once(' ') else {
            return Err(tagdir::malformed(file, idx + 1, "missing path field"));
        };
        let path = path.trim_start();
        if path.is_empty() {
            return Err(tagdir::malformed(file, idx + 1, "missing path field"));
        }
        out.insert(path.to_string(), digest.to_string());
    }
    Ok(out)
}

/// Format manifest entries as `DIGEST PATH` lines with a trailing newline
pub fn format_manifest(entries: &ManifestEntries) -> String {
    let mut out = String::new();
    for (path, digest) in entries {
        out.push_str(digest);
        out.push(' ');
        out.push_str(path);
        out.push('\n');
    }
    out
}

/// Format a byte count the way `Bag-Size` expects: three significant
/// digits with a decimal (base-1000) prefix.
pub fn format_bag_size(nbytes: u64) -> String {
    const PREFIXES: [&str; 5] = ["", "k", "M", "G", "T"];
    let mut value = nbytes as f64;
    let mut order = 0;
    while value >= 1000.0 && order < PREFIXES.len() - 1 {
        value /= 1000.0;
        order += 1;
    }

    let mut scale = 0u32;
    while value >= 10.0 {
        value /= 10.0;
        scale += 1;
    }
    let mut formatted = format!("{:.3}", (value * 1000.0).round() / 1000.0 * f64::from(10u32.pow(scale)));
    if formatted.contains('.') {
        formatted = formatted.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    format!("{} {}B", formatted, PREFIXES[order])
}
