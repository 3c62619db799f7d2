//! Manifest codec.
//!
//! A manifest is the ordered file listing of one module version: one
//! `(content digest, path)` pair per file, sorted by path ascending
//! (byte-wise). The serialized form is bit-exact for wire compatibility:
//!
//! ```text
//! <algo>:<hex-lowercase><SP><SP><path><LF>
//! ```
//!
//! with a trailing newline after the last entry. The manifest's own identity
//! digest is the SHAKE256 of that serialized form.

use crate::digest::Digest;
use crate::errors::{RegistryError, Result};
use serde::{Deserialize, Serialize};

/// Separator between digest and path in a serialized manifest line
const ENTRY_SEPARATOR: &str = "  ";

/// One manifest entry: a relative file path and its content digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// POSIX-style relative file path
    pub path: String,

    /// Content digest of the file's bytes
    pub digest: Digest,
}

/// Ordered file listing of a module version.
///
/// Entries are held sorted by path; two manifests built from the same file
/// set in any order serialize identically. Manifests are immutable once
/// constructed. There is no serde support on purpose: the line format of
/// `serialize`/`parse` is the only wire form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build a manifest from entries, sorting them by path ascending
    pub fn from_entries(mut entries: Vec<ManifestEntry>) -> Self {
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Self { entries }
    }

    /// Get the entries in path order
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Look up an entry by exact path
    pub fn entry(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries
            .binary_search_by(|e| e.path.as_str().cmp(path))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the manifest has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to the canonical line format
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.digest.to_string());
            out.push_str(ENTRY_SEPARATOR);
            out.push_str(&entry.path);
            out.push('\n');
        }
        out
    }

    /// Parse the canonical line format.
    ///
    /// Blank lines are tolerated. Each non-blank line must split on the first
    /// two-space separator into a digest string and a path.
    ///
    /// # Errors
    ///
    /// - `MalformedManifestLine` when the separator is absent or the path is
    ///   empty
    /// - `MalformedDigest` when the digest half fails to parse
    pub fn parse(input: &str) -> Result<Self> {
        let mut entries = Vec::new();

        for (idx, line) in input.lines().enumerate() {
            if line.is_empty() {
                continue;
            }

            let (digest_str, path) =
                line.split_once(ENTRY_SEPARATOR)
                    .ok_or_else(|| RegistryError::MalformedManifestLine {
                        line: idx + 1,
                        reason: "missing two-space separator".to_string(),
                    })?;

            if path.is_empty() {
                return Err(RegistryError::MalformedManifestLine {
                    line: idx + 1,
                    reason: "empty path".to_string(),
                });
            }

            entries.push(ManifestEntry {
                path: path.to_string(),
                digest: Digest::parse(digest_str)?,
            });
        }

        Ok(Self::from_entries(entries))
    }

    /// Compute the manifest's identity digest (SHAKE256 of its serialized form)
    pub fn digest(&self) -> Digest {
        Digest::shake256_of(self.serialize().as_bytes())
    }
}

/// Validate a module file path.
///
/// Paths are POSIX-style and relative: non-empty, no leading `/`, and no
/// empty, `.`, or `..` segments.
///
/// # Errors
///
/// Returns `InvalidPath` describing the first violated rule.
pub fn validate_path(path: &str) -> Result<()> {
    let fail = |reason: &str| {
        Err(RegistryError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        })
    };

    if path.is_empty() {
        return fail("empty path");
    }
    if path.starts_with('/') {
        return fail("absolute paths are not allowed");
    }
    for segment in path.split('/') {
        match segment {
            "" => return fail("empty path segment"),
            "." | ".." => return fail("relative path segments are not allowed"),
            _ => {}
        }
    }

    Ok(())
}
