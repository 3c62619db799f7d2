//! buf.lock parser.
//!
//! Parses the YAML lock format into typed dependency records:
//!
//! ```yaml
//! version: v1
//! deps:
//!   - remote: buf.example.com
//!     owner: acme
//!     repository: petstore
//!     commit: 0192aab3c4d5e6f7a8b9c0d1e2f3a4b5
//!     digest: b5:<hex>
//! ```
//!
//! The parser does not validate that a dep's commit exists locally; the
//! graph resolver decides what to do with entries it cannot resolve.

use std::path::Path;

use serde::{Deserialize, Serialize};

use protoreg_core::errors::{RegistryError, Result};

/// File name of the lock bundled with a module's file set
pub const BUF_LOCK_PATH: &str = "buf.lock";

/// Lock format version this parser accepts
const SUPPORTED_VERSION: &str = "v1";

/// Parsed buf.lock document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufLock {
    /// Lock format version (must be `v1`)
    pub version: String,

    /// Pinned dependencies
    #[serde(default)]
    pub deps: Vec<LockDep>,
}

/// One pinned dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockDep {
    /// Registry host serving the dependency
    pub remote: String,

    /// Dependency owner name
    pub owner: String,

    /// Dependency module name
    pub repository: String,

    /// Pinned commit id
    pub commit: String,

    /// Pinned module digest string (`shake256:<hex>` or `b5:<hex>`)
    pub digest: String,
}

impl BufLock {
    /// Find the dep entry pinned to the given commit id
    pub fn dep_by_commit(&self, commit_id: &str) -> Option<&LockDep> {
        self.deps.iter().find(|dep| dep.commit == commit_id)
    }
}

/// Parse buf.lock content.
///
/// # Errors
///
/// Returns `MalformedLock` for invalid YAML or an unsupported version.
pub fn parse_buf_lock(content: &str) -> Result<BufLock> {
    let lock: BufLock = serde_yaml::from_str(content).map_err(|e| RegistryError::MalformedLock {
        reason: e.to_string(),
    })?;

    if lock.version != SUPPORTED_VERSION {
        return Err(RegistryError::MalformedLock {
            reason: format!(
                "unsupported version {:?}, expected {:?}",
                lock.version, SUPPORTED_VERSION
            ),
        });
    }

    Ok(lock)
}

/// Read and parse the buf.lock in the given directory.
///
/// # Errors
///
/// - `BufLockNotFound` when the file is absent
/// - `MalformedLock` when the content fails to parse
pub fn read_buf_lock(dir: &Path) -> Result<BufLock> {
    let path = dir.join(BUF_LOCK_PATH);
    let content = std::fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RegistryError::BufLockNotFound {
                path: path.display().to_string(),
            }
        } else {
            RegistryError::Io {
                op: "read_buf_lock".to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    parse_buf_lock(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_lock() {
        let yaml = r#"
version: v1
deps:
  - remote: buf.example.com
    owner: acme
    repository: petstore
    commit: 0192aab3c4d5e6f7a8b9c0d1e2f3a4b5
    digest: b5:aabb
"#;

        let lock = parse_buf_lock(yaml).unwrap();
        assert_eq!(lock.version, "v1");
        assert_eq!(lock.deps.len(), 1);
        assert_eq!(lock.deps[0].remote, "buf.example.com");
        assert_eq!(lock.deps[0].repository, "petstore");
    }

    #[test]
    fn test_parse_lock_without_deps() {
        let lock = parse_buf_lock("version: v1\n").unwrap();
        assert!(lock.deps.is_empty());
    }

    #[test]
    fn test_reject_malformed_yaml() {
        let err = parse_buf_lock("version: [unclosed").unwrap_err();
        assert!(matches!(err, RegistryError::MalformedLock { .. }));
    }

    #[test]
    fn test_reject_unsupported_version() {
        let err = parse_buf_lock("version: v2\ndeps: []\n").unwrap_err();
        assert!(matches!(err, RegistryError::MalformedLock { .. }));
    }

    #[test]
    fn test_missing_file_is_buf_lock_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = read_buf_lock(dir.path()).unwrap_err();
        assert!(matches!(err, RegistryError::BufLockNotFound { .. }));
    }

    #[test]
    fn test_dep_by_commit() {
        let yaml = r#"
version: v1
deps:
  - remote: buf.example.com
    owner: acme
    repository: petstore
    commit: aaaa
    digest: b5:00
  - remote: buf.example.com
    owner: acme
    repository: payments
    commit: bbbb
    digest: b5:11
"#;

        let lock = parse_buf_lock(yaml).unwrap();
        assert_eq!(lock.dep_by_commit("bbbb").unwrap().repository, "payments");
        assert!(lock.dep_by_commit("cccc").is_none());
    }
}
