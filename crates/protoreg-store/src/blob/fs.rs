//! Filesystem blob store.
//!
//! Layout: `<root>/<algo>/<hex[0..2]>/<hex>`. The two-character shard
//! directory bounds per-directory fan-out. Writes publish atomically via a
//! temp file renamed into place, so readers never observe partial blobs.

use std::fs;
use std::path::{Path, PathBuf};

use protoreg_core::context::OpContext;
use protoreg_core::digest::Digest;

use super::BlobStore;
use crate::errors::{blob_missing, io_error, Result};

/// Blob store backed by a sharded directory tree
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a blob store rooted at the given directory.
    ///
    /// The directory is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_path(&self, digest: &Digest) -> PathBuf {
        let hex = digest.hex();
        let shard = &hex[..2.min(hex.len())];
        self.root.join(digest.algorithm()).join(shard).join(&hex)
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, ctx: &OpContext, content: &[u8]) -> Result<Digest> {
        ctx.check("blob_put")?;

        let digest = Digest::shake256_of(content);
        let target = self.blob_path(&digest);

        // Content-addressed dedup: an existing blob with this digest is the
        // same bytes, so the write is skipped entirely.
        if target.exists() {
            return Ok(digest);
        }

        publish_atomically(&target, content)?;

        tracing::debug!(
            digest = %digest,
            size_bytes = content.len(),
            "stored blob"
        );

        Ok(digest)
    }

    fn get(&self, ctx: &OpContext, digest: &Digest) -> Result<Vec<u8>> {
        ctx.check("blob_get")?;

        let path = self.blob_path(digest);
        match fs::read(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(blob_missing(digest)),
            Err(e) => Err(io_error("blob_get", e)),
        }
    }

    fn exists(&self, ctx: &OpContext, digest: &Digest) -> Result<bool> {
        ctx.check("blob_exists")?;
        Ok(self.blob_path(digest).exists())
    }

    fn delete(&self, ctx: &OpContext, digest: &Digest) -> Result<()> {
        ctx.check("blob_delete")?;

        match fs::remove_file(self.blob_path(digest)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("blob_delete", e)),
        }
    }
}

/// Write bytes to `target` via a temp file in the same directory plus rename
fn publish_atomically(target: &Path, content: &[u8]) -> Result<()> {
    let parent = target
        .parent()
        .ok_or_else(|| protoreg_core::RegistryError::internal("blob path has no parent"))?;
    fs::create_dir_all(parent).map_err(|e| io_error("blob_create_dir", e))?;

    let temp = target.with_extension("tmp");
    fs::write(&temp, content).map_err(|e| io_error("blob_write_temp", e))?;
    fs::rename(&temp, target).map_err(|e| io_error("blob_publish", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (FsBlobStore, OpContext, TempDir) {
        let dir = TempDir::new().unwrap();
        (FsBlobStore::new(dir.path()), OpContext::new(), dir)
    }

    #[test]
    fn test_put_get_roundtrip() {
        let (store, ctx, _dir) = setup();

        let digest = store.put(&ctx, b"hello world").unwrap();
        assert_eq!(digest, Digest::shake256_of(b"hello world"));

        let content = store.get(&ctx, &digest).unwrap();
        assert_eq!(content, b"hello world");
    }

    #[test]
    fn test_put_idempotent() {
        let (store, ctx, _dir) = setup();

        let first = store.put(&ctx, b"same bytes").unwrap();
        let second = store.put(&ctx, b"same bytes").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_put_reader_matches_put() {
        let (store, ctx, _dir) = setup();

        let mut reader = std::io::Cursor::new(b"streamed content".to_vec());
        let streamed = store.put_reader(&ctx, &mut reader).unwrap();
        assert_eq!(streamed, Digest::shake256_of(b"streamed content"));
        assert_eq!(store.get(&ctx, &streamed).unwrap(), b"streamed content");
    }

    #[test]
    fn test_shard_layout() {
        let (store, ctx, dir) = setup();

        let digest = store.put(&ctx, b"sharded").unwrap();
        let hex = digest.hex();
        let expected = dir
            .path()
            .join("shake256")
            .join(&hex[..2])
            .join(&hex);
        assert!(expected.is_file());
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let (store, ctx, _dir) = setup();

        let absent = Digest::parse(&format!("shake256:{}", "00".repeat(64))).unwrap();
        let err = store.get(&ctx, &absent).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_idempotent() {
        let (store, ctx, _dir) = setup();

        let digest = store.put(&ctx, b"to delete").unwrap();
        store.delete(&ctx, &digest).unwrap();
        assert!(!store.exists(&ctx, &digest).unwrap());

        // Second delete succeeds
        store.delete(&ctx, &digest).unwrap();
    }

    #[test]
    fn test_no_temp_files_after_put() {
        let (store, ctx, dir) = setup();

        store.put(&ctx, b"clean").unwrap();

        let mut stack = vec![dir.path().to_path_buf()];
        while let Some(path) = stack.pop() {
            for entry in fs::read_dir(&path).unwrap() {
                let entry = entry.unwrap();
                if entry.path().is_dir() {
                    stack.push(entry.path());
                } else {
                    let name = entry.file_name();
                    assert!(!name.to_string_lossy().ends_with(".tmp"));
                }
            }
        }
    }

    #[test]
    fn test_cancelled_context_aborts() {
        let (store, ctx, _dir) = setup();
        ctx.cancel_token().cancel();

        let err = store.put(&ctx, b"never stored").unwrap_err();
        assert!(matches!(
            err,
            protoreg_core::RegistryError::Cancelled { .. }
        ));
    }
}
