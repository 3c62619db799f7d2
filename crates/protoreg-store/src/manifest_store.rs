//! Manifest store.
//!
//! Wraps a blob store namespace with the same content-addressed dedup
//! semantics: a manifest's identity is the SHAKE256 of its serialized form.

use protoreg_core::context::OpContext;
use protoreg_core::digest::Digest;
use protoreg_core::manifest::Manifest;
use protoreg_core::RegistryError;

use crate::blob::BlobStore;
use crate::errors::{manifest_missing, Result};

/// Content-addressed manifest storage over a dedicated blob namespace
pub struct ManifestStore<B> {
    blobs: B,
}

impl<B: BlobStore> ManifestStore<B> {
    /// Create a manifest store over its own blob namespace
    pub fn new(blobs: B) -> Self {
        Self { blobs }
    }

    /// Serialize and store a manifest, returning its identity digest.
    ///
    /// Idempotent: an already-present manifest is not rewritten.
    pub fn put(&self, ctx: &OpContext, manifest: &Manifest) -> Result<Digest> {
        self.blobs.put(ctx, manifest.serialize().as_bytes())
    }

    /// Load and parse the manifest with the given digest.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no manifest with that digest exists.
    pub fn get(&self, ctx: &OpContext, digest: &Digest) -> Result<Manifest> {
        let bytes = self.blobs.get(ctx, digest).map_err(|e| {
            if e.is_not_found() {
                manifest_missing(digest)
            } else {
                e
            }
        })?;

        let text = String::from_utf8(bytes).map_err(|e| RegistryError::Serialization {
            reason: format!("manifest {} is not valid UTF-8: {}", digest, e),
        })?;

        Manifest::parse(&text)
    }

    /// Check whether a manifest with the given digest exists
    pub fn exists(&self, ctx: &OpContext, digest: &Digest) -> Result<bool> {
        self.blobs.exists(ctx, digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use protoreg_core::manifest::ManifestEntry;

    fn sample_manifest() -> Manifest {
        Manifest::from_entries(vec![
            ManifestEntry {
                path: "a.proto".to_string(),
                digest: Digest::shake256_of(b"a"),
            },
            ManifestEntry {
                path: "b.proto".to_string(),
                digest: Digest::shake256_of(b"b"),
            },
        ])
    }

    #[test]
    fn test_put_get_roundtrip() {
        let store = ManifestStore::new(MemoryBlobStore::new());
        let ctx = OpContext::new();
        let manifest = sample_manifest();

        let digest = store.put(&ctx, &manifest).unwrap();
        assert_eq!(digest, manifest.digest());

        let loaded = store.get(&ctx, &digest).unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_put_idempotent() {
        let store = ManifestStore::new(MemoryBlobStore::new());
        let ctx = OpContext::new();
        let manifest = sample_manifest();

        let first = store.put(&ctx, &manifest).unwrap();
        let second = store.put(&ctx, &manifest).unwrap();
        assert_eq!(first, second);
        assert!(store.exists(&ctx, &first).unwrap());
    }

    #[test]
    fn test_get_missing_names_manifest() {
        let store = ManifestStore::new(MemoryBlobStore::new());
        let ctx = OpContext::new();

        let absent = Digest::shake256_of(b"never stored");
        let err = store.get(&ctx, &absent).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("manifest"));
    }
}
