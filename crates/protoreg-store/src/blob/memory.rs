//! In-memory blob store for tests and embedded use.

use std::collections::HashMap;
use std::sync::RwLock;

use protoreg_core::context::OpContext;
use protoreg_core::digest::Digest;
use protoreg_core::RegistryError;

use super::BlobStore;
use crate::errors::{blob_missing, Result};

/// Blob store backed by a map, keyed by digest string
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create an empty in-memory blob store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Vec<u8>>>> {
        self.blobs
            .read()
            .map_err(|_| RegistryError::internal("blob store lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<u8>>>> {
        self.blobs
            .write()
            .map_err(|_| RegistryError::internal("blob store lock poisoned"))
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, ctx: &OpContext, content: &[u8]) -> Result<Digest> {
        ctx.check("blob_put")?;

        let digest = Digest::shake256_of(content);
        self.write()?
            .entry(digest.to_string())
            .or_insert_with(|| content.to_vec());
        Ok(digest)
    }

    fn get(&self, ctx: &OpContext, digest: &Digest) -> Result<Vec<u8>> {
        ctx.check("blob_get")?;

        self.read()?
            .get(&digest.to_string())
            .cloned()
            .ok_or_else(|| blob_missing(digest))
    }

    fn exists(&self, ctx: &OpContext, digest: &Digest) -> Result<bool> {
        ctx.check("blob_exists")?;
        Ok(self.read()?.contains_key(&digest.to_string()))
    }

    fn delete(&self, ctx: &OpContext, digest: &Digest) -> Result<()> {
        ctx.check("blob_delete")?;
        self.write()?.remove(&digest.to_string());
        Ok(())
    }
}
