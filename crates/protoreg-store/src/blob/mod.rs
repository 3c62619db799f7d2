//! Content-addressable blob storage.
//!
//! A blob's identity is its SHAKE256 digest; stores never rewrite existing
//! content. The capability interface lets the registry run over a local
//! filesystem, a cloud object store, or an in-memory backing for tests.

mod fs;
mod memory;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

use std::io::Read;

use protoreg_core::context::OpContext;
use protoreg_core::digest::Digest;

use crate::errors::{io_error, Result};

/// Capability interface for content-addressed byte storage.
///
/// `put` is idempotent: when a blob with the computed digest already exists,
/// no write occurs and the existing blob is used. `delete` treats an absent
/// blob as success.
pub trait BlobStore: Send + Sync {
    /// Store `content` keyed by its SHAKE256 digest and return the digest
    fn put(&self, ctx: &OpContext, content: &[u8]) -> Result<Digest>;

    /// Read the blob with the given digest.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no blob with that digest exists.
    fn get(&self, ctx: &OpContext, digest: &Digest) -> Result<Vec<u8>>;

    /// Check whether a blob with the given digest exists
    fn exists(&self, ctx: &OpContext, digest: &Digest) -> Result<bool>;

    /// Delete the blob with the given digest; absent blobs are success
    fn delete(&self, ctx: &OpContext, digest: &Digest) -> Result<()>;

    /// Read a stream to its end and store the bytes as one blob
    fn put_reader(&self, ctx: &OpContext, reader: &mut dyn Read) -> Result<Digest> {
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(|e| io_error("blob_put_reader", e))?;
        self.put(ctx, &content)
    }
}
