//! CLI subcommands.

pub mod files;
pub mod graph;
pub mod list;
pub mod push;

use std::path::Path;

use protoreg_registry::Registry;
use protoreg_store::{FsBlobStore, ManifestStore, SqliteMetadataStore};

/// Registry over the local filesystem store layout
pub type FsRegistry = Registry<FsBlobStore, SqliteMetadataStore>;

/// Open (creating if needed) the local registry store under `root`
pub fn open_registry(root: &Path, host: &str) -> Result<FsRegistry, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(root)?;
    Ok(Registry::new(
        FsBlobStore::new(root.join("blobs")),
        ManifestStore::new(FsBlobStore::new(root.join("manifests"))),
        SqliteMetadataStore::open(root.join("metadata.db"))?,
        host,
    ))
}
