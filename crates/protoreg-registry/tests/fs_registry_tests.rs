// Integration tests for the registry over the filesystem blob store and the
// SQLite metadata store: on-disk layout and durability across reopen.

mod common;

use common::input;
use protoreg_core::context::OpContext;
use protoreg_registry::{ModuleRef, Registry};
use protoreg_store::{FsBlobStore, ManifestStore, SqliteMetadataStore};
use std::path::Path;

fn open_registry(root: &Path) -> Registry<FsBlobStore, SqliteMetadataStore> {
    Registry::new(
        FsBlobStore::new(root.join("blobs")),
        ManifestStore::new(FsBlobStore::new(root.join("manifests"))),
        SqliteMetadataStore::open(root.join("metadata.db")).unwrap(),
        "registry.local",
    )
}

#[test]
fn test_on_disk_layout() {
    let dir = tempfile::TempDir::new().unwrap();
    let registry = open_registry(dir.path());
    let ctx = OpContext::new();

    let content: &[u8] = b"syntax = \"proto3\";";
    let commit = registry
        .create_commit(
            &ctx,
            &ModuleRef::new("acme", "petstore"),
            input(&[("a.proto", content)], &["main"]),
        )
        .unwrap();

    // Blobs shard under <root>/blobs/shake256/<hex[0..2]>/<hex>
    let blob_hex = protoreg_core::Digest::shake256_of(content).hex();
    assert!(dir
        .path()
        .join("blobs")
        .join("shake256")
        .join(&blob_hex[..2])
        .join(&blob_hex)
        .is_file());

    // Manifests shard the same way under their own namespace
    let manifest_hex = commit.files_digest.hex();
    assert!(dir
        .path()
        .join("manifests")
        .join("shake256")
        .join(&manifest_hex[..2])
        .join(&manifest_hex)
        .is_file());
}

#[test]
fn test_reopen_resolves_previous_push() {
    let dir = tempfile::TempDir::new().unwrap();
    let ctx = OpContext::new();
    let module = ModuleRef::new("acme", "petstore");

    let pushed = {
        let registry = open_registry(dir.path());
        registry
            .create_commit(&ctx, &module, input(&[("a.proto", b"persisted")], &["main"]))
            .unwrap()
    };

    let registry = open_registry(dir.path());
    let (files, commit) = registry.files_and_commit(&ctx, &module, "main").unwrap();
    assert_eq!(commit.id, pushed.id);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].content, b"persisted");

    // The same content dedups against the reopened store
    let again = registry
        .create_commit(&ctx, &module, input(&[("a.proto", b"persisted")], &[]))
        .unwrap();
    assert_eq!(again.id, pushed.id);
}
