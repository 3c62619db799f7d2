// Shared helpers for registry integration tests. Not every test binary uses
// every helper.
#![allow(dead_code)]

use protoreg_core::context::OpContext;
use protoreg_core::model::Commit;
use protoreg_registry::{CommitInput, ModuleRef, Registry};
use protoreg_store::{ManifestStore, MemoryBlobStore, MemoryMetadataStore};

pub const HOST: &str = "registry.local";

pub type MemoryRegistry = Registry<MemoryBlobStore, MemoryMetadataStore>;

pub fn memory_registry() -> MemoryRegistry {
    Registry::new(
        MemoryBlobStore::new(),
        ManifestStore::new(MemoryBlobStore::new()),
        MemoryMetadataStore::new(),
        HOST,
    )
}

pub fn input(files: &[(&str, &[u8])], labels: &[&str]) -> CommitInput {
    CommitInput {
        files: files
            .iter()
            .map(|(path, content)| (path.to_string(), content.to_vec()))
            .collect(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        ..CommitInput::default()
    }
}

/// Push a file set and wait long enough that the next commit id sorts later.
pub fn push(
    registry: &MemoryRegistry,
    ctx: &OpContext,
    module: &ModuleRef,
    files: &[(&str, &[u8])],
    deps: &[&Commit],
) -> Commit {
    let commit = registry
        .create_commit(
            ctx,
            module,
            CommitInput {
                dep_commit_ids: deps.iter().map(|d| d.id.clone()).collect(),
                ..input(files, &[])
            },
        )
        .expect("create_commit");
    // Commit-id ordering is millisecond-granular
    std::thread::sleep(std::time::Duration::from_millis(2));
    commit
}
