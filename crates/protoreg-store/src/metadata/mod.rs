//! Metadata store.
//!
//! A typed key/value layer over four logical collections (owners, modules,
//! commits, labels) keyed by record id, with the secondary indexes the
//! registry needs: owner name, `(owner, name)`, `(module_id, files_digest)`,
//! and per-module listings.

mod memory;
mod sqlite;

pub use memory::MemoryMetadataStore;
pub use sqlite::SqliteMetadataStore;

use protoreg_core::context::OpContext;
use protoreg_core::digest::Digest;
use protoreg_core::model::{Commit, Label, Module, Owner};

use crate::errors::Result;

/// Page size used when a caller passes limit 0
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// One page of commits in descending id order
#[derive(Debug, Clone)]
pub struct CommitPage {
    /// Commits, newest id first
    pub commits: Vec<Commit>,
    /// Token for the next page: the last returned commit id
    pub next_page_token: Option<String>,
}

/// Capability interface for the metadata collections.
///
/// `create_*` fails with `AlreadyExists` on a primary-key collision, except
/// `create_commit`, which treats a duplicate id as success (idempotent
/// replay). A `(module_id, files_digest)` uniqueness conflict surfaces
/// `AlreadyExists` so the caller can re-read the winning commit. `get_*`
/// returns `NotFound` when absent; deletes are idempotent.
pub trait MetadataStore: Send + Sync {
    // ----- Owners -----

    fn get_owner(&self, ctx: &OpContext, id: &str) -> Result<Owner>;
    fn get_owner_by_name(&self, ctx: &OpContext, name: &str) -> Result<Owner>;
    fn list_owners(&self, ctx: &OpContext) -> Result<Vec<Owner>>;
    fn create_owner(&self, ctx: &OpContext, owner: &Owner) -> Result<()>;

    // ----- Modules -----

    fn get_module(&self, ctx: &OpContext, id: &str) -> Result<Module>;
    fn get_module_by_name(&self, ctx: &OpContext, owner: &str, name: &str) -> Result<Module>;
    fn list_modules(&self, ctx: &OpContext, owner_id: &str) -> Result<Vec<Module>>;
    fn create_module(&self, ctx: &OpContext, module: &Module) -> Result<()>;
    fn update_module(&self, ctx: &OpContext, module: &Module) -> Result<()>;
    fn delete_module(&self, ctx: &OpContext, id: &str) -> Result<()>;

    // ----- Commits -----

    fn get_commit(&self, ctx: &OpContext, id: &str) -> Result<Commit>;
    fn get_commit_by_files_digest(
        &self,
        ctx: &OpContext,
        module_id: &str,
        files_digest: &Digest,
    ) -> Result<Commit>;

    /// List commits of a module in descending id order.
    ///
    /// `limit` 0 means [`DEFAULT_PAGE_SIZE`]; the page token is the last
    /// returned commit id.
    fn list_commits(
        &self,
        ctx: &OpContext,
        module_id: &str,
        limit: usize,
        page_token: Option<&str>,
    ) -> Result<CommitPage>;

    fn create_commit(&self, ctx: &OpContext, commit: &Commit) -> Result<()>;

    // ----- Labels -----

    fn get_label(&self, ctx: &OpContext, id: &str) -> Result<Label>;
    fn list_labels(&self, ctx: &OpContext, module_id: &str) -> Result<Vec<Label>>;
    fn create_or_update_label(&self, ctx: &OpContext, label: &Label) -> Result<()>;
    fn delete_label(&self, ctx: &OpContext, id: &str) -> Result<()>;
}

/// Effective page size for a caller-supplied limit
pub(crate) fn effective_limit(limit: usize) -> usize {
    if limit == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        limit
    }
}
