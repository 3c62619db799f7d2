//! Module registry façade.
//!
//! Composes the blob, manifest, and metadata stores into the public module
//! operations: module CRUD, commit creation with content dedup, file
//! reassembly, and label updates.
//!
//! Write ordering inside `create_commit` is load-bearing: blobs complete
//! before the manifest, the manifest before the commit record, the commit
//! record before label updates. A reader never observes a commit whose
//! manifest or blobs are missing.

use protoreg_core::context::OpContext;
use protoreg_core::digest::{Digest, ModuleDigest};
use protoreg_core::errors::{RegistryError, Result};
use protoreg_core::ids;
use protoreg_core::manifest::{validate_path, Manifest, ManifestEntry};
use protoreg_core::model::{validate_label_name, Commit, Label, Module, Owner};
use protoreg_store::blob::BlobStore;
use protoreg_store::manifest_store::ManifestStore;
use protoreg_store::metadata::{CommitPage, MetadataStore};

/// Reference to a module by owner and name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleRef {
    pub owner: String,
    pub name: String,
}

impl ModuleRef {
    /// Create a module reference
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl std::str::FromStr for ModuleRef {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = |reason: &str| RegistryError::InvalidModuleRef {
            reference: s.to_string(),
            reason: reason.to_string(),
        };

        let (owner, name) = s
            .split_once('/')
            .ok_or_else(|| malformed("expected owner/name"))?;
        if owner.is_empty() || name.is_empty() {
            return Err(malformed("owner and name must be non-empty"));
        }
        if name.contains('/') {
            return Err(malformed("too many path segments"));
        }

        Ok(Self::new(owner, name))
    }
}

/// One reassembled module file
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    /// POSIX-style relative path
    pub path: String,
    /// Raw file bytes
    pub content: Vec<u8>,
    /// Content digest of the bytes
    pub digest: Digest,
}

/// Inputs to `create_commit`
#[derive(Debug, Clone, Default)]
pub struct CommitInput {
    /// `(path, content)` pairs of the module's file set
    pub files: Vec<(String, Vec<u8>)>,
    /// Labels to point at the resulting commit; empty means the module's
    /// default label
    pub labels: Vec<String>,
    /// Source control URL the file set was assembled from
    pub source_control_url: Option<String>,
    /// Commit ids of dependencies
    pub dep_commit_ids: Vec<String>,
    /// User creating the commit, when known
    pub created_by_user_id: Option<String>,
}

/// The content-addressable module store façade
pub struct Registry<B, M> {
    blobs: B,
    manifests: ManifestStore<B>,
    metadata: M,
    host: String,
}

impl<B: BlobStore, M: MetadataStore> Registry<B, M> {
    /// Compose a registry from its stores.
    ///
    /// `host` is the registry's own name; the graph resolver uses it to tell
    /// locally hosted dependencies from cross-registry ones.
    pub fn new(blobs: B, manifests: ManifestStore<B>, metadata: M, host: impl Into<String>) -> Self {
        Self {
            blobs,
            manifests,
            metadata,
            host: host.into(),
        }
    }

    /// Get the registry host name
    pub fn host(&self) -> &str {
        &self.host
    }

    // ----- Modules -----

    /// Get the module for `(owner, name)`, materializing the owner and the
    /// module on first use.
    ///
    /// Concurrent calls converge on a single persisted record: a losing
    /// writer re-reads the winner.
    pub fn get_or_create_module(&self, ctx: &OpContext, owner: &str, name: &str) -> Result<Module> {
        match self.metadata.get_module_by_name(ctx, owner, name) {
            Ok(module) => return Ok(module),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let owner_record = self.get_or_create_owner(ctx, owner)?;
        let module = Module::new(&owner_record, name, "");
        match self.metadata.create_module(ctx, &module) {
            Ok(()) => {
                tracing::debug!(module_id = %module.id, owner, name, "created module");
                Ok(module)
            }
            Err(e) if e.is_already_exists() => self.metadata.get_module_by_name(ctx, owner, name),
            Err(e) => Err(e),
        }
    }

    /// Create a module with a description.
    ///
    /// Idempotent on `(owner, name)`: when the module already exists the
    /// stored record is returned unchanged (the description is not updated).
    pub fn create_module(
        &self,
        ctx: &OpContext,
        owner: &str,
        name: &str,
        description: &str,
    ) -> Result<Module> {
        match self.metadata.get_module_by_name(ctx, owner, name) {
            Ok(module) => return Ok(module),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let owner_record = self.get_or_create_owner(ctx, owner)?;
        let module = Module::new(&owner_record, name, description);
        match self.metadata.create_module(ctx, &module) {
            Ok(()) => Ok(module),
            Err(e) if e.is_already_exists() => self.metadata.get_module_by_name(ctx, owner, name),
            Err(e) => Err(e),
        }
    }

    /// Look up a module by `(owner, name)`
    pub fn module(&self, ctx: &OpContext, owner: &str, name: &str) -> Result<Module> {
        self.metadata.get_module_by_name(ctx, owner, name)
    }

    /// Look up a module by id
    pub fn module_by_id(&self, ctx: &OpContext, id: &str) -> Result<Module> {
        self.metadata.get_module(ctx, id)
    }

    /// Look up the module owning the given commit
    pub fn module_by_commit_id(&self, ctx: &OpContext, commit_id: &str) -> Result<Module> {
        let commit = self.metadata.get_commit(ctx, commit_id)?;
        self.metadata.get_module(ctx, &commit.module_id)
    }

    /// List an owner's modules
    pub fn list_modules(&self, ctx: &OpContext, owner: &str) -> Result<Vec<Module>> {
        let owner_record = self.metadata.get_owner_by_name(ctx, owner)?;
        self.metadata.list_modules(ctx, &owner_record.id)
    }

    /// List a module's commits in descending id order
    pub fn list_commits(
        &self,
        ctx: &OpContext,
        module_id: &str,
        limit: usize,
        page_token: Option<&str>,
    ) -> Result<CommitPage> {
        self.metadata.list_commits(ctx, module_id, limit, page_token)
    }

    /// List a module's labels
    pub fn list_labels(&self, ctx: &OpContext, module_id: &str) -> Result<Vec<Label>> {
        self.metadata.list_labels(ctx, module_id)
    }

    /// Delete a module record and all its labels.
    ///
    /// Commits, manifests, and blobs remain in place. Idempotent: an absent
    /// module is success.
    pub fn delete_module(&self, ctx: &OpContext, owner: &str, name: &str) -> Result<()> {
        let module = match self.metadata.get_module_by_name(ctx, owner, name) {
            Ok(module) => module,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };

        for label in self.metadata.list_labels(ctx, &module.id)? {
            self.metadata.delete_label(ctx, &label.id)?;
        }
        self.metadata.delete_module(ctx, &module.id)?;

        tracing::debug!(module_id = %module.id, "deleted module");
        Ok(())
    }

    // ----- Commit resolution -----

    /// Resolve a reference string to a commit.
    ///
    /// The reference is tried as a label name first, then as a commit id
    /// scoped to the module. An empty reference resolves to the module's
    /// default label.
    pub fn commit(&self, ctx: &OpContext, module_ref: &ModuleRef, reference: &str) -> Result<Commit> {
        let module = self.module(ctx, &module_ref.owner, &module_ref.name)?;
        let reference = if reference.is_empty() {
            module.default_label_name.as_str()
        } else {
            reference
        };

        match self
            .metadata
            .get_label(ctx, &ids::label_id(&module.id, reference))
        {
            Ok(label) => self.metadata.get_commit(ctx, &label.commit_id),
            Err(e) if e.is_not_found() => {
                let commit = self.metadata.get_commit(ctx, reference).map_err(|e| {
                    if e.is_not_found() {
                        RegistryError::not_found("commit", reference)
                    } else {
                        e
                    }
                })?;
                if commit.module_id != module.id {
                    return Err(RegistryError::not_found("commit", reference));
                }
                Ok(commit)
            }
            Err(e) => Err(e),
        }
    }

    /// Look up a commit by id, scoped to the module.
    ///
    /// A commit belonging to a different module is NotFound.
    pub fn commit_by_id(
        &self,
        ctx: &OpContext,
        module_ref: &ModuleRef,
        commit_id: &str,
    ) -> Result<Commit> {
        let module = self.module(ctx, &module_ref.owner, &module_ref.name)?;
        let commit = self.metadata.get_commit(ctx, commit_id)?;
        if commit.module_id != module.id {
            return Err(RegistryError::not_found("commit", commit_id));
        }
        Ok(commit)
    }

    /// Look up a commit record by id, unscoped.
    ///
    /// Used by the graph resolver, which discovers the owning module from
    /// the record itself.
    pub fn commit_record(&self, ctx: &OpContext, commit_id: &str) -> Result<Commit> {
        self.metadata.get_commit(ctx, commit_id)
    }

    // ----- Files -----

    /// Resolve a reference and reassemble the commit's file set
    pub fn files_and_commit(
        &self,
        ctx: &OpContext,
        module_ref: &ModuleRef,
        reference: &str,
    ) -> Result<(Vec<File>, Commit)> {
        let commit = self.commit(ctx, module_ref, reference)?;
        let files = self.files_for_commit(ctx, &commit)?;
        Ok((files, commit))
    }

    /// Reassemble the file set of the given commit id
    pub fn files_and_commit_by_commit_id(
        &self,
        ctx: &OpContext,
        commit_id: &str,
    ) -> Result<(Vec<File>, Commit)> {
        let commit = self.metadata.get_commit(ctx, commit_id)?;
        let files = self.files_for_commit(ctx, &commit)?;
        Ok((files, commit))
    }

    /// Load the manifest of a commit
    pub fn manifest_for_commit(&self, ctx: &OpContext, commit: &Commit) -> Result<Manifest> {
        self.manifests.get(ctx, &commit.files_digest)
    }

    /// Read a single file from a commit's file set.
    ///
    /// Returns `None` when the manifest has no entry for the path.
    pub fn commit_file(
        &self,
        ctx: &OpContext,
        commit: &Commit,
        path: &str,
    ) -> Result<Option<Vec<u8>>> {
        let manifest = self.manifest_for_commit(ctx, commit)?;
        match manifest.entry(path) {
            Some(entry) => Ok(Some(self.blobs.get(ctx, &entry.digest)?)),
            None => Ok(None),
        }
    }

    fn files_for_commit(&self, ctx: &OpContext, commit: &Commit) -> Result<Vec<File>> {
        let manifest = self.manifest_for_commit(ctx, commit)?;

        let mut files = Vec::with_capacity(manifest.len());
        for entry in manifest.entries() {
            let content = self.blobs.get(ctx, &entry.digest)?;
            files.push(File {
                path: entry.path.clone(),
                content,
                digest: entry.digest.clone(),
            });
        }
        Ok(files)
    }

    // ----- Commit creation -----

    /// Create a commit from a file set, deduplicating on content.
    ///
    /// When the module already has a commit with the same files digest, that
    /// commit is returned and the requested labels are moved to it; no new
    /// record is written.
    pub fn create_commit(
        &self,
        ctx: &OpContext,
        module_ref: &ModuleRef,
        input: CommitInput,
    ) -> Result<Commit> {
        ctx.check("create_commit")?;

        for (path, _) in &input.files {
            validate_path(path)?;
        }
        for label in &input.labels {
            validate_label_name(label)?;
        }

        let module = self.get_or_create_module(ctx, &module_ref.owner, &module_ref.name)?;

        // 1. Store every file as a blob; identical content dedups naturally
        let mut entries = Vec::with_capacity(input.files.len());
        for (path, content) in &input.files {
            let digest = self.blobs.put(ctx, content)?;
            entries.push(ManifestEntry {
                path: path.clone(),
                digest,
            });
        }

        // 2.-3. Assemble and store the manifest; its digest is the commit's
        // files digest (the B4 value)
        let manifest = Manifest::from_entries(entries);
        let files_digest = self.manifests.put(ctx, &manifest)?;

        // 4. Dedup: an existing commit with this files digest wins
        match self
            .metadata
            .get_commit_by_files_digest(ctx, &module.id, &files_digest)
        {
            Ok(existing) => {
                tracing::debug!(
                    commit_id = %existing.id,
                    files_digest = %files_digest,
                    "content already committed, moving labels"
                );
                self.update_labels(ctx, &module, &input.labels, &existing.id)?;
                return Ok(existing);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        // 5. Compose the module digest over the locally resolvable deps;
        // deps not hosted here are skipped in the B5 input
        let mut dep_digests = Vec::with_capacity(input.dep_commit_ids.len());
        for dep_id in &input.dep_commit_ids {
            match self.metadata.get_commit(ctx, dep_id) {
                Ok(dep) => dep_digests.push(dep.module_digest),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(
                        dep_commit_id = %dep_id,
                        "dependency not hosted locally, skipped in module digest"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        let module_digest = ModuleDigest::b5(&manifest, &dep_digests)?;

        // 6. Persist the commit record
        let commit = Commit::new(
            &module.id,
            &module.owner_id,
            files_digest,
            module_digest,
            input.dep_commit_ids.clone(),
        )
        .with_source_control_url(input.source_control_url.clone())
        .with_created_by(input.created_by_user_id.clone());

        match self.metadata.create_commit(ctx, &commit) {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => {
                // A concurrent writer won the (module, files digest) race;
                // observe its commit instead
                let winner = self
                    .metadata
                    .get_commit_by_files_digest(ctx, &module.id, &commit.files_digest)?;
                self.update_labels(ctx, &module, &input.labels, &winner.id)?;
                return Ok(winner);
            }
            Err(e) => return Err(e),
        }

        // 7. Point the requested labels at the new commit
        self.update_labels(ctx, &module, &input.labels, &commit.id)?;

        tracing::debug!(
            commit_id = %commit.id,
            module_id = %module.id,
            files = manifest.len(),
            "created commit"
        );

        Ok(commit)
    }

    fn update_labels(
        &self,
        ctx: &OpContext,
        module: &Module,
        labels: &[String],
        commit_id: &str,
    ) -> Result<()> {
        let default = [module.default_label_name.clone()];
        let labels: &[String] = if labels.is_empty() { &default } else { labels };

        for name in labels {
            let label = Label::new(&module.id, name, commit_id);
            self.metadata.create_or_update_label(ctx, &label)?;
        }
        Ok(())
    }

    fn get_or_create_owner(&self, ctx: &OpContext, name: &str) -> Result<Owner> {
        match self.metadata.get_owner_by_name(ctx, name) {
            Ok(owner) => return Ok(owner),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let owner = Owner::new(name);
        match self.metadata.create_owner(ctx, &owner) {
            Ok(()) => Ok(owner),
            Err(e) if e.is_already_exists() => self.metadata.get_owner_by_name(ctx, name),
            Err(e) => Err(e),
        }
    }
}
