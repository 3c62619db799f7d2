//! In-memory metadata store.
//!
//! Map-backed implementation mirroring the secondary indexes of the SQLite
//! variant. Used by tests and embedded callers.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use protoreg_core::context::OpContext;
use protoreg_core::digest::Digest;
use protoreg_core::model::{Commit, Label, Module, Owner};
use protoreg_core::RegistryError;

use super::{effective_limit, CommitPage, MetadataStore};
use crate::errors::Result;

#[derive(Default)]
struct Collections {
    owners: HashMap<String, Owner>,
    owner_ids_by_name: HashMap<String, String>,
    modules: HashMap<String, Module>,
    module_ids_by_name: HashMap<(String, String), String>,
    commits: HashMap<String, Commit>,
    commit_ids_by_files_digest: HashMap<(String, String), String>,
    labels: HashMap<String, Label>,
}

/// Metadata store backed by in-process maps
#[derive(Default)]
pub struct MemoryMetadataStore {
    inner: RwLock<Collections>,
}

impl MemoryMetadataStore {
    /// Create an empty in-memory metadata store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.inner
            .read()
            .map_err(|_| RegistryError::internal("metadata lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.inner
            .write()
            .map_err(|_| RegistryError::internal("metadata lock poisoned"))
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn get_owner(&self, ctx: &OpContext, id: &str) -> Result<Owner> {
        ctx.check("get_owner")?;
        self.read()?
            .owners
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("owner", id))
    }

    fn get_owner_by_name(&self, ctx: &OpContext, name: &str) -> Result<Owner> {
        ctx.check("get_owner_by_name")?;
        let inner = self.read()?;
        inner
            .owner_ids_by_name
            .get(name)
            .and_then(|id| inner.owners.get(id))
            .cloned()
            .ok_or_else(|| RegistryError::not_found("owner", name))
    }

    fn list_owners(&self, ctx: &OpContext) -> Result<Vec<Owner>> {
        ctx.check("list_owners")?;
        let mut owners: Vec<Owner> = self.read()?.owners.values().cloned().collect();
        owners.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(owners)
    }

    fn create_owner(&self, ctx: &OpContext, owner: &Owner) -> Result<()> {
        ctx.check("create_owner")?;
        let mut inner = self.write()?;
        if inner.owners.contains_key(&owner.id) || inner.owner_ids_by_name.contains_key(&owner.name)
        {
            return Err(RegistryError::already_exists("owner", &owner.id));
        }
        inner
            .owner_ids_by_name
            .insert(owner.name.clone(), owner.id.clone());
        inner.owners.insert(owner.id.clone(), owner.clone());
        Ok(())
    }

    fn get_module(&self, ctx: &OpContext, id: &str) -> Result<Module> {
        ctx.check("get_module")?;
        self.read()?
            .modules
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("module", id))
    }

    fn get_module_by_name(&self, ctx: &OpContext, owner: &str, name: &str) -> Result<Module> {
        ctx.check("get_module_by_name")?;
        let inner = self.read()?;
        inner
            .module_ids_by_name
            .get(&(owner.to_string(), name.to_string()))
            .and_then(|id| inner.modules.get(id))
            .cloned()
            .ok_or_else(|| RegistryError::not_found("module", format!("{}/{}", owner, name)))
    }

    fn list_modules(&self, ctx: &OpContext, owner_id: &str) -> Result<Vec<Module>> {
        ctx.check("list_modules")?;
        let mut modules: Vec<Module> = self
            .read()?
            .modules
            .values()
            .filter(|m| m.owner_id == owner_id)
            .cloned()
            .collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(modules)
    }

    fn create_module(&self, ctx: &OpContext, module: &Module) -> Result<()> {
        ctx.check("create_module")?;
        let mut inner = self.write()?;
        let name_key = (module.owner.clone(), module.name.clone());
        if inner.modules.contains_key(&module.id) || inner.module_ids_by_name.contains_key(&name_key)
        {
            return Err(RegistryError::already_exists("module", &module.id));
        }
        inner.module_ids_by_name.insert(name_key, module.id.clone());
        inner.modules.insert(module.id.clone(), module.clone());
        Ok(())
    }

    fn update_module(&self, ctx: &OpContext, module: &Module) -> Result<()> {
        ctx.check("update_module")?;
        let mut inner = self.write()?;
        if !inner.modules.contains_key(&module.id) {
            return Err(RegistryError::not_found("module", &module.id));
        }
        inner.modules.insert(module.id.clone(), module.clone());
        Ok(())
    }

    fn delete_module(&self, ctx: &OpContext, id: &str) -> Result<()> {
        ctx.check("delete_module")?;
        let mut inner = self.write()?;
        if let Some(module) = inner.modules.remove(id) {
            inner
                .module_ids_by_name
                .remove(&(module.owner.clone(), module.name.clone()));
        }
        Ok(())
    }

    fn get_commit(&self, ctx: &OpContext, id: &str) -> Result<Commit> {
        ctx.check("get_commit")?;
        self.read()?
            .commits
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("commit", id))
    }

    fn get_commit_by_files_digest(
        &self,
        ctx: &OpContext,
        module_id: &str,
        files_digest: &Digest,
    ) -> Result<Commit> {
        ctx.check("get_commit_by_files_digest")?;
        let inner = self.read()?;
        inner
            .commit_ids_by_files_digest
            .get(&(module_id.to_string(), files_digest.to_string()))
            .and_then(|id| inner.commits.get(id))
            .cloned()
            .ok_or_else(|| RegistryError::not_found("commit", files_digest.to_string()))
    }

    fn list_commits(
        &self,
        ctx: &OpContext,
        module_id: &str,
        limit: usize,
        page_token: Option<&str>,
    ) -> Result<CommitPage> {
        ctx.check("list_commits")?;

        let mut commits: Vec<Commit> = self
            .read()?
            .commits
            .values()
            .filter(|c| c.module_id == module_id)
            .filter(|c| page_token.map_or(true, |token| c.id.as_str() < token))
            .cloned()
            .collect();
        commits.sort_by(|a, b| b.id.cmp(&a.id));

        let limit = effective_limit(limit);
        let has_more = commits.len() > limit;
        commits.truncate(limit);

        let next_page_token = if has_more {
            commits.last().map(|c| c.id.clone())
        } else {
            None
        };

        Ok(CommitPage {
            commits,
            next_page_token,
        })
    }

    fn create_commit(&self, ctx: &OpContext, commit: &Commit) -> Result<()> {
        ctx.check("create_commit")?;
        let mut inner = self.write()?;

        // Idempotent replay of the same commit id
        if inner.commits.contains_key(&commit.id) {
            return Ok(());
        }

        let digest_key = (commit.module_id.clone(), commit.files_digest.to_string());
        if inner.commit_ids_by_files_digest.contains_key(&digest_key) {
            return Err(RegistryError::already_exists("commit", &commit.id));
        }

        inner
            .commit_ids_by_files_digest
            .insert(digest_key, commit.id.clone());
        inner.commits.insert(commit.id.clone(), commit.clone());
        Ok(())
    }

    fn get_label(&self, ctx: &OpContext, id: &str) -> Result<Label> {
        ctx.check("get_label")?;
        self.read()?
            .labels
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("label", id))
    }

    fn list_labels(&self, ctx: &OpContext, module_id: &str) -> Result<Vec<Label>> {
        ctx.check("list_labels")?;
        let mut labels: Vec<Label> = self
            .read()?
            .labels
            .values()
            .filter(|l| l.module_id == module_id)
            .cloned()
            .collect();
        labels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(labels)
    }

    fn create_or_update_label(&self, ctx: &OpContext, label: &Label) -> Result<()> {
        ctx.check("create_or_update_label")?;
        self.write()?.labels.insert(label.id.clone(), label.clone());
        Ok(())
    }

    fn delete_label(&self, ctx: &OpContext, id: &str) -> Result<()> {
        ctx.check("delete_label")?;
        self.write()?.labels.remove(id);
        Ok(())
    }
}
