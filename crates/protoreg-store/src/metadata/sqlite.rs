//! SQLite metadata store.
//!
//! Four tables mirror the logical collections; the `(owner, name)`,
//! `(module_id, files_digest)`, and per-module indexes live in the schema.
//! Digest columns hold canonical string forms and are re-parsed on read.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};

use protoreg_core::context::OpContext;
use protoreg_core::digest::{Digest, ModuleDigest};
use protoreg_core::model::{Commit, Label, Module, Owner};
use protoreg_core::RegistryError;

use super::{effective_limit, CommitPage, MetadataStore};
use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;

/// Metadata store backed by a SQLite database
pub struct SqliteMetadataStore {
    conn: Mutex<Connection>,
}

impl SqliteMetadataStore {
    /// Open (and migrate) the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| from_rusqlite("open", e))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| from_rusqlite("open_in_memory", e))?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| from_rusqlite("pragma_journal_mode", e))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| from_rusqlite("pragma_foreign_keys", e))?;

        apply_migrations(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RegistryError::internal("metadata connection lock poisoned"))
    }
}

fn timestamp(ms: i64, column: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp_millis(ms).ok_or_else(|| RegistryError::Persistence {
        op: "decode_row".to_string(),
        reason: format!("{} out of range: {}", column, ms),
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// Raw column tuples read inside rusqlite row closures; digest and JSON
// parsing happens outside so parse failures surface as RegistryError.

type OwnerRow = (String, String, i64);

fn owner_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OwnerRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn owner_from_row((id, name, create_time): OwnerRow) -> Result<Owner> {
    Ok(Owner {
        id,
        name,
        create_time: timestamp(create_time, "create_time")?,
    })
}

type ModuleRow = (String, String, String, String, String, String, i64, i64);

fn module_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ModuleRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn module_from_row(row: ModuleRow) -> Result<Module> {
    let (id, owner_id, owner, name, description, default_label_name, create_time, update_time) =
        row;
    Ok(Module {
        id,
        owner_id,
        owner,
        name,
        description,
        default_label_name,
        create_time: timestamp(create_time, "create_time")?,
        update_time: timestamp(update_time, "update_time")?,
    })
}

type CommitRow = (
    String,
    String,
    String,
    String,
    String,
    i64,
    Option<String>,
    Option<String>,
    String,
);

fn commit_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommitRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn commit_from_row(row: CommitRow) -> Result<Commit> {
    let (
        id,
        module_id,
        owner_id,
        files_digest,
        module_digest,
        create_time,
        created_by_user_id,
        source_control_url,
        dep_commit_ids,
    ) = row;
    Ok(Commit {
        id,
        module_id,
        owner_id,
        files_digest: Digest::parse(&files_digest)?,
        module_digest: ModuleDigest::parse(&module_digest)?,
        create_time: timestamp(create_time, "create_time")?,
        created_by_user_id,
        source_control_url,
        dep_commit_ids: serde_json::from_str(&dep_commit_ids)?,
    })
}

const COMMIT_COLUMNS: &str = "id, module_id, owner_id, files_digest, module_digest, \
     create_time, created_by_user_id, source_control_url, dep_commit_ids";

impl MetadataStore for SqliteMetadataStore {
    fn get_owner(&self, ctx: &OpContext, id: &str) -> Result<Owner> {
        ctx.check("get_owner")?;
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, name, create_time FROM owners WHERE id = ?1",
                [id],
                owner_row,
            )
            .optional()
            .map_err(|e| from_rusqlite("get_owner", e))?
            .ok_or_else(|| RegistryError::not_found("owner", id))?;
        owner_from_row(row)
    }

    fn get_owner_by_name(&self, ctx: &OpContext, name: &str) -> Result<Owner> {
        ctx.check("get_owner_by_name")?;
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, name, create_time FROM owners WHERE name = ?1",
                [name],
                owner_row,
            )
            .optional()
            .map_err(|e| from_rusqlite("get_owner_by_name", e))?
            .ok_or_else(|| RegistryError::not_found("owner", name))?;
        owner_from_row(row)
    }

    fn list_owners(&self, ctx: &OpContext) -> Result<Vec<Owner>> {
        ctx.check("list_owners")?;
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, name, create_time FROM owners ORDER BY name")
            .map_err(|e| from_rusqlite("list_owners", e))?;
        let rows: Vec<OwnerRow> = stmt
            .query_map([], owner_row)
            .map_err(|e| from_rusqlite("list_owners", e))?
            .collect::<rusqlite::Result<_>>()
            .map_err(|e| from_rusqlite("list_owners", e))?;
        rows.into_iter().map(owner_from_row).collect()
    }

    fn create_owner(&self, ctx: &OpContext, owner: &Owner) -> Result<()> {
        ctx.check("create_owner")?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO owners (id, name, create_time) VALUES (?1, ?2, ?3)",
            rusqlite::params![owner.id, owner.name, owner.create_time.timestamp_millis()],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                RegistryError::already_exists("owner", &owner.id)
            } else {
                from_rusqlite("create_owner", e)
            }
        })?;
        Ok(())
    }

    fn get_module(&self, ctx: &OpContext, id: &str) -> Result<Module> {
        ctx.check("get_module")?;
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, owner_id, owner, name, description, default_label_name, \
                 create_time, update_time FROM modules WHERE id = ?1",
                [id],
                module_row,
            )
            .optional()
            .map_err(|e| from_rusqlite("get_module", e))?
            .ok_or_else(|| RegistryError::not_found("module", id))?;
        module_from_row(row)
    }

    fn get_module_by_name(&self, ctx: &OpContext, owner: &str, name: &str) -> Result<Module> {
        ctx.check("get_module_by_name")?;
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, owner_id, owner, name, description, default_label_name, \
                 create_time, update_time FROM modules WHERE owner = ?1 AND name = ?2",
                [owner, name],
                module_row,
            )
            .optional()
            .map_err(|e| from_rusqlite("get_module_by_name", e))?
            .ok_or_else(|| RegistryError::not_found("module", format!("{}/{}", owner, name)))?;
        module_from_row(row)
    }

    fn list_modules(&self, ctx: &OpContext, owner_id: &str) -> Result<Vec<Module>> {
        ctx.check("list_modules")?;
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, owner_id, owner, name, description, default_label_name, \
                 create_time, update_time FROM modules WHERE owner_id = ?1 ORDER BY name",
            )
            .map_err(|e| from_rusqlite("list_modules", e))?;
        let rows: Vec<ModuleRow> = stmt
            .query_map([owner_id], module_row)
            .map_err(|e| from_rusqlite("list_modules", e))?
            .collect::<rusqlite::Result<_>>()
            .map_err(|e| from_rusqlite("list_modules", e))?;
        rows.into_iter().map(module_from_row).collect()
    }

    fn create_module(&self, ctx: &OpContext, module: &Module) -> Result<()> {
        ctx.check("create_module")?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO modules (id, owner_id, owner, name, description, default_label_name, \
             create_time, update_time) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                module.id,
                module.owner_id,
                module.owner,
                module.name,
                module.description,
                module.default_label_name,
                module.create_time.timestamp_millis(),
                module.update_time.timestamp_millis(),
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                RegistryError::already_exists("module", &module.id)
            } else {
                from_rusqlite("create_module", e)
            }
        })?;
        Ok(())
    }

    fn update_module(&self, ctx: &OpContext, module: &Module) -> Result<()> {
        ctx.check("update_module")?;
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE modules SET description = ?2, default_label_name = ?3, update_time = ?4 \
                 WHERE id = ?1",
                rusqlite::params![
                    module.id,
                    module.description,
                    module.default_label_name,
                    module.update_time.timestamp_millis(),
                ],
            )
            .map_err(|e| from_rusqlite("update_module", e))?;
        if updated == 0 {
            return Err(RegistryError::not_found("module", &module.id));
        }
        Ok(())
    }

    fn delete_module(&self, ctx: &OpContext, id: &str) -> Result<()> {
        ctx.check("delete_module")?;
        let conn = self.conn()?;
        conn.execute("DELETE FROM modules WHERE id = ?1", [id])
            .map_err(|e| from_rusqlite("delete_module", e))?;
        Ok(())
    }

    fn get_commit(&self, ctx: &OpContext, id: &str) -> Result<Commit> {
        ctx.check("get_commit")?;
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM commits WHERE id = ?1", COMMIT_COLUMNS),
                [id],
                commit_row,
            )
            .optional()
            .map_err(|e| from_rusqlite("get_commit", e))?
            .ok_or_else(|| RegistryError::not_found("commit", id))?;
        commit_from_row(row)
    }

    fn get_commit_by_files_digest(
        &self,
        ctx: &OpContext,
        module_id: &str,
        files_digest: &Digest,
    ) -> Result<Commit> {
        ctx.check("get_commit_by_files_digest")?;
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM commits WHERE module_id = ?1 AND files_digest = ?2",
                    COMMIT_COLUMNS
                ),
                rusqlite::params![module_id, files_digest.to_string()],
                commit_row,
            )
            .optional()
            .map_err(|e| from_rusqlite("get_commit_by_files_digest", e))?
            .ok_or_else(|| RegistryError::not_found("commit", files_digest.to_string()))?;
        commit_from_row(row)
    }

    fn list_commits(
        &self,
        ctx: &OpContext,
        module_id: &str,
        limit: usize,
        page_token: Option<&str>,
    ) -> Result<CommitPage> {
        ctx.check("list_commits")?;
        let limit = effective_limit(limit);

        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM commits \
                 WHERE module_id = ?1 AND (?2 IS NULL OR id < ?2) \
                 ORDER BY id DESC LIMIT ?3",
                COMMIT_COLUMNS
            ))
            .map_err(|e| from_rusqlite("list_commits", e))?;
        let rows: Vec<CommitRow> = stmt
            .query_map(
                rusqlite::params![module_id, page_token, (limit + 1) as i64],
                commit_row,
            )
            .map_err(|e| from_rusqlite("list_commits", e))?
            .collect::<rusqlite::Result<_>>()
            .map_err(|e| from_rusqlite("list_commits", e))?;

        let has_more = rows.len() > limit;
        let mut commits = rows
            .into_iter()
            .map(commit_from_row)
            .collect::<Result<Vec<Commit>>>()?;
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
        let conn = self.conn()?;

        // Idempotent replay of the same commit id
        let exists: Option<i64> = conn
            .query_row("SELECT 1 FROM commits WHERE id = ?1", [&commit.id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| from_rusqlite("create_commit", e))?;
        if exists.is_some() {
            return Ok(());
        }

        conn.execute(
            "INSERT INTO commits (id, module_id, owner_id, files_digest, module_digest, \
             create_time, created_by_user_id, source_control_url, dep_commit_ids) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                commit.id,
                commit.module_id,
                commit.owner_id,
                commit.files_digest.to_string(),
                commit.module_digest.to_string(),
                commit.create_time.timestamp_millis(),
                commit.created_by_user_id,
                commit.source_control_url,
                serde_json::to_string(&commit.dep_commit_ids)?,
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                RegistryError::already_exists("commit", &commit.id)
            } else {
                from_rusqlite("create_commit", e)
            }
        })?;

        tracing::debug!(
            commit_id = %commit.id,
            module_id = %commit.module_id,
            files_digest = %commit.files_digest,
            "created commit record"
        );

        Ok(())
    }

    fn get_label(&self, ctx: &OpContext, id: &str) -> Result<Label> {
        ctx.check("get_label")?;
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, module_id, name, commit_id FROM labels WHERE id = ?1",
            [id],
            |row| {
                Ok(Label {
                    id: row.get(0)?,
                    module_id: row.get(1)?,
                    name: row.get(2)?,
                    commit_id: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(|e| from_rusqlite("get_label", e))?
        .ok_or_else(|| RegistryError::not_found("label", id))
    }

    fn list_labels(&self, ctx: &OpContext, module_id: &str) -> Result<Vec<Label>> {
        ctx.check("list_labels")?;
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, module_id, name, commit_id FROM labels \
                 WHERE module_id = ?1 ORDER BY name",
            )
            .map_err(|e| from_rusqlite("list_labels", e))?;
        let labels = stmt
            .query_map([module_id], |row| {
                Ok(Label {
                    id: row.get(0)?,
                    module_id: row.get(1)?,
                    name: row.get(2)?,
                    commit_id: row.get(3)?,
                })
            })
            .map_err(|e| from_rusqlite("list_labels", e))?
            .collect::<rusqlite::Result<Vec<Label>>>()
            .map_err(|e| from_rusqlite("list_labels", e))?;
        Ok(labels)
    }

    fn create_or_update_label(&self, ctx: &OpContext, label: &Label) -> Result<()> {
        ctx.check("create_or_update_label")?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO labels (id, module_id, name, commit_id) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT (id) DO UPDATE SET commit_id = excluded.commit_id",
            rusqlite::params![label.id, label.module_id, label.name, label.commit_id],
        )
        .map_err(|e| from_rusqlite("create_or_update_label", e))?;
        Ok(())
    }

    fn delete_label(&self, ctx: &OpContext, id: &str) -> Result<()> {
        ctx.check("delete_label")?;
        let conn = self.conn()?;
        conn.execute("DELETE FROM labels WHERE id = ?1", [id])
            .map_err(|e| from_rusqlite("delete_label", e))?;
        Ok(())
    }
}
