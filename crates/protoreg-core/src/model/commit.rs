use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::{Digest, ModuleDigest};
use crate::ids;

/// Commit - an immutable snapshot of a module's file set.
///
/// The id is a freshly generated UUIDv7 with the dashes removed, so ids sort
/// lexicographically in creation order. Within one module the `files_digest`
/// uniquely identifies a commit; a second write with the same digest returns
/// the existing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Time-sortable 32-hex-char identifier
    pub id: String,

    /// Id of the owning Module
    pub module_id: String,

    /// Id of the module's Owner
    pub owner_id: String,

    /// Content digest of the commit's manifest (the B4 value)
    pub files_digest: Digest,

    /// Module digest (B5) of this version
    pub module_digest: ModuleDigest,

    /// Timestamp when this commit was created
    pub create_time: DateTime<Utc>,

    /// User that created the commit, when known
    pub created_by_user_id: Option<String>,

    /// Source control URL the file set was assembled from, when known
    pub source_control_url: Option<String>,

    /// Commit ids of locally hosted dependencies
    pub dep_commit_ids: Vec<String>,
}

impl Commit {
    /// Create a new Commit record with a fresh time-sortable id
    pub fn new(
        module_id: impl Into<String>,
        owner_id: impl Into<String>,
        files_digest: Digest,
        module_digest: ModuleDigest,
        dep_commit_ids: Vec<String>,
    ) -> Self {
        Self {
            id: ids::new_commit_id(),
            module_id: module_id.into(),
            owner_id: owner_id.into(),
            files_digest,
            module_digest,
            create_time: Utc::now(),
            created_by_user_id: None,
            source_control_url: None,
            dep_commit_ids,
        }
    }

    /// Set the source control URL
    pub fn with_source_control_url(mut self, url: Option<String>) -> Self {
        self.source_control_url = url;
        self
    }

    /// Set the creating user id
    pub fn with_created_by(mut self, user_id: Option<String>) -> Self {
        self.created_by_user_id = user_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;

    #[test]
    fn test_new_commit_generates_time_sortable_id() {
        let manifest = Manifest::default();
        let first = Commit::new(
            "m1",
            "o1",
            manifest.digest(),
            ModuleDigest::b5(&manifest, &[]).unwrap(),
            vec![],
        );
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = Commit::new(
            "m1",
            "o1",
            manifest.digest(),
            ModuleDigest::b5(&manifest, &[]).unwrap(),
            vec![],
        );

        assert_eq!(first.id.len(), 32);
        assert!(second.id > first.id);
        assert!(first.dep_commit_ids.is_empty());
    }
}
