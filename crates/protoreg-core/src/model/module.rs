use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::owner::Owner;
use super::DEFAULT_LABEL_NAME;
use crate::ids;

/// Module - a namespaced collection of commits, owned by an Owner.
///
/// `(owner, name)` is unique; the id is a deterministic derivation of
/// `(owner_id, name)` so two instances serving the same pair derive the same
/// module id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Deterministic 32-hex-char derivation of `(owner_id, name)`
    pub id: String,

    /// Id of the owning Owner
    pub owner_id: String,

    /// Owner name, denormalized for `(owner, name)` lookups
    pub owner: String,

    /// Module name within the owner namespace
    pub name: String,

    /// Free-form description
    pub description: String,

    /// Label resolved when a reference string is empty
    pub default_label_name: String,

    /// Timestamp when this module was created
    pub create_time: DateTime<Utc>,

    /// Timestamp of the last metadata update
    pub update_time: DateTime<Utc>,
}

impl Module {
    /// Create a new Module record under the given owner
    pub fn new(owner: &Owner, name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: ids::module_id(&owner.id, &name),
            owner_id: owner.id.clone(),
            owner: owner.name.clone(),
            name,
            description: description.into(),
            default_label_name: DEFAULT_LABEL_NAME.to_string(),
            create_time: now,
            update_time: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_module_derives_id_and_default_label() {
        let owner = Owner::new("acme");
        let module = Module::new(&owner, "petstore", "pet APIs");

        assert_eq!(module.id, ids::module_id(&owner.id, "petstore"));
        assert_eq!(module.owner_id, owner.id);
        assert_eq!(module.owner, "acme");
        assert_eq!(module.default_label_name, DEFAULT_LABEL_NAME);
    }
}
