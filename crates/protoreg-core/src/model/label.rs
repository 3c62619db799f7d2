use serde::{Deserialize, Serialize};

use crate::errors::{RegistryError, Result};
use crate::ids;

/// Label resolved when a caller supplies no reference and no labels
pub const DEFAULT_LABEL_NAME: &str = "main";

/// Label - a mutable pointer from a human-readable name to a commit.
///
/// A second upload targeting the same label rewrites `commit_id`; multiple
/// labels may point at one commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// `module_id/name`
    pub id: String,

    /// Id of the owning Module
    pub module_id: String,

    /// Label name (non-empty, no `/`)
    pub name: String,

    /// Commit the label currently points at
    pub commit_id: String,
}

impl Label {
    /// Create a new Label record pointing at the given commit
    pub fn new(
        module_id: impl Into<String>,
        name: impl Into<String>,
        commit_id: impl Into<String>,
    ) -> Self {
        let module_id = module_id.into();
        let name = name.into();
        Self {
            id: ids::label_id(&module_id, &name),
            module_id,
            name,
            commit_id: commit_id.into(),
        }
    }
}

/// Validate a label name: non-empty UTF-8, no `/`.
///
/// # Errors
///
/// Returns `InvalidLabelName` describing the violated rule.
pub fn validate_label_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RegistryError::InvalidLabelName {
            name: name.to_string(),
            reason: "empty label name".to_string(),
        });
    }
    if name.contains('/') {
        return Err(RegistryError::InvalidLabelName {
            name: name.to_string(),
            reason: "label names may not contain '/'".to_string(),
        });
    }
    Ok(())
}
