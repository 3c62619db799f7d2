use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids;

/// Owner - a namespace (user or organization) for modules.
///
/// Owner records materialize lazily: the first write path that references an
/// owner name creates the record with its deterministic id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    /// Deterministic 32-hex-char derivation of `name`
    pub id: String,

    /// Owner name, unique across the registry
    pub name: String,

    /// Timestamp when this owner was first materialized
    pub create_time: DateTime<Utc>,
}

impl Owner {
    /// Create a new Owner record for the given name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: ids::owner_id(&name),
            name,
            create_time: Utc::now(),
        }
    }
}
