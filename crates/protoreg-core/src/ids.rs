//! Deterministic record identifiers.
//!
//! Owner and module ids are pure functions of their names, so two instances
//! ingesting the same `(owner, name)` derive the same ids. Commit ids are
//! freshly generated UUIDv7 values with the dashes removed; their
//! lexicographic order equals creation order, which the graph resolver's
//! newest-wins rule relies on.

use crate::digest::shake256;
use uuid::Uuid;

/// Length of derived and generated ids in hex characters
pub const ID_LENGTH: usize = 32;

/// Derive the deterministic owner id from an owner name
pub fn owner_id(name: &str) -> String {
    truncated_shake(name.as_bytes())
}

/// Derive the deterministic module id from an owner id and module name.
///
/// The `/` separator is load-bearing: without it `("a", "bc")` and
/// `("ab", "c")` would collide.
pub fn module_id(owner_id: &str, name: &str) -> String {
    truncated_shake(format!("{}/{}", owner_id, name).as_bytes())
}

/// Derive the label id from its module id and label name
pub fn label_id(module_id: &str, name: &str) -> String {
    format!("{}/{}", module_id, name)
}

/// Generate a fresh time-sortable commit id (UUIDv7, dashes removed)
pub fn new_commit_id() -> String {
    Uuid::now_v7().simple().to_string()
}

fn truncated_shake(input: &[u8]) -> String {
    let mut id = hex::encode(shake256(input));
    id.truncate(ID_LENGTH);
    id
}
