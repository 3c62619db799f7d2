//! Error helpers for the storage layer.
//!
//! Thin constructors that wrap protoreg-core's RegistryError with
//! store-specific context.

use protoreg_core::digest::Digest;
use protoreg_core::errors::RegistryError;

/// Result type alias using RegistryError
pub type Result<T> = protoreg_core::errors::Result<T>;

/// Create an IO error for a storage operation
pub fn io_error(op: &str, err: std::io::Error) -> RegistryError {
    RegistryError::Io {
        op: op.to_string(),
        reason: err.to_string(),
    }
}

/// Create a missing-blob error
pub fn blob_missing(digest: &Digest) -> RegistryError {
    RegistryError::not_found("blob", digest.to_string())
}

/// Create a missing-manifest error
pub fn manifest_missing(digest: &Digest) -> RegistryError {
    RegistryError::not_found("manifest", digest.to_string())
}

/// Create a persistence error from rusqlite::Error
pub fn from_rusqlite(op: &str, err: rusqlite::Error) -> RegistryError {
    RegistryError::Persistence {
        op: op.to_string(),
        reason: err.to_string(),
    }
}

/// Create a migration failure error
pub fn migration_error(migration_id: &str, reason: &str) -> RegistryError {
    RegistryError::Persistence {
        op: "migration".to_string(),
        reason: format!("migration {} failed: {}", migration_id, reason),
    }
}

/// Create a migration checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> RegistryError {
    RegistryError::internal(format!(
        "checksum mismatch for migration {}: expected {}, got {}",
        migration_id, expected, actual
    ))
}
