//! Error facility for the module store.
//!
//! Every error carries a stable `ERR_*` code for programmatic handling and a
//! [`Status`] classification that maps one-to-one onto the external RPC status
//! the transport layer reports.

use thiserror::Error;

/// Result type alias using RegistryError
pub type Result<T> = std::result::Result<T, RegistryError>;

/// External status classification.
///
/// Each [`RegistryError`] variant maps to exactly one status; the RPC layer
/// translates these into wire status codes without inspecting variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    Unavailable,
    Cancelled,
    Internal,
}

impl Status {
    /// Get the wire-level status name
    pub fn code(&self) -> &'static str {
        match self {
            Status::NotFound => "NOT_FOUND",
            Status::AlreadyExists => "ALREADY_EXISTS",
            Status::InvalidArgument => "INVALID_ARGUMENT",
            Status::Unavailable => "UNAVAILABLE",
            Status::Cancelled => "CANCELLED",
            Status::Internal => "INTERNAL",
        }
    }
}

/// Error taxonomy for all module-store operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// A record, blob, or manifest was not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Primary key collision on create
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// A digest string failed to parse
    #[error("malformed digest {input:?}: {reason}")]
    MalformedDigest { input: String, reason: String },

    /// A module digest string carried a prefix other than shake256/b5
    #[error("unknown digest type: {prefix:?}")]
    UnknownDigestType { prefix: String },

    /// A manifest line did not split into digest and path
    #[error("malformed manifest line {line}: {reason}")]
    MalformedManifestLine { line: usize, reason: String },

    /// buf.lock content failed to parse
    #[error("malformed buf.lock: {reason}")]
    MalformedLock { reason: String },

    /// buf.lock file is absent
    #[error("buf.lock not found: {path}")]
    BufLockNotFound { path: String },

    /// B5 composition received a dependency digest that is not B5
    #[error("dependency digest is not b5: {digest}")]
    InvalidDepDigest { digest: String },

    /// A file path violated the relative-POSIX-path rules
    #[error("invalid file path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// A label name violated the non-empty / no-slash rules
    #[error("invalid label name {name:?}: {reason}")]
    InvalidLabelName { name: String, reason: String },

    /// A module reference did not split into `owner/name`
    #[error("invalid module reference {reference:?}: {reason}")]
    InvalidModuleRef { reference: String, reason: String },

    /// The operation context was cancelled
    #[error("operation cancelled: {op}")]
    Cancelled { op: String },

    /// Underlying storage reported a transient failure
    #[error("storage unavailable in {op}: {reason}")]
    Unavailable { op: String, reason: String },

    /// Filesystem I/O failure
    #[error("io error in {op}: {reason}")]
    Io { op: String, reason: String },

    /// Encoding or decoding failure
    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    /// Metadata persistence failure
    #[error("persistence error in {op}: {reason}")]
    Persistence { op: String, reason: String },

    /// Anything uncategorized
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl RegistryError {
    /// Create a NotFound error for the given entity kind and id
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        RegistryError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create an AlreadyExists error for the given entity kind and id
    pub fn already_exists(entity: &'static str, id: impl Into<String>) -> Self {
        RegistryError::AlreadyExists {
            entity,
            id: id.into(),
        }
    }

    /// Create an Internal error with the given reason
    pub fn internal(reason: impl Into<String>) -> Self {
        RegistryError::Internal {
            reason: reason.into(),
        }
    }

    /// Get the stable error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::NotFound { .. } => "ERR_NOT_FOUND",
            RegistryError::AlreadyExists { .. } => "ERR_ALREADY_EXISTS",
            RegistryError::MalformedDigest { .. } => "ERR_MALFORMED_DIGEST",
            RegistryError::UnknownDigestType { .. } => "ERR_UNKNOWN_DIGEST_TYPE",
            RegistryError::MalformedManifestLine { .. } => "ERR_MALFORMED_MANIFEST_LINE",
            RegistryError::MalformedLock { .. } => "ERR_MALFORMED_LOCK",
            RegistryError::BufLockNotFound { .. } => "ERR_BUF_LOCK_NOT_FOUND",
            RegistryError::InvalidDepDigest { .. } => "ERR_INVALID_DEP_DIGEST",
            RegistryError::InvalidPath { .. } => "ERR_INVALID_PATH",
            RegistryError::InvalidLabelName { .. } => "ERR_INVALID_LABEL_NAME",
            RegistryError::InvalidModuleRef { .. } => "ERR_INVALID_MODULE_REF",
            RegistryError::Cancelled { .. } => "ERR_CANCELLED",
            RegistryError::Unavailable { .. } => "ERR_UNAVAILABLE",
            RegistryError::Io { .. } => "ERR_IO",
            RegistryError::Serialization { .. } => "ERR_SERIALIZATION",
            RegistryError::Persistence { .. } => "ERR_PERSISTENCE",
            RegistryError::Internal { .. } => "ERR_INTERNAL",
        }
    }

    /// Get the external status classification for this error
    pub fn status(&self) -> Status {
        match self {
            RegistryError::NotFound { .. } | RegistryError::BufLockNotFound { .. } => {
                Status::NotFound
            }
            RegistryError::AlreadyExists { .. } => Status::AlreadyExists,
            RegistryError::MalformedDigest { .. }
            | RegistryError::UnknownDigestType { .. }
            | RegistryError::MalformedManifestLine { .. }
            | RegistryError::MalformedLock { .. }
            | RegistryError::InvalidPath { .. }
            | RegistryError::InvalidLabelName { .. }
            | RegistryError::InvalidModuleRef { .. } => Status::InvalidArgument,
            RegistryError::Unavailable { .. }
            | RegistryError::Io { .. }
            | RegistryError::Persistence { .. } => Status::Unavailable,
            RegistryError::Cancelled { .. } => Status::Cancelled,
            RegistryError::InvalidDepDigest { .. }
            | RegistryError::Serialization { .. }
            | RegistryError::Internal { .. } => Status::Internal,
        }
    }

    /// Check whether this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::NotFound { .. } | RegistryError::BufLockNotFound { .. }
        )
    }

    /// Check whether this is an AlreadyExists error
    pub fn is_already_exists(&self) -> bool {
        matches!(self, RegistryError::AlreadyExists { .. })
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Serialization {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                RegistryError::not_found("module", "m1"),
                Status::NotFound,
                "ERR_NOT_FOUND",
            ),
            (
                RegistryError::already_exists("owner", "o1"),
                Status::AlreadyExists,
                "ERR_ALREADY_EXISTS",
            ),
            (
                RegistryError::MalformedDigest {
                    input: "x".into(),
                    reason: "no prefix".into(),
                },
                Status::InvalidArgument,
                "ERR_MALFORMED_DIGEST",
            ),
            (
                RegistryError::InvalidDepDigest {
                    digest: "shake256:00".into(),
                },
                Status::Internal,
                "ERR_INVALID_DEP_DIGEST",
            ),
            (
                RegistryError::Cancelled {
                    op: "create_commit".into(),
                },
                Status::Cancelled,
                "ERR_CANCELLED",
            ),
            (
                RegistryError::Unavailable {
                    op: "put".into(),
                    reason: "disk".into(),
                },
                Status::Unavailable,
                "ERR_UNAVAILABLE",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status(), status, "wrong status for {:?}", err);
            assert_eq!(err.code(), code, "wrong code for {:?}", err);
        }
    }

    #[test]
    fn test_buf_lock_not_found_is_not_found() {
        let err = RegistryError::BufLockNotFound {
            path: "buf.lock".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.status(), Status::NotFound);
    }

    #[test]
    fn test_display_carries_context() {
        let err = RegistryError::not_found("commit", "abc123");
        assert_eq!(err.to_string(), "commit not found: abc123");
    }
}
