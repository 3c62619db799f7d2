//! protoreg-core - Content-addressable module store primitives
//!
//! This crate provides the foundational pieces of the module registry:
//! - SHAKE256 content digests and B4/B5 module digests
//! - The bit-exact manifest codec for ordered file sets
//! - Typed records (Owner, Module, Commit, Label) with deterministic ids
//! - The operation context with cancellation
//! - The error facility with stable codes and external status mapping

pub mod context;
pub mod digest;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod manifest;
pub mod model;

// Re-export commonly used types
pub use context::{CancelToken, OpContext, RequestId};
pub use digest::{shake256, Digest, ModuleDigest, ModuleDigestType};
pub use errors::{RegistryError, Result, Status};
pub use manifest::{Manifest, ManifestEntry};
pub use model::{Commit, Label, Module, Owner, DEFAULT_LABEL_NAME};
