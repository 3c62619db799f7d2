//! protoreg-registry - The content-addressable module store façade
//!
//! Composes the storage layer into the public registry operations:
//! - Module CRUD with lazily materialized owners
//! - Commit creation with blob/manifest/commit dedup and label upserts
//! - File reassembly from stored manifests and blobs
//! - Transitive dependency graph resolution with newest-wins arbitration
//! - The buf.lock wire-format parser

pub mod graph;
pub mod lock;
pub mod registry;

// Re-export commonly used types
pub use graph::{resolve_graph, Graph, GraphEdge, GraphNode, GraphSeed};
pub use lock::{parse_buf_lock, read_buf_lock, BufLock, LockDep, BUF_LOCK_PATH};
pub use registry::{CommitInput, File, ModuleRef, Registry};
