//! Transitive dependency graph resolution.
//!
//! Walks `dep_commit_ids` depth-first over locally hosted dependencies,
//! deduplicates by `(owner, name)`, and arbitrates version conflicts by
//! commit-id ordering: commit ids are time-sortable, so the lexicographically
//! larger id is the newer version and wins. When a newer candidate replaces
//! an earlier selection, already-emitted edges pointing at the old commit are
//! rewritten to the winner.
//!
//! Dependencies whose commit is not hosted locally are resolved through the
//! referencing commit's bundled `buf.lock`: entries for another registry are
//! emitted as nodes and edges with their id and digest taken as given, but
//! never recursed into. Dep commit ids with no local record and no lock
//! entry are silently omitted.

use std::collections::HashMap;

use protoreg_core::context::OpContext;
use protoreg_core::errors::Result;
use protoreg_core::model::Commit;
use protoreg_store::blob::BlobStore;
use protoreg_store::metadata::MetadataStore;

use crate::lock::{parse_buf_lock, BufLock, BUF_LOCK_PATH};
use crate::registry::{ModuleRef, Registry};

/// One graph request root: a module plus a reference string
#[derive(Debug, Clone)]
pub struct GraphSeed {
    /// Module to root the graph at
    pub module: ModuleRef,
    /// Label name or commit id; empty means the module's default label
    pub reference: String,
}

impl GraphSeed {
    /// Create a seed for the given module and reference
    pub fn new(module: ModuleRef, reference: impl Into<String>) -> Self {
        Self {
            module,
            reference: reference.into(),
        }
    }
}

/// One resolved module version
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// Registry host serving this node
    pub remote: String,
    /// Owner name
    pub owner: String,
    /// Module name
    pub module: String,
    /// Selected commit id
    pub commit_id: String,
    /// Module digest string of the selected commit
    pub digest: String,
}

/// Directed dependency edge between two commits
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    /// Commit id of the dependent
    pub from_commit_id: String,
    /// Commit id of the dependency
    pub to_commit_id: String,
}

/// Resolved dependency graph
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Selected nodes; each `(owner, name)` appears at most once
    pub nodes: Vec<GraphNode>,
    /// Edges; every target equals the finally selected commit for its key
    pub edges: Vec<GraphEdge>,
}

/// Resolve the dependency graph rooted at the given seeds.
///
/// Seeds are expanded in input order; each `(owner, name)` is expanded at
/// most once, so the traversal terminates in O(commits + edges).
pub fn resolve_graph<B: BlobStore, M: MetadataStore>(
    ctx: &OpContext,
    registry: &Registry<B, M>,
    seeds: &[GraphSeed],
) -> Result<Graph> {
    let mut traversal = Traversal {
        ctx,
        registry,
        selected: HashMap::new(),
        nodes: Vec::new(),
        edges: Vec::new(),
    };

    // Seed phase: emit every root as a node before expanding any of them
    let mut roots = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let commit = registry.commit(ctx, &seed.module, &seed.reference)?;
        let node = GraphNode {
            remote: registry.host().to_string(),
            owner: seed.module.owner.clone(),
            module: seed.module.name.clone(),
            commit_id: commit.id.clone(),
            digest: commit.module_digest.to_string(),
        };
        traversal.insert_root(node);
        roots.push(commit);
    }

    for commit in &roots {
        traversal.expand(commit)?;
    }

    Ok(Graph {
        nodes: traversal.nodes,
        edges: traversal
            .edges
            .into_iter()
            .map(|e| GraphEdge {
                from_commit_id: e.from,
                to_commit_id: e.to,
            })
            .collect(),
    })
}

struct EdgeRecord {
    from: String,
    to: String,
    /// `(owner, name)` key of the target, for conflict rewrites
    to_key: String,
}

struct Traversal<'a, B, M> {
    ctx: &'a OpContext,
    registry: &'a Registry<B, M>,
    /// `(owner, name)` key to index into `nodes`
    selected: HashMap<String, usize>,
    nodes: Vec<GraphNode>,
    edges: Vec<EdgeRecord>,
}

fn node_key(node: &GraphNode) -> String {
    format!("{}/{}", node.owner, node.module)
}

impl<B: BlobStore, M: MetadataStore> Traversal<'_, B, M> {
    fn insert_root(&mut self, node: GraphNode) {
        let key = node_key(&node);
        match self.selected.get(&key) {
            None => {
                self.selected.insert(key, self.nodes.len());
                self.nodes.push(node);
            }
            Some(&idx) => {
                // Two seeds naming the same module: newest wins
                if node.commit_id > self.nodes[idx].commit_id {
                    self.nodes[idx] = node;
                }
            }
        }
    }

    fn expand(&mut self, commit: &Commit) -> Result<()> {
        self.ctx.check("resolve_graph")?;

        // The commit's buf.lock is only consulted for deps that are not
        // hosted locally; parse it at most once
        let mut lock: Option<Option<BufLock>> = None;

        for dep_id in &commit.dep_commit_ids {
            match self.registry.commit_record(self.ctx, dep_id) {
                Ok(dep_commit) => {
                    let module = self
                        .registry
                        .module_by_id(self.ctx, &dep_commit.module_id)?;
                    let node = GraphNode {
                        remote: self.registry.host().to_string(),
                        owner: module.owner.clone(),
                        module: module.name.clone(),
                        commit_id: dep_commit.id.clone(),
                        digest: dep_commit.module_digest.to_string(),
                    };
                    self.arbitrate(&commit.id, node, Some(&dep_commit))?;
                }
                Err(e) if e.is_not_found() => {
                    if lock.is_none() {
                        lock = Some(self.lock_for_commit(commit)?);
                    }
                    let parsed = lock.as_ref().and_then(|l| l.as_ref());
                    let Some(entry) = parsed.and_then(|l| l.dep_by_commit(dep_id)) else {
                        // Not hosted here and not pinned in the lock: omitted
                        tracing::debug!(
                            from_commit_id = %commit.id,
                            dep_commit_id = %dep_id,
                            "unresolvable dependency omitted from graph"
                        );
                        continue;
                    };
                    let node = GraphNode {
                        remote: entry.remote.clone(),
                        owner: entry.owner.clone(),
                        module: entry.repository.clone(),
                        commit_id: entry.commit.clone(),
                        digest: entry.digest.clone(),
                    };
                    self.arbitrate(&commit.id, node, None)?;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Dedup and conflict arbitration keyed by `(owner, name)`.
    ///
    /// `dep_commit` is present for locally hosted candidates and drives
    /// recursion; cross-registry candidates pass `None`.
    fn arbitrate(
        &mut self,
        from_commit_id: &str,
        node: GraphNode,
        dep_commit: Option<&Commit>,
    ) -> Result<()> {
        let key = node_key(&node);

        let Some(&idx) = self.selected.get(&key) else {
            // First sighting of this (owner, name)
            self.selected.insert(key.clone(), self.nodes.len());
            self.edges.push(EdgeRecord {
                from: from_commit_id.to_string(),
                to: node.commit_id.clone(),
                to_key: key,
            });
            let local = node.remote == self.registry.host();
            self.nodes.push(node);

            if local {
                if let Some(dep_commit) = dep_commit {
                    self.expand(dep_commit)?;
                }
            }
            return Ok(());
        };

        let selected_id = self.nodes[idx].commit_id.clone();
        if node.commit_id == selected_id {
            // Same version reached again: edge only, no second expansion
            self.edges.push(EdgeRecord {
                from: from_commit_id.to_string(),
                to: selected_id,
                to_key: key,
            });
        } else if node.commit_id > selected_id {
            // Newer candidate wins: replace the node and retarget every
            // already-emitted edge for this key
            let winner_id = node.commit_id.clone();
            self.nodes[idx] = node;
            for edge in &mut self.edges {
                if edge.to_key == key {
                    edge.to = winner_id.clone();
                }
            }
            self.edges.push(EdgeRecord {
                from: from_commit_id.to_string(),
                to: winner_id,
                to_key: key,
            });
        } else {
            // Older candidate: discard it, but the dependent still depends
            // on this (owner, name)
            self.edges.push(EdgeRecord {
                from: from_commit_id.to_string(),
                to: selected_id,
                to_key: key,
            });
        }

        Ok(())
    }

    fn lock_for_commit(&self, commit: &Commit) -> Result<Option<BufLock>> {
        match self.registry.commit_file(self.ctx, commit, BUF_LOCK_PATH)? {
            Some(bytes) => {
                let text =
                    String::from_utf8(bytes).map_err(|e| {
                        protoreg_core::RegistryError::MalformedLock {
                            reason: format!("buf.lock is not valid UTF-8: {}", e),
                        }
                    })?;
                Ok(Some(parse_buf_lock(&text)?))
            }
            None => Ok(None),
        }
    }
}
