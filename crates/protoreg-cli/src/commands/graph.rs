//! Graph command: resolve and print a module's dependency graph.

use std::path::PathBuf;

use clap::Args;
use protoreg_core::context::OpContext;
use protoreg_registry::{resolve_graph, GraphSeed, ModuleRef};

use super::open_registry;

#[derive(Debug, Args)]
pub struct GraphArgs {
    /// Root module as owner/name
    pub module: String,

    /// Label name or commit id (defaults to the module's default label)
    #[arg(long = "ref", default_value = "")]
    pub reference: String,

    #[arg(long, default_value = ".protoreg")]
    pub root: PathBuf,

    #[arg(long, default_value = "localhost")]
    pub host: String,
}

pub fn execute(args: GraphArgs) -> Result<(), Box<dyn std::error::Error>> {
    let module: ModuleRef = args.module.parse()?;
    let registry = open_registry(&args.root, &args.host)?;
    let ctx = OpContext::new();

    let graph = resolve_graph(
        &ctx,
        &registry,
        &[GraphSeed::new(module, args.reference)],
    )?;

    println!("nodes:");
    for node in &graph.nodes {
        println!(
            "  {}/{}/{}  {}  {}",
            node.remote, node.owner, node.module, node.commit_id, node.digest
        );
    }

    println!("edges:");
    for edge in &graph.edges {
        println!("  {} -> {}", edge.from_commit_id, edge.to_commit_id);
    }

    Ok(())
}
