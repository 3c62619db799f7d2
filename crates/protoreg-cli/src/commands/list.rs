//! Listing commands: modules, commits, labels.

use std::path::PathBuf;

use clap::Args;
use protoreg_core::context::OpContext;
use protoreg_registry::ModuleRef;

use super::open_registry;

#[derive(Debug, Args)]
pub struct ModulesArgs {
    /// Owner name
    pub owner: String,

    #[arg(long, default_value = ".protoreg")]
    pub root: PathBuf,

    #[arg(long, default_value = "localhost")]
    pub host: String,
}

pub fn execute_modules(args: ModulesArgs) -> Result<(), Box<dyn std::error::Error>> {
    let registry = open_registry(&args.root, &args.host)?;
    let ctx = OpContext::new();

    for module in registry.list_modules(&ctx, &args.owner)? {
        println!("{}/{}  {}", module.owner, module.name, module.id);
    }

    Ok(())
}

#[derive(Debug, Args)]
pub struct CommitsArgs {
    /// Module as owner/name
    pub module: String,

    /// Page size (0 means the server default)
    #[arg(long, default_value_t = 0)]
    pub limit: usize,

    /// Resume listing after this commit id
    #[arg(long)]
    pub page_token: Option<String>,

    #[arg(long, default_value = ".protoreg")]
    pub root: PathBuf,

    #[arg(long, default_value = "localhost")]
    pub host: String,
}

pub fn execute_commits(args: CommitsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let module_ref: ModuleRef = args.module.parse()?;
    let registry = open_registry(&args.root, &args.host)?;
    let ctx = OpContext::new();

    let module = registry.module(&ctx, &module_ref.owner, &module_ref.name)?;
    let page = registry.list_commits(&ctx, &module.id, args.limit, args.page_token.as_deref())?;

    for commit in &page.commits {
        println!("{}  {}", commit.id, commit.module_digest);
    }
    if let Some(token) = page.next_page_token {
        println!("next page: --page-token {}", token);
    }

    Ok(())
}

#[derive(Debug, Args)]
pub struct LabelsArgs {
    /// Module as owner/name
    pub module: String,

    #[arg(long, default_value = ".protoreg")]
    pub root: PathBuf,

    #[arg(long, default_value = "localhost")]
    pub host: String,
}

pub fn execute_labels(args: LabelsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let module_ref: ModuleRef = args.module.parse()?;
    let registry = open_registry(&args.root, &args.host)?;
    let ctx = OpContext::new();

    let module = registry.module(&ctx, &module_ref.owner, &module_ref.name)?;
    for label in registry.list_labels(&ctx, &module.id)? {
        println!("{}  ->  {}", label.name, label.commit_id);
    }

    Ok(())
}
