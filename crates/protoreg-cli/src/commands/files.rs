//! Files command: fetch and print or materialize a commit's file set.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use protoreg_core::context::OpContext;
use protoreg_registry::ModuleRef;

use super::open_registry;

#[derive(Debug, Args)]
pub struct FilesArgs {
    /// Module as owner/name
    pub module: String,

    /// Label name or commit id (defaults to the module's default label)
    #[arg(long = "ref", default_value = "")]
    pub reference: String,

    /// Write files into this directory instead of printing the listing
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, default_value = ".protoreg")]
    pub root: PathBuf,

    #[arg(long, default_value = "localhost")]
    pub host: String,
}

pub fn execute(args: FilesArgs) -> Result<(), Box<dyn std::error::Error>> {
    let module: ModuleRef = args.module.parse()?;
    let registry = open_registry(&args.root, &args.host)?;
    let ctx = OpContext::new();

    let (files, commit) = registry.files_and_commit(&ctx, &module, &args.reference)?;

    println!("{} at commit {}:", module, commit.id);

    match args.out {
        Some(out) => {
            for file in &files {
                // Stored manifests are validated on push, but never trust a
                // path before joining it under --out
                protoreg_core::manifest::validate_path(&file.path)?;
                let target = out.join(&file.path);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&target, &file.content)?;
            }
            println!("  wrote {} files to {}", files.len(), out.display());
        }
        None => {
            for file in &files {
                println!("  {}  {}", file.digest, file.path);
            }
        }
    }

    Ok(())
}
