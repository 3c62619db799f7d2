//! Push command: upload a directory of module files as a commit.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use protoreg_core::context::OpContext;
use protoreg_registry::{CommitInput, ModuleRef};

use super::open_registry;

#[derive(Debug, Args)]
pub struct PushArgs {
    /// Target module as owner/name
    pub module: String,

    /// Directory holding the module's files
    #[arg(long)]
    pub dir: PathBuf,

    /// Label(s) to point at the commit (defaults to the module's default label)
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Source control URL the files were assembled from
    #[arg(long)]
    pub source_control_url: Option<String>,

    /// Dependency commit id(s)
    #[arg(long = "dep")]
    pub dep_commit_ids: Vec<String>,

    #[arg(long, default_value = ".protoreg")]
    pub root: PathBuf,

    #[arg(long, default_value = "localhost")]
    pub host: String,
}

pub fn execute(args: PushArgs) -> Result<(), Box<dyn std::error::Error>> {
    let module: ModuleRef = args.module.parse()?;
    let registry = open_registry(&args.root, &args.host)?;
    let ctx = OpContext::new();

    let files = collect_files(&args.dir)?;
    if files.is_empty() {
        return Err(format!("no files found under {}", args.dir.display()).into());
    }
    let file_count = files.len();

    let commit = registry.create_commit(
        &ctx,
        &module,
        CommitInput {
            files,
            labels: args.labels,
            source_control_url: args.source_control_url,
            dep_commit_ids: args.dep_commit_ids,
            created_by_user_id: None,
        },
    )?;

    println!("Pushed {} ({} files):", module, file_count);
    println!("  commit: {}", commit.id);
    println!("  files_digest: {}", commit.files_digest);
    println!("  module_digest: {}", commit.module_digest);

    Ok(())
}

/// Collect `(relative path, content)` pairs under `base`, sorted by path
fn collect_files(base: &Path) -> Result<Vec<(String, Vec<u8>)>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    let mut stack = vec![base.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let relative = path
                    .strip_prefix(base)?
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                files.push((relative, fs::read(&path)?));
            }
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_files_relative_sorted() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("z.proto"), b"z").unwrap();
        fs::write(dir.path().join("nested/a.proto"), b"a").unwrap();

        let files = collect_files(dir.path()).unwrap();
        let paths: Vec<&str> = files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, ["nested/a.proto", "z.proto"]);
        assert_eq!(files[0].1, b"a");
    }
}
