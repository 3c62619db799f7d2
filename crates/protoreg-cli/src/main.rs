//! protoreg CLI
//!
//! Administration interface for a local module registry store.

use clap::{Parser, Subcommand};
use protoreg_core::logging;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "protoreg")]
#[command(about = "protoreg - Content-addressable protobuf module registry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Push a directory of module files as a commit
    Push(commands::push::PushArgs),
    /// Fetch a commit's file set
    Files(commands::files::FilesArgs),
    /// List an owner's modules
    Modules(commands::list::ModulesArgs),
    /// List a module's commits
    Commits(commands::list::CommitsArgs),
    /// List a module's labels
    Labels(commands::list::LabelsArgs),
    /// Resolve a module's dependency graph
    Graph(commands::graph::GraphArgs),
}

fn main() {
    logging::init(logging::Profile::Development);

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Push(args) => commands::push::execute(args),
        Commands::Files(args) => commands::files::execute(args),
        Commands::Modules(args) => commands::list::execute_modules(args),
        Commands::Commits(args) => commands::list::execute_commits(args),
        Commands::Labels(args) => commands::list::execute_labels(args),
        Commands::Graph(args) => commands::graph::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
