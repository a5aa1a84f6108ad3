//! depgraph CLI — command-line driver for the dependency-graph compiler.
//!
//! Calls `depgraph-core` directly with no server overhead.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use depgraph_core::{build_graph, summarize_selection, BuildOptions, Entry, SelectionOptions};

/// depgraph — build and query deterministic dependency graphs.
#[derive(Parser)]
#[command(name = "depgraph", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the dependency graph for a repository root
    Build {
        /// Repository root (default: current directory)
        path: Option<PathBuf>,

        /// Extra include globs (repeatable)
        #[arg(long = "include")]
        includes: Vec<String>,

        /// Extra exclude globs (repeatable)
        #[arg(long = "exclude")]
        excludes: Vec<String>,
    },
    /// Build the graph, then summarize a selection closure over it
    Select {
        /// Repository root (default: current directory)
        path: Option<PathBuf>,

        /// Node ids to include in the closure (repeatable)
        #[arg(long = "include")]
        includes: Vec<String>,

        /// Node ids to exclude from the closure (repeatable)
        #[arg(long = "exclude")]
        excludes: Vec<String>,
    },
}

fn resolve_root(path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(|| std::env::current_dir().expect("could not determine current directory"))
        .canonicalize()
        .expect("path not found")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("depgraph_core=info".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { path, includes, excludes } => {
            let cwd = resolve_root(path);
            let mut options = BuildOptions::new(cwd);
            options.includes = includes;
            options.excludes = excludes;

            let result = build_graph(&options).expect("build_graph failed");

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result).unwrap());
            } else {
                println!(
                    "modules={} edges={} dirty={}",
                    result.stats.modules, result.stats.edges, result.stats.dirty
                );
                for error in &result.errors {
                    eprintln!("{error}");
                }
            }
        }
        Commands::Select { path, includes, excludes } => {
            let cwd = resolve_root(path);
            let options = BuildOptions::new(cwd);
            let result = build_graph(&options).expect("build_graph failed");

            let include: Vec<Entry> = includes.into_iter().map(Entry::Id).collect();
            let exclude: Vec<Entry> = excludes.into_iter().map(Entry::Id).collect();

            let summary = summarize_selection(&result.graph, &include, &exclude, &SelectionOptions::default())
                .expect("summarize_selection failed");

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary).unwrap());
            } else {
                println!("selected={} totalBytes={}", summary.selected_count, summary.total_bytes);
                for id in &summary.selected_node_ids {
                    println!("  {id}");
                }
                for warning in &summary.warnings {
                    eprintln!("{warning}");
                }
            }
        }
    }
}
