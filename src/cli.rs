//! Command-line driver: resolve configuration, run the core, write the
//! artifact. Deliberately thin; all analysis lives in the library.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

use crate::assemble::GraphAssembler;
use crate::codec;
use crate::config::{EntryPointRule, ResolvedConfig};
use crate::diagnostics::DiagnosticSeverity;
use crate::model::Language;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;

/// Static call-graph analyzer with liveness and parameter-usage annotation.
///
/// Analyzes a TypeScript, Go, or Python source tree and emits a JSON graph
/// of every function and statically resolvable call, annotated with
/// reachability from declared entry points.
#[derive(Parser)]
#[command(name = "codegraph")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a project and write the graph artifact
    Analyze(AnalyzeArgs),
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Project root to analyze
    pub path: PathBuf,

    /// Source language: typescript, go, or python
    #[arg(short, long)]
    pub language: Option<Language>,

    /// Load a resolved configuration from a JSON file (overrides flags)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Include glob patterns (default: the language's source globs)
    #[arg(long = "include", value_name = "PATTERN")]
    pub include: Vec<String>,

    /// Exclude glob patterns
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Entry-point rules as kind:value, e.g. function:main, file:src/api/**,
    /// decorator:app.route, export:src/index.ts (repeatable)
    #[arg(long = "entry", value_name = "RULE")]
    pub entry: Vec<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    let config = match &args.config {
        Some(path) => ResolvedConfig::from_file(path)?,
        None => {
            let language = match args.language {
                Some(l) => l,
                None => {
                    eprintln!("Error: --language is required without --config");
                    return Ok(EXIT_ERROR);
                }
            };
            let root = args.path.canonicalize()?;
            let mut config = ResolvedConfig::for_project(language, root);
            if !args.include.is_empty() {
                config.include = args.include.clone();
            }
            config.exclude = args.exclude.clone();
            for spec in &args.entry {
                config.entry_points.push(EntryPointRule::parse(spec)?);
            }
            config.output = args
                .output
                .as_ref()
                .map(|p| p.to_string_lossy().to_string());
            config
        }
    };

    let assembler = GraphAssembler::new(config)?;
    let graph = assembler.assemble()?;

    for diag in &graph.metadata.diagnostics {
        let line = diag.to_string();
        match diag.severity {
            DiagnosticSeverity::Error => eprintln!("{}", line.red()),
            DiagnosticSeverity::Warning => eprintln!("{}", line.yellow()),
            DiagnosticSeverity::Info => eprintln!("{}", line.dimmed()),
        }
    }

    match &args.output {
        Some(path) => {
            codec::write_artifact(&graph, path)?;
            eprintln!(
                "{} {} functions, {} edges, {} dead → {}",
                "✓".green(),
                graph.metadata.total_functions,
                graph.metadata.total_edges,
                graph.metadata.total_dead_functions,
                path.display()
            );
        }
        None => {
            println!("{}", codec::to_json(&graph)?);
        }
    }

    Ok(EXIT_SUCCESS)
}
