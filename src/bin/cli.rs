//! Cartograph CLI - structural source maps for Python projects.
//!
//! Usage:
//!   cartograph parse a.py b.py -o graph.json   # Parse files into a document
//!   cartograph parse --dir src -o graph.json   # Parse a whole directory
//!   cartograph stats graph.json                # Document statistics
//!   cartograph palette types                   # List styled kinds
//!   cartograph palette new <kind> <base> ...   # Create a theme

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ignore::WalkBuilder;
use tracing_subscriber::EnvFilter;

use cartograph::{
    load_document, save_document, to_document, to_graph, BuilderOptions, GraphBuilder, Palette,
    SourceLocation,
};

#[derive(Parser)]
#[command(name = "cartograph")]
#[command(about = "Cartograph - structural source maps for Python projects", long_about = None)]
struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse source files into a graph document
    Parse {
        /// Source files to analyze
        paths: Vec<PathBuf>,

        /// Analyze every .py file under this directory instead
        #[arg(long, conflicts_with = "paths")]
        dir: Option<PathBuf>,

        /// Output document path (default: graph.json)
        #[arg(short, long, default_value = "graph.json")]
        output: PathBuf,

        /// Follow imports to project files outside the given set
        #[arg(long)]
        follow_imports: bool,

        /// Collect unresolved imports under an "external" bucket node
        #[arg(long)]
        external_bucket: bool,
    },

    /// Show statistics for a saved graph document
    Stats {
        /// Path to a graph document
        document: PathBuf,
    },

    /// Manage the rendering palette
    Palette {
        #[command(subcommand)]
        action: PaletteAction,
    },
}

#[derive(Subcommand)]
enum PaletteAction {
    /// List every styled node kind
    Types,

    /// Show the resolved style for one kind
    Show { kind: String },

    /// Create or overwrite a theme
    New {
        kind: String,
        base: String,
        shape: String,
        size: f64,
        color: String,
        alpha: f64,

        /// Draw node labels for this theme
        #[arg(long)]
        label: bool,

        /// Overwrite an existing theme without asking
        #[arg(long)]
        overwrite: bool,
    },

    /// Restore the packaged default palette
    Reset,

    /// Import a palette.json file
    Import { file: PathBuf },

    /// Export the current palette to a directory
    Export { dir: PathBuf },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = cli.root.canonicalize().unwrap_or(cli.root);

    match cli.command {
        Commands::Parse {
            paths,
            dir,
            output,
            follow_imports,
            external_bucket,
        } => parse_command(&root, paths, dir, &output, follow_imports, external_bucket),
        Commands::Stats { document } => stats_command(&document),
        Commands::Palette { action } => palette_command(&root, action),
    }
}

fn parse_command(
    root: &Path,
    paths: Vec<PathBuf>,
    dir: Option<PathBuf>,
    output: &Path,
    follow_imports: bool,
    external_bucket: bool,
) -> Result<()> {
    let locations: Vec<SourceLocation> = match dir {
        Some(dir) => collect_python_files(&dir)?
            .into_iter()
            .map(SourceLocation::Path)
            .collect(),
        None => paths.into_iter().map(SourceLocation::Path).collect(),
    };
    if locations.is_empty() {
        bail!("no source files to analyze");
    }

    let options = BuilderOptions {
        project_root: Some(root.to_path_buf()),
        follow_project_imports: follow_imports,
        external_bucket,
    };
    let report = GraphBuilder::with_options(options)
        .build(&locations)
        .context("analysis failed")?;

    for diagnostic in &report.diagnostics {
        eprintln!("warning: {diagnostic}");
    }

    let document = to_document(&report.graph);
    save_document(output, &document)
        .with_context(|| format!("could not write {}", output.display()))?;

    let stats = report.graph.stats();
    println!(
        "Wrote {} ({} nodes, {} edges, {} modules, {} skipped)",
        output.display(),
        stats.total_nodes,
        stats.total_edges,
        stats.modules,
        report.diagnostics.len()
    );
    Ok(())
}

fn stats_command(path: &Path) -> Result<()> {
    let document = load_document(path)?;
    let graph = to_graph(&document)?;
    let stats = graph.stats();
    println!("Nodes:     {}", stats.total_nodes);
    println!("Edges:     {}", stats.total_edges);
    println!("Modules:   {}", stats.modules);
    println!("Classes:   {}", stats.classes);
    println!("Functions: {}", stats.functions);
    Ok(())
}

fn palette_command(root: &Path, action: PaletteAction) -> Result<()> {
    let palette_dir = root.join(".cartograph");
    let mut palette = Palette::open(&palette_dir)?;

    match action {
        PaletteAction::Types => {
            for kind in palette.kinds() {
                println!("{kind}");
            }
        }
        PaletteAction::Show { kind } => {
            let style = palette.get_style(&kind);
            println!("{}", serde_json::to_string_pretty(&style)?);
        }
        PaletteAction::New {
            kind,
            base,
            shape,
            size,
            color,
            alpha,
            label,
            overwrite,
        } => {
            let created = palette.create_theme(
                &kind,
                &base,
                label,
                &shape,
                size,
                &color,
                alpha_clamped(alpha),
                overwrite,
            )?;
            match created {
                Some(style) => println!("{}", serde_json::to_string_pretty(&style)?),
                None => {
                    if confirm(&format!("'{kind}' already exists. Overwrite? [y/N] "))? {
                        let style = palette
                            .create_theme(
                                &kind,
                                &base,
                                label,
                                &shape,
                                size,
                                &color,
                                alpha_clamped(alpha),
                                true,
                            )?
                            .expect("overwrite was requested");
                        println!("{}", serde_json::to_string_pretty(&style)?);
                    } else {
                        println!("Unchanged.");
                    }
                }
            }
        }
        PaletteAction::Reset => {
            palette.reset()?;
            println!("Palette reset to defaults.");
        }
        PaletteAction::Import { file } => {
            palette.import_from(&file)?;
            println!("Imported {}", file.display());
        }
        PaletteAction::Export { dir } => {
            let path = palette.export_to(&dir)?;
            println!("Exported to {}", path.display());
        }
    }
    Ok(())
}

/// Every .py file under `dir`, respecting .gitignore.
fn collect_python_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("not a directory: {}", dir.display());
    }
    let mut files: Vec<PathBuf> = WalkBuilder::new(dir)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "py" || e == "pyw")
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    Ok(files)
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}

fn alpha_clamped(alpha: f64) -> f64 {
    alpha.clamp(0.0, 1.0)
}
