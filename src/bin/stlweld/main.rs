//! stlweld CLI - STL inspection and conversion tool.
//!
//! Usage: stlweld <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `stlweld --help` for available commands.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};

use stlweld::io::{self, Completion, Encoding, ParseOptions};
use stlweld::mesh::BuildOptions;
use stlweld::pipeline::{load_mesh, LoadOptions};
use stlweld::progress::Progress;

#[derive(Parser)]
#[command(name = "stlweld")]
#[command(author, version, about = "STL inspection and conversion CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information
    Info {
        /// Input STL file
        input: PathBuf,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Re-encode an STL file
    Convert {
        /// Input STL file
        input: PathBuf,

        /// Output STL file
        output: PathBuf,

        /// Write text STL instead of binary
        #[arg(long)]
        ascii: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input, sequential } => {
            cmd_info(&input, sequential)?;
        }

        Commands::Convert { input, output, ascii } => {
            cmd_convert(&input, &output, ascii)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0));

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        let old = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        if raw_percent <= old && raw_percent != 100 {
            return;
        }
        let percent = raw_percent.max(old);

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {}", bar, space, percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn describe(completion: Completion) -> &'static str {
    match completion {
        Completion::Complete => "complete",
        Completion::Truncated => "truncated (malformed data skipped)",
        Completion::Cancelled => "cancelled",
    }
}

fn cmd_info(input: &Path, sequential: bool) -> Result<(), Box<dyn std::error::Error>> {
    let options = LoadOptions::default()
        .with_parse(ParseOptions::default().with_progress(create_progress()))
        .with_build(BuildOptions::default().with_parallel(!sequential));

    let start = Instant::now();
    let loaded = load_mesh(input, &options)?;
    let elapsed = start.elapsed();

    println!("File: {}", input.display());
    println!("Header: {:?}", loaded.stl.header());
    for (i, block) in loaded.stl.blocks.iter().enumerate() {
        println!(
            "Payload {}: {}, {} facets",
            i,
            block.encoding,
            block.facets.len()
        );
    }
    println!("Status: {}", describe(loaded.stl.completion));
    println!("Facets: {}", loaded.stl.num_facets());
    println!("Vertices: {}", loaded.mesh.num_vertices());
    println!("Triangles: {}", loaded.mesh.num_triangles());

    let degenerate = loaded.mesh.degenerate_triangle_count();
    if degenerate > 0 {
        println!("Degenerate triangles: {}", degenerate);
    }

    if let Some((min, max)) = loaded.mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }

    match &loaded.edges {
        Some(edges) => {
            println!("Edges: {}", edges.num_edges());
            if edges.is_closed() {
                println!("Topology: Closed (no boundary)");
            } else {
                println!(
                    "Topology: Open ({} boundary edges, {} non-manifold edges)",
                    edges.boundary_edge_count(),
                    edges.non_manifold_edge_count()
                );
            }
        }
        None => println!("Edges: unavailable"),
    }

    println!("Time: {:.2?}", elapsed);
    Ok(())
}

fn cmd_convert(input: &Path, output: &Path, ascii: bool) -> Result<(), Box<dyn std::error::Error>> {
    let options = ParseOptions::default().with_progress(create_progress());
    let mut stl = io::load(input, &options)?;
    println!(
        "Loaded: {} facets ({})",
        stl.num_facets(),
        describe(stl.completion)
    );

    let encoding = if ascii { Encoding::Ascii } else { Encoding::Binary };
    // Binary headers may carry line breaks, which a text header cannot.
    if let Some(block) = stl.blocks.first_mut() {
        block.header = block.header.replace(['\r', '\n'], " ");
    }
    io::save(&stl, output, encoding)?;
    println!("Saved {} STL to: {}", encoding, output.display());
    Ok(())
}
