//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Force-directed graph layout from the command line.
#[derive(Parser, Debug)]
#[command(name = "forcelayout")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log progress (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Lay out a graph file and write node positions
    Layout {
        /// Input graph (.json, .yaml, .yml)
        #[arg(short, long)]
        input: PathBuf,

        /// Output layout (.json, .yaml, .yml)
        #[arg(short, long, default_value = "layout.json")]
        output: PathBuf,

        /// Layout configuration (.yaml, .yml, .json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Ticks for alpha to cool down to its minimum
        #[arg(long)]
        iterations: Option<usize>,

        /// Stop after this many ticks even if not converged
        #[arg(long)]
        max_ticks: Option<usize>,

        /// Enable collision, optionally with a default radius
        #[arg(long, value_name = "RADIUS", num_args = 0..=1, default_missing_value = "5")]
        collide: Option<f64>,
    },
    /// Print the default layout configuration as YAML
    Config,
}
