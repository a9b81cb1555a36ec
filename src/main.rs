use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use forcelayout::config::{CollisionConfig, LayoutConfig};
use forcelayout::io::FormatRegistry;
use forcelayout::layout::layout;

mod cli;

use cli::{Cli, Commands};

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct LayoutArgs {
    input: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
    iterations: Option<usize>,
    max_ticks: Option<usize>,
    collide: Option<f64>,
}

fn load_config(args: &LayoutArgs) -> anyhow::Result<LayoutConfig> {
    let mut config = match &args.config {
        Some(path) => LayoutConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => LayoutConfig::default(),
    };
    if let Some(iterations) = args.iterations {
        config.simulation.iterations = iterations;
    }
    if let Some(max_ticks) = args.max_ticks {
        config.max_ticks = max_ticks;
    }
    if let Some(radius) = args.collide {
        config.collision = Some(CollisionConfig {
            radius,
            ..config.collision.take().unwrap_or_default()
        });
    }
    config.validate()?;
    Ok(config)
}

fn run_layout(args: &LayoutArgs) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let registry = FormatRegistry::with_defaults();

    let graph = registry
        .reader_for_path(&args.input)?
        .read(&args.input)
        .with_context(|| format!("failed to read graph {}", args.input.display()))?;
    let result = layout(&graph, &config)?;
    registry
        .writer_for_path(&args.output)?
        .write(&result, &args.output)
        .with_context(|| format!("failed to write layout {}", args.output.display()))?;

    println!(
        "Laid out {} nodes in {} ticks{} -> {}",
        result.nodes.len(),
        result.ticks,
        if result.converged { "" } else { " (not converged)" },
        args.output.display()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Layout {
            input,
            output,
            config,
            iterations,
            max_ticks,
            collide,
        } => run_layout(&LayoutArgs {
            input,
            output,
            config,
            iterations,
            max_ticks,
            collide,
        })?,
        Commands::Config => print!("{}", LayoutConfig::default().to_yaml()?),
    }

    Ok(())
}
