mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "wetmap", about = "Seasonal Landsat composites and flood maps")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the scenes in an archive directory
    Info(commands::info::InfoArgs),
    /// Print or save an example pipeline config
    Config(commands::config::ConfigArgs),
    /// List the season windows of a date range
    Windows(commands::windows::WindowsArgs),
    /// Build, filter and save seasonal composites
    Composites(commands::composites::CompositesArgs),
    /// Classify saved composites into flood maps and summaries
    Classify(commands::classify::ClassifyArgs),
    /// Run the full pipeline
    Run(commands::pipeline::RunArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Config(args) => commands::config::run(args),
        Commands::Windows(args) => commands::windows::run(args),
        Commands::Composites(args) => commands::composites::run(args),
        Commands::Classify(args) => commands::classify::run(args),
        Commands::Run(args) => commands::pipeline::run(args),
    }
}
