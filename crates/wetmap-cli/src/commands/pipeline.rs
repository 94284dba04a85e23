use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use wetmap_core::pipeline::run_pipeline_reported;

use super::{BarReporter, ConfigSource};
use crate::summary::{print_composite_report, print_flood_report, print_pipeline_summary};

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: ConfigSource,

    /// Skip gap filling
    #[arg(long)]
    pub no_gap_fill: bool,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let mut config = args.source.load()?;
    if args.no_gap_fill {
        config.gap_fill.enabled = false;
    }
    print_pipeline_summary(&config);

    let output = run_pipeline_reported(&config, Arc::new(BarReporter::default()))?;

    println!();
    print_composite_report(&output.composites);
    print_flood_report(&output.floods);
    println!("Output saved to {}", config.output.display());
    Ok(())
}
