use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use wetmap_core::pipeline::run_composites_reported;

use super::{BarReporter, ConfigSource};
use crate::summary::{print_composite_report, print_pipeline_summary};

#[derive(Args)]
pub struct CompositesArgs {
    #[command(flatten)]
    pub source: ConfigSource,
}

pub fn run(args: &CompositesArgs) -> Result<()> {
    let config = args.source.load()?;
    print_pipeline_summary(&config);

    let output = run_composites_reported(&config, Arc::new(BarReporter::default()))?;

    println!();
    print_composite_report(&output);
    println!(
        "{} composite(s) saved to {}",
        output.composites.len(),
        config.output.join("composites").display()
    );
    Ok(())
}
