use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use wetmap_core::pipeline::run_classification_reported;

use super::{BarReporter, ConfigSource};
use crate::summary::print_flood_report;

#[derive(Args)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub source: ConfigSource,
}

pub fn run(args: &ClassifyArgs) -> Result<()> {
    let config = args.source.load()?;

    let output = run_classification_reported(&config, Arc::new(BarReporter::default()))?;

    println!();
    print_flood_report(&output);
    println!(
        "{} flood map(s) and summaries saved to {}",
        output.flood_maps.len(),
        config.output.display()
    );
    Ok(())
}
