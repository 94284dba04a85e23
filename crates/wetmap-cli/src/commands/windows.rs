use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use wetmap_core::composite::{parse_date, season_windows};
use wetmap_core::consts::{
    DEFAULT_SEASON_DURATION_MONTHS, DEFAULT_SEASON_OFFSET_MONTHS, DEFAULT_SEASON_STRIDE_MONTHS,
};
use wetmap_core::pipeline::config::PipelineConfig;
use wetmap_core::pipeline::configured_windows;

#[derive(Args)]
pub struct WindowsArgs {
    /// Take the range and season from a pipeline config instead
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Range start (YYYY-MM-DD)
    #[arg(long, default_value = "1990-01-01")]
    pub start: String,

    /// Range end (YYYY-MM-DD)
    #[arg(long, default_value = "2019-12-31")]
    pub end: String,

    /// Months from the range start to the first window
    #[arg(long, default_value_t = DEFAULT_SEASON_OFFSET_MONTHS)]
    pub offset: u32,

    /// Window length in months
    #[arg(long, default_value_t = DEFAULT_SEASON_DURATION_MONTHS)]
    pub duration: u32,

    /// Months between window starts
    #[arg(long, default_value_t = DEFAULT_SEASON_STRIDE_MONTHS)]
    pub stride: u32,
}

pub fn run(args: &WindowsArgs) -> Result<()> {
    let windows = if let Some(ref path) = args.config {
        let config = PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?;
        configured_windows(&config)?
    } else {
        season_windows(
            parse_date(&args.start)?,
            parse_date(&args.end)?,
            args.offset,
            args.duration,
            args.stride,
        )?
    };

    println!("{:>4}  {:>10}  {:>10}", "#", "Start", "End");
    println!("{}", "-".repeat(28));
    for (i, window) in windows.iter().enumerate() {
        println!("{:>4}  {:>10}  {:>10}", i + 1, window.start, window.end);
    }
    println!("\n{} window(s)", windows.len());

    Ok(())
}
