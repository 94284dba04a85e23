pub mod classify;
pub mod composites;
pub mod config;
pub mod info;
pub mod pipeline;
pub mod windows;

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use wetmap_core::pipeline::config::PipelineConfig;
use wetmap_core::pipeline::{PipelineStage, ProgressReporter};

/// Config file plus the paths most often overridden on the command line.
#[derive(Args)]
pub struct ConfigSource {
    /// Pipeline config file (TOML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Override the scene archive directory
    #[arg(long)]
    pub archive: Option<PathBuf>,

    /// Override the output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ConfigSource {
    pub fn load(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::load(&self.config)
            .with_context(|| format!("Failed to load config {}", self.config.display()))?;
        if let Some(ref archive) = self.archive {
            config.archive = archive.clone();
        }
        if let Some(ref output) = self.output {
            config.output = output.clone();
        }
        info!(
            config = %self.config.display(),
            archive = %config.archive.display(),
            output = %config.output.display(),
            "Loaded pipeline config"
        );
        Ok(config)
    }
}

/// One progress bar per pipeline stage.
#[derive(Default)]
pub struct BarReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        let bar = match total_items {
            Some(total) => {
                let bar = ProgressBar::new(total as u64);
                if let Ok(style) = ProgressStyle::default_bar().template("{msg:22} [{bar:40}] {pos}/{len}") {
                    bar.set_style(style.progress_chars("=> "));
                }
                bar
            }
            None => ProgressBar::new_spinner(),
        };
        bar.set_message(stage.to_string());

        if let Ok(mut current) = self.bar.lock() {
            if let Some(previous) = current.replace(bar) {
                previous.finish();
            }
        }
    }

    fn advance(&self, items_done: usize) {
        if let Ok(current) = self.bar.lock() {
            if let Some(bar) = current.as_ref() {
                bar.set_position(items_done as u64);
            }
        }
    }

    fn finish_stage(&self) {
        if let Ok(mut current) = self.bar.lock() {
            if let Some(bar) = current.take() {
                if let Some(total) = bar.length() {
                    bar.set_position(total);
                }
                bar.finish();
            }
        }
    }
}
