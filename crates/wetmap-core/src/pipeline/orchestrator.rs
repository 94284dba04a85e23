use std::sync::Arc;

use chrono::Months;
use tracing::info;

use crate::classify::classify_collection;
use crate::composite::{build_composites, season_windows, Composite, SeasonWindow};
use crate::error::{Result, WetmapError};
use crate::filter::filter_composites;
use crate::gapfill::gap_fill_collection_with_progress;
use crate::io::archive::{DirectoryArchive, SceneArchive};
use crate::io::sink::{load_composites, DirectorySink, OutputSink};
use crate::mask::mask_collection;
use crate::scene::SceneCollection;
use crate::summary::{annual_flood_area, flood_frequency, flood_variance};

use super::config::PipelineConfig;
use super::types::{
    ClassificationFailure, CompositeOutput, FloodOutput, NoOpReporter, PipelineOutput,
    PipelineStage, ProgressReporter,
};

/// Season windows of the configured date range.
pub fn configured_windows(config: &PipelineConfig) -> Result<Vec<SeasonWindow>> {
    season_windows(
        config.dates.start,
        config.dates.end,
        config.season.offset_months,
        config.season.duration_months,
        config.season.stride_months,
    )
}

/// Load, cloud-mask and merge every configured sensor, then keep the analysis band.
///
/// The load range is widened by a year on both sides so that gap filling
/// near the range edges sees a full neighbourhood.
pub fn load_masked_scenes(
    config: &PipelineConfig,
    archive: &dyn SceneArchive,
    reporter: &Arc<dyn ProgressReporter>,
) -> Result<SceneCollection> {
    let pad = Months::new(12);
    let start = config.dates.start.checked_sub_months(pad).unwrap_or(config.dates.start);
    let end = config.dates.end.checked_add_months(pad).unwrap_or(config.dates.end);

    reporter.begin_stage(PipelineStage::Loading, Some(config.sensors.len()));
    let mut loaded = Vec::with_capacity(config.sensors.len());
    for (i, &sensor) in config.sensors.iter().enumerate() {
        loaded.push(archive.load(sensor, &config.region_of_interest, start, end)?);
        reporter.advance(i + 1);
    }
    reporter.finish_stage();

    let total: usize = loaded.iter().map(SceneCollection::len).sum();
    reporter.begin_stage(PipelineStage::Masking, Some(total));
    let mut merged = SceneCollection::default();
    let mut done = 0;
    for scenes in &loaded {
        merged = merged.merge(mask_collection(scenes)?);
        done += scenes.len();
        reporter.advance(done);
    }
    reporter.finish_stage();

    info!(scenes = merged.len(), band = %config.band, "Merged masked scenes");
    merged.select_band(&config.band)
}

/// Composite Builder on an already loaded, masked, band-selected collection.
pub fn composite_stage(
    config: &PipelineConfig,
    scenes: &SceneCollection,
    reporter: &Arc<dyn ProgressReporter>,
) -> Result<CompositeOutput> {
    let filled;
    let source = if config.gap_fill.enabled {
        reporter.begin_stage(PipelineStage::GapFilling, Some(scenes.len()));
        let radius = config.grid.cells_for(config.gap_fill.kernel_radius);
        filled = gap_fill_collection_with_progress(scenes, radius, |done| reporter.advance(done))?;
        reporter.finish_stage();
        &filled
    } else {
        scenes
    };

    let windows = configured_windows(config)?;
    reporter.begin_stage(PipelineStage::Compositing, Some(windows.len()));
    let composites = build_composites(source, &windows, &config.region_of_interest, &config.grid)?;
    reporter.advance(composites.len());
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Filtering, Some(composites.len()));
    let (composites, rejected) = filter_composites(composites, &config.filter, &config.grid)?;
    reporter.advance(composites.len() + rejected.len());
    reporter.finish_stage();

    Ok(CompositeOutput {
        composites,
        rejected,
    })
}

/// Flood Classifier: threshold every composite and summarise the flood maps.
pub fn classification_stage(
    config: &PipelineConfig,
    composites: &[Composite],
    reporter: &Arc<dyn ProgressReporter>,
) -> Result<FloodOutput> {
    reporter.begin_stage(PipelineStage::Classifying, Some(composites.len()));
    let results = classify_collection(composites, &config.band, &config.threshold, &config.grid);
    reporter.advance(results.len());
    reporter.finish_stage();

    let mut flood_maps = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (composite, result) in composites.iter().zip(results) {
        match result {
            Ok(map) => flood_maps.push(map),
            Err(error) => failures.push(ClassificationFailure {
                metadata: composite.metadata.clone(),
                error,
            }),
        }
    }

    reporter.begin_stage(PipelineStage::Summarizing, None);
    let shape = config.grid.shape();
    let frequency = flood_frequency(&flood_maps, shape)?;
    let variance = flood_variance(&flood_maps, shape, &config.band)?;
    let areas = annual_flood_area(&flood_maps, &config.region_of_interest, &config.grid)?;
    reporter.finish_stage();

    Ok(FloodOutput {
        flood_maps,
        failures,
        frequency,
        variance,
        areas,
    })
}

fn write_composites(
    sink: &dyn OutputSink,
    output: &CompositeOutput,
    reporter: &Arc<dyn ProgressReporter>,
) -> Result<()> {
    reporter.begin_stage(PipelineStage::Writing, Some(output.composites.len()));
    sink.write_composites(&output.composites)?;
    reporter.advance(output.composites.len());
    reporter.finish_stage();
    Ok(())
}

fn write_floods(sink: &dyn OutputSink, output: &FloodOutput, reporter: &Arc<dyn ProgressReporter>) -> Result<()> {
    reporter.begin_stage(PipelineStage::Writing, Some(output.flood_maps.len()));
    sink.write_flood_maps(&output.flood_maps)?;
    reporter.advance(output.flood_maps.len());
    sink.write_frequency(&output.frequency)?;
    sink.write_variance(&output.variance)?;
    sink.write_area_table(&output.areas)?;
    reporter.finish_stage();
    Ok(())
}

/// Run both stages against explicit archive and sink implementations.
pub fn run_pipeline_with(
    config: &PipelineConfig,
    archive: &dyn SceneArchive,
    sink: &dyn OutputSink,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<PipelineOutput> {
    config.validate()?;
    let scenes = load_masked_scenes(config, archive, &reporter)?;
    let composites = composite_stage(config, &scenes, &reporter)?;
    write_composites(sink, &composites, &reporter)?;

    let floods = classification_stage(config, &composites.composites, &reporter)?;
    write_floods(sink, &floods, &reporter)?;

    info!(
        composites = composites.composites.len(),
        rejected = composites.rejected.len(),
        flood_maps = floods.flood_maps.len(),
        failures = floods.failures.len(),
        "Pipeline complete"
    );
    Ok(PipelineOutput { composites, floods })
}

/// Composite Builder from the configured archive, persisting composites to the output directory.
pub fn run_composites_reported(config: &PipelineConfig, reporter: Arc<dyn ProgressReporter>) -> Result<CompositeOutput> {
    config.validate()?;
    let archive = DirectoryArchive::open(&config.archive, &config.grid)?;
    let sink = DirectorySink::new(&config.output)?;
    let scenes = load_masked_scenes(config, &archive, &reporter)?;
    let output = composite_stage(config, &scenes, &reporter)?;
    write_composites(&sink, &output, &reporter)?;
    Ok(output)
}

/// Flood Classifier from composites persisted in the output directory.
pub fn run_classification_reported(config: &PipelineConfig, reporter: Arc<dyn ProgressReporter>) -> Result<FloodOutput> {
    config.validate()?;
    let composites = load_composites(&config.output)?;
    if composites.is_empty() {
        return Err(WetmapError::Pipeline(format!(
            "no composites found in {}",
            config.output.display()
        )));
    }
    for composite in &composites {
        if let Some(dim) = composite.raster.dim() {
            config.grid.check_shape(dim)?;
        }
    }
    let sink = DirectorySink::new(&config.output)?;
    let output = classification_stage(config, &composites, &reporter)?;
    write_floods(&sink, &output, &reporter)?;
    Ok(output)
}

/// Run the full pipeline with a thread-safe progress reporter.
pub fn run_pipeline_reported(config: &PipelineConfig, reporter: Arc<dyn ProgressReporter>) -> Result<PipelineOutput> {
    config.validate()?;
    let archive = DirectoryArchive::open(&config.archive, &config.grid)?;
    let sink = DirectorySink::new(&config.output)?;
    run_pipeline_with(config, &archive, &sink, reporter)
}

/// Run the full pipeline without progress reporting.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineOutput> {
    run_pipeline_reported(config, Arc::new(NoOpReporter))
}
