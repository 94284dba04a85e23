use chrono::NaiveDate;
use ndarray::{Array2, Zip};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::composite::Composite;
use crate::consts::{DATE_FORMAT, PARALLEL_ITEM_THRESHOLD};
use crate::error::{Result, WetmapError};
use crate::geometry::Region;
use crate::pipeline::config::ThresholdConfig;
use crate::raster::{Band, GridSpec};
use crate::reduce::region_median;

/// Tags carried from the source composite.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloodMapMetadata {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl FloodMapMetadata {
    pub fn start_tag(&self) -> String {
        self.start_date.format(DATE_FORMAT).to_string()
    }

    pub fn end_tag(&self) -> String {
        self.end_date.format(DATE_FORMAT).to_string()
    }
}

/// Binary flood classification of one composite: 1 = flooded, 0 = dry.
#[derive(Clone, Debug)]
pub struct FloodMap {
    pub metadata: FloodMapMetadata,
    pub band: String,
    pub data: Array2<u8>,
    /// Pixels invalid in the source composite stay invalid.
    pub mask: Array2<bool>,
    pub threshold: f32,
}

impl FloodMap {
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn flooded(&self, row: usize, col: usize) -> Option<bool> {
        self.mask[[row, col]].then(|| self.data[[row, col]] == 1)
    }
}

/// `wet + fraction * (dry - wet)`.
pub fn threshold_value(wet: f32, dry: f32, fraction: f32) -> f32 {
    wet + fraction * (dry - wet)
}

fn reference_median(band: &Band, region: &Region, grid: &GridSpec, scale: f64, start: &NaiveDate) -> Result<f32> {
    region_median(band, region, grid, scale)?.ok_or_else(|| WetmapError::UndefinedThreshold {
        start_date: start.format(DATE_FORMAT).to_string(),
        region: region.name.clone(),
    })
}

/// Threshold for one composite from the wet and dry reference medians.
pub fn composite_threshold(composite: &Composite, band: &str, config: &ThresholdConfig, grid: &GridSpec) -> Result<f32> {
    let values = composite.raster.band(band)?;
    let start = &composite.metadata.start_date;
    let dry = reference_median(values, &config.dry, grid, config.scale, start)?;
    let wet = reference_median(values, &config.wet, grid, config.scale, start)?;
    let threshold = threshold_value(wet, dry, config.fraction);
    debug!(start = %start, wet, dry, threshold, "Threshold computed");
    Ok(threshold)
}

/// Pixel = 1 iff value < threshold.
pub fn classify_band(band: &Band, threshold: f32) -> Array2<u8> {
    band.data.mapv(|v| u8::from(v < threshold))
}

pub fn classify_composite(composite: &Composite, band: &str, config: &ThresholdConfig, grid: &GridSpec) -> Result<FloodMap> {
    let threshold = composite_threshold(composite, band, config, grid)?;
    let values = composite.raster.band(band)?;
    let mut data = classify_band(values, threshold);
    Zip::from(&mut data)
        .and(&values.mask)
        .for_each(|d, &m| {
            if !m {
                *d = 0;
            }
        });
    Ok(FloodMap {
        metadata: FloodMapMetadata {
            start_date: composite.metadata.start_date,
            end_date: composite.metadata.end_date,
        },
        band: band.to_string(),
        data,
        mask: values.mask.clone(),
        threshold,
    })
}

/// Classify every composite independently; one failure does not affect the others.
pub fn classify_collection(
    composites: &[Composite],
    band: &str,
    config: &ThresholdConfig,
    grid: &GridSpec,
) -> Vec<Result<FloodMap>> {
    let classify = |c: &Composite| classify_composite(c, band, config, grid);
    let results: Vec<Result<FloodMap>> = if composites.len() >= PARALLEL_ITEM_THRESHOLD {
        composites.par_iter().map(classify).collect()
    } else {
        composites.iter().map(classify).collect()
    };

    for (composite, result) in composites.iter().zip(&results) {
        if let Err(e) = result {
            warn!(start = %composite.metadata.start_tag(), error = %e, "Flood classification failed");
        }
    }
    let ok = results.iter().filter(|r| r.is_ok()).count();
    info!(composites = composites.len(), flood_maps = ok, "Flood classification complete");
    results
}
