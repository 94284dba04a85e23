use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classify::FloodMap;
use crate::consts::UNITS2_PER_KM2;
use crate::error::{Result, WetmapError};
use crate::geometry::Region;
use crate::raster::{cast_clamped, GridSpec};

/// Per-pixel count of flooded years.
#[derive(Clone, Debug, PartialEq)]
pub struct SumRaster {
    pub data: Array2<i16>,
    /// `false` where no flood map held a valid pixel.
    pub mask: Array2<bool>,
}

/// Per-pixel sample variance of the flood state across years.
#[derive(Clone, Debug, PartialEq)]
pub struct VarianceRaster {
    pub name: String,
    pub data: Array2<f32>,
    /// `false` where fewer than two years were valid.
    pub mask: Array2<bool>,
}

/// Flooded area of one year within one region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaRecord {
    /// Start-date tag of the flood map.
    pub year: String,
    pub region: String,
    pub area_km2: f64,
}

/// Running per-pixel moments over the valid years.
///
/// Inputs are 0/1, so every accumulator holds an exact integer and the
/// result does not depend on the order of the maps.
struct Moments {
    sum: Array2<f64>,
    sum_sq: Array2<f64>,
    count: Array2<u32>,
}

fn accumulate(maps: &[FloodMap], shape: (usize, usize)) -> Result<Moments> {
    let mut m = Moments {
        sum: Array2::zeros(shape),
        sum_sq: Array2::zeros(shape),
        count: Array2::zeros(shape),
    };
    for map in maps {
        if map.dim() != shape {
            return Err(WetmapError::DimensionMismatch {
                expected: shape,
                actual: map.dim(),
            });
        }
        Zip::from(&mut m.sum)
            .and(&mut m.sum_sq)
            .and(&mut m.count)
            .and(&map.data)
            .and(&map.mask)
            .for_each(|s, sq, n, &v, &valid| {
                if valid {
                    let v = v as f64;
                    *s += v;
                    *sq += v * v;
                    *n += 1;
                }
            });
    }
    Ok(m)
}

/// Number of years each pixel was flooded, as i16.
pub fn flood_frequency(maps: &[FloodMap], shape: (usize, usize)) -> Result<SumRaster> {
    let m = accumulate(maps, shape)?;
    Ok(SumRaster {
        data: m.sum.mapv(|v| cast_clamped::<i16>(v as f32)),
        mask: m.count.mapv(|n| n > 0),
    })
}

/// Sample variance (n - 1 denominator) of each pixel across years.
pub fn flood_variance(maps: &[FloodMap], shape: (usize, usize), band: &str) -> Result<VarianceRaster> {
    let m = accumulate(maps, shape)?;
    let data = Zip::from(&m.sum)
        .and(&m.sum_sq)
        .and(&m.count)
        .map_collect(|&s, &sq, &n| {
            if n < 2 {
                0.0
            } else {
                let n = n as f64;
                ((sq - s * s / n) / (n - 1.0)) as f32
            }
        });
    Ok(VarianceRaster {
        name: format!("{band}_variance"),
        data,
        mask: m.count.mapv(|n| n >= 2),
    })
}

/// Flooded area of a map inside a region mask, in km².
pub fn flooded_area_km2(map: &FloodMap, roi_mask: &Array2<bool>, grid: &GridSpec) -> Result<f64> {
    grid.check_shape(map.dim())?;
    grid.check_shape(roi_mask.dim())?;
    let flooded = Zip::from(&map.data)
        .and(&map.mask)
        .and(roi_mask)
        .fold(0usize, |acc, &v, &valid, &inside| acc + usize::from(valid && inside && v == 1));
    Ok(flooded as f64 * grid.pixel_area() / UNITS2_PER_KM2)
}

/// One area record per flood map, flattened into a table.
pub fn annual_flood_area(maps: &[FloodMap], roi: &Region, grid: &GridSpec) -> Result<Vec<AreaRecord>> {
    let roi_mask = roi.rasterize(grid);
    let records = maps
        .iter()
        .map(|map| {
            Ok(AreaRecord {
                year: map.metadata.start_tag(),
                region: roi.name.clone(),
                area_km2: flooded_area_km2(map, &roi_mask, grid)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    info!(years = records.len(), region = %roi.name, "Flood area table computed");
    Ok(records)
}
