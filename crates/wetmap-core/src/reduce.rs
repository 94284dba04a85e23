use std::ops::Range;

use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{Result, WetmapError};
use crate::geometry::Region;
use crate::raster::{Band, GridSpec};

/// Per-pixel median over a stack of bands, using valid samples only.
///
/// A pixel with no valid sample in any band stays invalid. Uses
/// `select_nth_unstable` for O(n) median without full sort and
/// parallelizes at the row level for large grids.
pub fn median_stack(bands: &[&Band], name: &str) -> Result<Band> {
    let Some(first) = bands.first() else {
        return Err(WetmapError::EmptySequence);
    };
    let (h, w) = first.dim();
    for band in &bands[1..] {
        if band.dim() != (h, w) {
            return Err(WetmapError::DimensionMismatch {
                expected: (h, w),
                actual: band.dim(),
            });
        }
    }
    let n = bands.len();

    let reduce_row = |row: usize| -> Vec<Option<f32>> {
        let mut pixel_values = Vec::with_capacity(n);
        (0..w)
            .map(|col| {
                pixel_values.clear();
                pixel_values.extend(bands.iter().filter_map(|b| b.get(row, col)));
                median_of(&mut pixel_values)
            })
            .collect()
    };

    let rows: Vec<Vec<Option<f32>>> = if h * w >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        (0..h).into_par_iter().map(reduce_row).collect()
    } else {
        (0..h).map(reduce_row).collect()
    };

    let mut data = Array2::<f32>::zeros((h, w));
    let mut mask = Array2::from_elem((h, w), false);
    for (row, row_data) in rows.into_iter().enumerate() {
        for (col, value) in row_data.into_iter().enumerate() {
            if let Some(v) = value {
                data[[row, col]] = v;
                mask[[row, col]] = true;
            }
        }
    }
    Band::with_mask(name, data, mask)
}

/// Median of a sample set; the mean of the two middle values for even counts.
pub fn median_of(values: &mut [f32]) -> Option<f32> {
    let n = values.len();
    if n == 0 {
        None
    } else if n == 1 {
        Some(values[0])
    } else if n % 2 == 1 {
        let mid = n / 2;
        Some(*values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b)).1)
    } else {
        let mid = n / 2;
        values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        values[..mid].select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b));
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// One sample of a band taken at some sampling scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionSample {
    pub value: f32,
    /// Ground area represented by this sample.
    pub area: f64,
}

/// Sample a band over a region at a given scale.
///
/// The grid is block-averaged by `round(scale / pixel_size)` cells. A block
/// contributes one sample (the mean of its valid cells) when its centre
/// lies in the region and at least one of its cells is valid. At the
/// native scale this is every valid cell whose centre lies in the region.
///
/// A region too small to hold any block centre is sampled from the blocks
/// it overlaps instead, using only the cells whose centres lie inside it.
pub fn sample_region(band: &Band, region: &Region, grid: &GridSpec, scale: f64) -> Result<Vec<RegionSample>> {
    grid.check_shape(band.dim())?;
    let factor = grid.cells_for(scale);
    let (h, w) = band.dim();
    let blocks = move || {
        (0..h).step_by(factor).flat_map(move |r0| {
            (0..w)
                .step_by(factor)
                .map(move |c0| (r0..(r0 + factor).min(h), c0..(c0 + factor).min(w)))
        })
    };

    let mut samples = Vec::new();
    let mut centre_hit = false;
    for (rows, cols) in blocks() {
        let cx = grid.origin_x + (cols.start + cols.end) as f64 / 2.0 * grid.pixel_size;
        let cy = grid.origin_y - (rows.start + rows.end) as f64 / 2.0 * grid.pixel_size;
        if !region.contains(cx, cy) {
            continue;
        }
        centre_hit = true;
        samples.extend(block_sample(band, grid, rows, cols, |_, _| true));
    }
    if centre_hit || factor == 1 {
        return Ok(samples);
    }

    let inside = |row: usize, col: usize| {
        let (x, y) = grid.cell_center(row, col);
        region.contains(x, y)
    };
    debug!(region = %region.name, factor, "No block centre inside region, sampling overlapped blocks");
    Ok(blocks()
        .filter_map(|(rows, cols)| block_sample(band, grid, rows, cols, inside))
        .collect())
}

/// Mean of the valid cells of one block accepted by `include`. The sample
/// area covers every accepted cell, valid or not.
fn block_sample(
    band: &Band,
    grid: &GridSpec,
    rows: Range<usize>,
    cols: Range<usize>,
    include: impl Fn(usize, usize) -> bool,
) -> Option<RegionSample> {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    let mut cells = 0usize;
    for row in rows {
        for col in cols.clone() {
            if !include(row, col) {
                continue;
            }
            cells += 1;
            if let Some(v) = band.get(row, col) {
                sum += v as f64;
                count += 1;
            }
        }
    }
    (count > 0).then(|| RegionSample {
        value: (sum / count as f64) as f32,
        area: cells as f64 * grid.pixel_area(),
    })
}

/// Median of the band over a region; `None` when the region has no valid sample.
pub fn region_median(band: &Band, region: &Region, grid: &GridSpec, scale: f64) -> Result<Option<f32>> {
    let mut values: Vec<f32> = sample_region(band, region, grid, scale)?
        .into_iter()
        .map(|s| s.value)
        .collect();
    Ok(median_of(&mut values))
}

/// Area-weighted sum of the band over a region (`Σ value × area`).
pub fn region_area_sum(band: &Band, region: &Region, grid: &GridSpec, scale: f64) -> Result<f64> {
    Ok(sample_region(band, region, grid, scale)?
        .iter()
        .map(|s| s.value as f64 * s.area)
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> GridSpec {
        GridSpec {
            origin_x: 0.0,
            origin_y: n as f64,
            pixel_size: 1.0,
            width: n,
            height: n,
        }
    }

    #[test]
    fn test_median_of_odd_and_even() {
        assert_eq!(median_of(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median_of(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median_of(&mut []), None);
    }

    #[test]
    fn test_median_stack_skips_invalid() {
        let a = Band::new("B7", Array2::from_elem((2, 2), 10.0));
        let mut b = Band::new("B7", Array2::from_elem((2, 2), 1000.0));
        b.mask[[0, 0]] = false;
        let c = Band::new("B7", Array2::from_elem((2, 2), 20.0));
        let m = median_stack(&[&a, &b, &c], "B7").unwrap();
        assert_eq!(m.data[[0, 0]], 15.0);
        assert_eq!(m.data[[1, 1]], 20.0);
    }

    #[test]
    fn test_median_stack_all_invalid_pixel() {
        let mut a = Band::new("B7", Array2::from_elem((1, 2), 1.0));
        a.mask[[0, 1]] = false;
        let m = median_stack(&[&a], "B7").unwrap();
        assert!(m.mask[[0, 0]]);
        assert!(!m.mask[[0, 1]]);
    }

    #[test]
    fn test_median_stack_empty_error() {
        assert!(median_stack(&[], "B7").is_err());
    }

    #[test]
    fn test_region_area_sum_native_scale() {
        let g = grid(4);
        let band = Band::new("B7", Array2::from_elem((4, 4), 2.0));
        let region = Region::rectangle("all", 0.0, 0.0, 4.0, 4.0);
        let sum = region_area_sum(&band, &region, &g, 1.0).unwrap();
        assert!((sum - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_region_area_sum_coarse_scale() {
        // 2x2 blocks, one fully masked block contributes nothing.
        let g = grid(4);
        let mut band = Band::new("B7", Array2::from_elem((4, 4), 1.0));
        for r in 0..2 {
            for c in 0..2 {
                band.mask[[r, c]] = false;
            }
        }
        let region = Region::rectangle("all", 0.0, 0.0, 4.0, 4.0);
        let sum = region_area_sum(&band, &region, &g, 2.0).unwrap();
        assert!((sum - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_region_smaller_than_block_uses_overlapped_cells() {
        // 100x100 cells of 30 units; a 10x10-cell corner sampled at 1000 units
        // (33-cell blocks) holds no block centre.
        let g = GridSpec {
            origin_x: 0.0,
            origin_y: 3000.0,
            pixel_size: 30.0,
            width: 100,
            height: 100,
        };
        let band = Band::new("B7", Array2::from_elem((100, 100), 500.0));
        let corner = Region::rectangle("west", 0.0, 2700.0, 300.0, 3000.0);

        let samples = sample_region(&band, &corner, &g, 1000.0).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 500.0);
        assert!((samples[0].area - 100.0 * 900.0).abs() < 1e-6);
    }

    #[test]
    fn test_small_unobserved_region_still_sums_to_zero() {
        let g = grid(8);
        let mut band = Band::new("B7", Array2::from_elem((8, 8), 3.0));
        band.mask[[0, 0]] = false;
        // Only cell (0, 0) lies in the region; its 4x4 block has other valid cells.
        let corner = Region::rectangle("corner", 0.0, 7.0, 1.0, 8.0);
        assert_eq!(region_area_sum(&band, &corner, &g, 4.0).unwrap(), 0.0);
    }

    #[test]
    fn test_region_median_none_when_masked() {
        let g = grid(2);
        let mut band = Band::new("B7", Array2::from_elem((2, 2), 1.0));
        band.mask.fill(false);
        let region = Region::rectangle("all", 0.0, 0.0, 2.0, 2.0);
        assert_eq!(region_median(&band, &region, &g, 1.0).unwrap(), None);
    }
}
