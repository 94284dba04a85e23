//! Gap filling by local regression against a temporal-neighbourhood median.
//!
//! For each scene, the median of all scenes acquired within one year either
//! side is used as a fill reference `F`. Within a square kernel around each
//! pixel, the scene's values are regressed on `F` (ordinary least squares),
//! and pixels missing from the scene are replaced with `F * scale + offset`.
//! Pixels without a usable fit or reference stay masked.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Months, NaiveDate};
use ndarray::{Array2, Zip};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::consts::{GAP_FILL_NEIGHBOURHOOD_YEARS, PARALLEL_ITEM_THRESHOLD, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{Result, WetmapError};
use crate::raster::{Band, Raster};
use crate::reduce::median_stack;
use crate::scene::{Scene, SceneCollection};

/// Per-pixel least-squares coefficients `y ≈ x * scale + offset`.
#[derive(Clone, Debug)]
pub struct LinearFit {
    pub scale: Array2<f32>,
    pub offset: Array2<f32>,
    /// `false` where the kernel held no pixel valid in both inputs.
    pub defined: Array2<bool>,
}

/// Summed-area table with a zero guard row and column.
struct Integral {
    table: Array2<f64>,
}

impl Integral {
    fn build(h: usize, w: usize, value: impl Fn(usize, usize) -> f64) -> Self {
        let mut table = Array2::<f64>::zeros((h + 1, w + 1));
        for row in 0..h {
            let mut row_sum = 0.0;
            for col in 0..w {
                row_sum += value(row, col);
                table[[row + 1, col + 1]] = table[[row, col + 1]] + row_sum;
            }
        }
        Self { table }
    }

    /// Sum over rows `r0..r1`, cols `c0..c1` (exclusive upper bounds).
    fn window(&self, r0: usize, r1: usize, c0: usize, c1: usize) -> f64 {
        self.table[[r1, c1]] - self.table[[r0, c1]] - self.table[[r1, c0]] + self.table[[r0, c0]]
    }
}

fn valid_mean(band: &Band) -> f64 {
    let (sum, n) = Zip::from(&band.data)
        .and(&band.mask)
        .fold((0.0f64, 0usize), |(s, n), &v, &m| if m { (s + v as f64, n + 1) } else { (s, n) });
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Fit `y` against `x` by ordinary least squares inside a square window of
/// `(2 * radius + 1)²` cells around every pixel, using only cells valid in
/// both bands.
///
/// A window with zero variance in `x` yields `scale = 0` and
/// `offset = mean(y)`.
pub fn local_linear_fit(x: &Band, y: &Band, radius: usize) -> Result<LinearFit> {
    if x.dim() != y.dim() {
        return Err(WetmapError::DimensionMismatch {
            expected: y.dim(),
            actual: x.dim(),
        });
    }
    let (h, w) = y.dim();

    // Centre both variables for conditioning; the slope is shift-invariant.
    let mx = valid_mean(x);
    let my = valid_mean(y);
    let both = |r: usize, c: usize| x.mask[[r, c]] && y.mask[[r, c]];
    let xv = |r: usize, c: usize| x.data[[r, c]] as f64 - mx;
    let yv = |r: usize, c: usize| y.data[[r, c]] as f64 - my;
    let pick = |r: usize, c: usize, f: &dyn Fn(usize, usize) -> f64| if both(r, c) { f(r, c) } else { 0.0 };

    let n = Integral::build(h, w, |r, c| pick(r, c, &|_, _| 1.0));
    let sx = Integral::build(h, w, |r, c| pick(r, c, &xv));
    let sy = Integral::build(h, w, |r, c| pick(r, c, &yv));
    let sxx = Integral::build(h, w, |r, c| pick(r, c, &|r, c| xv(r, c).powi(2)));
    let sxy = Integral::build(h, w, |r, c| pick(r, c, &|r, c| xv(r, c) * yv(r, c)));

    let fit_row = |row: usize| -> Vec<Option<(f32, f32)>> {
        let r0 = row.saturating_sub(radius);
        let r1 = (row + radius + 1).min(h);
        (0..w)
            .map(|col| {
                let c0 = col.saturating_sub(radius);
                let c1 = (col + radius + 1).min(w);
                let count = n.window(r0, r1, c0, c1);
                if count < 0.5 {
                    return None;
                }
                let mean_x = sx.window(r0, r1, c0, c1) / count;
                let mean_y = sy.window(r0, r1, c0, c1) / count;
                let var_x = sxx.window(r0, r1, c0, c1) / count - mean_x * mean_x;
                let cov = sxy.window(r0, r1, c0, c1) / count - mean_x * mean_y;
                let scale = if var_x > 1e-9 { cov / var_x } else { 0.0 };
                // Undo the centring: offset in original units.
                let offset = (mean_y + my) - scale * (mean_x + mx);
                Some((scale as f32, offset as f32))
            })
            .collect()
    };

    let rows: Vec<Vec<Option<(f32, f32)>>> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(fit_row).collect()
    } else {
        (0..h).map(fit_row).collect()
    };

    let mut fit = LinearFit {
        scale: Array2::zeros((h, w)),
        offset: Array2::zeros((h, w)),
        defined: Array2::from_elem((h, w), false),
    };
    for (row, values) in rows.into_iter().enumerate() {
        for (col, value) in values.into_iter().enumerate() {
            if let Some((s, o)) = value {
                fit.scale[[row, col]] = s;
                fit.offset[[row, col]] = o;
                fit.defined[[row, col]] = true;
            }
        }
    }
    Ok(fit)
}

/// Replace missing pixels of `band` with `fill * scale + offset`, then cast to u16.
pub fn fill_band(band: &Band, fill: &Band, fit: &LinearFit) -> Band {
    let mut out = band.clone();
    Zip::indexed(&mut out.data)
        .and(&mut out.mask)
        .for_each(|(r, c), value, valid| {
            if !*valid && fill.mask[[r, c]] && fit.defined[[r, c]] {
                *value = fill.data[[r, c]] * fit.scale[[r, c]] + fit.offset[[r, c]];
                *valid = true;
            }
        });
    out.to_u16()
}

/// Gap-fill one scene against its temporal neighbourhood.
///
/// Bands absent from every neighbour are returned unchanged (still cast to
/// u16); so is the whole scene when the neighbourhood is empty.
pub fn gap_fill_scene(scene: &Scene, neighbourhood: &[&Scene], radius_cells: usize) -> Result<Scene> {
    let mut bands = Vec::with_capacity(scene.raster.band_count());
    for band in &scene.raster.bands {
        if band.is_complete() {
            bands.push(band.to_u16());
            continue;
        }
        let references: Vec<&Band> = neighbourhood
            .iter()
            .filter_map(|s| s.raster.band(&band.name).ok())
            .collect();
        if references.is_empty() {
            debug!(date = %scene.date, band = %band.name, "Empty gap-fill neighbourhood, leaving gaps masked");
            bands.push(band.to_u16());
            continue;
        }
        let fill = median_stack(&references, &band.name)?;
        let fit = local_linear_fit(&fill, band, radius_cells)?;
        bands.push(fill_band(band, &fill, &fit));
    }
    Ok(scene.with_raster(Raster::new(bands)?))
}

/// `[date - 1 year, date + 1 year)`.
pub fn neighbourhood_window(date: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let span = Months::new(12 * GAP_FILL_NEIGHBOURHOOD_YEARS as u32);
    let start = date
        .checked_sub_months(span)
        .ok_or_else(|| WetmapError::InvalidDate(date.to_string()))?;
    let end = date
        .checked_add_months(span)
        .ok_or_else(|| WetmapError::InvalidDate(date.to_string()))?;
    Ok((start, end))
}

/// Gap-fill every scene of a (merged, band-selected) collection against the
/// same collection.
pub fn gap_fill_collection(collection: &SceneCollection, radius_cells: usize) -> Result<SceneCollection> {
    gap_fill_collection_with_progress(collection, radius_cells, |_| {})
}

/// Gap fill every scene, calling `on_progress(items_done)` as each scene completes.
pub fn gap_fill_collection_with_progress(
    collection: &SceneCollection,
    radius_cells: usize,
    on_progress: impl Fn(usize) + Send + Sync,
) -> Result<SceneCollection> {
    let done = AtomicUsize::new(0);
    let fill_one = |scene: &Scene| -> Result<Scene> {
        let (start, end) = neighbourhood_window(scene.date)?;
        let neighbourhood = collection.in_range(start, end);
        let filled = gap_fill_scene(scene, &neighbourhood, radius_cells)?;
        on_progress(done.fetch_add(1, Ordering::Relaxed) + 1);
        Ok(filled)
    };

    let scenes = collection.scenes();
    let filled: Vec<Scene> = if scenes.len() >= PARALLEL_ITEM_THRESHOLD {
        scenes.par_iter().map(fill_one).collect::<Result<_>>()?
    } else {
        scenes.iter().map(fill_one).collect::<Result<_>>()?
    };
    info!(scenes = filled.len(), radius_cells, "Gap filling complete");
    Ok(SceneCollection::new(filled))
}
