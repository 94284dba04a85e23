use ndarray::{Array2, Zip};
use num_traits::{Bounded, NumCast};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WetmapError};

/// Georeferencing of the shared analysis grid.
///
/// North-up: `origin_y` is the top edge and rows grow southwards.
/// All rasters in a run live on one grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub origin_x: f64,
    pub origin_y: f64,
    /// Cell edge length in distance units.
    pub pixel_size: f64,
    pub width: usize,
    pub height: usize,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            pixel_size: crate::consts::DEFAULT_PIXEL_SIZE,
            width: 0,
            height: 0,
        }
    }
}

impl GridSpec {
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Area of one cell in square distance units.
    pub fn pixel_area(&self) -> f64 {
        self.pixel_size * self.pixel_size
    }

    /// Grid coordinates of the centre of cell `(row, col)`.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_size,
            self.origin_y - (row as f64 + 0.5) * self.pixel_size,
        )
    }

    /// Number of native cells covered by a distance, rounded, at least one.
    pub fn cells_for(&self, distance: f64) -> usize {
        ((distance / self.pixel_size).round() as usize).max(1)
    }

    pub fn check_shape(&self, actual: (usize, usize)) -> Result<()> {
        if actual != self.shape() {
            return Err(WetmapError::DimensionMismatch {
                expected: self.shape(),
                actual,
            });
        }
        Ok(())
    }
}

/// One named band: values plus a per-pixel validity mask.
///
/// Masking only ever clears validity; values under an invalid pixel are
/// kept untouched so that re-masking is reproducible.
#[derive(Clone, Debug, PartialEq)]
pub struct Band {
    pub name: String,
    /// Pixel values, row-major, shape = (height, width)
    pub data: Array2<f32>,
    /// `true` where the pixel holds an observation.
    pub mask: Array2<bool>,
}

impl Band {
    /// A fully valid band.
    pub fn new(name: impl Into<String>, data: Array2<f32>) -> Self {
        let mask = Array2::from_elem(data.dim(), true);
        Self {
            name: name.into(),
            data,
            mask,
        }
    }

    pub fn with_mask(name: impl Into<String>, data: Array2<f32>, mask: Array2<bool>) -> Result<Self> {
        if data.dim() != mask.dim() {
            return Err(WetmapError::DimensionMismatch {
                expected: data.dim(),
                actual: mask.dim(),
            });
        }
        Ok(Self {
            name: name.into(),
            data,
            mask,
        })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Value at `(row, col)` if the pixel is valid.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if self.mask[[row, col]] {
            Some(self.data[[row, col]])
        } else {
            None
        }
    }

    /// AND `mask` into the band's validity.
    pub fn update_mask(&mut self, mask: &Array2<bool>) {
        Zip::from(&mut self.mask)
            .and(mask)
            .for_each(|m, &keep| *m = *m && keep);
    }

    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    pub fn is_complete(&self) -> bool {
        self.mask.iter().all(|&m| m)
    }

    /// Round and clamp valid values into the u16 range; invalid pixels become 0.
    pub fn to_u16(&self) -> Band {
        let data = Zip::from(&self.data)
            .and(&self.mask)
            .map_collect(|&v, &m| if m { cast_clamped::<u16>(v) as f32 } else { 0.0 });
        Band {
            name: self.name.clone(),
            data,
            mask: self.mask.clone(),
        }
    }
}

/// An ordered set of co-registered bands.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Raster {
    pub bands: Vec<Band>,
}

impl Raster {
    pub fn new(bands: Vec<Band>) -> Result<Self> {
        if let Some(first) = bands.first() {
            for band in &bands[1..] {
                if band.dim() != first.dim() {
                    return Err(WetmapError::DimensionMismatch {
                        expected: first.dim(),
                        actual: band.dim(),
                    });
                }
            }
        }
        Ok(Self { bands })
    }

    pub fn empty() -> Self {
        Self { bands: Vec::new() }
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Shape of the bands, `None` for a band-less raster.
    pub fn dim(&self) -> Option<(usize, usize)> {
        self.bands.first().map(Band::dim)
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn band(&self, name: &str) -> Result<&Band> {
        self.bands
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| WetmapError::UnknownBand(name.to_string()))
    }

    /// Keep only the named band.
    pub fn select(&self, name: &str) -> Result<Raster> {
        Ok(Raster {
            bands: vec![self.band(name)?.clone()],
        })
    }

    pub fn update_mask(&mut self, mask: &Array2<bool>) {
        for band in &mut self.bands {
            band.update_mask(mask);
        }
    }

    /// Per-pixel minimum of validity over all bands.
    pub fn min_mask(&self) -> Option<Array2<bool>> {
        let first = self.bands.first()?;
        let mut mask = first.mask.clone();
        for band in &self.bands[1..] {
            Zip::from(&mut mask)
                .and(&band.mask)
                .for_each(|m, &b| *m = *m && b);
        }
        Some(mask)
    }

    pub fn to_u16(&self) -> Raster {
        Raster {
            bands: self.bands.iter().map(Band::to_u16).collect(),
        }
    }
}

/// Convert a float to an integer type: round half away from zero, then
/// clamp to the type's range. NaN maps to zero.
pub fn cast_clamped<T: Bounded + NumCast + Copy>(value: f32) -> T {
    let lo = T::min_value().to_f64().unwrap_or(0.0);
    let hi = T::max_value().to_f64().unwrap_or(0.0);
    if value.is_nan() {
        return NumCast::from(0.0f64).unwrap_or_else(T::min_value);
    }
    let clamped = (value as f64).round().clamp(lo, hi);
    NumCast::from(clamped).unwrap_or_else(T::min_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_rounds_half_away_from_zero() {
        assert_eq!(cast_clamped::<u16>(1.5), 2);
        assert_eq!(cast_clamped::<u16>(2.49), 2);
        assert_eq!(cast_clamped::<i16>(-1.5), -2);
    }

    #[test]
    fn test_cast_clamps_to_range() {
        assert_eq!(cast_clamped::<u16>(-12.0), 0);
        assert_eq!(cast_clamped::<u16>(70_000.0), u16::MAX);
        assert_eq!(cast_clamped::<i16>(40_000.0), i16::MAX);
        assert_eq!(cast_clamped::<u16>(f32::NAN), 0);
    }

    #[test]
    fn test_update_mask_is_monotonic() {
        let mut band = Band::new("B7", Array2::from_elem((2, 2), 5.0));
        band.mask[[0, 0]] = false;
        let mut reveal = Array2::from_elem((2, 2), true);
        reveal[[1, 1]] = false;
        band.update_mask(&reveal);
        assert!(!band.mask[[0, 0]]);
        assert!(!band.mask[[1, 1]]);
        assert!(band.mask[[0, 1]]);
        assert_eq!(band.data[[0, 0]], 5.0);
    }

    #[test]
    fn test_min_mask_across_bands() {
        let mut a = Band::new("B1", Array2::zeros((1, 3)));
        let mut b = Band::new("B2", Array2::zeros((1, 3)));
        a.mask[[0, 0]] = false;
        b.mask[[0, 2]] = false;
        let raster = Raster::new(vec![a, b]).unwrap();
        let mask = raster.min_mask().unwrap();
        assert_eq!(mask.iter().copied().collect::<Vec<_>>(), vec![false, true, false]);
    }

    #[test]
    fn test_raster_rejects_mismatched_bands() {
        let a = Band::new("B1", Array2::zeros((2, 2)));
        let b = Band::new("B2", Array2::zeros((3, 2)));
        assert!(Raster::new(vec![a, b]).is_err());
    }

    #[test]
    fn test_grid_cell_center_north_up() {
        let grid = GridSpec {
            origin_x: 100.0,
            origin_y: 200.0,
            pixel_size: 10.0,
            width: 4,
            height: 4,
        };
        assert_eq!(grid.cell_center(0, 0), (105.0, 195.0));
        assert_eq!(grid.cell_center(2, 1), (115.0, 175.0));
        assert_eq!(grid.cells_for(1000.0), 100);
        assert_eq!(grid.cells_for(1.0), 1);
    }
}
