use chrono::{Datelike, Months, NaiveDate};
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{DATE_FORMAT, MEAN_DAYS_PER_MONTH, PARALLEL_ITEM_THRESHOLD};
use crate::error::{Result, WetmapError};
use crate::geometry::Region;
use crate::raster::{Band, GridSpec, Raster};
use crate::reduce::median_stack;
use crate::scene::SceneCollection;

/// Half-open date window `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeasonWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SeasonWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// Typed tags carried by every composite.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeMetadata {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub band_count: usize,
}

impl CompositeMetadata {
    /// Start date as an ISO `YYYY-MM-DD` tag.
    pub fn start_tag(&self) -> String {
        self.start_date.format(DATE_FORMAT).to_string()
    }

    pub fn end_tag(&self) -> String {
        self.end_date.format(DATE_FORMAT).to_string()
    }
}

/// Median composite of one season window. Zero bands when the window held no scene.
#[derive(Clone, Debug)]
pub struct Composite {
    pub metadata: CompositeMetadata,
    pub raster: Raster,
}

impl Composite {
    pub fn is_empty(&self) -> bool {
        self.raster.band_count() == 0
    }
}

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| WetmapError::InvalidDate(s.to_string()))
}

/// Months between two dates, with the day difference as a fraction, rounded.
pub fn month_span(start: NaiveDate, end: NaiveDate) -> i64 {
    let whole = (end.year() - start.year()) as i64 * 12 + end.month() as i64 - start.month() as i64;
    let frac = (end.day() as f64 - start.day() as f64) / MEAN_DAYS_PER_MONTH;
    (whole as f64 + frac).round() as i64
}

/// Season windows over `[start, end]`.
///
/// Windows open at `start + k` months for `k = offset, offset + stride, …`
/// while `k` does not exceed the rounded month span, and each lasts
/// `duration` months.
pub fn season_windows(
    start: NaiveDate,
    end: NaiveDate,
    offset_months: u32,
    duration_months: u32,
    stride_months: u32,
) -> Result<Vec<SeasonWindow>> {
    if end < start {
        return Err(WetmapError::InvalidConfig(format!(
            "date range end {end} precedes start {start}"
        )));
    }
    if duration_months == 0 || stride_months == 0 {
        return Err(WetmapError::InvalidConfig(
            "season duration and stride must be at least one month".into(),
        ));
    }

    let span = month_span(start, end);
    let mut windows = Vec::new();
    let mut k = offset_months as i64;
    while k <= span {
        let open = start
            .checked_add_months(Months::new(k as u32))
            .ok_or_else(|| WetmapError::InvalidDate(format!("{start} + {k} months")))?;
        let close = open
            .checked_add_months(Months::new(duration_months))
            .ok_or_else(|| WetmapError::InvalidDate(format!("{open} + {duration_months} months")))?;
        windows.push(SeasonWindow {
            start: open,
            end: close,
        });
        k += stride_months as i64;
    }
    Ok(windows)
}

/// Median composite of all scenes in the window, clipped to `roi_mask` and cast to u16.
pub fn build_composite(
    scenes: &SceneCollection,
    window: SeasonWindow,
    roi_mask: &Array2<bool>,
) -> Result<Composite> {
    let members = scenes.in_range(window.start, window.end);

    let mut names: Vec<&str> = Vec::new();
    for scene in &members {
        for name in scene.raster.band_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }

    let mut bands = Vec::with_capacity(names.len());
    for name in names {
        let stack: Vec<&Band> = members
            .iter()
            .filter_map(|s| s.raster.band(name).ok())
            .collect();
        let mut band = median_stack(&stack, name)?;
        if band.dim() != roi_mask.dim() {
            return Err(WetmapError::DimensionMismatch {
                expected: roi_mask.dim(),
                actual: band.dim(),
            });
        }
        band.update_mask(roi_mask);
        bands.push(band.to_u16());
    }
    let raster = Raster::new(bands)?;

    debug!(
        start = %window.start,
        scenes = members.len(),
        bands = raster.band_count(),
        "Composite built"
    );

    Ok(Composite {
        metadata: CompositeMetadata {
            start_date: window.start,
            end_date: window.end,
            band_count: raster.band_count(),
        },
        raster,
    })
}

/// One composite per window, in window order.
pub fn build_composites(
    scenes: &SceneCollection,
    windows: &[SeasonWindow],
    roi: &Region,
    grid: &GridSpec,
) -> Result<Vec<Composite>> {
    let roi_mask = roi.rasterize(grid);
    let composites: Vec<Composite> = if windows.len() >= PARALLEL_ITEM_THRESHOLD {
        windows
            .par_iter()
            .map(|w| build_composite(scenes, *w, &roi_mask))
            .collect::<Result<_>>()?
    } else {
        windows
            .iter()
            .map(|w| build_composite(scenes, *w, &roi_mask))
            .collect::<Result<_>>()?
    };
    let empty = composites.iter().filter(|c| c.is_empty()).count();
    info!(composites = composites.len(), empty, "Seasonal compositing complete");
    Ok(composites)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_month_span_rounds_partial_month() {
        assert_eq!(month_span(d("1990-01-01"), d("2019-12-31")), 360);
        assert_eq!(month_span(d("2000-01-01"), d("2000-03-01")), 2);
    }

    #[test]
    fn test_thirty_year_range_gives_thirty_windows() {
        let windows = season_windows(d("1990-01-01"), d("2020-01-01"), 6, 3, 12).unwrap();
        assert_eq!(windows.len(), 30);
        for pair in windows.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        for w in &windows {
            assert_eq!(month_span(w.start, w.end), 3);
            assert_eq!(w.start.month(), 7);
            assert_eq!(w.end.month(), 10);
        }
        assert_eq!(windows[0].start, d("1990-07-01"));
        assert_eq!(windows[29].start, d("2019-07-01"));
    }

    #[test]
    fn test_window_contains_is_half_open() {
        let w = SeasonWindow {
            start: d("2000-07-01"),
            end: d("2000-10-01"),
        };
        assert!(w.contains(d("2000-07-01")));
        assert!(w.contains(d("2000-09-30")));
        assert!(!w.contains(d("2000-10-01")));
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        assert!(season_windows(d("2001-01-01"), d("2000-01-01"), 6, 3, 12).is_err());
        assert!(season_windows(d("2000-01-01"), d("2001-01-01"), 6, 0, 12).is_err());
        assert!(parse_date("2000-13-01").is_err());
    }

    #[test]
    fn test_empty_window_yields_zero_band_composite() {
        let scenes = SceneCollection::default();
        let window = SeasonWindow {
            start: d("2000-07-01"),
            end: d("2000-10-01"),
        };
        let c = build_composite(&scenes, window, &Array2::from_elem((2, 2), true)).unwrap();
        assert!(c.is_empty());
        assert_eq!(c.metadata.band_count, 0);
        assert_eq!(c.metadata.start_tag(), "2000-07-01");
        assert_eq!(c.metadata.end_tag(), "2000-10-01");
    }
}
