use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::composite::Composite;
use crate::consts::PARALLEL_ITEM_THRESHOLD;
use crate::error::Result;
use crate::geometry::Region;
use crate::pipeline::config::FilterConfig;
use crate::raster::GridSpec;
use crate::reduce::region_area_sum;

/// Why a composite was discarded.
#[derive(Clone, Debug, PartialEq)]
pub enum RejectionReason {
    /// No scene fell in the season window, so the composite has no bands.
    EmptyWindow,
    /// The probe region was entirely unobserved (area-weighted sum of zero).
    EmptyProbe { probe: String },
    /// The start date is on the manual exclusion list.
    ManualExclusion,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyWindow => write!(f, "no scenes in window"),
            Self::EmptyProbe { probe } => write!(f, "no data in probe region '{probe}'"),
            Self::ManualExclusion => write!(f, "manually excluded"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rejection {
    pub start_date: NaiveDate,
    pub reason: RejectionReason,
}

/// Area-weighted sum of all band values over a probe region at `scale`.
///
/// Band-less composites sum to zero.
pub fn probe_area_sum(composite: &Composite, probe: &Region, grid: &GridSpec, scale: f64) -> Result<f64> {
    let mut total = 0.0;
    for band in &composite.raster.bands {
        total += region_area_sum(band, probe, grid, scale)?;
    }
    Ok(total)
}

/// First probe whose area-weighted sum is exactly zero, if any.
pub fn first_empty_probe<'a>(
    composite: &Composite,
    probes: &'a [Region],
    grid: &GridSpec,
    scale: f64,
) -> Result<Option<&'a Region>> {
    for probe in probes {
        if probe_area_sum(composite, probe, grid, scale)? == 0.0 {
            return Ok(Some(probe));
        }
    }
    Ok(None)
}

/// Drop composites whose probe regions were never observed.
pub fn filter_by_probes(
    composites: Vec<Composite>,
    probes: &[Region],
    grid: &GridSpec,
    scale: f64,
) -> Result<(Vec<Composite>, Vec<Rejection>)> {
    let check = |c: &Composite| first_empty_probe(c, probes, grid, scale).map(|p| p.map(|r| r.name.clone()));
    let verdicts: Vec<Option<String>> = if composites.len() >= PARALLEL_ITEM_THRESHOLD {
        composites.par_iter().map(check).collect::<Result<_>>()?
    } else {
        composites.iter().map(check).collect::<Result<_>>()?
    };

    let mut kept = Vec::with_capacity(composites.len());
    let mut rejected = Vec::new();
    for (composite, verdict) in composites.into_iter().zip(verdicts) {
        match verdict {
            Some(probe) => {
                warn!(start = %composite.metadata.start_tag(), probe = %probe, "Discarding composite with unobserved probe region");
                rejected.push(Rejection {
                    start_date: composite.metadata.start_date,
                    reason: RejectionReason::EmptyProbe { probe },
                });
            }
            None => kept.push(composite),
        }
    }
    Ok((kept, rejected))
}

/// Drop band-less composites built from windows without scenes.
pub fn filter_empty(composites: Vec<Composite>) -> (Vec<Composite>, Vec<Rejection>) {
    let (empty, kept): (Vec<Composite>, Vec<Composite>) = composites.into_iter().partition(Composite::is_empty);
    let rejections = empty
        .into_iter()
        .map(|c| {
            debug!(start = %c.metadata.start_tag(), "Discarding composite of an empty window");
            Rejection {
                start_date: c.metadata.start_date,
                reason: RejectionReason::EmptyWindow,
            }
        })
        .collect();
    (kept, rejections)
}

/// Drop composites whose start date is listed. Listed dates with no match are ignored.
pub fn filter_by_exclusion(composites: Vec<Composite>, excluded: &[NaiveDate]) -> (Vec<Composite>, Vec<Rejection>) {
    for date in excluded {
        if !composites.iter().any(|c| c.metadata.start_date == *date) {
            debug!(date = %date, "Excluded start date not present in collection");
        }
    }

    let (rejected, kept): (Vec<Composite>, Vec<Composite>) = composites
        .into_iter()
        .partition(|c| excluded.contains(&c.metadata.start_date));
    let rejections = rejected
        .into_iter()
        .map(|c| Rejection {
            start_date: c.metadata.start_date,
            reason: RejectionReason::ManualExclusion,
        })
        .collect();
    (kept, rejections)
}

/// Drop empty-window composites, then apply the manual exclusion list and the probe checks.
pub fn filter_composites(
    composites: Vec<Composite>,
    config: &FilterConfig,
    grid: &GridSpec,
) -> Result<(Vec<Composite>, Vec<Rejection>)> {
    let total = composites.len();
    let (composites, mut rejected) = filter_empty(composites);
    let (composites, excluded) = filter_by_exclusion(composites, &config.exclude_start_dates);
    rejected.extend(excluded);
    let (kept, probe_rejected) = filter_by_probes(composites, &config.probes, grid, config.probe_scale)?;
    rejected.extend(probe_rejected);
    info!(total, kept = kept.len(), rejected = rejected.len(), "Composite filtering complete");
    Ok((kept, rejected))
}
