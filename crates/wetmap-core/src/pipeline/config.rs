use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_BAND, DEFAULT_GAP_FILL_KERNEL_CELLS, DEFAULT_PIXEL_SIZE, DEFAULT_PROBE_SCALE,
    DEFAULT_SEASON_DURATION_MONTHS, DEFAULT_SEASON_OFFSET_MONTHS, DEFAULT_SEASON_STRIDE_MONTHS,
    DEFAULT_THRESHOLD_FRACTION,
};
use crate::error::{Result, WetmapError};
use crate::geometry::Region;
use crate::raster::GridSpec;
use crate::scene::Sensor;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Scene archive directory (holds `scenes.toml`).
    pub archive: PathBuf,
    /// Output directory for composites, flood maps and summaries.
    pub output: PathBuf,
    /// Analysis band kept after merging sensors.
    #[serde(default = "default_band")]
    pub band: String,
    /// Sensors to load, merged in this order.
    #[serde(default = "default_sensors")]
    pub sensors: Vec<Sensor>,
    pub grid: GridSpec,
    pub region_of_interest: Region,
    #[serde(default)]
    pub dates: DateRangeConfig,
    #[serde(default)]
    pub season: SeasonConfig,
    #[serde(default)]
    pub gap_fill: GapFillConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    pub threshold: ThresholdConfig,
}

fn default_band() -> String {
    DEFAULT_BAND.to_string()
}

fn default_sensors() -> Vec<Sensor> {
    Sensor::ALL.to_vec()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DateRangeConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for DateRangeConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2019, 12, 31).unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonConfig {
    /// Months after the range start at which the first window opens.
    pub offset_months: u32,
    pub duration_months: u32,
    pub stride_months: u32,
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            offset_months: DEFAULT_SEASON_OFFSET_MONTHS,
            duration_months: DEFAULT_SEASON_DURATION_MONTHS,
            stride_months: DEFAULT_SEASON_STRIDE_MONTHS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GapFillConfig {
    pub enabled: bool,
    /// Square kernel radius in distance units.
    pub kernel_radius: f64,
}

impl Default for GapFillConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kernel_radius: DEFAULT_GAP_FILL_KERNEL_CELLS * DEFAULT_PIXEL_SIZE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Scene-corner regions that must contain data.
    #[serde(default)]
    pub probes: Vec<Region>,
    #[serde(default = "default_probe_scale")]
    pub probe_scale: f64,
    /// Composite start dates rejected after visual inspection.
    #[serde(default)]
    pub exclude_start_dates: Vec<NaiveDate>,
}

fn default_probe_scale() -> f64 {
    DEFAULT_PROBE_SCALE
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            probes: Vec::new(),
            probe_scale: DEFAULT_PROBE_SCALE,
            exclude_start_dates: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub wet: Region,
    pub dry: Region,
    /// Fraction of the wet→dry distance at which the threshold sits.
    #[serde(default = "default_fraction")]
    pub fraction: f32,
    /// Sampling scale for the reference medians.
    #[serde(default = "default_threshold_scale")]
    pub scale: f64,
}

fn default_fraction() -> f32 {
    DEFAULT_THRESHOLD_FRACTION
}

fn default_threshold_scale() -> f64 {
    DEFAULT_PIXEL_SIZE
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(WetmapError::InvalidConfig(msg));
        if self.dates.end < self.dates.start {
            return fail(format!(
                "dates.end {} precedes dates.start {}",
                self.dates.end, self.dates.start
            ));
        }
        if self.season.duration_months == 0 || self.season.stride_months == 0 {
            return fail("season duration and stride must be at least one month".into());
        }
        if !(self.grid.pixel_size > 0.0) {
            return fail(format!("grid.pixel_size must be positive, got {}", self.grid.pixel_size));
        }
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(WetmapError::InvalidDimensions {
                width: self.grid.width,
                height: self.grid.height,
            });
        }
        if self.sensors.is_empty() {
            return fail("at least one sensor is required".into());
        }
        for region in [&self.region_of_interest, &self.threshold.wet, &self.threshold.dry] {
            if region.geometry.0.is_empty() {
                return fail(format!("region '{}' has no polygons", region.name));
            }
        }
        if self.gap_fill.enabled && !(self.gap_fill.kernel_radius > 0.0) {
            return fail("gap_fill.kernel_radius must be positive".into());
        }
        if !(self.filter.probe_scale > 0.0) || !(self.threshold.scale > 0.0) {
            return fail("sampling scales must be positive".into());
        }
        if !self.threshold.fraction.is_finite() {
            return fail("threshold.fraction must be finite".into());
        }
        Ok(())
    }

    /// A complete configuration with placeholder regions on a 30 m grid.
    pub fn example() -> Self {
        let grid = GridSpec {
            origin_x: 0.0,
            origin_y: 30_000.0,
            pixel_size: DEFAULT_PIXEL_SIZE,
            width: 1000,
            height: 1000,
        };
        Self {
            archive: PathBuf::from("archive"),
            output: PathBuf::from("output"),
            band: default_band(),
            sensors: default_sensors(),
            grid,
            region_of_interest: Region::rectangle("delta", 0.0, 0.0, 30_000.0, 30_000.0),
            dates: DateRangeConfig::default(),
            season: SeasonConfig::default(),
            gap_fill: GapFillConfig::default(),
            filter: FilterConfig {
                probes: vec![
                    Region::rectangle("west", 0.0, 24_000.0, 6_000.0, 30_000.0),
                    Region::rectangle("east", 24_000.0, 0.0, 30_000.0, 6_000.0),
                ],
                exclude_start_dates: NaiveDate::from_ymd_opt(1993, 7, 1).into_iter().collect(),
                ..FilterConfig::default()
            },
            threshold: ThresholdConfig {
                wet: Region::rectangle("wet", 9_000.0, 9_000.0, 12_000.0, 12_000.0),
                dry: Region::rectangle("dry", 18_000.0, 18_000.0, 21_000.0, 21_000.0),
                fraction: DEFAULT_THRESHOLD_FRACTION,
                scale: DEFAULT_PIXEL_SIZE,
            },
        }
    }
}
