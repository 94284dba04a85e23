/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum item count (scenes, windows, composites) to use item-level Rayon parallelism.
pub const PARALLEL_ITEM_THRESHOLD: usize = 4;

/// QA bit flagging cloud shadow.
pub const QA_CLOUD_SHADOW_BIT: u16 = 1 << 3;

/// QA bit flagging cloud.
pub const QA_CLOUD_BIT: u16 = 1 << 5;

/// QA bit flagging high cloud confidence (TM/ETM+ products only).
pub const QA_CLOUD_CONFIDENCE_HIGH_BIT: u16 = 1 << 7;

/// Default analysis band (shortwave infrared).
pub const DEFAULT_BAND: &str = "B7";

/// Default native pixel size in distance units (Landsat: 30 m).
pub const DEFAULT_PIXEL_SIZE: f64 = 30.0;

/// Default gap-fill kernel size, in cells of the native pixel size.
pub const DEFAULT_GAP_FILL_KERNEL_CELLS: f64 = 10.0;

/// Temporal half-width of the gap-fill neighbourhood, in years.
pub const GAP_FILL_NEIGHBOURHOOD_YEARS: i32 = 1;

/// Default sampling scale for probe-region area sums.
pub const DEFAULT_PROBE_SCALE: f64 = 1000.0;

/// Default fraction of the wet→dry distance used for the flood threshold.
pub const DEFAULT_THRESHOLD_FRACTION: f32 = 0.3;

/// Default season: months after the range start at which the first window opens (July).
pub const DEFAULT_SEASON_OFFSET_MONTHS: u32 = 6;

/// Default season length in months (July..September).
pub const DEFAULT_SEASON_DURATION_MONTHS: u32 = 3;

/// Default stride between consecutive season windows.
pub const DEFAULT_SEASON_STRIDE_MONTHS: u32 = 12;

/// Mean month length in days, used for fractional month spans.
pub const MEAN_DAYS_PER_MONTH: f64 = 365.25 / 12.0;

/// Square distance units per square kilometre (metre grids).
pub const UNITS2_PER_KM2: f64 = 1_000_000.0;

/// ISO date format used for composite tags and filenames.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
