use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WetmapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    Image(#[from] image::ImageError),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Raster shape mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Empty raster sequence")]
    EmptySequence,

    #[error("Invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown band '{0}'")]
    UnknownBand(String),

    #[error("Threshold undefined for composite {start_date}: region '{region}' has no valid samples")]
    UndefinedThreshold { start_date: String, region: String },

    #[error("Archive error for {sensor} scenes {start}..{end} over '{region}': {reason}")]
    Archive {
        sensor: String,
        start: String,
        end: String,
        region: String,
        reason: String,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: Box<WetmapError>,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: Box<WetmapError>,
    },

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

pub type Result<T> = std::result::Result<T, WetmapError>;

/// Attach the file a failed read or write was working on.
pub trait PathContext<T> {
    fn reading(self, path: &Path) -> Result<T>;
    fn writing(self, path: &Path) -> Result<T>;
}

impl<T, E: Into<WetmapError>> PathContext<T> for std::result::Result<T, E> {
    fn reading(self, path: &Path) -> Result<T> {
        self.map_err(|e| WetmapError::Read {
            path: path.to_path_buf(),
            source: Box::new(e.into()),
        })
    }

    fn writing(self, path: &Path) -> Result<T> {
        self.map_err(|e| WetmapError::Write {
            path: path.to_path_buf(),
            source: Box::new(e.into()),
        })
    }
}
