use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PathContext, Result, WetmapError};
use crate::geometry::{BoundingBox, Region};
use crate::io::image_io::load_u16;
use crate::raster::{Band, GridSpec, Raster};
use crate::scene::{Scene, SceneCollection, Sensor};

/// Manifest filename inside an archive directory.
pub const SCENE_MANIFEST: &str = "scenes.toml";

/// Source of raw scenes.
pub trait SceneArchive {
    /// Scenes of one sensor acquired in `[start, end]` whose footprint touches `region`.
    fn load(&self, sensor: Sensor, region: &Region, start: NaiveDate, end: NaiveDate) -> Result<SceneCollection>;
}

/// One `[[scene]]` entry of `scenes.toml`. Paths are relative to the archive directory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneEntry {
    pub sensor: Sensor,
    pub date: NaiveDate,
    pub qa: PathBuf,
    /// Band value marking a missing observation.
    #[serde(default)]
    pub nodata: Option<u16>,
    /// Band name → 16-bit image.
    pub bands: BTreeMap<String, PathBuf>,
    /// Defaults to the full grid extent.
    #[serde(default)]
    pub footprint: Option<BoundingBox>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SceneManifest {
    #[serde(rename = "scene", default)]
    pub scenes: Vec<SceneEntry>,
}

impl SceneManifest {
    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(SCENE_MANIFEST);
        let contents = std::fs::read_to_string(&path).reading(&path)?;
        toml::from_str::<Self>(&contents).reading(&path)
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(SCENE_MANIFEST);
        std::fs::write(&path, toml::to_string_pretty(self)?).writing(&path)
    }
}

/// Scenes stored as 16-bit images in a directory, indexed by `scenes.toml`.
pub struct DirectoryArchive {
    root: PathBuf,
    grid: GridSpec,
    manifest: SceneManifest,
}

impl DirectoryArchive {
    pub fn open(root: &Path, grid: &GridSpec) -> Result<Self> {
        let manifest = SceneManifest::read(root)?;
        debug!(root = %root.display(), scenes = manifest.scenes.len(), "Opened scene archive");
        Ok(Self {
            root: root.to_path_buf(),
            grid: grid.clone(),
            manifest,
        })
    }

    pub fn manifest(&self) -> &SceneManifest {
        &self.manifest
    }

    fn read_scene(&self, entry: &SceneEntry) -> Result<Scene> {
        let qa_path = self.root.join(&entry.qa);
        let qa = load_u16(&qa_path).reading(&qa_path)?;
        self.grid.check_shape(qa.dim())?;

        let mut bands = Vec::with_capacity(entry.bands.len());
        for (name, file) in &entry.bands {
            let path = self.root.join(file);
            let values = load_u16(&path).reading(&path)?;
            self.grid.check_shape(values.dim())?;
            let mask = match entry.nodata {
                Some(nodata) => values.mapv(|v| v != nodata),
                None => values.mapv(|_| true),
            };
            bands.push(Band::with_mask(name.clone(), values.mapv(f32::from), mask)?);
        }

        Ok(Scene {
            sensor: entry.sensor,
            date: entry.date,
            qa,
            raster: Raster::new(bands)?,
            footprint: entry.footprint.unwrap_or_else(|| BoundingBox::of_grid(&self.grid)),
        })
    }
}

impl SceneArchive for DirectoryArchive {
    fn load(&self, sensor: Sensor, region: &Region, start: NaiveDate, end: NaiveDate) -> Result<SceneCollection> {
        let context = |reason: String| WetmapError::Archive {
            sensor: sensor.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            region: region.name.clone(),
            reason,
        };

        let scenes = self
            .manifest
            .scenes
            .iter()
            .filter(|e| e.sensor == sensor && start <= e.date && e.date <= end)
            .map(|e| {
                self.read_scene(e)
                    .map_err(|err| context(format!("scene {}: {err}", e.date)))
            })
            .collect::<Result<Vec<_>>>()?;

        let collection = SceneCollection::new(scenes).filter_bounds(region);
        info!(sensor = %sensor, scenes = collection.len(), "Loaded scenes");
        Ok(collection)
    }
}
