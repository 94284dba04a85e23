use std::collections::BTreeMap;

use chrono::NaiveDate;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{BoundingBox, Region};
use crate::raster::Raster;

/// Source sensor of a scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sensor {
    #[serde(alias = "LT05")]
    Landsat5,
    #[serde(alias = "LE07")]
    Landsat7,
    #[serde(alias = "LC08")]
    Landsat8,
}

/// QA bit conventions shared by a group of sensors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskFamily {
    /// Landsat 5 TM / Landsat 7 ETM+.
    TmEtm,
    /// Landsat 8 OLI.
    Oli,
}

impl Sensor {
    pub const ALL: [Sensor; 3] = [Sensor::Landsat5, Sensor::Landsat7, Sensor::Landsat8];

    pub fn mask_family(self) -> MaskFamily {
        match self {
            Sensor::Landsat5 | Sensor::Landsat7 => MaskFamily::TmEtm,
            Sensor::Landsat8 => MaskFamily::Oli,
        }
    }
}

impl std::fmt::Display for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sensor::Landsat5 => write!(f, "Landsat 5"),
            Sensor::Landsat7 => write!(f, "Landsat 7"),
            Sensor::Landsat8 => write!(f, "Landsat 8"),
        }
    }
}

/// A single-sensor raster observation.
#[derive(Clone, Debug)]
pub struct Scene {
    pub sensor: Sensor,
    pub date: NaiveDate,
    /// Per-pixel quality-assurance bitmask.
    pub qa: Array2<u16>,
    pub raster: Raster,
    pub footprint: BoundingBox,
}

impl Scene {
    /// Same scene with a different raster (masked, band-selected or filled).
    pub fn with_raster(&self, raster: Raster) -> Scene {
        Scene {
            sensor: self.sensor,
            date: self.date,
            qa: self.qa.clone(),
            raster,
            footprint: self.footprint,
        }
    }
}

/// Scenes ordered by acquisition date.
#[derive(Clone, Debug, Default)]
pub struct SceneCollection {
    scenes: Vec<Scene>,
}

impl SceneCollection {
    pub fn new(mut scenes: Vec<Scene>) -> Self {
        scenes.sort_by_key(|s| s.date);
        Self { scenes }
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn into_scenes(self) -> Vec<Scene> {
        self.scenes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Scene> {
        self.scenes.iter()
    }

    /// Keep scenes whose footprint touches the region's bounds.
    pub fn filter_bounds(self, region: &Region) -> Self {
        let Some(bounds) = region.bounds() else {
            return Self::default();
        };
        Self {
            scenes: self
                .scenes
                .into_iter()
                .filter(|s| s.footprint.intersects(&bounds))
                .collect(),
        }
    }

    /// Scenes acquired in `[start, end)`.
    pub fn in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<&Scene> {
        let lo = self.scenes.partition_point(|s| s.date < start);
        let hi = self.scenes.partition_point(|s| s.date < end);
        if lo >= hi {
            return Vec::new();
        }
        self.scenes[lo..hi].iter().collect()
    }

    /// Owned sub-collection of scenes acquired in `[start, end)`.
    pub fn filter_date(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            scenes: self.in_range(start, end).into_iter().cloned().collect(),
        }
    }

    pub fn merge(self, other: SceneCollection) -> Self {
        let mut scenes = self.scenes;
        scenes.extend(other.scenes);
        Self::new(scenes)
    }

    /// Reduce every scene to the named band.
    pub fn select_band(&self, name: &str) -> Result<Self> {
        let scenes = self
            .scenes
            .iter()
            .map(|s| Ok(s.with_raster(s.raster.select(name)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { scenes })
    }

    pub fn count_by_sensor(&self) -> BTreeMap<Sensor, usize> {
        let mut counts = BTreeMap::new();
        for s in &self.scenes {
            *counts.entry(s.sensor).or_insert(0) += 1;
        }
        counts
    }

    /// First and last acquisition dates.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.scenes.first()?.date, self.scenes.last()?.date))
    }
}

impl From<Vec<Scene>> for SceneCollection {
    fn from(scenes: Vec<Scene>) -> Self {
        Self::new(scenes)
    }
}
