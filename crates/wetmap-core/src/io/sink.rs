use std::path::{Path, PathBuf};

use ndarray::Zip;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classify::FloodMap;
use crate::composite::{Composite, CompositeMetadata};
use crate::error::{PathContext, Result, WetmapError};
use crate::io::image_io::{load_u16, load_u8, save_f32_tiff, save_i16_tiff, save_u16, save_u8};
use crate::raster::{cast_clamped, Band, Raster};
use crate::summary::{AreaRecord, SumRaster, VarianceRaster};

/// Manifest filename for persisted composites.
pub const COMPOSITE_MANIFEST: &str = "composites.toml";

const COMPOSITE_DIR: &str = "composites";
const FLOOD_MAP_DIR: &str = "floodmaps";
const SUMMARY_DIR: &str = "summary";
const AREA_TABLE: &str = "flood_area.csv";

/// Destination for pipeline products. Invalid pixels are written as 0.
pub trait OutputSink {
    fn write_composites(&self, composites: &[Composite]) -> Result<()>;
    fn write_flood_maps(&self, maps: &[FloodMap]) -> Result<()>;
    fn write_frequency(&self, sum: &SumRaster) -> Result<()>;
    fn write_variance(&self, variance: &VarianceRaster) -> Result<()>;
    fn write_area_table(&self, records: &[AreaRecord]) -> Result<()>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BandFiles {
    pub name: String,
    pub values: PathBuf,
    pub mask: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompositeEntry {
    pub metadata: CompositeMetadata,
    #[serde(default)]
    pub bands: Vec<BandFiles>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CompositeManifest {
    #[serde(rename = "composite", default)]
    pub composites: Vec<CompositeEntry>,
}

/// Writes products below one output directory:
/// `composites/`, `floodmaps/` and `summary/`.
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root).writing(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn subdir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir).writing(&dir)?;
        Ok(dir)
    }
}

/// `floodmap_{start}_{end}.tif`
pub fn flood_map_filename(map: &FloodMap) -> String {
    format!(
        "floodmap_{}_{}.tif",
        map.metadata.start_tag(),
        map.metadata.end_tag()
    )
}

fn write_band(band: &Band, dir: &Path, stem: &str) -> Result<BandFiles> {
    let values = PathBuf::from(format!("{stem}_{}.tif", band.name));
    let mask = PathBuf::from(format!("{stem}_{}_mask.tif", band.name));
    let pixels = Zip::from(&band.data)
        .and(&band.mask)
        .map_collect(|&v, &m| if m { cast_clamped::<u16>(v) } else { 0 });
    let values_path = dir.join(&values);
    save_u16(&pixels, &values_path).writing(&values_path)?;
    let mask_path = dir.join(&mask);
    save_u8(&band.mask.mapv(u8::from), &mask_path).writing(&mask_path)?;
    Ok(BandFiles {
        name: band.name.clone(),
        values,
        mask,
    })
}

impl OutputSink for DirectorySink {
    fn write_composites(&self, composites: &[Composite]) -> Result<()> {
        let dir = self.subdir(COMPOSITE_DIR)?;
        let mut manifest = CompositeManifest::default();
        for composite in composites {
            let stem = format!(
                "composite_{}_{}",
                composite.metadata.start_tag(),
                composite.metadata.end_tag()
            );
            let bands = composite
                .raster
                .bands
                .iter()
                .map(|b| write_band(b, &dir, &stem))
                .collect::<Result<Vec<_>>>()?;
            manifest.composites.push(CompositeEntry {
                metadata: composite.metadata.clone(),
                bands,
            });
        }
        let manifest_path = dir.join(COMPOSITE_MANIFEST);
        std::fs::write(&manifest_path, toml::to_string_pretty(&manifest)?).writing(&manifest_path)?;
        info!(count = composites.len(), dir = %dir.display(), "Composites written");
        Ok(())
    }

    fn write_flood_maps(&self, maps: &[FloodMap]) -> Result<()> {
        let dir = self.subdir(FLOOD_MAP_DIR)?;
        for map in maps {
            let pixels = Zip::from(&map.data)
                .and(&map.mask)
                .map_collect(|&v, &m| if m { v } else { 0 });
            let path = dir.join(flood_map_filename(map));
            save_u8(&pixels, &path).writing(&path)?;
        }
        info!(count = maps.len(), dir = %dir.display(), "Flood maps written");
        Ok(())
    }

    fn write_frequency(&self, sum: &SumRaster) -> Result<()> {
        let dir = self.subdir(SUMMARY_DIR)?;
        let pixels = Zip::from(&sum.data)
            .and(&sum.mask)
            .map_collect(|&v, &m| if m { v } else { 0 });
        let path = dir.join("flood_frequency.tif");
        save_i16_tiff(&pixels, &path).writing(&path)
    }

    fn write_variance(&self, variance: &VarianceRaster) -> Result<()> {
        let dir = self.subdir(SUMMARY_DIR)?;
        let pixels = Zip::from(&variance.data)
            .and(&variance.mask)
            .map_collect(|&v, &m| if m { v } else { 0.0 });
        let path = dir.join(format!("{}.tif", variance.name));
        save_f32_tiff(&pixels, &path).writing(&path)
    }

    fn write_area_table(&self, records: &[AreaRecord]) -> Result<()> {
        let path = self.subdir(SUMMARY_DIR)?.join(AREA_TABLE);
        let write = || -> Result<()> {
            let mut writer = csv::Writer::from_path(&path)?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
            Ok(())
        };
        write().writing(&path)
    }
}

/// Reload composites persisted by [`DirectorySink::write_composites`] from an output directory.
pub fn load_composites(output: &Path) -> Result<Vec<Composite>> {
    let dir = output.join(COMPOSITE_DIR);
    let manifest_path = dir.join(COMPOSITE_MANIFEST);
    let contents = std::fs::read_to_string(&manifest_path).reading(&manifest_path)?;
    let manifest = toml::from_str::<CompositeManifest>(&contents).reading(&manifest_path)?;

    manifest
        .composites
        .into_iter()
        .map(|entry| {
            let bands = entry
                .bands
                .iter()
                .map(|files| {
                    let values_path = dir.join(&files.values);
                    let values = load_u16(&values_path).reading(&values_path)?;
                    let mask_path = dir.join(&files.mask);
                    let mask = load_u8(&mask_path).reading(&mask_path)?;
                    Band::with_mask(files.name.clone(), values.mapv(f32::from), mask.mapv(|m| m != 0))
                })
                .collect::<Result<Vec<_>>>()?;
            let raster = Raster::new(bands)?;
            if raster.band_count() != entry.metadata.band_count {
                return Err(WetmapError::Pipeline(format!(
                    "composite {} lists {} bands but {} were stored",
                    entry.metadata.start_tag(),
                    entry.metadata.band_count,
                    raster.band_count()
                )));
            }
            Ok(Composite {
                metadata: entry.metadata,
                raster,
            })
        })
        .collect()
}
