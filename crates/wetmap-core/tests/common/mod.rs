use std::sync::Mutex;

use chrono::NaiveDate;
use ndarray::Array2;

use wetmap_core::classify::FloodMap;
use wetmap_core::composite::Composite;
use wetmap_core::error::Result;
use wetmap_core::geometry::{BoundingBox, Region};
use wetmap_core::io::archive::SceneArchive;
use wetmap_core::io::sink::OutputSink;
use wetmap_core::pipeline::{PipelineStage, ProgressReporter};
use wetmap_core::raster::{Band, GridSpec, Raster};
use wetmap_core::scene::{Scene, SceneCollection, Sensor};
use wetmap_core::summary::{AreaRecord, SumRaster, VarianceRaster};

pub const PIXEL: f64 = 30.0;

/// North-up grid of 30-unit cells with its bottom-left corner at the origin.
pub fn grid(width: usize, height: usize) -> GridSpec {
    GridSpec {
        origin_x: 0.0,
        origin_y: height as f64 * PIXEL,
        pixel_size: PIXEL,
        width,
        height,
    }
}

/// Rectangle covering whole cells `cols` x `rows` of a grid built by [`grid`].
pub fn cell_rect(name: &str, g: &GridSpec, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> Region {
    let top = g.origin_y - rows.start as f64 * PIXEL;
    let bottom = g.origin_y - rows.end as f64 * PIXEL;
    Region::rectangle(
        name,
        cols.start as f64 * PIXEL,
        bottom,
        cols.end as f64 * PIXEL,
        top,
    )
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
}

/// Single-band (`B7`) scene with a clear QA layer.
pub fn b7_scene(sensor: Sensor, on: &str, values: Array2<f32>, g: &GridSpec) -> Scene {
    let dim = values.dim();
    Scene {
        sensor,
        date: date(on),
        qa: Array2::zeros(dim),
        raster: Raster::new(vec![Band::new("B7", values)]).expect("single band"),
        footprint: BoundingBox::of_grid(g),
    }
}

/// Values that depend on the column only.
pub fn columns(h: usize, w: usize, value: impl Fn(usize) -> f32) -> Array2<f32> {
    Array2::from_shape_fn((h, w), |(_, c)| value(c))
}

/// In-memory archive for pipeline tests.
pub struct MemoryArchive {
    pub scenes: Vec<Scene>,
}

impl SceneArchive for MemoryArchive {
    fn load(&self, sensor: Sensor, region: &Region, start: NaiveDate, end: NaiveDate) -> Result<SceneCollection> {
        let scenes = self
            .scenes
            .iter()
            .filter(|s| s.sensor == sensor && start <= s.date && s.date <= end)
            .cloned()
            .collect::<Vec<_>>();
        Ok(SceneCollection::new(scenes).filter_bounds(region))
    }
}

/// Sink that keeps everything in memory.
#[derive(Default)]
pub struct MemorySink {
    pub composites: Mutex<Vec<Composite>>,
    pub flood_maps: Mutex<Vec<FloodMap>>,
    pub frequency: Mutex<Option<SumRaster>>,
    pub variance: Mutex<Option<VarianceRaster>>,
    pub areas: Mutex<Vec<AreaRecord>>,
}

impl OutputSink for MemorySink {
    fn write_composites(&self, composites: &[Composite]) -> Result<()> {
        self.composites.lock().unwrap().extend_from_slice(composites);
        Ok(())
    }

    fn write_flood_maps(&self, maps: &[FloodMap]) -> Result<()> {
        self.flood_maps.lock().unwrap().extend_from_slice(maps);
        Ok(())
    }

    fn write_frequency(&self, sum: &SumRaster) -> Result<()> {
        *self.frequency.lock().unwrap() = Some(sum.clone());
        Ok(())
    }

    fn write_variance(&self, variance: &VarianceRaster) -> Result<()> {
        *self.variance.lock().unwrap() = Some(variance.clone());
        Ok(())
    }

    fn write_area_table(&self, records: &[AreaRecord]) -> Result<()> {
        self.areas.lock().unwrap().extend_from_slice(records);
        Ok(())
    }
}

/// Progress seen for one stage: its declared total and the furthest position reached.
#[derive(Clone, Debug, PartialEq)]
pub struct StageProgress {
    pub stage: PipelineStage,
    pub total: Option<usize>,
    pub reached: usize,
}

/// Records every stage it is told about.
#[derive(Default)]
pub struct RecordingReporter {
    pub stages: Mutex<Vec<PipelineStage>>,
    pub progress: Mutex<Vec<StageProgress>>,
}

impl ProgressReporter for RecordingReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.stages.lock().unwrap().push(stage);
        self.progress.lock().unwrap().push(StageProgress {
            stage,
            total: total_items,
            reached: 0,
        });
    }

    fn advance(&self, items_done: usize) {
        if let Some(current) = self.progress.lock().unwrap().last_mut() {
            current.reached = current.reached.max(items_done);
        }
    }
}
