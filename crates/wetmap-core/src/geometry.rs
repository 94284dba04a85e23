use geo::{BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Polygon, Rect};
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::raster::GridSpec;

/// Axis-aligned bounds in grid coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Full extent of a grid.
    pub fn of_grid(grid: &GridSpec) -> Self {
        Self {
            min_x: grid.origin_x,
            max_x: grid.origin_x + grid.width as f64 * grid.pixel_size,
            min_y: grid.origin_y - grid.height as f64 * grid.pixel_size,
            max_y: grid.origin_y,
        }
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        Self {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
        }
    }
}

/// A fixed, named multipolygon: region of interest, wet/dry reference
/// area or probe corner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RegionRecord", into = "RegionRecord")]
pub struct Region {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

impl Region {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            geometry,
        }
    }

    /// Axis-aligned rectangle region.
    pub fn rectangle(name: impl Into<String>, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        let rect = Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y });
        Self::new(name, MultiPolygon::new(vec![rect.to_polygon()]))
    }

    /// Interior test; points on an edge are outside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.geometry.contains(&Point::new(x, y))
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        self.geometry.bounding_rect().map(BoundingBox::from)
    }

    /// Cell mask: `true` where the cell centre lies inside the region.
    pub fn rasterize(&self, grid: &GridSpec) -> Array2<bool> {
        let (h, w) = grid.shape();
        let row_mask = |row: usize| -> Vec<bool> {
            (0..w)
                .map(|col| {
                    let (x, y) = grid.cell_center(row, col);
                    self.contains(x, y)
                })
                .collect()
        };

        let rows: Vec<Vec<bool>> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
            (0..h).into_par_iter().map(row_mask).collect()
        } else {
            (0..h).map(row_mask).collect()
        };

        let mut mask = Array2::from_elem((h, w), false);
        for (row, values) in rows.into_iter().enumerate() {
            for (col, v) in values.into_iter().enumerate() {
                mask[[row, col]] = v;
            }
        }
        mask
    }
}

/// Config-file form of a region: plain coordinate rings.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct RegionRecord {
    name: String,
    polygons: Vec<PolygonRecord>,
}

/// Rings need not be closed.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct PolygonRecord {
    exterior: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    holes: Vec<Vec<[f64; 2]>>,
}

fn ring(points: Vec<[f64; 2]>) -> LineString<f64> {
    points.into_iter().map(|[x, y]| Coord { x, y }).collect()
}

fn ring_points(line: &LineString<f64>) -> Vec<[f64; 2]> {
    let mut points: Vec<[f64; 2]> = line.coords().map(|c| [c.x, c.y]).collect();
    if line.is_closed() && points.len() > 1 {
        points.pop();
    }
    points
}

impl From<RegionRecord> for Region {
    fn from(record: RegionRecord) -> Self {
        let polygons = record
            .polygons
            .into_iter()
            .map(|p| Polygon::new(ring(p.exterior), p.holes.into_iter().map(ring).collect()))
            .collect();
        Region::new(record.name, MultiPolygon::new(polygons))
    }
}

impl From<Region> for RegionRecord {
    fn from(region: Region) -> Self {
        let polygons = region
            .geometry
            .iter()
            .map(|p| PolygonRecord {
                exterior: ring_points(p.exterior()),
                holes: p.interiors().iter().map(ring_points).collect(),
            })
            .collect();
        RegionRecord {
            name: region.name,
            polygons,
        }
    }
}
