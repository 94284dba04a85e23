#[allow(dead_code)]
mod common;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ndarray::Array2;

use wetmap_core::composite::{Composite, CompositeMetadata};
use wetmap_core::error::WetmapError;
use wetmap_core::geometry::{BoundingBox, Region};
use wetmap_core::io::archive::{DirectoryArchive, SceneArchive, SceneEntry, SceneManifest};
use wetmap_core::io::image_io::{load_u16, load_u8, save_i16_tiff, save_u16, save_u8};
use wetmap_core::io::sink::{load_composites, DirectorySink, OutputSink};
use wetmap_core::raster::{Band, Raster};
use wetmap_core::scene::Sensor;

use common::{date, grid};

// ---------------------------------------------------------------------------
// Image files
// ---------------------------------------------------------------------------

#[test]
fn test_u16_tiff_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("band.tif");
    let data = Array2::from_shape_fn((3, 5), |(r, c)| (r * 1000 + c) as u16 + 60_000);

    save_u16(&data, &path).unwrap();
    assert_eq!(load_u16(&path).unwrap(), data);
}

#[test]
fn test_u8_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mask.tif");
    let data = Array2::from_shape_fn((2, 3), |(r, c)| ((r + c) % 2) as u8);

    save_u8(&data, &path).unwrap();
    assert_eq!(load_u8(&path).unwrap(), data);
}

#[test]
fn test_i16_tiff_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sum.tif");
    save_i16_tiff(&Array2::from_elem((4, 4), 7i16), &path).unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}

// ---------------------------------------------------------------------------
// Scene archive
// ---------------------------------------------------------------------------

fn add_scene(root: &Path, manifest: &mut SceneManifest, sensor: Sensor, on: &str, value: u16) {
    let qa = PathBuf::from(format!("{on}_qa.tif"));
    let b7 = PathBuf::from(format!("{on}_b7.tif"));
    save_u16(&Array2::zeros((2, 2)), &root.join(&qa)).unwrap();
    let mut values = Array2::from_elem((2, 2), value);
    values[[1, 1]] = 0;
    save_u16(&values, &root.join(&b7)).unwrap();
    manifest.scenes.push(SceneEntry {
        sensor,
        date: date(on),
        qa,
        nodata: Some(0),
        bands: BTreeMap::from([("B7".to_string(), b7)]),
        footprint: None,
    });
}

fn sample_archive(root: &Path) {
    let mut manifest = SceneManifest::default();
    add_scene(root, &mut manifest, Sensor::Landsat5, "1995-07-10", 400);
    add_scene(root, &mut manifest, Sensor::Landsat5, "1996-07-10", 500);
    add_scene(root, &mut manifest, Sensor::Landsat7, "1995-08-10", 600);
    manifest.write(root).unwrap();
}

#[test]
fn test_archive_filters_sensor_and_dates() {
    let dir = tempfile::tempdir().unwrap();
    sample_archive(dir.path());
    let g = grid(2, 2);
    let archive = DirectoryArchive::open(dir.path(), &g).unwrap();
    let roi = Region::rectangle("roi", 0.0, 0.0, 60.0, 60.0);

    let scenes = archive.load(Sensor::Landsat5, &roi, date("1995-01-01"), date("1996-07-10")).unwrap();
    assert_eq!(scenes.len(), 2);
    assert_eq!(scenes.scenes()[0].date, date("1995-07-10"));
    assert!(scenes.iter().all(|s| s.sensor == Sensor::Landsat5));

    let band = scenes.scenes()[0].raster.band("B7").unwrap();
    assert_eq!(band.get(0, 0), Some(400.0));
    assert_eq!(band.get(1, 1), None);
}

#[test]
fn test_archive_drops_scenes_outside_region() {
    let dir = tempfile::tempdir().unwrap();
    sample_archive(dir.path());
    let archive = DirectoryArchive::open(dir.path(), &grid(2, 2)).unwrap();
    let far = Region::rectangle("far", 10_000.0, 10_000.0, 11_000.0, 11_000.0);

    let scenes = archive.load(Sensor::Landsat7, &far, date("1990-01-01"), date("2000-01-01")).unwrap();
    assert!(scenes.is_empty());
}

#[test]
fn test_archive_grid_mismatch_names_the_query() {
    let dir = tempfile::tempdir().unwrap();
    sample_archive(dir.path());
    let archive = DirectoryArchive::open(dir.path(), &grid(3, 3)).unwrap();
    let roi = Region::rectangle("roi", 0.0, 0.0, 90.0, 90.0);

    let err = archive.load(Sensor::Landsat7, &roi, date("1995-01-01"), date("1995-12-31")).unwrap_err();
    match err {
        WetmapError::Archive { sensor, region, .. } => {
            assert_eq!(sensor, "Landsat 7");
            assert_eq!(region, "roi");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_archive_footprint_from_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let mut manifest = SceneManifest::default();
    add_scene(dir.path(), &mut manifest, Sensor::Landsat8, "2015-07-10", 300);
    manifest.scenes[0].footprint = Some(BoundingBox {
        min_x: 5_000.0,
        min_y: 5_000.0,
        max_x: 6_000.0,
        max_y: 6_000.0,
    });
    manifest.write(dir.path()).unwrap();

    let archive = DirectoryArchive::open(dir.path(), &grid(2, 2)).unwrap();
    assert_eq!(archive.manifest().scenes.len(), 1);
    let roi = Region::rectangle("roi", 0.0, 0.0, 60.0, 60.0);
    let scenes = archive.load(Sensor::Landsat8, &roi, date("2015-01-01"), date("2015-12-31")).unwrap();
    assert!(scenes.is_empty());
}

// ---------------------------------------------------------------------------
// Output sink
// ---------------------------------------------------------------------------

#[test]
fn test_composites_reload_with_masks() {
    let dir = tempfile::tempdir().unwrap();
    let mut mask = Array2::from_elem((2, 3), true);
    mask[[0, 2]] = false;
    let band = Band::with_mask("B7", Array2::from_elem((2, 3), 1234.0), mask.clone()).unwrap();
    let composite = Composite {
        metadata: CompositeMetadata {
            start_date: date("1999-07-01"),
            end_date: date("1999-10-01"),
            band_count: 1,
        },
        raster: Raster::new(vec![band]).unwrap(),
    };
    let empty = Composite {
        metadata: CompositeMetadata {
            start_date: date("2000-07-01"),
            end_date: date("2000-10-01"),
            band_count: 0,
        },
        raster: Raster::empty(),
    };

    let sink = DirectorySink::new(dir.path()).unwrap();
    sink.write_composites(&[composite, empty]).unwrap();
    let reloaded = load_composites(sink.root()).unwrap();

    assert_eq!(reloaded.len(), 2);
    let band = reloaded[0].raster.band("B7").unwrap();
    assert_eq!(band.mask, mask);
    assert_eq!(band.get(1, 1), Some(1234.0));
    // Invalid pixels are stored as 0.
    assert_eq!(band.data[[0, 2]], 0.0);
    assert!(reloaded[1].is_empty());
    assert_eq!(reloaded[1].metadata.start_tag(), "2000-07-01");
}

#[test]
fn test_missing_composite_manifest_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_composites(dir.path()).unwrap_err();
    match err {
        WetmapError::Read { path, source } => {
            assert_eq!(path, dir.path().join("composites").join("composites.toml"));
            assert!(matches!(*source, WetmapError::Io(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_failed_area_table_write_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let sink = DirectorySink::new(dir.path()).unwrap();
    // A directory where the table should go makes the write fail.
    let blocked = dir.path().join("summary").join("flood_area.csv");
    std::fs::create_dir_all(&blocked).unwrap();

    let err = sink.write_area_table(&[]).unwrap_err();
    assert!(matches!(&err, WetmapError::Write { path, .. } if *path == blocked));
    assert!(err.to_string().contains("flood_area.csv"));
}

#[test]
fn test_missing_scene_manifest_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = SceneManifest::read(dir.path()).unwrap_err();
    assert!(matches!(err, WetmapError::Read { ref path, .. } if path.ends_with("scenes.toml")));
}
