use wetmap_core::error::WetmapError;
use wetmap_core::pipeline::config::PipelineConfig;
use wetmap_core::pipeline::PipelineStage;
use wetmap_core::scene::Sensor;

const MINIMAL: &str = r#"
archive = "archive"
output = "output"

[grid]
origin_x = 0.0
origin_y = 300.0
pixel_size = 30.0
width = 10
height = 10

[region_of_interest]
name = "delta"
[[region_of_interest.polygons]]
exterior = [[0.0, 0.0], [300.0, 0.0], [300.0, 300.0], [0.0, 300.0]]

[threshold.wet]
name = "wet"
[[threshold.wet.polygons]]
exterior = [[0.0, 0.0], [60.0, 0.0], [60.0, 60.0], [0.0, 60.0]]

[threshold.dry]
name = "dry"
[[threshold.dry.polygons]]
exterior = [[240.0, 240.0], [300.0, 240.0], [300.0, 300.0], [240.0, 300.0]]
"#;

// ---------------------------------------------------------------------------
// Parsing and defaults
// ---------------------------------------------------------------------------

#[test]
fn test_minimal_config_uses_defaults() {
    let config: PipelineConfig = toml::from_str(MINIMAL).unwrap();
    config.validate().unwrap();

    assert_eq!(config.band, "B7");
    assert_eq!(config.sensors, vec![Sensor::Landsat5, Sensor::Landsat7, Sensor::Landsat8]);
    assert_eq!(config.dates.start.to_string(), "1990-01-01");
    assert_eq!(config.dates.end.to_string(), "2019-12-31");
    assert_eq!(config.season.offset_months, 6);
    assert_eq!(config.season.duration_months, 3);
    assert_eq!(config.season.stride_months, 12);
    assert!(config.gap_fill.enabled);
    assert_eq!(config.gap_fill.kernel_radius, 300.0);
    assert_eq!(config.filter.probe_scale, 1000.0);
    assert!(config.filter.exclude_start_dates.is_empty());
    assert!((config.threshold.fraction - 0.3).abs() < 1e-6);
}

#[test]
fn test_example_round_trips_through_toml() {
    let example = PipelineConfig::example();
    let text = example.to_toml().unwrap();
    let parsed: PipelineConfig = toml::from_str(&text).unwrap();

    assert_eq!(parsed.grid, example.grid);
    assert_eq!(parsed.region_of_interest, example.region_of_interest);
    assert_eq!(parsed.filter, example.filter);
    assert_eq!(parsed.threshold, example.threshold);
    assert_eq!(parsed.sensors, example.sensors);
    parsed.validate().unwrap();
}

#[test]
fn test_sensor_short_names_accepted() {
    let text = format!("sensors = [\"LT05\", \"LC08\"]\n{MINIMAL}");
    let config: PipelineConfig = toml::from_str(&text).unwrap();
    assert_eq!(config.sensors, vec![Sensor::Landsat5, Sensor::Landsat8]);
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wetmap.toml");
    std::fs::write(&path, PipelineConfig::example().to_toml().unwrap()).unwrap();

    let config = PipelineConfig::load(&path).unwrap();
    assert_eq!(config.filter.exclude_start_dates.len(), 1);
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = PipelineConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, WetmapError::Io(_)));
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn test_reversed_dates_rejected() {
    let mut config = PipelineConfig::example();
    std::mem::swap(&mut config.dates.start, &mut config.dates.end);
    assert!(matches!(config.validate(), Err(WetmapError::InvalidConfig(_))));
}

#[test]
fn test_zero_stride_rejected() {
    let mut config = PipelineConfig::example();
    config.season.stride_months = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_empty_grid_rejected() {
    let mut config = PipelineConfig::example();
    config.grid.width = 0;
    assert!(matches!(
        config.validate(),
        Err(WetmapError::InvalidDimensions { width: 0, .. })
    ));
}

#[test]
fn test_empty_region_rejected() {
    let mut config = PipelineConfig::example();
    config.threshold.dry.geometry.0.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_no_sensors_rejected() {
    let mut config = PipelineConfig::example();
    config.sensors.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_disabled_gap_fill_ignores_radius() {
    let mut config = PipelineConfig::example();
    config.gap_fill.enabled = false;
    config.gap_fill.kernel_radius = 0.0;
    config.validate().unwrap();
}

// ---------------------------------------------------------------------------
// PipelineStage Display
// ---------------------------------------------------------------------------

#[test]
fn test_stage_display() {
    assert_eq!(PipelineStage::Masking.to_string(), "Masking clouds");
    assert_eq!(PipelineStage::GapFilling.to_string(), "Filling gaps");
    assert_eq!(PipelineStage::Classifying.to_string(), "Classifying floods");
}
