use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use wetmap_core::io::archive::{SceneManifest, SCENE_MANIFEST};
use wetmap_core::scene::Sensor;

#[derive(Args)]
pub struct InfoArgs {
    /// Scene archive directory
    pub archive: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let manifest = SceneManifest::read(&args.archive)
        .with_context(|| format!("Failed to read {} in {}", SCENE_MANIFEST, args.archive.display()))?;

    let mut per_sensor: BTreeMap<Sensor, (usize, NaiveDate, NaiveDate)> = BTreeMap::new();
    let mut bands = BTreeSet::new();
    for entry in &manifest.scenes {
        let slot = per_sensor
            .entry(entry.sensor)
            .or_insert((0, entry.date, entry.date));
        slot.0 += 1;
        slot.1 = slot.1.min(entry.date);
        slot.2 = slot.2.max(entry.date);
        bands.extend(entry.bands.keys().cloned());
    }

    println!("Archive:     {}", args.archive.display());
    println!("Scenes:      {}", manifest.scenes.len());
    println!(
        "Bands:       {}",
        bands.into_iter().collect::<Vec<_>>().join(", ")
    );
    println!();
    println!("{:<12}  {:>6}  {:>10}  {:>10}", "Sensor", "Scenes", "First", "Last");
    println!("{}", "-".repeat(44));
    for (sensor, (count, first, last)) in &per_sensor {
        println!("{:<12}  {:>6}  {:>10}  {:>10}", sensor.to_string(), count, first, last);
    }

    Ok(())
}
