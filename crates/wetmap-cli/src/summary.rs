use console::Style;
use wetmap_core::pipeline::config::PipelineConfig;
use wetmap_core::pipeline::{CompositeOutput, FloodOutput};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    warn: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            warn: Style::new().yellow(),
        }
    }
}

pub fn print_pipeline_summary(config: &PipelineConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Wetmap Pipeline"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(15)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Archive"),
        s.path.apply_to(config.archive.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Region"),
        s.value.apply_to(&config.region_of_interest.name)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Grid"),
        s.value.apply_to(format!(
            "{}x{} @ {}",
            config.grid.width, config.grid.height, config.grid.pixel_size
        ))
    );
    let sensors: Vec<String> = config.sensors.iter().map(|s| s.to_string()).collect();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Sensors"),
        s.method.apply_to(sensors.join(", "))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Band"),
        s.method.apply_to(&config.band)
    );
    println!();

    println!("  {}", s.header.apply_to("Seasons"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Range"),
        s.value.apply_to(format!("{} .. {}", config.dates.start, config.dates.end))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Window"),
        s.value.apply_to(format!(
            "+{} months, {} long, every {}",
            config.season.offset_months, config.season.duration_months, config.season.stride_months
        ))
    );
    println!();

    if config.gap_fill.enabled {
        println!("  {}", s.header.apply_to("Gap Filling"));
        println!(
            "    {:<12}{}",
            s.label.apply_to("Kernel"),
            s.value.apply_to(format!(
                "{} ({} cells)",
                config.gap_fill.kernel_radius,
                config.grid.cells_for(config.gap_fill.kernel_radius)
            ))
        );
    } else {
        println!(
            "  {:<14}{}",
            s.header.apply_to("Gap Filling"),
            s.disabled.apply_to("disabled")
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Filtering"));
    if config.filter.probes.is_empty() {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Probes"),
            s.disabled.apply_to("none")
        );
    } else {
        let names: Vec<&str> = config.filter.probes.iter().map(|p| p.name.as_str()).collect();
        println!(
            "    {:<12}{}",
            s.label.apply_to("Probes"),
            s.value.apply_to(format!("{} @ {}", names.join(", "), config.filter.probe_scale))
        );
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("Excluded"),
        s.value.apply_to(config.filter.exclude_start_dates.len())
    );
    println!();

    println!("  {}", s.header.apply_to("Threshold"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Wet / Dry"),
        s.value.apply_to(format!("{} / {}", config.threshold.wet.name, config.threshold.dry.name))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Fraction"),
        s.value.apply_to(config.threshold.fraction)
    );
    println!();
}

pub fn print_composite_report(output: &CompositeOutput) {
    let s = Styles::new();

    println!("  {}", s.header.apply_to("Composites"));
    for composite in &output.composites {
        let valid = composite
            .raster
            .min_mask()
            .map(|m| m.iter().filter(|&&v| v).count() as f64 / m.len().max(1) as f64 * 100.0);
        let coverage = match valid {
            Some(pct) => s.value.apply_to(format!("{pct:.1}% valid")),
            None => s.disabled.apply_to("no data".to_string()),
        };
        println!(
            "    {}  {}",
            s.method.apply_to(composite.metadata.start_tag()),
            coverage
        );
    }
    for rejection in &output.rejected {
        println!(
            "    {}  {}",
            s.warn.apply_to(rejection.start_date),
            s.disabled.apply_to(format!("rejected: {}", rejection.reason))
        );
    }
    println!();
}

pub fn print_flood_report(output: &FloodOutput) {
    let s = Styles::new();

    println!("  {}", s.header.apply_to("Flood Maps"));
    println!(
        "    {:<12}  {:>10}  {:>12}",
        s.label.apply_to("Season"),
        s.label.apply_to("Threshold"),
        s.label.apply_to("Area (km²)")
    );
    for (map, area) in output.flood_maps.iter().zip(&output.areas) {
        println!(
            "    {:<12}  {:>10.1}  {:>12.3}",
            map.metadata.start_tag(),
            map.threshold,
            area.area_km2
        );
    }
    for failure in &output.failures {
        println!(
            "    {:<12}  {}",
            s.warn.apply_to(failure.metadata.start_tag()),
            s.disabled.apply_to(&failure.error)
        );
    }
    println!();

    let max_years = output.frequency.data.iter().copied().max().unwrap_or(0);
    println!(
        "  {:<14}{}",
        s.label.apply_to("Max years"),
        s.value.apply_to(max_years)
    );
    println!();
}
