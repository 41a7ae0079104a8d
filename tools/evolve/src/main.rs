//! Rainfall-driven terrain evolution runner. Loads an elevation raster,
//! steps the chosen erosion model over an event or observed-precipitation
//! schedule, and writes every registered grid as JSON into the output
//! directory, one file per category and timestamp.

use anyhow::{bail, Context, Result};
use catena_core::{
    read_precipitation, DynamicEvolution, ModelVariant, OutputNames, Raster, RunSummary,
    SimulationParameters, TimeDriver, TimeSeriesCollection, WalkerEngine,
};
use chrono::NaiveDateTime;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "evolve", about = "Run a rainfall-driven terrain evolution simulation")]
struct Args {
    /// Time driver: `event` (design storm) or `series` (observed record).
    #[arg(long, default_value = "event")]
    runs: String,

    /// Governing model: simwe_mode, usped_mode, or rusle_mode.
    #[arg(short, long, default_value = "simwe_mode")]
    mode: String,

    /// Initial elevation raster (JSON).
    #[arg(short, long)]
    elevation: PathBuf,

    /// Event-mode base rain intensity (mm/hr).
    #[arg(long, default_value_t = 50.0)]
    rain_intensity: f64,

    /// Total rainfall duration (minutes).
    #[arg(long, default_value_t = 60.0)]
    rain_duration: f64,

    /// Step interval (minutes).
    #[arg(long, default_value_t = 10.0)]
    rain_interval: f64,

    /// Series-mode precipitation CSV (timestamp, depth in mm).
    #[arg(short, long)]
    precipitation: Option<PathBuf>,

    /// Simulation start timestamp, e.g. `2020-01-01 00:00:00`.
    #[arg(long, default_value = "2020-01-01 00:00:00")]
    start: String,

    /// Walker count for the stochastic hydrologic solver.
    #[arg(long, default_value_t = 10_000)]
    walkers: usize,

    /// Worker threads for the stochastic solver.
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Runoff coefficient.
    #[arg(long, default_value_t = 0.35)]
    runoff: f64,

    /// Manning's roughness coefficient.
    #[arg(long, default_value_t = 0.1)]
    mannings: f64,

    /// Detachment coefficient (s/m).
    #[arg(long, default_value_t = 0.01)]
    detachment: f64,

    /// Transport coefficient (s/m).
    #[arg(long, default_value_t = 0.01)]
    transport: f64,

    /// Critical shear stress (Pa).
    #[arg(long, default_value_t = 0.0)]
    shear_stress: f64,

    /// Sediment mass density (g/cm³).
    #[arg(long, default_value_t = 1.4)]
    density: f64,

    /// Soil mass per area (kg/m²), RUSLE only.
    #[arg(long, default_value_t = 116.0)]
    mass: f64,

    /// Gravitational diffusion coefficient (m²/s).
    #[arg(long, default_value_t = 0.2)]
    grav_diffusion: f64,

    /// Lower erosion-deposition clip bound (kg·m⁻²·s⁻¹).
    #[arg(long, default_value_t = -0.5, allow_hyphen_values = true)]
    erdepmin: f64,

    /// Upper erosion-deposition clip bound (kg·m⁻²·s⁻¹).
    #[arg(long, default_value_t = 0.5)]
    erdepmax: f64,

    /// Upper RUSLE flux clip bound (kg·m⁻¹·s⁻¹).
    #[arg(long, default_value_t = 0.25)]
    fluxmax: f64,

    /// Soil erodibility factor K.
    #[arg(long, default_value_t = 0.25)]
    k_factor: f64,

    /// Land cover factor C.
    #[arg(long, default_value_t = 0.1)]
    c_factor: f64,

    /// Water-flow exponent m.
    #[arg(long, default_value_t = 1.5)]
    m: f64,

    /// Slope exponent n.
    #[arg(long, default_value_t = 1.2)]
    n: f64,

    /// Fill depressions after each SIMWE step.
    #[arg(short = 'f', long)]
    fill_sinks: bool,

    /// Output directory for per-step grid JSON files.
    #[arg(short, long, default_value = "data/evolution")]
    output: PathBuf,

    /// Category name for evolved elevation grids.
    #[arg(long, default_value = "elevation")]
    elevation_name: String,

    /// Category name for water depth grids.
    #[arg(long, default_value = "depth")]
    depth_name: String,

    /// Category name for the model diagnostic (erosion-deposition or flux).
    /// Defaults to `erdep`, or `flux` under rusle_mode.
    #[arg(long)]
    diagnostic_name: Option<String>,

    /// Category name for per-step elevation difference grids.
    #[arg(long, default_value = "difference")]
    difference_name: String,
}

const START_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

fn parse_start(s: &str) -> Result<NaiveDateTime> {
    for fmt in START_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(t);
        }
    }
    bail!("unparseable start timestamp `{s}` (expected e.g. 2020-01-01 00:00:00)");
}

fn build_driver(args: &Args) -> Result<TimeDriver> {
    match args.runs.as_str() {
        "event" => Ok(TimeDriver::Event {
            start: parse_start(&args.start)?,
            intensity: args.rain_intensity,
            duration_min: args.rain_duration,
            interval_min: args.rain_interval,
        }),
        "series" => {
            let path = args
                .precipitation
                .as_deref()
                .context("--runs series requires --precipitation")?;
            let records = read_precipitation(path)?;
            Ok(TimeDriver::Series {
                records,
                interval_min: args.rain_interval,
            })
        }
        other => bail!("unknown runs value `{other}` (expected event or series)"),
    }
}

fn params_from(args: &Args) -> SimulationParameters {
    SimulationParameters {
        rain_intensity: args.rain_intensity,
        rain_duration: args.rain_duration,
        rain_interval: args.rain_interval,
        walkers: args.walkers,
        threads: args.threads,
        runoff: args.runoff,
        mannings: args.mannings,
        detachment: args.detachment,
        transport: args.transport,
        shear_stress: args.shear_stress,
        density: args.density,
        mass: args.mass,
        grav_diffusion: args.grav_diffusion,
        erdepmin: args.erdepmin,
        erdepmax: args.erdepmax,
        fluxmax: args.fluxmax,
        k_factor: args.k_factor,
        c_factor: args.c_factor,
        m: args.m,
        n: args.n,
        fill_sinks: args.fill_sinks,
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

fn write_series(series: &TimeSeriesCollection, dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir)
        .with_context(|| format!("cannot create output directory {}", dir.display()))?;
    let mut written = 0usize;
    let categories: Vec<String> = series.categories().map(str::to_string).collect();
    for category in &categories {
        let subdir = dir.join(category);
        fs::create_dir_all(&subdir)
            .with_context(|| format!("cannot create output directory {}", subdir.display()))?;
        for (timestamp, grid) in series.enumerate(category) {
            let name = format!("{}.json", timestamp.format("%Y%m%d_%H%M%S"));
            let path = subdir.join(name);
            let json = serde_json::to_string(grid.as_ref())?;
            fs::write(&path, json)
                .with_context(|| format!("cannot write {}", path.display()))?;
            written += 1;
        }
    }
    Ok(written)
}

fn print_summary(summary: &RunSummary, written: usize) {
    let d = &summary.net_difference;
    eprintln!(
        "evolve: {} steps to {}, net elevation change mean {:.6} m (min {:.6}, max {:.6}), {} grids written",
        summary.steps,
        summary.final_timestamp,
        d.mean(),
        d.min_value(),
        d.max_value(),
        written
    );
}

fn main() -> Result<()> {
    let args = Args::parse();

    let variant: ModelVariant = args.mode.parse()?;
    let json = fs::read_to_string(&args.elevation)
        .with_context(|| format!("cannot read elevation raster {}", args.elevation.display()))?;
    let elevation: Raster = serde_json::from_str(&json)
        .with_context(|| format!("malformed elevation raster {}", args.elevation.display()))?;

    let driver = build_driver(&args)?;
    let names = OutputNames {
        elevation: args.elevation_name.clone(),
        depth: args.depth_name.clone(),
        diagnostic: args.diagnostic_name.clone().unwrap_or_else(|| {
            match variant {
                ModelVariant::Rusle => "flux".to_string(),
                _ => "erdep".to_string(),
            }
        }),
        difference: args.difference_name.clone(),
    };

    eprintln!(
        "evolve: {variant} over {}×{} grid, {} driver",
        elevation.width, elevation.height, args.runs
    );
    let mut evolution =
        DynamicEvolution::new(WalkerEngine::new(), variant, params_from(&args), driver)
            .with_output_names(names);
    let outcome = evolution.run(elevation);

    // Grids from steps completed before a failure are still worth keeping.
    let written = write_series(evolution.series(), &args.output)?;
    match outcome {
        Ok(summary) => {
            print_summary(&summary, written);
            Ok(())
        }
        Err(e) => {
            eprintln!("evolve: aborted after writing {written} grids");
            Err(e.into())
        }
    }
}
