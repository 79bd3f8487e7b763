// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mtsearch::grid::{
    double_couple_grid_random, double_couple_grid_regular, force_grid_random, force_grid_regular,
    full_moment_tensor_grid_random, full_moment_tensor_grid_regular,
};
use mtsearch::io;
use mtsearch::{
    Dataset, GreensTensorList, GridSearch, Misfit, Norm, ParameterGrid, ProgressInfo,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum GridKind {
    /// Double couples, regular spacing
    DcRegular,
    /// Double couples, uniform random draws
    DcRandom,
    /// Full moment tensors, regular spacing
    FmtRegular,
    /// Full moment tensors, uniform random draws
    FmtRandom,
    /// Point forces, regular spacing
    ForceRegular,
    /// Point forces, uniform random draws
    ForceRandom,
}

#[derive(Parser)]
#[command(name = "mtsearch", about = "Grid-search source estimation by waveform misfit")]
struct Cli {
    /// Station bundle (.npz or .mat) with greens, data and dt arrays (repeatable)
    #[arg(long = "station", num_args = 1, required = true)]
    stations: Vec<PathBuf>,

    /// Grid family
    #[arg(long, value_enum, default_value = "dc-regular")]
    grid: GridKind,

    /// Moment magnitude, or force in newtons for force grids (repeatable)
    #[arg(long = "magnitude", num_args = 1, allow_negative_numbers = true)]
    magnitudes: Vec<f64>,

    /// Points per axis for regular grids
    #[arg(long, default_value = "10")]
    npts_per_axis: usize,

    /// Points per magnitude for random grids
    #[arg(long, default_value = "10000")]
    npts: usize,

    /// Seed for random grids (entropy if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Misfit norm: L1, L2 or hybrid
    #[arg(long, default_value = "L2")]
    norm: String,

    /// Component group sharing one time shift, e.g. ZR (repeatable; default ZR and T)
    #[arg(long = "group", num_args = 1)]
    groups: Vec<String>,

    /// Smallest allowed time shift in seconds
    #[arg(long, default_value = "-2.0", allow_negative_numbers = true)]
    time_shift_min: f64,

    /// Largest allowed time shift in seconds
    #[arg(long, default_value = "2.0", allow_negative_numbers = true)]
    time_shift_max: f64,

    /// Number of Rayon worker threads
    #[arg(long)]
    threads: Option<usize>,

    /// Output file path (.npz or .mat)
    #[arg(short = 'o', long, default_value = "misfit.npz")]
    output: PathBuf,

    /// Print search progress to stderr (see --progress-interval)
    #[arg(long)]
    progress: bool,

    /// Progress reporting interval in milliseconds (used with --progress)
    #[arg(long, default_value = "500")]
    progress_interval: u64,
}

fn load_stations(paths: &[PathBuf]) -> Result<(Dataset, GreensTensorList)> {
    let mut data = Dataset::new();
    let mut greens = GreensTensorList::new();
    for path in paths {
        let (observed, tensor) = io::load_station_bundle(path)
            .with_context(|| format!("failed to load station bundle {}", path.display()))?;
        data.push(observed);
        greens.push(tensor);
    }
    Ok((data, greens))
}

fn run<G: ParameterGrid>(cli: &Cli, grid: G, mut search: GridSearch) -> Result<()> {
    if let Some(threads) = cli.threads {
        search = search.with_threads(threads);
    }
    if cli.progress {
        search = search
            .with_progress_interval(Duration::from_millis(cli.progress_interval))
            .with_progress(Box::new(|info: ProgressInfo| {
                eprintln!(
                    "[{:.1}s] evaluated={}/{}",
                    info.elapsed.as_secs_f64(),
                    info.candidates_evaluated,
                    info.total,
                );
            }));
    }

    let results = search.run(&grid).context("grid search failed")?.to_vec();
    grid.save(&cli.output, &[("misfit", &results[..])])
        .with_context(|| format!("failed to save {}", cli.output.display()))?;

    let (best, value) = search.best()?;
    let source = grid.get(best)?;
    info!(
        index = best,
        misfit = value,
        point = ?grid.get_dict(best)?,
        source = ?source,
        "best-fitting source"
    );
    for (station, fits) in search.explain(&source)? {
        for fit in fits {
            info!(
                station = %station,
                component = %fit.component,
                time_shift = fit.time_shift,
                misfit = fit.misfit,
                "best fit"
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    if cli.magnitudes.is_empty() {
        bail!("at least one --magnitude must be specified");
    }
    let norm: Norm = cli.norm.parse()?;
    let groups = if cli.groups.is_empty() {
        vec!["ZR".to_string(), "T".to_string()]
    } else {
        cli.groups.clone()
    };
    let misfit = Misfit::new(norm, &groups, cli.time_shift_min, cli.time_shift_max)?;

    let (data, greens) = load_stations(&cli.stations)?;
    let search = GridSearch::new(data, greens, misfit)?;
    if search.num_stations() == 0 {
        bail!("no station has a component in any --group");
    }

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let m = &cli.magnitudes;
    match cli.grid {
        GridKind::DcRegular => run(&cli, double_couple_grid_regular(m, cli.npts_per_axis)?, search),
        GridKind::DcRandom => run(&cli, double_couple_grid_random(m, cli.npts, &mut rng)?, search),
        GridKind::FmtRegular => {
            run(&cli, full_moment_tensor_grid_regular(m, cli.npts_per_axis)?, search)
        }
        GridKind::FmtRandom => {
            run(&cli, full_moment_tensor_grid_random(m, cli.npts, &mut rng)?, search)
        }
        GridKind::ForceRegular => run(&cli, force_grid_regular(m, cli.npts_per_axis)?, search),
        GridKind::ForceRandom => run(&cli, force_grid_random(m, cli.npts, &mut rng)?, search),
    }
}
