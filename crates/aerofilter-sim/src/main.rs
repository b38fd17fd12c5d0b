//! aerofilter scenario runner
//!
//! # Usage
//!
//! ```bash
//! # Both scenarios with built-in defaults
//! aerofilter-sim all
//!
//! # Localization from a config file, overriding the particle count
//! aerofilter-sim --config scenario.yaml localize --particles 500
//!
//! # Print the effective configuration as YAML
//! aerofilter-sim dump-config
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use aerofilter_sim::config::ScenarioConfig;
use aerofilter_sim::scenarios::{run_altitude, run_localization, AltitudeRun, LocalizationRun, ScenarioError};

#[derive(Parser)]
#[command(name = "aerofilter-sim")]
#[command(about = "Run the drone estimators against simulated data")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// YAML scenario configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the random seed
    #[arg(short, long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Altitude hold with Kalman and complementary filters
    Altitude {
        /// Number of filter steps
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Particle filter localization
    Localize {
        /// Number of particles
        #[arg(short, long)]
        particles: Option<usize>,

        /// Number of filter steps
        #[arg(long)]
        steps: Option<usize>,

        /// Delimited occupancy grid file
        #[arg(short, long)]
        map: Option<PathBuf>,
    },
    /// Run both scenarios
    All,
    /// Print the effective configuration
    DumpConfig,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), ScenarioError> {
    let mut config = match &args.config {
        Some(path) => ScenarioConfig::load(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    match args.command {
        Commands::Altitude { steps } => {
            if let Some(steps) = steps {
                config.altitude.steps = steps;
            }
            altitude(&config)
        }
        Commands::Localize {
            particles,
            steps,
            map,
        } => {
            if let Some(particles) = particles {
                config.localization.particles = particles;
            }
            if let Some(steps) = steps {
                config.localization.steps = steps;
            }
            if map.is_some() {
                config.localization.map_file = map;
            }
            localize(&config)
        }
        Commands::All => {
            altitude(&config)?;
            localize(&config)
        }
        Commands::DumpConfig => {
            println!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

fn altitude(config: &ScenarioConfig) -> Result<(), ScenarioError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let run = run_altitude(&config.altitude, &mut rng)?;
    report_altitude(&run);
    Ok(())
}

fn localize(config: &ScenarioConfig) -> Result<(), ScenarioError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let run = run_localization(&config.localization, &mut rng)?;
    report_localization(&run);
    Ok(())
}

fn report_altitude(run: &AltitudeRun) {
    info!("=== Altitude ({} steps) ===", run.steps);
    info!(
        "calibration scale ({:.4}, {:.4}, {:.4}) bias ({:.4}, {:.4}, {:.4})",
        run.calibration.x.scale,
        run.calibration.y.scale,
        run.calibration.z.scale,
        run.calibration.x.bias,
        run.calibration.y.bias,
        run.calibration.z.bias
    );
    info!(
        "final altitude {:.3} m, estimate {:.3} ± {:.3} m",
        run.final_altitude, run.final_estimate, run.final_std
    );
    info!(
        "rms error: kalman {:.4}, complementary {:.4}, altimeter {:.4}",
        run.kalman_rms, run.complementary_rms, run.altimeter_rms
    );
    info!("mean NIS {:.3}", run.mean_nis);
}

fn report_localization(run: &LocalizationRun) {
    info!(
        "=== Localization ({} particles, {} steps) ===",
        run.particles, run.steps
    );
    for (k, error) in run.errors.iter().enumerate() {
        info!("step {:>3}: error {:.2} cells", k + 1, error);
    }
    info!(
        "final truth ({:.1}, {:.1}, {:.1}°), estimate ({:.1}, {:.1}, {:.1}°), spread {:.2}",
        run.final_truth.x,
        run.final_truth.y,
        run.final_truth.heading.to_degrees(),
        run.estimate.pose.x,
        run.estimate.pose.y,
        run.estimate.pose.heading.to_degrees(),
        run.estimate.spread
    );
    info!("final error {:.2} cells", run.final_error());
}
