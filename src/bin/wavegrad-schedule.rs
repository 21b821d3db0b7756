//! WaveGrad noise schedule inspector.
//!
//! Builds the train or test noise schedule from a JSON config (or the
//! defaults), applies any command-line overrides and prints it to stdout:
//!
//! ```json
//! {"hop_length":300,"schedule":{"num_steps":50,"min_beta":1e-6,"max_beta":0.01,...}}
//! ```
//!
//! With `--full` every schedule array is included. Logs go to stderr.

use clap::{Parser, ValueEnum};
use serde::Serialize;
use wavegrad_rs::{
    config::WavegradConfig,
    scheduler::{NoiseSchedule, ScheduleSummary},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Phase {
    Train,
    Test,
}

#[derive(Parser, Debug)]
#[command(
    name = "wavegrad-schedule",
    about = "Print a WaveGrad noise schedule as JSON"
)]
struct Args {
    /// JSON config file. Missing fields use WaveGrad defaults.
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Which configured schedule to start from.
    #[arg(long, value_enum, default_value_t = Phase::Test)]
    phase: Phase,

    /// Override the number of diffusion steps.
    #[arg(long, short = 'n')]
    num_steps: Option<usize>,

    /// Override the first beta value.
    #[arg(long)]
    min_val: Option<f64>,

    /// Override the last beta value.
    #[arg(long)]
    max_val: Option<f64>,

    /// Include every schedule array in the output.
    #[arg(long)]
    full: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    hop_length: usize,
    schedule: ScheduleSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    arrays: Option<&'a NoiseSchedule>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            tracing::info!("Loading config from {path}");
            WavegradConfig::from_json_file(path)
                .map_err(|e| anyhow::anyhow!("failed to load config {path}: {e}"))?
        }
        None => WavegradConfig::default(),
    };

    let mut schedule_config = match args.phase {
        Phase::Train => config.train_noise_schedule,
        Phase::Test => config.test_noise_schedule,
    };
    if let Some(n) = args.num_steps {
        schedule_config.num_steps = n;
    }
    if let Some(v) = args.min_val {
        schedule_config.min_val = v;
    }
    if let Some(v) = args.max_val {
        schedule_config.max_val = v;
    }

    let schedule = NoiseSchedule::from_config(&schedule_config)
        .map_err(|e| anyhow::anyhow!("invalid noise schedule: {e}"))?;
    tracing::info!(
        "{:?} schedule: {} steps, final noise level {:.6}",
        args.phase,
        schedule.num_steps(),
        schedule.summary().final_noise_level
    );

    let report = Report {
        hop_length: config.hop_length(),
        schedule: schedule.summary(),
        arrays: args.full.then_some(&schedule),
    };
    println!("{}", serde_json::to_string(&report)?);

    Ok(())
}
