//! Stroke pathway trial CLI
//!
//! Runs a multi-replication trial and prints the KPI summary.
//!
//! # Example
//!
//! ```bash
//! # Default scenario, ten replications of one year
//! strokeflow
//!
//! # SDEC open 12 hours a day from 08:00, therapy delivered in SDEC
//! strokeflow --sdec-availability 50 --sdec-opening-hour 8 --therapy-sdec --parallel
//!
//! # Scenario file with overrides, summary as JSON
//! strokeflow --config scenario.toml --runs 20 --seed 7 --json
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use strokeflow::{ModelConfig, Trial, TrialHistory};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Stroke pathway simulator
///
/// Every replication is reproducible from the master seed.
#[derive(Parser, Debug)]
#[command(name = "strokeflow")]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML scenario file; missing keys take their defaults
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Number of replications
    #[arg(short = 'r', long)]
    runs: Option<u32>,

    /// Master seed
    #[arg(long)]
    seed: Option<u64>,

    /// Reported duration in days (warm-up becomes a fifth of it)
    #[arg(short = 'd', long)]
    days: Option<f64>,

    /// Warm-up length in days, overriding the default fifth
    #[arg(long)]
    warm_up_days: Option<f64>,

    /// Percentage of each day SDEC is open (0-100)
    #[arg(long)]
    sdec_availability: Option<f64>,

    /// Hour SDEC opens
    #[arg(long)]
    sdec_opening_hour: Option<u32>,

    /// Percentage of each day the CT perfusion scanner is available (0-100)
    #[arg(long)]
    ctp_availability: Option<f64>,

    /// Hour the CT perfusion scanner becomes available
    #[arg(long)]
    ctp_opening_hour: Option<u32>,

    /// Deliver therapy in SDEC, widening admission avoidance
    #[arg(long)]
    therapy_sdec: bool,

    /// Run replications on all cores
    #[arg(short = 'p', long)]
    parallel: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Debug-level logging unless RUST_LOG says otherwise
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Args {
    fn model_config(&self) -> anyhow::Result<ModelConfig> {
        let mut config = match &self.config {
            Some(path) => ModelConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ModelConfig::default(),
        };
        if let Some(days) = self.days {
            config = config.with_days(days);
        }
        if let Some(days) = self.warm_up_days {
            config = config.with_warm_up(days * 1440.0);
        }
        if let Some(runs) = self.runs {
            config = config.with_runs(runs);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(percent) = self.sdec_availability {
            config.sdec.availability_percent = percent;
        }
        if let Some(hour) = self.sdec_opening_hour {
            config.sdec.opening_hour = hour;
        }
        if let Some(percent) = self.ctp_availability {
            config.advanced_ct.availability_percent = percent;
        }
        if let Some(hour) = self.ctp_opening_hour {
            config.advanced_ct.opening_hour = hour;
        }
        if self.therapy_sdec {
            config = config.with_therapy_sdec(true);
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.model_config()?;
    info!(
        runs = config.number_of_runs,
        seed = config.master_seed,
        days = config.sim_duration / 1440.0,
        sdec_availability = config.sdec.availability_percent,
        ctp_availability = config.advanced_ct.availability_percent,
        therapy_sdec = config.therapy_sdec,
        "starting trial"
    );

    let trial = Trial::new(config).context("invalid configuration")?;
    let output = if args.parallel {
        trial.run_parallel()?
    } else {
        trial.run()?
    };
    info!(
        events = output.metrics.events_processed,
        wall_time = ?output.metrics.wall_time,
        "trial finished"
    );

    let mut history = TrialHistory::new();
    history.record(output.summary());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&history)?);
    } else {
        print!("{history}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ModelConfig {
        let argv = std::iter::once("strokeflow").chain(args.iter().copied());
        Args::parse_from(argv).model_config().unwrap()
    }

    #[test]
    fn overrides_keep_file_opening_hours() {
        let path = std::env::temp_dir().join(format!("strokeflow-cli-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[sdec]\navailability_percent = 50.0\nopening_hour = 8\n",
        )
        .unwrap();
        let file = path.to_string_lossy().into_owned();

        let config = parse(&["--config", &file, "--sdec-availability", "60"]);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.sdec.availability_percent, 60.0);
        assert_eq!(config.sdec.opening_hour, 8);
    }

    #[test]
    fn opening_hour_applies_on_its_own() {
        let config = parse(&["--sdec-opening-hour", "8", "--ctp-opening-hour", "6"]);
        assert_eq!(config.sdec.availability_percent, 100.0);
        assert_eq!(config.sdec.opening_hour, 8);
        assert_eq!(config.advanced_ct.opening_hour, 6);
    }

    #[test]
    fn days_and_warm_up_combine() {
        let config = parse(&["--days", "30", "--warm-up-days", "2", "--runs", "4"]);
        assert_eq!(config.sim_duration, 30.0 * 1440.0);
        assert_eq!(config.warm_up_period, 2.0 * 1440.0);
        assert_eq!(config.number_of_runs, 4);
        assert!(!config.therapy_sdec);
    }
}
