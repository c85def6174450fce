//! Generator binary for the tempnet temporal network model.
//!
//! Loads configuration, runs one seeded simulation, and writes the activity
//! logs and run summary to the output directory.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `tempnet-config.yaml` (or `TEMPNET_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Validate model and run parameters
//! 4. Create the activity log in the output directory
//! 5. Run the simulation; Ctrl-C stops it at the next step boundary
//! 6. Write the run summary
//! 7. Log the result

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempnet_core::config::{LogFormat, LoggingConfig, SimulationConfig};
use tempnet_core::runner::{self, RunControl, RunOutcome};
use tempnet_log::stats::DistributionSummary;
use tempnet_log::{ActivityLog, LogFiles};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Environment variable naming the configuration file.
const CONFIG_PATH_ENV: &str = "TEMPNET_CONFIG";

/// Configuration file read when `TEMPNET_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "tempnet-config.yaml";

/// Where the configuration came from.
enum ConfigSource {
    File(PathBuf),
    Defaults,
}

/// Application entry point for the generator.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the run aborts, or an
/// output file cannot be written.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("tempnet-engine starting");
    match &source {
        ConfigSource::File(path) => info!(path = %path.display(), "Configuration loaded"),
        ConfigSource::Defaults => info!("Config file not found, using defaults"),
    }

    // 3-6. Validate, run, persist.
    let control = Arc::new(RunControl::new());
    install_stop_handler(Arc::clone(&control));
    let outcome = generate(&config, &control)?;

    // 7. Log results.
    runner::log_run_end(&outcome);
    if let Some(degrees) = DistributionSummary::of(&outcome.network.degrees()) {
        info!(
            min = degrees.min,
            max = degrees.max,
            mean = degrees.mean,
            "Degree distribution"
        );
    }

    info!(
        end_reason = ?outcome.end_reason,
        output = %config.output.directory.display(),
        "tempnet-engine shutdown complete"
    );

    Ok(())
}

/// Route Ctrl-C to `control`. The run then stops before its next step and
/// the logs and summary cover every completed step.
fn install_stop_handler(control: Arc<RunControl>) {
    if let Err(err) = ctrlc::set_handler(move || control.request_stop()) {
        warn!(error = %err, "Ctrl-C handler not installed, run will not stop cleanly");
    }
}

/// Validate the configuration, run the simulation into the activity log,
/// and write the summary.
fn generate(config: &SimulationConfig, control: &RunControl) -> Result<RunOutcome, EngineError> {
    let params = config.validate()?;
    info!(
        expected_nodes = params.expected_final_nodes(),
        "Parameters validated"
    );

    let directory = config.output.directory.as_path();
    let files = LogFiles::from(&config.output);
    let mut log = ActivityLog::create(directory, &files)?;

    let outcome = runner::run_simulation(params, config.run.seed, &mut log, control)?;

    let summary_path = files.summary_path(directory);
    tempnet_log::write_summary(&summary_path, &outcome.summary)?;
    info!(
        snapshot_lines = log.snapshot_lines(),
        active_lines = log.active_lines(),
        summary = %summary_path.display(),
        "Output written"
    );

    Ok(outcome)
}

/// Load the simulation configuration.
///
/// `TEMPNET_CONFIG` names the file explicitly and must exist. Otherwise
/// `tempnet-config.yaml` in the working directory is used if present, and
/// defaults if not.
fn load_config() -> Result<(SimulationConfig, ConfigSource), EngineError> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        let config = SimulationConfig::from_file(&path)?;
        return Ok((config, ConfigSource::File(path)));
    }

    let config_path = Path::new(DEFAULT_CONFIG_PATH);
    if config_path.exists() {
        let config = SimulationConfig::from_file(config_path)?;
        Ok((config, ConfigSource::File(config_path.to_path_buf())))
    } else {
        let mut config = SimulationConfig::default();
        config.output.apply_env_overrides();
        Ok((config, ConfigSource::Defaults))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level` when set.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    match logging.format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}
