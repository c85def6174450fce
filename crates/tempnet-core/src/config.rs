//! Configuration loading and typed config structures for tempnet.
//!
//! The canonical configuration lives in `tempnet-config.yaml`. This module
//! defines strongly-typed structs that mirror the YAML structure, a loader
//! that reads the file, and [`SimulationConfig::validate`], which turns the
//! raw model/run sections into validated [`ModelParams`]. Validation runs
//! before any simulation step, so an invalid configuration never produces a
//! partial log.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::sampler::PowerLaw;

/// Environment variable overriding `output.directory`.
pub const OUTPUT_DIR_ENV: &str = "TEMPNET_OUTPUT_DIR";

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A parameter is outside its valid range.
    #[error("invalid parameter `{field}`: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Explanation of what is wrong with the value.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `tempnet-config.yaml`. Every field has a
/// default, so an empty document is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Model parameters (seed size, attachment, propensity law).
    #[serde(default)]
    pub model: ModelConfig,

    /// Run parameters (steps, seed, growth policy).
    #[serde(default)]
    pub run: RunConfig,

    /// Where the activity log and summary are written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// The `TEMPNET_OUTPUT_DIR` environment variable overrides
    /// `output.directory`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.output.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Validate the model and run sections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<ModelParams, ConfigError> {
        let growth = match self.run.growth_cap {
            Some(cap) => GrowthPolicy::Capped(cap),
            None => GrowthPolicy::Unbounded,
        };
        ModelParams::new(&self.model, self.run.steps, growth)
    }
}

/// Model configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelConfig {
    /// Size `n` of the complete seed graph.
    #[serde(default = "default_initial_nodes")]
    pub initial_nodes: u32,

    /// Ties `m` brought by each new node.
    #[serde(default = "default_edges_per_new_node")]
    pub edges_per_new_node: u32,

    /// Exponent of the activity-propensity power law (must exceed 1).
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    /// Global scale of the exploration probability.
    #[serde(default = "default_rho")]
    pub rho: f64,

    /// Degree exponent damping exploration by well-connected nodes.
    #[serde(default = "default_gam")]
    pub gam: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            initial_nodes: default_initial_nodes(),
            edges_per_new_node: default_edges_per_new_node(),
            gamma: default_gamma(),
            rho: default_rho(),
            gam: default_gam(),
        }
    }
}

/// Run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Number of steps `N` to execute.
    #[serde(default = "default_steps")]
    pub steps: u64,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Maximum node count; absent means the network grows every step.
    #[serde(default)]
    pub growth_cap: Option<u32>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            seed: default_seed(),
            growth_cap: None,
        }
    }
}

/// Output locations for the activity log and run summary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving all output files.
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// File name of the snapshot log inside `directory`.
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,

    /// File name of the active-node log inside `directory`.
    #[serde(default = "default_active_file")]
    pub active_file: String,

    /// File name of the JSON run summary inside `directory`.
    #[serde(default = "default_summary_file")]
    pub summary_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            snapshot_file: default_snapshot_file(),
            active_file: default_active_file(),
            summary_file: default_summary_file(),
        }
    }
}

impl OutputConfig {
    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV) {
            if !dir.is_empty() {
                self.directory = PathBuf::from(dir);
            }
        }
    }

    /// Full path of the snapshot log.
    pub fn snapshot_path(&self) -> PathBuf {
        self.directory.join(&self.snapshot_file)
    }

    /// Full path of the active-node log.
    pub fn active_path(&self) -> PathBuf {
        self.directory.join(&self.active_file)
    }

    /// Full path of the run summary.
    pub fn summary_path(&self) -> PathBuf {
        self.directory.join(&self.summary_file)
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Subscriber output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// Validated parameters
// ---------------------------------------------------------------------------

/// Whether new nodes keep joining the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// One node joins every step.
    Unbounded,
    /// Nodes join until the node count reaches the cap, then never again.
    Capped(u32),
}

impl GrowthPolicy {
    /// Whether a node may join a network that currently has `node_count`
    /// nodes.
    pub fn allows_growth(self, node_count: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Capped(cap) => usize::try_from(cap).is_ok_and(|cap| node_count < cap),
        }
    }
}

/// Validated model and run parameters.
///
/// Constructed only through [`ModelParams::new`] (or
/// [`SimulationConfig::validate`]), so holding one means every range check
/// has passed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    initial_nodes: u32,
    edges_per_new_node: u32,
    power_law: PowerLaw,
    rho: f64,
    gam: f64,
    steps: u64,
    growth: GrowthPolicy,
}

impl ModelParams {
    /// Validate a model section together with the step count and growth
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when:
    /// - `gamma` is not a finite number greater than 1,
    /// - `rho` or `gam` is not finite,
    /// - `initial_nodes < 2` (a one-node seed has no degree to attach to),
    /// - `edges_per_new_node` is outside `1..=initial_nodes`,
    /// - the growth cap does not exceed `initial_nodes`.
    pub fn new(model: &ModelConfig, steps: u64, growth: GrowthPolicy) -> Result<Self, ConfigError> {
        let power_law = PowerLaw::new(model.gamma).map_err(|err| ConfigError::Invalid {
            field: "gamma",
            reason: err.to_string(),
        })?;

        if !model.rho.is_finite() {
            return Err(invalid("rho", format!("must be finite, got {}", model.rho)));
        }
        if !model.gam.is_finite() {
            return Err(invalid("gam", format!("must be finite, got {}", model.gam)));
        }
        if model.initial_nodes < 2 {
            return Err(invalid(
                "initial_nodes",
                format!("must be at least 2, got {}", model.initial_nodes),
            ));
        }
        if model.edges_per_new_node == 0 || model.edges_per_new_node > model.initial_nodes {
            return Err(invalid(
                "edges_per_new_node",
                format!(
                    "must be within 1..={}, got {}",
                    model.initial_nodes, model.edges_per_new_node
                ),
            ));
        }
        if let GrowthPolicy::Capped(cap) = growth {
            if cap <= model.initial_nodes {
                return Err(invalid(
                    "growth_cap",
                    format!(
                        "must exceed initial_nodes ({}), got {cap}",
                        model.initial_nodes
                    ),
                ));
            }
        }

        Ok(Self {
            initial_nodes: model.initial_nodes,
            edges_per_new_node: model.edges_per_new_node,
            power_law,
            rho: model.rho,
            gam: model.gam,
            steps,
            growth,
        })
    }

    /// Size `n` of the complete seed graph.
    pub const fn initial_nodes(&self) -> u32 {
        self.initial_nodes
    }

    /// Ties `m` brought by each new node.
    pub const fn edges_per_new_node(&self) -> u32 {
        self.edges_per_new_node
    }

    /// Activity-propensity distribution.
    pub const fn power_law(&self) -> PowerLaw {
        self.power_law
    }

    /// Global scale of the exploration probability.
    pub const fn rho(&self) -> f64 {
        self.rho
    }

    /// Degree exponent of the exploration probability.
    pub const fn gam(&self) -> f64 {
        self.gam
    }

    /// Number of steps to execute.
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Growth policy.
    pub const fn growth(&self) -> GrowthPolicy {
        self.growth
    }

    /// Node count the run ends with if every step completes.
    pub fn expected_final_nodes(&self) -> u64 {
        let grown = u64::from(self.initial_nodes).saturating_add(self.steps);
        match self.growth {
            GrowthPolicy::Unbounded => grown,
            GrowthPolicy::Capped(cap) => grown.min(u64::from(cap)),
        }
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

const fn default_initial_nodes() -> u32 {
    5
}

const fn default_edges_per_new_node() -> u32 {
    2
}

const fn default_gamma() -> f64 {
    2.5
}

const fn default_rho() -> f64 {
    1.0
}

const fn default_gam() -> f64 {
    0.5
}

const fn default_steps() -> u64 {
    1000
}

const fn default_seed() -> u64 {
    42
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("output")
}

fn default_snapshot_file() -> String {
    String::from("snapshots.jsonl")
}

fn default_active_file() -> String {
    String::from("active_nodes.jsonl")
}

fn default_summary_file() -> String {
    String::from("summary.json")
}

fn default_log_level() -> String {
    String::from("info")
}
