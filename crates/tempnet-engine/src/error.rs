//! Error types for the generator binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure mode
//! of configuration, the run itself, and output persistence.

/// Top-level error for the generator binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: tempnet_core::config::ConfigError,
    },

    /// The run aborted.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: tempnet_core::runner::RunnerError,
    },

    /// The activity log or summary could not be written.
    #[error("log error: {source}")]
    Log {
        /// The underlying log error.
        #[from]
        source: tempnet_log::LogError,
    },
}
