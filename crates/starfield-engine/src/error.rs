//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and simulation execution.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: starfield_core::config::ConfigError,
    },

    /// Database setup failed after the store was reached.
    #[error("database error: {source}")]
    Db {
        /// The underlying database error.
        #[from]
        source: starfield_db::DbError,
    },

    /// Seeding the population failed.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: starfield_core::simulation::SimulationError,
    },

    /// The tick loop refused to run.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: starfield_core::runner::RunnerError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: starfield_api::ServerError,
    },

    /// A background task panicked or was cancelled.
    #[error("task error: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },
}
