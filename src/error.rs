//! Error types for the schedule optimizer.
//!
//! Only structural misconfiguration reaches the caller of
//! [`optimize`](crate::optimize). Context and evaluation problems are
//! absorbed by the evolution controller and reported through flags on the
//! [`OptimizationResult`](crate::report::OptimizationResult).

use thiserror::Error;

/// Error type for all optimizer operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptimizerError {
    /// Genetic parameters that make a run impossible
    #[error("Invalid genetic parameters: {0}")]
    InvalidParameters(String),

    /// Empty or inconsistent roster / requirements
    #[error("Optimization context unavailable: {0}")]
    ContextUnavailable(String),

    /// A single chromosome could not be scored
    #[error("Evaluation of chromosome {chromosome} failed: {reason}")]
    EvaluationFailure { chromosome: u64, reason: String },

    /// The dedicated rayon pool could not be built
    #[error("Worker pool error: {0}")]
    ThreadPool(String),

    /// A result sink refused the result
    #[error("Result sink error: {0}")]
    Sink(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, OptimizerError>;
