//! Error types for the reconcile crate

use thiserror::Error;

/// Errors that can occur while planning or executing a reconciliation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The dependency graph could not be fully ordered
    #[error("circular dependency detected among: {}", .unresolved.join(", "))]
    CircularDependency {
        /// Every resource still blocked when ordering stopped, sorted by name
        unresolved: Vec<String>,
    },

    /// More than one resource declares the same output (strict mode only)
    #[error("output '{output}' is produced by more than one resource: {}", .producers.join(", "))]
    DuplicateOutput {
        output: String,
        producers: Vec<String>,
    },

    /// Failed to build the worker pool for an apply run
    #[error("failed to create thread pool: {0}")]
    ThreadPool(String),
}

/// Result type for reconcile operations
pub type Result<T> = std::result::Result<T, Error>;
