//! # RingSwarm Core
//!
//! Process-local building blocks for ring-topology swarm optimization.
//!
//! This crate provides:
//! - The numeric element abstraction shared by real and complex search spaces
//! - Ownership/addressing of logical candidates across a fixed process group
//! - Candidate and population storage with initialization and evaluation
//! - The problem adapter contract consumed by the optimizer
//! - Local particle update and personal-best selection rules
//! - The termination/success evaluator
//!
//! Nothing in this crate sends messages. The distributed protocols live in
//! the `ringswarm` crate and are built from these pieces.
//!
//! ## Feature Flags
//!
//! - `telemetry`: Enable tracing-based telemetry for population lifecycle events

#![forbid(unsafe_code)]

pub mod addressing;
pub mod algorithms;
pub mod candidate;
pub mod population;
pub mod problem;
pub mod scalar;
pub mod termination;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::addressing::*;
    pub use crate::algorithms::*;
    pub use crate::candidate::*;
    pub use crate::population::*;
    pub use crate::problem::*;
    pub use crate::scalar::*;
    pub use crate::termination::*;
}

/// Result type for RingSwarm core operations
pub type Result<T> = core::result::Result<T, Error>;

/// Error type for RingSwarm core operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Population size must be strictly positive
    #[error("invalid parameter: population size must be positive, got {size}")]
    InvalidPopulationSize { size: i64 },
    /// Iteration budget must be strictly positive
    #[error("invalid parameter: iteration budget must be positive, got {iterations}")]
    InvalidIterationBudget { iterations: i64 },
    /// Process-group layout is inconsistent
    #[error("invalid group layout: {reason}")]
    InvalidLayout { reason: String },
    /// A position or velocity has the wrong number of components
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// The evaluator returned a fitness vector of the wrong length
    #[error("fitness length mismatch: expected {expected}, got {got}")]
    FitnessLengthMismatch { expected: usize, got: usize },
    /// Local slot does not exist on this process
    #[error("local slot {slot} out of range for population of {len}")]
    SlotOutOfRange { slot: usize, len: usize },
    /// Standard deviation for Gaussian initialization is invalid
    #[error("invalid deviation {dev} for dimension {index}")]
    InvalidDeviation { index: usize, dev: f64 },
    /// Any other invalid configuration value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Error {
    /// Returns `true` for errors raised while validating configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidPopulationSize { .. }
                | Error::InvalidIterationBudget { .. }
                | Error::InvalidLayout { .. }
                | Error::InvalidDeviation { .. }
                | Error::InvalidParameter(_)
        )
    }
}

/// Validate a signed population size coming from configuration.
///
/// Zero and negative sizes are rejected rather than clamped.
pub fn checked_population_size(size: i64) -> Result<usize> {
    if size <= 0 {
        return Err(Error::InvalidPopulationSize { size });
    }
    usize::try_from(size).map_err(|_| Error::InvalidPopulationSize { size })
}
