//! Problem adapter contract
//!
//! The optimizer never looks inside the objective. Everything it needs from a
//! problem instance goes through [`Problem`].

use serde::{Deserialize, Serialize};

use crate::scalar::Scalar;

/// Auxiliary parameters handed to the structural termination predicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralParams {
    /// Problem-specific variable counts
    #[serde(default)]
    pub numvar: Vec<usize>,
    /// Cut-off used by the predicate
    #[serde(default)]
    pub cutoff: usize,
    /// Problem-specific type flags
    #[serde(default)]
    pub type_flags: Vec<bool>,
}

/// An objective to maximize.
///
/// `evaluate` may be stochastic; callers average repeated calls when they
/// need a less noisy estimate.
pub trait Problem<T: Scalar>: Send {
    /// Number of position components (`num`)
    fn dimension(&self) -> usize;

    /// Length of every fitness vector (`num_fit`)
    fn fitness_len(&self) -> usize;

    /// Repeat count passed to `evaluate` by the optimizer
    fn num_repeat(&self) -> usize {
        1
    }

    /// Lower and upper bound of one dimension, used for uniform initialization
    fn bounds(&self, dimension: usize) -> (f64, f64);

    /// Normalize a position in place (e.g. periodic wrap of angles)
    fn wrap(&self, position: &mut [T]);

    /// Bring a freshly sampled position back into the domain
    fn boundary(&self, position: &mut [T]) {
        self.wrap(position);
    }

    /// Evaluate a position, averaging `repeat` internal samples
    fn evaluate(&mut self, position: &[T], repeat: usize) -> Vec<f64>;

    /// Fixed-budget termination predicate over the winning fitness vector
    fn structural_terminate(&self, fitness: &[f64], params: &StructuralParams) -> bool;

    /// Error-goal termination predicate
    fn error_terminate(&self, current: &[f64], remembered: &[f64], size: usize, goal: f64) -> bool;
}
