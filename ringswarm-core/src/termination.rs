//! Termination/success evaluator
//!
//! Two policies, chosen once per run:
//! - fixed budget: never stop before iteration `T`, then defer to the
//!   problem's structural condition
//! - error goal: stop as soon as the problem's error condition holds

use crate::problem::{Problem, StructuralParams};
use crate::scalar::Scalar;
use crate::{Error, Result};

/// Success criterion for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessCriterion {
    iterations: u64,
    goal: bool,
    success: u32,
}

impl SuccessCriterion {
    /// Configure the criterion. `iterations` must be positive.
    pub fn new(iterations: i64, goal: bool) -> Result<Self> {
        if iterations <= 0 {
            return Err(Error::InvalidIterationBudget { iterations });
        }
        Ok(Self {
            iterations: iterations as u64,
            goal,
            success: 0,
        })
    }

    /// Iteration budget `T`
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Whether the error-goal policy is active
    pub fn is_goal_mode(&self) -> bool {
        self.goal
    }

    /// Number of positive checks recorded since configuration
    pub fn successes(&self) -> u32 {
        self.success
    }

    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn reset(&mut self) {
        self.success = 0;
    }

    /// Decide whether the run may stop at iteration `t`.
    pub fn check<T, P>(
        &self,
        problem: &P,
        t: u64,
        current: &[f64],
        remembered: &[f64],
        goal_threshold: f64,
        params: &StructuralParams,
    ) -> bool
    where
        T: Scalar,
        P: Problem<T> + ?Sized,
    {
        if self.goal {
            problem.error_terminate(current, remembered, current.len(), goal_threshold)
        } else if t >= self.iterations {
            problem.structural_terminate(current, params)
        } else {
            false
        }
    }
}
