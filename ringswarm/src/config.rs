//! Run configuration
//!
//! Every field has a default, so a JSON document only needs the values it
//! changes:
//!
//! ```json
//! { "pop_size": 16, "iterations": 40, "seed": 3, "final_repeat": 8 }
//! ```

use serde::{Deserialize, Serialize};

use ringswarm_core::algorithms::PsoConfig;
use ringswarm_core::problem::StructuralParams;
use ringswarm_core::termination::SuccessCriterion;
use ringswarm_core::checked_population_size;

use crate::{Error, Result};

/// How the first population is sampled
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Initialization {
    /// Uniformly within the problem bounds
    #[default]
    Uniform,
    /// Folded-normal samples around a previously found solution
    Previous {
        solution: Vec<f64>,
        prev_dev: f64,
        new_dev: f64,
    },
}

/// Configuration of one optimization run, identical on every rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Candidates per rank
    pub pop_size: i64,
    /// Iteration budget `T` in fixed-budget mode
    pub iterations: i64,
    /// Error-goal mode instead of fixed-budget mode
    pub goal: bool,
    /// Threshold handed to the error-goal predicate
    pub goal_threshold: f64,
    /// Particle swarm coefficients
    pub pso: PsoConfig,
    /// Re-evaluations per candidate in the final selection, 0 for exact
    pub final_repeat: usize,
    /// Hard cap on generations
    pub max_generations: u64,
    /// Base RNG seed; rank `r` uses `seed + r`
    pub seed: Option<u64>,
    pub init: Initialization,
    pub structural: StructuralParams,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            pop_size: 10,
            iterations: 100,
            goal: false,
            goal_threshold: 0.0,
            pso: PsoConfig::default(),
            final_repeat: 0,
            max_generations: 1000,
            seed: None,
            init: Initialization::Uniform,
            structural: StructuralParams::default(),
        }
    }
}

impl RunConfig {
    /// Create a new builder
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::new()
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(format!("malformed run configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Candidates per rank as a validated count.
    pub fn population_size(&self) -> Result<usize> {
        Ok(checked_population_size(self.pop_size)?)
    }

    /// Success criterion for this run.
    pub fn criterion(&self) -> Result<SuccessCriterion> {
        Ok(SuccessCriterion::new(self.iterations, self.goal)?)
    }

    /// Reject values the optimizer cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.population_size()?;
        let criterion = self.criterion()?;
        self.pso.validate()?;

        if self.max_generations == 0 {
            return Err(Error::Config("max_generations must be at least 1".into()));
        }
        if !criterion.is_goal_mode() && self.max_generations < criterion.iterations() {
            return Err(Error::Config(format!(
                "max_generations ({}) is below the iteration budget ({})",
                self.max_generations,
                criterion.iterations()
            )));
        }
        if self.goal && !self.goal_threshold.is_finite() {
            return Err(Error::Config(format!(
                "goal_threshold must be finite, got {}",
                self.goal_threshold
            )));
        }
        if let Initialization::Previous {
            solution,
            prev_dev,
            new_dev,
        } = &self.init
        {
            if solution.is_empty() {
                return Err(Error::Config("previous solution must not be empty".into()));
            }
            for dev in [*prev_dev, *new_dev] {
                if !(dev.is_finite() && dev >= 0.0) {
                    return Err(Error::Config(format!("deviation must be non-negative, got {dev}")));
                }
            }
        }
        Ok(())
    }
}

/// Builder for RunConfig
#[derive(Debug, Default)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of candidates per rank
    pub fn pop_size(mut self, size: i64) -> Self {
        self.config.pop_size = size;
        self
    }

    /// Set the fixed iteration budget
    pub fn iterations(mut self, iterations: i64) -> Self {
        self.config.iterations = iterations;
        self
    }

    /// Switch to error-goal mode with the given threshold
    pub fn goal(mut self, threshold: f64) -> Self {
        self.config.goal = true;
        self.config.goal_threshold = threshold;
        self
    }

    /// Set the particle swarm coefficients
    pub fn pso(mut self, pso: PsoConfig) -> Self {
        self.config.pso = pso;
        self
    }

    /// Use the averaged final selection with `repeat` re-evaluations
    pub fn final_repeat(mut self, repeat: usize) -> Self {
        self.config.final_repeat = repeat;
        self
    }

    /// Set the generation cap
    pub fn max_generations(mut self, generations: u64) -> Self {
        self.config.max_generations = generations;
        self
    }

    /// Seed every rank's RNG deterministically
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set the initialization strategy
    pub fn init(mut self, init: Initialization) -> Self {
        self.config.init = init;
        self
    }

    /// Set the parameters of the structural termination predicate
    pub fn structural(mut self, params: StructuralParams) -> Self {
        self.config.structural = params;
        self
    }

    /// Build the configuration
    pub fn build(self) -> RunConfig {
        self.config
    }
}

/// Configuration of the demo binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Size of the in-process group
    pub processes: usize,
    /// Number of phases to tune
    pub dimension: usize,
    /// Standard deviation of the evaluation noise
    pub noise: f64,
    pub run: RunConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            processes: 4,
            dimension: 4,
            noise: 0.05,
            run: RunConfig::builder().pop_size(6).iterations(60).final_repeat(8).build(),
        }
    }
}

impl DemoConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(format!("malformed demo configuration: {e}")))?;
        if config.processes == 0 {
            return Err(Error::Config("processes must be at least 1".into()));
        }
        config.run.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        RunConfig::default().validate().unwrap();
        assert_eq!(RunConfig::default().pso, PsoConfig::default());
    }

    #[test]
    fn builder_sets_fields() {
        let config = RunConfig::builder()
            .pop_size(4)
            .iterations(7)
            .goal(0.01)
            .final_repeat(3)
            .seed(11)
            .build();
        assert_eq!(config.pop_size, 4);
        assert_eq!(config.iterations, 7);
        assert!(config.goal);
        assert_eq!(config.goal_threshold, 0.01);
        assert_eq!(config.final_repeat, 3);
        assert_eq!(config.seed, Some(11));
    }

    #[test]
    fn non_positive_population_is_rejected() {
        for size in [0, -1] {
            let err = RunConfig::builder().pop_size(size).build().validate().unwrap_err();
            assert!(err.is_config_error());
            assert!(matches!(
                err,
                Error::Core(ringswarm_core::Error::InvalidPopulationSize { .. })
            ));
        }
    }

    #[test]
    fn non_positive_budget_is_rejected() {
        let err = RunConfig::builder().iterations(0).build().validate().unwrap_err();
        assert!(matches!(
            err,
            Error::Core(ringswarm_core::Error::InvalidIterationBudget { iterations: 0 })
        ));
    }

    #[test]
    fn cap_below_budget_is_rejected() {
        let err = RunConfig::builder()
            .iterations(50)
            .max_generations(10)
            .build()
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        // the cap is the only bound in error-goal mode
        RunConfig::builder()
            .iterations(50)
            .max_generations(10)
            .goal(0.1)
            .build()
            .validate()
            .unwrap();
    }

    #[test]
    fn json_fills_in_defaults() {
        let config = RunConfig::from_json_str(r#"{ "pop_size": 3, "seed": 9 }"#).unwrap();
        assert_eq!(config.pop_size, 3);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.iterations, 100);
        assert_eq!(config.init, Initialization::Uniform);
    }

    #[test]
    fn json_previous_initialization() {
        let config = RunConfig::from_json_str(
            r#"{ "init": { "kind": "previous", "solution": [0.1, 0.2], "prev_dev": 0.05, "new_dev": 0.5 } }"#,
        )
        .unwrap();
        assert_eq!(
            config.init,
            Initialization::Previous {
                solution: vec![0.1, 0.2],
                prev_dev: 0.05,
                new_dev: 0.5,
            }
        );
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = RunConfig::from_json_str("{ pop_size: 3 }").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = RunConfig::from_json_str(r#"{ "pop_size": -1 }"#).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn demo_config_rejects_empty_group() {
        let err = DemoConfig::from_json_str(r#"{ "processes": 0 }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let config = DemoConfig::from_json_str(r#"{ "processes": 2 }"#).unwrap();
        assert_eq!(config.dimension, 4);
    }
}
