//! Generation loop
//!
//! [`Optimizer`] runs the same loop on every rank of the group:
//!
//! ```text
//! initialize: sample population -> put_to_best
//! repeat:     combination -> selection -> exact final selection -> termination check
//! finish:     exact or averaged final selection
//! ```
//!
//! The termination check only reads data every rank holds identically (the
//! broadcast winning fitness vector), so all ranks leave the loop in the
//! same generation as long as the problem's predicates are deterministic.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ringswarm_core::population::Population;
use ringswarm_core::problem::Problem;
use ringswarm_core::scalar::Scalar;
use ringswarm_core::termination::SuccessCriterion;
use ringswarm_net::traits::Communicator;

use crate::algorithm::PopulationAlgorithm;
use crate::config::{Initialization, RunConfig};
use crate::group::Group;
use crate::select::{avg_final_select, final_select, Selection};
use crate::{Error, Result};

/// Result of a completed run on one rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Scalar")]
pub struct RunOutcome<T> {
    /// Generations executed
    pub generations: u64,
    /// Whether the success criterion was met before the cap
    pub converged: bool,
    /// Final selection as seen by this rank
    pub selection: Selection<T>,
}

/// One rank's optimizer
#[derive(Debug)]
pub struct Optimizer<T, A, C, P> {
    group: Group<C>,
    algorithm: A,
    problem: P,
    population: Population<T>,
    config: RunConfig,
    criterion: SuccessCriterion,
    rng: StdRng,
    generation: u64,
    initialized: bool,
}

impl<T, A, C, P> Optimizer<T, A, C, P>
where
    T: Scalar,
    A: PopulationAlgorithm<T>,
    C: Communicator,
    P: Problem<T>,
{
    /// Validate the configuration, join the group and sample the first
    /// population. Purely local; no messages are exchanged yet.
    pub fn new(comm: C, algorithm: A, mut problem: P, config: RunConfig) -> Result<Self> {
        config.validate()?;
        let criterion = config.criterion()?;
        let group = Group::new(comm, config.population_size()?)?;

        if problem.dimension() == 0 {
            return Err(Error::Config("problem dimension must be at least 1".into()));
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(group.rank() as u64)),
            None => StdRng::from_entropy(),
        };

        let population = match &config.init {
            Initialization::Uniform => Population::uniform(config.pop_size, &mut problem, &mut rng)?,
            Initialization::Previous {
                solution,
                prev_dev,
                new_dev,
            } => {
                let previous: Vec<T> = solution.iter().map(|&x| T::from_real(x)).collect();
                Population::around_previous(config.pop_size, &previous, *prev_dev, *new_dev, &mut problem, &mut rng)?
            }
        };
        group.check_population(&population)?;

        Ok(Self {
            group,
            algorithm,
            problem,
            population,
            config,
            criterion,
            rng,
            generation: 0,
            initialized: false,
        })
    }

    /// Seed personal bests and velocities and run the first neighbor-best
    /// exchange. Collective.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        let layout = self.group.layout();
        info!(
            rank = layout.rank(),
            nb_proc = layout.nb_proc(),
            pop_size = layout.pop_size(),
            dimension = self.population.dimension(),
            "starting run"
        );
        self.algorithm
            .put_to_best(&self.group, &mut self.population, &mut self.rng)
            .await?;
        self.initialized = true;
        Ok(())
    }

    /// Run one generation. Collective.
    pub async fn step(&mut self) -> Result<()> {
        self.initialize().await?;
        self.algorithm
            .combination(&mut self.population, &mut self.problem, &mut self.rng)?;
        self.algorithm.selection(&self.group, &mut self.population).await?;
        self.generation += 1;
        Ok(())
    }

    /// Run generations until the success criterion holds or the cap is
    /// reached, then perform the final reduction. Collective.
    pub async fn run(&mut self) -> Result<RunOutcome<T>> {
        self.initialize().await?;

        let mut remembered: Option<Vec<f64>> = None;
        let mut converged = false;

        while self.generation < self.config.max_generations {
            self.step().await?;
            let selection = final_select(&self.group, &self.algorithm, &mut self.population).await?;
            let current = selection.fitness_vector.unwrap_or_default();

            debug!(
                rank = self.group.rank(),
                generation = self.generation,
                best = selection.fitness,
                index = selection.index,
                "generation complete"
            );

            if self.should_stop(&current, remembered.as_deref()) {
                self.criterion.record_success();
                converged = true;
                break;
            }
            remembered = Some(current);
        }

        if !converged {
            warn!(
                rank = self.group.rank(),
                generations = self.generation,
                "generation cap reached without meeting the success criterion"
            );
        }

        let selection = if self.config.final_repeat > 0 {
            avg_final_select(
                &self.group,
                &self.algorithm,
                &mut self.population,
                &mut self.problem,
                self.config.final_repeat,
            )
            .await?
        } else {
            final_select(&self.group, &self.algorithm, &mut self.population).await?
        };

        if self.group.is_coordinator() {
            info!(
                generations = self.generation,
                converged,
                index = selection.index,
                fitness = selection.fitness,
                "final selection"
            );
        }

        Ok(RunOutcome {
            generations: self.generation,
            converged,
            selection,
        })
    }

    /// Error-goal mode needs a previous generation to compare against.
    fn should_stop(&self, current: &[f64], remembered: Option<&[f64]>) -> bool {
        let remembered = match remembered {
            Some(previous) => previous,
            None if self.criterion.is_goal_mode() => return false,
            None => current,
        };
        self.criterion.check::<T, P>(
            &self.problem,
            self.generation,
            current,
            remembered,
            self.config.goal_threshold,
            &self.config.structural,
        )
    }

    pub fn group(&self) -> &Group<C> {
        &self.group
    }

    pub fn population(&self) -> &Population<T> {
        &self.population
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn criterion(&self) -> &SuccessCriterion {
        &self.criterion
    }

    /// Generations completed so far
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
