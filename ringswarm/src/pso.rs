//! Particle swarm over a ring topology

use rand::Rng;
use tracing::debug;

use ringswarm_core::algorithms::{advance_particle, seed_particle, select_personal_best, PsoConfig};
use ringswarm_core::population::Population;
use ringswarm_core::problem::Problem;
use ringswarm_core::scalar::Scalar;
use ringswarm_net::traits::Communicator;

use crate::algorithm::{GlobalSync, PopulationAlgorithm};
use crate::group::Group;
use crate::ring::find_global;
use crate::Result;

/// Particle swarm optimizer whose social term follows the ring neighborhood
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleSwarm {
    config: PsoConfig,
}

impl ParticleSwarm {
    pub fn new(config: PsoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PsoConfig {
        &self.config
    }
}

/// The ring protocol keeps global bests current, nothing to copy.
impl<T: Scalar> GlobalSync<T> for ParticleSwarm {
    fn sync_local_to_global(&self, _population: &mut Population<T>) {}
}

impl<T: Scalar> PopulationAlgorithm<T> for ParticleSwarm {
    async fn put_to_best<C, R>(&self, group: &Group<C>, population: &mut Population<T>, rng: &mut R) -> Result<()>
    where
        C: Communicator,
        R: Rng + Send,
    {
        for candidate in population.iter_mut() {
            seed_particle(candidate, &self.config, rng)?;
        }
        find_global(group, population).await
    }

    fn combination<P, R>(&self, population: &mut Population<T>, problem: &mut P, rng: &mut R) -> Result<()>
    where
        P: Problem<T>,
        R: Rng,
    {
        for slot in 0..population.len() {
            let mut position = advance_particle(population.candidate_mut(slot)?, &self.config, rng)?;
            problem.wrap(&mut position);
            population.candidate_mut(slot)?.set_position(&position)?;
            population.evaluate_contender(slot, problem)?;
        }
        Ok(())
    }

    async fn selection<C>(&self, group: &Group<C>, population: &mut Population<T>) -> Result<()>
    where
        C: Communicator,
    {
        let improved = population.iter_mut().map(select_personal_best).filter(|&b| b).count();
        debug!(rank = group.rank(), improved, "personal bests updated");
        find_global(group, population).await
    }
}
