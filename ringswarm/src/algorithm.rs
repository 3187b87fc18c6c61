//! Population algorithm traits
//!
//! The optimizer drives any population metaheuristic through
//! [`PopulationAlgorithm`]. The final-selection reductions only need the
//! narrower [`GlobalSync`] hook.

use std::future::Future;

use rand::Rng;

use ringswarm_core::population::Population;
use ringswarm_core::problem::Problem;
use ringswarm_core::scalar::Scalar;
use ringswarm_net::traits::Communicator;

use crate::group::Group;
use crate::Result;

/// Hook run before every final-selection reduction
///
/// Algorithms that maintain the global best continuously leave the
/// population untouched. Algorithms that only know personal bests copy them
/// into the global-best fields here, typically with
/// [`Population::promote_personal_to_global`].
pub trait GlobalSync<T: Scalar> {
    fn sync_local_to_global(&self, population: &mut Population<T>);
}

/// One generation-based population metaheuristic
///
/// `put_to_best` and `selection` are collective: every rank of the group
/// must call them together. `combination` is local to one rank.
pub trait PopulationAlgorithm<T: Scalar>: GlobalSync<T> + Send + Sync {
    /// Prepare a freshly initialized population.
    fn put_to_best<C, R>(
        &self,
        group: &Group<C>,
        population: &mut Population<T>,
        rng: &mut R,
    ) -> impl Future<Output = Result<()>> + Send
    where
        C: Communicator,
        R: Rng + Send;

    /// Produce and evaluate the next contenders.
    fn combination<P, R>(&self, population: &mut Population<T>, problem: &mut P, rng: &mut R) -> Result<()>
    where
        P: Problem<T>,
        R: Rng;

    /// Keep the better contenders and refresh neighborhood information.
    fn selection<C>(&self, group: &Group<C>, population: &mut Population<T>) -> impl Future<Output = Result<()>> + Send
    where
        C: Communicator;
}
