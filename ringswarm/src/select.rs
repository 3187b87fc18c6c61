//! Final-selection reductions
//!
//! Both variants pick the single best candidate of the whole distributed
//! population by scalar global-best fitness and deliver it to the
//! coordinator (rank 0):
//!
//! - [`final_select`] compares the stored global-best fitness.
//! - [`avg_final_select`] first re-evaluates every global-best position
//!   `repeat` times and compares the averaged scalar instead.
//!
//! Every rank learns the winning index and fitness; only the coordinator
//! receives the winning position.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ringswarm_core::population::Population;
use ringswarm_core::problem::Problem;
use ringswarm_core::scalar::Scalar;
use ringswarm_net::protocol::Tag;
use ringswarm_net::traits::{Communicator, CommunicatorExt};

use crate::algorithm::GlobalSync;
use crate::group::{Group, COORDINATOR};
use crate::{Error, Result};

/// Outcome of a final-selection reduction on one rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Scalar")]
pub struct Selection<T> {
    /// Logical index of the winner
    pub index: usize,
    /// Scalar fitness the winner was selected on
    pub fitness: f64,
    /// Winner's full global-best fitness vector (exact variant only)
    pub fitness_vector: Option<Vec<f64>>,
    /// Winner's global-best position (coordinator only)
    pub solution: Option<Vec<T>>,
    /// Gathered scores indexed by logical index (coordinator only)
    pub scores: Option<Vec<f64>>,
}

/// Index of the first maximum, scanning for strict improvement.
///
/// NaN scores never win. Returns 0 for an empty slice.
pub fn first_max(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] || scores[best].is_nan() {
            best = i;
        }
    }
    best
}

/// Exact final selection over the stored global-best fitness.
pub async fn final_select<T, C, A>(
    group: &Group<C>,
    algorithm: &A,
    population: &mut Population<T>,
) -> Result<Selection<T>>
where
    T: Scalar,
    C: Communicator,
    A: GlobalSync<T> + ?Sized,
{
    group.check_population(population)?;
    algorithm.sync_local_to_global(population);

    let local: Vec<f64> = population.iter().map(|c| c.global_fit()).collect();
    let scores = gather_scores(group, &local).await?;
    group.comm().barrier().await?;

    let index = broadcast_index(group, scores.as_deref()).await?;
    group.comm().barrier().await?;

    let layout = group.layout();
    let owner = layout.owner(index);
    let fitness_vector: Vec<f64> = if group.rank() == owner {
        let vector = population.candidate(layout.slot(index))?.global_fitness().to_vec();
        for dest in (0..layout.nb_proc()).filter(|&d| d != owner) {
            group.comm().send(dest, Tag::WinnerFitness, 0, &vector).await?;
        }
        vector
    } else {
        group.comm().recv(owner, Tag::WinnerFitness, 0).await?
    };
    group.comm().barrier().await?;

    let solution = deliver_solution(group, population, index).await?;
    group.comm().barrier().await?;

    let fitness = fitness_vector.first().copied().unwrap_or(f64::NAN);
    debug!(index, fitness, "exact final selection");

    Ok(Selection {
        index,
        fitness,
        fitness_vector: Some(fitness_vector),
        solution,
        scores,
    })
}

/// Averaged final selection for noisy objectives.
///
/// Each rank re-evaluates the global-best position of every local candidate
/// `repeat` times and averages the scalar fitness. The averaged scores are
/// gathered and compared; the winning score is broadcast to every rank and
/// the winner's stored global-best position goes to the coordinator.
pub async fn avg_final_select<T, C, A, P>(
    group: &Group<C>,
    algorithm: &A,
    population: &mut Population<T>,
    problem: &mut P,
    repeat: usize,
) -> Result<Selection<T>>
where
    T: Scalar,
    C: Communicator,
    A: GlobalSync<T> + ?Sized,
    P: Problem<T>,
{
    if repeat == 0 {
        return Err(Error::Config("averaged selection needs at least one repeat".into()));
    }
    group.check_population(population)?;
    algorithm.sync_local_to_global(population);

    let local = averaged_scores(population, problem, repeat)?;
    let scores = gather_scores(group, &local).await?;
    group.comm().barrier().await?;

    let winning = scores.as_deref().map(|s| s[first_max(s)]);
    let fitness = broadcast(group, Tag::WinnerScore, winning).await?;
    let index = broadcast_index(group, scores.as_deref()).await?;
    group.comm().barrier().await?;

    let solution = deliver_solution(group, population, index).await?;
    group.comm().barrier().await?;

    debug!(index, fitness, repeat, "averaged final selection");

    Ok(Selection {
        index,
        fitness,
        fitness_vector: None,
        solution,
        scores,
    })
}

fn averaged_scores<T, P>(population: &Population<T>, problem: &mut P, repeat: usize) -> Result<Vec<f64>>
where
    T: Scalar,
    P: Problem<T>,
{
    let samples = problem.num_repeat();
    let mut scores = Vec::with_capacity(population.len());
    for candidate in population.iter() {
        let mut total = 0.0;
        for _ in 0..repeat {
            let fitness = problem.evaluate(candidate.global_position(), samples);
            let scalar = fitness.first().copied().ok_or(ringswarm_core::Error::FitnessLengthMismatch {
                expected: population.fitness_len(),
                got: 0,
            })?;
            total += scalar;
        }
        scores.push(total / repeat as f64);
    }
    Ok(scores)
}

/// Gather one score per logical index at the coordinator.
///
/// Returns the full score table on the coordinator and `None` elsewhere.
async fn gather_scores<C: Communicator>(group: &Group<C>, local: &[f64]) -> Result<Option<Vec<f64>>> {
    let layout = group.layout();
    let comm = group.comm();

    if !group.is_coordinator() {
        for (slot, score) in local.iter().enumerate() {
            let p = layout.logical_index(group.rank(), slot);
            comm.send(COORDINATOR, Tag::GatherScore, p as u64, score).await?;
        }
        return Ok(None);
    }

    let mut scores = vec![f64::NAN; layout.total_pop()];
    for (p, score) in scores.iter_mut().enumerate() {
        let owner = layout.owner(p);
        *score = if owner == COORDINATOR {
            local[layout.slot(p)]
        } else {
            comm.recv(owner, Tag::GatherScore, p as u64).await?
        };
    }
    Ok(Some(scores))
}

async fn broadcast_index<C: Communicator>(group: &Group<C>, scores: Option<&[f64]>) -> Result<usize> {
    let index = broadcast(group, Tag::WinnerIndex, scores.map(|s| first_max(s) as u64)).await?;
    Ok(index as usize)
}

/// Send the coordinator's value to every other rank.
async fn broadcast<V, C>(group: &Group<C>, tag: Tag, value: Option<V>) -> Result<V>
where
    V: Serialize + DeserializeOwned + Send + Sync,
    C: Communicator,
{
    let comm = group.comm();
    if !group.is_coordinator() {
        return Ok(comm.recv(COORDINATOR, tag, 0).await?);
    }

    let value = value.ok_or_else(|| Error::GroupMismatch("coordinator has nothing to broadcast".into()))?;
    for dest in 1..comm.size() {
        comm.send(dest, tag, 0, &value).await?;
    }
    Ok(value)
}

/// Deliver the winner's global-best position to the coordinator.
async fn deliver_solution<T, C>(
    group: &Group<C>,
    population: &Population<T>,
    index: usize,
) -> Result<Option<Vec<T>>>
where
    T: Scalar,
    C: Communicator,
{
    let layout = group.layout();
    let owner = layout.owner(index);
    let rank = group.rank();

    if rank == owner {
        let position = population.candidate(layout.slot(index))?.global_position().to_vec();
        if group.is_coordinator() {
            return Ok(Some(position));
        }
        group.comm().send(COORDINATOR, Tag::Solution, 0, &position).await?;
        Ok(None)
    } else if group.is_coordinator() {
        Ok(Some(group.comm().recv(owner, Tag::Solution, 0).await?))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_max_keeps_the_earliest_tie() {
        assert_eq!(first_max(&[1.0, 3.0, 2.0, 3.0]), 1);
        assert_eq!(first_max(&[5.0, 5.0, 5.0]), 0);
        assert_eq!(first_max(&[f64::NEG_INFINITY, -1.0]), 1);
    }

    #[test]
    fn first_max_skips_nan() {
        assert_eq!(first_max(&[f64::NAN, 2.0, 1.0]), 1);
        assert_eq!(first_max(&[0.5, f64::NAN, 0.25]), 0);
    }

    #[test]
    fn first_max_of_empty_is_zero() {
        assert_eq!(first_max(&[]), 0);
    }
}
