//! Ring neighbor-best protocol
//!
//! Every logical candidate `p` looks at its ring neighborhood
//! `{p - 1, p, p + 1}` (wrapping at both ends) and adopts the best personal
//! best found there as its global best. Rounds run strictly in increasing
//! `p`, each one closed by two group barriers:
//!
//! 1. the owners of `prev` and `forw` send their personal-best fitness to the
//!    owner of `p` (local reads when the owners coincide)
//! 2. the owner of `p` picks the winner and announces it to the neighbor
//!    owners
//! 3. barrier
//! 4. the owner of the winner ships its personal best to the owner of `p`
//! 5. barrier
//!
//! Ties prefer `p`, then `prev`, then `forw`.

use serde::{Deserialize, Serialize};
use tracing::trace;

use ringswarm_core::addressing::GroupLayout;
use ringswarm_core::population::Population;
use ringswarm_core::scalar::Scalar;
use ringswarm_net::protocol::Tag;
use ringswarm_net::traits::{Communicator, CommunicatorExt};

use crate::group::Group;
use crate::{Error, Result};

/// Personal best shipped from the winner's owner to the owner of `p`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Scalar")]
struct BestRecord<T> {
    position: Vec<T>,
    fitness: Vec<f64>,
}

/// Scalar personal-best fitness around `p`, as seen by the owner of `p`
#[derive(Debug, Clone, Copy, PartialEq)]
struct Neighborhood {
    p: usize,
    prev: usize,
    forw: usize,
    prev_fit: f64,
    own_fit: f64,
    forw_fit: f64,
}

impl Neighborhood {
    fn winner(&self) -> Result<usize> {
        if self.prev_fit.is_nan() || self.own_fit.is_nan() || self.forw_fit.is_nan() {
            return Err(Error::IncomparableFitness {
                index: self.p,
                prev: self.prev_fit,
                own: self.own_fit,
                forw: self.forw_fit,
            });
        }

        let winner = if self.prev_fit <= self.own_fit {
            if self.forw_fit > self.own_fit {
                self.forw
            } else {
                self.p
            }
        } else if self.forw_fit > self.prev_fit {
            self.forw
        } else {
            self.prev
        };
        Ok(winner)
    }

    /// Fitness the owner of `p` already knows for a neighbor.
    fn known_fit(&self, index: usize) -> f64 {
        if index == self.prev {
            self.prev_fit
        } else if index == self.forw {
            self.forw_fit
        } else {
            self.own_fit
        }
    }
}

/// Run the neighbor-best protocol over the whole population.
///
/// Every rank of the group must call this with its local population. On
/// return each candidate's global best is the best personal best in its ring
/// neighborhood.
pub async fn find_global<T, C>(group: &Group<C>, population: &mut Population<T>) -> Result<()>
where
    T: Scalar,
    C: Communicator,
{
    group.check_population(population)?;
    let layout = *group.layout();

    for p in 0..layout.total_pop() {
        let round = p as u64;

        let neighborhood = neighbor_fitness(group, population, p, round).await?;
        let decided = neighborhood.as_ref().map(Neighborhood::winner).transpose()?;
        let winner = announce_winner(group, p, decided, round).await?;
        group.comm().barrier().await?;

        if let Some(winner) = winner {
            transfer_best(group, population, p, winner, neighborhood.as_ref(), round).await?;
        }
        group.comm().barrier().await?;

        if let Some(n) = neighborhood {
            trace!(p, winner = ?decided, prev_fit = n.prev_fit, own_fit = n.own_fit, forw_fit = n.forw_fit, "ring round");
        }
    }
    Ok(())
}

/// Collect the three fitness values at the owner of `p`.
///
/// Returns `None` on every other rank.
async fn neighbor_fitness<T, C>(
    group: &Group<C>,
    population: &Population<T>,
    p: usize,
    round: u64,
) -> Result<Option<Neighborhood>>
where
    T: Scalar,
    C: Communicator,
{
    let layout = group.layout();
    let rank = group.rank();
    let home = layout.owner(p);
    let (prev, forw) = layout.ring_neighbors(p);

    // prev before forw; the home rank receives in the same order
    for q in [prev, forw] {
        let owner = layout.owner(q);
        if rank == owner && owner != home {
            let fit = population.candidate(layout.slot(q))?.best_fit();
            group.comm().send(home, Tag::NeighborFitness, round, &fit).await?;
        }
    }

    if rank != home {
        return Ok(None);
    }

    let own_fit = population.candidate(layout.slot(p))?.best_fit();
    let prev_fit = fetch_fit(group, population, prev, round).await?;
    let forw_fit = fetch_fit(group, population, forw, round).await?;
    Ok(Some(Neighborhood {
        p,
        prev,
        forw,
        prev_fit,
        own_fit,
        forw_fit,
    }))
}

async fn fetch_fit<T, C>(group: &Group<C>, population: &Population<T>, q: usize, round: u64) -> Result<f64>
where
    T: Scalar,
    C: Communicator,
{
    let layout = group.layout();
    let owner = layout.owner(q);
    if owner == group.rank() {
        Ok(population.candidate(layout.slot(q))?.best_fit())
    } else {
        Ok(group.comm().recv(owner, Tag::NeighborFitness, round).await?)
    }
}

/// Remote ranks owning `prev` or `forw`, each listed once.
fn winner_recipients(layout: &GroupLayout, p: usize) -> Vec<usize> {
    let home = layout.owner(p);
    let (prev, forw) = layout.ring_neighbors(p);
    let mut ranks = Vec::with_capacity(2);
    for owner in [layout.owner(prev), layout.owner(forw)] {
        if owner != home && !ranks.contains(&owner) {
            ranks.push(owner);
        }
    }
    ranks
}

/// Tell the neighbor owners which index won round `p`.
///
/// Returns the winner on the owner of `p` and on the neighbor owners,
/// `None` elsewhere.
async fn announce_winner<C: Communicator>(
    group: &Group<C>,
    p: usize,
    decided: Option<usize>,
    round: u64,
) -> Result<Option<usize>> {
    let layout = group.layout();
    let recipients = winner_recipients(layout, p);

    match decided {
        Some(winner) => {
            for &dest in &recipients {
                group
                    .comm()
                    .send(dest, Tag::NeighborWinner, round, &(winner as u64))
                    .await?;
            }
            Ok(Some(winner))
        }
        None if recipients.contains(&group.rank()) => {
            let winner: u64 = group
                .comm()
                .recv(layout.owner(p), Tag::NeighborWinner, round)
                .await?;
            Ok(Some(winner as usize))
        }
        None => Ok(None),
    }
}

/// Move the winner's personal best into the global best of `p`.
async fn transfer_best<T, C>(
    group: &Group<C>,
    population: &mut Population<T>,
    p: usize,
    winner: usize,
    neighborhood: Option<&Neighborhood>,
    round: u64,
) -> Result<()>
where
    T: Scalar,
    C: Communicator,
{
    let layout = group.layout();
    let rank = group.rank();
    let home = layout.owner(p);
    let source = layout.owner(winner);

    if winner == p {
        if rank == home {
            population.candidate_mut(layout.slot(p))?.promote_best_to_global();
        }
        return Ok(());
    }

    if rank == source && source != home {
        let candidate = population.candidate(layout.slot(winner))?;
        let record = BestRecord {
            position: candidate.best_position().to_vec(),
            fitness: candidate.best_fitness().to_vec(),
        };
        group.comm().send(home, Tag::NeighborBest, round, &record).await?;
    }

    let Some(neighborhood) = neighborhood.filter(|_| rank == home) else {
        return Ok(());
    };

    let record: BestRecord<T> = if source == home {
        let candidate = population.candidate(layout.slot(winner))?;
        BestRecord {
            position: candidate.best_position().to_vec(),
            fitness: candidate.best_fitness().to_vec(),
        }
    } else {
        group.comm().recv(source, Tag::NeighborBest, round).await?
    };

    let expected = neighborhood.known_fit(winner);
    let got = record.fitness.first().copied().unwrap_or(f64::NAN);
    if got != expected {
        return Err(Error::StaleBest {
            index: p,
            expected,
            got,
        });
    }

    population
        .candidate_mut(layout.slot(p))?
        .set_global_best(&record.position, &record.fitness)?;
    Ok(())
}
