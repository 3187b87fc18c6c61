//! Ownership and addressing of logical candidates
//!
//! Logical index `p` lives on rank `p % nb_proc` at local slot
//! `p / nb_proc`. The mapping is recomputed on every process and never sent.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Static shape of the process group as seen from one rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLayout {
    rank: usize,
    nb_proc: usize,
    pop_size: usize,
}

impl GroupLayout {
    /// Create a layout for `rank` in a group of `nb_proc` processes, each
    /// owning `pop_size` candidates.
    pub fn new(rank: usize, nb_proc: usize, pop_size: usize) -> Result<Self> {
        if nb_proc == 0 {
            return Err(Error::InvalidLayout {
                reason: "group must contain at least one process".into(),
            });
        }
        if rank >= nb_proc {
            return Err(Error::InvalidLayout {
                reason: format!("rank {rank} outside group of {nb_proc}"),
            });
        }
        if pop_size == 0 {
            return Err(Error::InvalidPopulationSize { size: 0 });
        }
        nb_proc
            .checked_mul(pop_size)
            .ok_or_else(|| Error::InvalidLayout {
                reason: format!("total population {pop_size} x {nb_proc} overflows"),
            })?;
        Ok(Self {
            rank,
            nb_proc,
            pop_size,
        })
    }

    /// Create a layout and check an externally supplied total population.
    pub fn with_total(rank: usize, nb_proc: usize, pop_size: usize, total_pop: usize) -> Result<Self> {
        let layout = Self::new(rank, nb_proc, pop_size)?;
        if layout.total_pop() != total_pop {
            return Err(Error::InvalidLayout {
                reason: format!(
                    "total population {total_pop} != {pop_size} per process x {nb_proc} processes"
                ),
            });
        }
        Ok(layout)
    }

    /// This process's rank
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of processes in the group
    pub fn nb_proc(&self) -> usize {
        self.nb_proc
    }

    /// Candidates owned by each process
    pub fn pop_size(&self) -> usize {
        self.pop_size
    }

    /// Size of the logical population
    pub fn total_pop(&self) -> usize {
        self.pop_size * self.nb_proc
    }

    /// Rank owning logical index `p`
    #[inline]
    pub fn owner(&self, p: usize) -> usize {
        p % self.nb_proc
    }

    /// Local slot of logical index `p` on its owner
    #[inline]
    pub fn slot(&self, p: usize) -> usize {
        p / self.nb_proc
    }

    /// Inverse of (`owner`, `slot`)
    #[inline]
    pub fn logical_index(&self, rank: usize, slot: usize) -> usize {
        slot * self.nb_proc + rank
    }

    /// Whether logical index `p` is stored on this process
    #[inline]
    pub fn is_local(&self, p: usize) -> bool {
        self.owner(p) == self.rank
    }

    /// Ring predecessor and successor of `p`.
    pub fn ring_neighbors(&self, p: usize) -> (usize, usize) {
        let total = self.total_pop();
        let prev = if p == 0 { total - 1 } else { p - 1 };
        let forw = (p + 1) % total;
        (prev, forw)
    }

    /// Logical indices owned by this process, in slot order.
    pub fn local_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.pop_size).map(move |slot| self.logical_index(self.rank, slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn mapping_is_a_bijection() {
        for nb_proc in 1..=6 {
            for pop_size in 1..=7 {
                let layout = GroupLayout::new(0, nb_proc, pop_size).unwrap();
                let mut seen = HashSet::new();
                for p in 0..layout.total_pop() {
                    let (rank, slot) = (layout.owner(p), layout.slot(p));
                    assert!(rank < nb_proc);
                    assert!(slot < pop_size);
                    assert_eq!(layout.logical_index(rank, slot), p);
                    assert!(seen.insert((rank, slot)), "collision at p={p}");
                }
                assert_eq!(seen.len(), nb_proc * pop_size);
            }
        }
    }

    #[test]
    fn local_indices_match_owner() {
        let layout = GroupLayout::new(2, 3, 4).unwrap();
        let indices: Vec<usize> = layout.local_indices().collect();
        assert_eq!(indices, vec![2, 5, 8, 11]);
        assert!(indices.iter().all(|&p| layout.is_local(p)));
    }

    #[test]
    fn ring_wraps_at_both_ends() {
        let layout = GroupLayout::new(0, 2, 3).unwrap();
        assert_eq!(layout.ring_neighbors(0), (5, 1));
        assert_eq!(layout.ring_neighbors(5), (4, 0));
        assert_eq!(layout.ring_neighbors(2), (1, 3));

        let single = GroupLayout::new(0, 1, 1).unwrap();
        assert_eq!(single.ring_neighbors(0), (0, 0));
    }

    #[test]
    fn invalid_layouts_are_rejected() {
        assert!(GroupLayout::new(0, 0, 4).is_err());
        assert!(GroupLayout::new(3, 3, 4).is_err());
        assert_eq!(
            GroupLayout::new(0, 3, 0),
            Err(Error::InvalidPopulationSize { size: 0 })
        );
        assert!(GroupLayout::with_total(0, 3, 4, 12).is_ok());
        assert!(GroupLayout::with_total(0, 3, 4, 13).is_err());
    }
}
