//! Group context
//!
//! Everything a protocol needs to know about the process group travels in a
//! [`Group`]: the communicator and the static layout. There is no ambient
//! global state.

use ringswarm_core::addressing::GroupLayout;
use ringswarm_core::population::Population;
use ringswarm_core::scalar::Scalar;
use ringswarm_net::traits::Communicator;

use crate::{Error, Result};

/// Rank that gathers scores and receives the final solution
pub const COORDINATOR: usize = 0;

/// One rank's view of the process group
#[derive(Debug)]
pub struct Group<C> {
    comm: C,
    layout: GroupLayout,
}

impl<C: Communicator> Group<C> {
    /// Configure the group with `pop_size` candidates per rank.
    pub fn new(comm: C, pop_size: usize) -> Result<Self> {
        let layout = GroupLayout::new(comm.rank(), comm.size(), pop_size)?;
        Ok(Self { comm, layout })
    }

    /// Configure the group from an explicit layout.
    pub fn with_layout(comm: C, layout: GroupLayout) -> Result<Self> {
        if layout.rank() != comm.rank() || layout.nb_proc() != comm.size() {
            return Err(Error::GroupMismatch(format!(
                "layout is rank {} of {}, communicator is rank {} of {}",
                layout.rank(),
                layout.nb_proc(),
                comm.rank(),
                comm.size()
            )));
        }
        Ok(Self { comm, layout })
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn layout(&self) -> &GroupLayout {
        &self.layout
    }

    pub fn rank(&self) -> usize {
        self.layout.rank()
    }

    pub fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR
    }

    /// Check that a local population has the shape this layout expects.
    pub fn check_population<T: Scalar>(&self, population: &Population<T>) -> Result<()> {
        if population.len() != self.layout.pop_size() {
            return Err(Error::GroupMismatch(format!(
                "rank {} holds {} candidates, layout expects {}",
                self.rank(),
                population.len(),
                self.layout.pop_size()
            )));
        }
        Ok(())
    }

    pub fn into_comm(self) -> C {
        self.comm
    }
}
