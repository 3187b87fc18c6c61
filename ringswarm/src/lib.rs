//! # RingSwarm
//!
//! **Ring-topology particle swarm optimization over a fixed group of
//! cooperating processes.**
//!
//! The population is partitioned across the group: logical candidate `p`
//! lives on rank `p % nb_proc`. Every rank runs the same program in lockstep
//! (SPMD) and talks to the others only through a
//! [`Communicator`](ringswarm_net::traits::Communicator).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ringswarm::prelude::*;
//! use ringswarm::sample::PhaseWells;
//!
//! #[tokio::main]
//! async fn main() -> ringswarm::Result<()> {
//!     let config = RunConfig::builder().pop_size(8).iterations(50).seed(7).build();
//!
//!     let outcomes = LocalGroup::run(4, |comm| {
//!         let config = config.clone();
//!         async move {
//!             let problem = PhaseWells::new(4, 0.05, comm.rank() as u64);
//!             let swarm = ParticleSwarm::new(config.pso.clone())?;
//!             let mut optimizer = Optimizer::new(comm, swarm, problem, config)?;
//!             optimizer.run().await
//!         }
//!     })
//!     .await?;
//!
//!     println!("best fitness: {}", outcomes[0].selection.fitness);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `local-transport` (default): In-process process group (`LocalGroup`)
//! - `telemetry`: Population lifecycle events from `ringswarm-core`
//!
//! ## Crate Structure
//!
//! - [`ringswarm_core`]: Candidate model, addressing, local rules, termination
//! - [`ringswarm_net`]: Communicator trait, wire format, in-process transport

#![forbid(unsafe_code)]

// Re-export sub-crates
pub use ringswarm_core as core;
pub use ringswarm_net as net;

pub mod algorithm;
pub mod config;
pub mod group;
pub mod optimizer;
pub mod pso;
pub mod ring;
pub mod sample;
pub mod select;

pub use algorithm::{GlobalSync, PopulationAlgorithm};
pub use config::{Initialization, RunConfig, RunConfigBuilder};
pub use group::Group;
pub use optimizer::{Optimizer, RunOutcome};
pub use pso::ParticleSwarm;
pub use select::Selection;

/// Prelude module for convenient imports
///
/// ```rust,ignore
/// use ringswarm::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::prelude::*;
    pub use crate::net::prelude::*;
    #[cfg(feature = "local-transport")]
    pub use crate::net::{LocalEndpoint, LocalGroup};

    pub use crate::{
        GlobalSync, Group, Initialization, Optimizer, ParticleSwarm, PopulationAlgorithm,
        RunConfig, RunOutcome, Selection,
    };
}

/// Result type for RingSwarm operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for RingSwarm operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Local model or configuration error
    #[error(transparent)]
    Core(#[from] ringswarm_core::Error),
    /// Transport or wire-format error
    #[error(transparent)]
    Net(#[from] ringswarm_net::Error),
    /// Neighborhood fitness values cannot be ordered
    #[error("incomparable fitness around candidate {index}: prev={prev}, own={own}, forw={forw}")]
    IncomparableFitness {
        index: usize,
        prev: f64,
        own: f64,
        forw: f64,
    },
    /// A neighborhood best changed between announcement and transfer
    #[error("neighborhood best for candidate {index} changed in flight: expected {expected}, got {got}")]
    StaleBest {
        index: usize,
        expected: f64,
        got: f64,
    },
    /// Communicator, layout and population disagree about the group
    #[error("group mismatch: {0}")]
    GroupMismatch(String),
    /// Run configuration is invalid
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` for errors raised while validating configuration.
    pub fn is_config_error(&self) -> bool {
        match self {
            Error::Core(e) => e.is_config_error(),
            Error::Config(_) | Error::GroupMismatch(_) => true,
            _ => false,
        }
    }

    /// Returns `true` for message-protocol violations.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Error::Net(_) | Error::IncomparableFitness { .. } | Error::StaleBest { .. }
        )
    }
}
