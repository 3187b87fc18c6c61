//! Phase Tuning Example
//!
//! Runs a four-rank ring swarm on the noisy phase problem and prints the
//! coordinator's result.

use ringswarm::prelude::*;
use ringswarm::sample::PhaseWells;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("RingSwarm Phase Tuning Example");
    println!("==============================");

    let config = RunConfig::builder()
        .pop_size(5)
        .iterations(50)
        .final_repeat(20)
        .seed(2024)
        .structural(StructuralParams {
            cutoff: 5,
            ..StructuralParams::default()
        })
        .build();

    println!("Configuration:");
    println!("  Candidates per rank: {}", config.pop_size);
    println!("  Iteration budget: {}", config.iterations);
    println!("  Final re-evaluations: {}", config.final_repeat);

    let outcomes = LocalGroup::run(4, |comm| {
        let config = config.clone();
        async move {
            let problem = PhaseWells::new(4, 0.1, 100 + comm.rank() as u64);
            let swarm = ParticleSwarm::new(config.pso.clone())?;
            let mut optimizer = Optimizer::new(comm, swarm, problem, config)?;
            optimizer.run().await
        }
    })
    .await?;

    let outcome = &outcomes[0];
    println!("\nGenerations: {} (converged: {})", outcome.generations, outcome.converged);
    println!("Winner: candidate {} with mean score {:.4}", outcome.selection.index, outcome.selection.fitness);
    if let Some(solution) = &outcome.selection.solution {
        println!("Phases: {solution:.3?}");
    }

    Ok(())
}
