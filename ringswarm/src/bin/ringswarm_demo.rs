use std::path::PathBuf;

use ringswarm::config::DemoConfig;
use ringswarm::net::traits::Communicator;
use ringswarm::net::LocalGroup;
use ringswarm::sample::PhaseWells;
use ringswarm::{Optimizer, ParticleSwarm, RunOutcome};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn usage() -> ! {
    eprintln!("Usage: ringswarm_demo [config.json]");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  RUST_LOG=debug ringswarm_demo demo.json");
    std::process::exit(2);
}

fn load_config(args: &[String]) -> ringswarm::Result<DemoConfig> {
    match args {
        [] => Ok(DemoConfig::default()),
        [path] => {
            let path = PathBuf::from(path);
            let json = std::fs::read_to_string(&path)
                .map_err(|e| ringswarm::Error::Config(format!("cannot read {}: {e}", path.display())))?;
            DemoConfig::from_json_str(&json)
        }
        _ => usage(),
    }
}

async fn run(config: DemoConfig) -> ringswarm::Result<Vec<RunOutcome<f64>>> {
    LocalGroup::run(config.processes, |comm| {
        let config = config.clone();
        async move {
            let seed = config.run.seed.unwrap_or(0).wrapping_add(comm.rank() as u64);
            let problem = PhaseWells::new(config.dimension, config.noise, seed);
            let swarm = ParticleSwarm::new(config.run.pso.clone())?;
            let mut optimizer = Optimizer::new(comm, swarm, problem, config.run)?;
            optimizer.run().await
        }
    })
    .await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };

    let outcomes = match run(config).await {
        Ok(outcomes) => outcomes,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    // the coordinator holds the solution
    match outcomes.first().map(serde_json::to_string_pretty) {
        Some(Ok(json)) => println!("{json}"),
        Some(Err(e)) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
        None => usage(),
    }
}
