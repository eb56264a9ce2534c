use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use kemy::{
    config::SimulationArgs,
    simulation::{demo_policy, BottleneckSimulation},
};

fn main() -> anyhow::Result<()> {
    let args = SimulationArgs::parse();
    #[cfg(feature = "trace")]
    kemy::tracing::tracer::init_tracer(args.log_level)?;

    let config = args.build().context("invalid simulation config")?;
    let policy = demo_policy(config.occupancy_mode()?, config.traffic.packet_size)
        .context("failed to build demonstration policy")?;

    let mut simulation = BottleneckSimulation::new(&config, Arc::new(policy))?;
    let report = simulation.run();
    println!("{report}");
    Ok(())
}
