// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Demo driver: a ring of Poisson spike sources over one or more in-process
//! ranks.
//!
//! Every cell fires as a seeded Poisson source and excites its ring
//! neighbour; the run reports the spike totals and the epoch parameters as
//! JSON on stdout.
//!
//! ```text
//! synfire-demo --cells 64 --ranks 2 --t-final 100 --rate 20
//! RUST_LOG=synfire_comm=debug synfire-demo ...
//! ```

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use synfire_engine::{
    CellDescription, CellSite, Collective, Connection, DomainDecomposition, EngineConfig,
    ExecutionContext, Recipe, RuntimeConfig, Schedule, SharedCollective, Simulation, VecRecipe,
};

#[derive(Parser, Debug, Clone)]
#[command(name = "synfire-demo", about = "Ring-network spike exchange demo")]
struct Cli {
    /// Number of cells in the ring
    #[arg(long, default_value_t = 64)]
    cells: u32,

    /// In-process ranks to split the ring over
    #[arg(long, default_value_t = 1)]
    ranks: usize,

    /// Poisson rate of every source, in spikes per time unit
    #[arg(long, default_value_t = 20.0)]
    rate: f64,

    /// Synaptic delay on every ring connection
    #[arg(long, default_value_t = 5.0)]
    delay: f64,

    /// End of the simulated interval
    #[arg(long, default_value_t = 100.0)]
    t_final: f64,

    /// Integration step (upper bound on the epoch length)
    #[arg(long, default_value_t = 1.0)]
    dt: f64,

    /// Worker threads per rank; 0 = auto
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Base seed for the Poisson sources
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// TOML configuration file; takes precedence over --t-final, --dt,
    /// --threads, and --seed
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

fn ring_recipe(cli: &Cli) -> Result<VecRecipe> {
    let mut connections = Vec::with_capacity(cli.cells as usize);
    for gid in 0..cli.cells {
        let next = (gid + 1) % cli.cells;
        connections.push(Connection::new(
            CellSite::new(gid, 0),
            CellSite::new(next, 0),
            1.0,
            cli.delay,
        ));
    }
    let mut recipe = VecRecipe::new(cli.cells).with_connections(connections);
    for gid in 0..cli.cells {
        let schedule = Schedule::poisson(0.0, cli.rate, cli.t_final, cli.seed ^ gid as u64)
            .context("invalid source schedule")?;
        recipe.set_description(gid, CellDescription::SpikeSource(schedule));
    }
    Ok(recipe)
}

fn run_rank<R: Recipe>(
    recipe: &R,
    decomposition: DomainDecomposition,
    runtime: &RuntimeConfig,
    collective: Arc<dyn synfire_engine::Collective>,
    t_final: f64,
    dt: f64,
) -> Result<(usize, u64, f64)> {
    let rank = decomposition.rank;
    let ctx = ExecutionContext::with_collective(runtime, collective)?;
    let mut sim = Simulation::new(recipe, decomposition, &ctx)?;
    let reached = sim.run(t_final, dt)?;
    Ok((rank, sim.num_spikes(), reached))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.cells == 0 {
        bail!("the ring needs at least one cell");
    }
    if cli.ranks == 0 || cli.ranks > cli.cells as usize {
        bail!(
            "rank count must be in 1..={} for {} cells",
            cli.cells,
            cli.cells
        );
    }

    let (t_final, dt, runtime) = match &cli.config {
        Some(path) => {
            let config = EngineConfig::from_path(path)?;
            (config.simulation.t_final, config.simulation.dt, config.runtime)
        }
        None => (
            cli.t_final,
            cli.dt,
            RuntimeConfig {
                threads: cli.threads,
                seed: cli.seed,
            },
        ),
    };

    let recipe = ring_recipe(&cli)?;
    let mut outcomes = Vec::new();

    if cli.ranks == 1 {
        let decomposition = DomainDecomposition::single_rank(cli.cells);
        let ctx = ExecutionContext::local(&runtime)?;
        let mut sim = Simulation::new(&recipe, decomposition, &ctx)?;
        let reached = sim.run(t_final, dt)?;
        outcomes.push((0, sim.num_spikes(), reached));
    } else {
        let mut joins = Vec::new();
        for collective in SharedCollective::group(cli.ranks) {
            let recipe = recipe.clone();
            let runtime = runtime.clone();
            let num_cells = cli.cells;
            let num_ranks = cli.ranks;
            joins.push(std::thread::spawn(move || {
                let rank = collective.rank();
                run_rank(
                    &recipe,
                    DomainDecomposition::contiguous(rank, num_ranks, num_cells),
                    &runtime,
                    Arc::new(collective),
                    t_final,
                    dt,
                )
            }));
        }
        for join in joins {
            let outcome = join
                .join()
                .map_err(|_| anyhow::anyhow!("a rank thread panicked"))??;
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|(rank, _, _)| *rank);
    }

    let summary = serde_json::json!({
        "cells": cli.cells,
        "ranks": cli.ranks,
        "t_final": t_final,
        "dt": dt,
        "per_rank": outcomes
            .iter()
            .map(|(rank, spikes, reached)| {
                serde_json::json!({ "rank": rank, "num_spikes": spikes, "t_reached": reached })
            })
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
