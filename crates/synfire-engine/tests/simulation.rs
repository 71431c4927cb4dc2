// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end driver tests: epoch advancement, delivery timing, determinism,
//! callbacks, and the reset contract.

use std::sync::{Arc, Mutex};

use synfire_engine::{
    BinningPolicy, CellDescription, CellSite, Collective, Connection, CoreError,
    DomainDecomposition, EngineConfig, EventGenerator, ExecutionContext, RuntimeConfig, Schedule,
    Simulation, Spike, SynapticEvent, VecRecipe,
};

fn site(gid: u32, index: u32) -> CellSite {
    CellSite::new(gid, index)
}

fn test_context() -> ExecutionContext {
    ExecutionContext::local(&RuntimeConfig {
        threads: 2,
        seed: 0,
    })
    .unwrap()
}

/// The 4-cell / 8-connection network of the exchange tests, with cell 0
/// firing once at t = 5.
fn ring_recipe() -> VecRecipe {
    let mut recipe = VecRecipe::new(4).with_connections(vec![
        Connection::new(site(0, 0), site(1, 0), 1.0, 60.0),
        Connection::new(site(0, 0), site(1, 1), 2.0, 10.0),
        Connection::new(site(0, 0), site(2, 2), 3.0, 22.0),
        Connection::new(site(0, 0), site(3, 3), 4.0, 16.0),
        Connection::new(site(1, 0), site(0, 0), 5.0, 30.0),
        Connection::new(site(1, 0), site(3, 1), 6.0, 14.0),
        Connection::new(site(2, 0), site(1, 0), 7.0, 12.0),
        Connection::new(site(2, 0), site(3, 1), 8.0, 20.0),
    ]);
    recipe.set_description(0, CellDescription::SpikeSource(Schedule::explicit(vec![5.0])));
    recipe
}

#[test]
fn spikes_fan_out_and_arrive_at_their_delivery_times() {
    let ctx = test_context();
    let mut sim = Simulation::new(&ring_recipe(), DomainDecomposition::single_rank(4), &ctx)
        .unwrap();
    assert_eq!(sim.min_delay(), 10.0);

    let reached = sim.run(70.0, 5.0).unwrap();
    assert_eq!(reached, 70.0);
    assert_eq!(sim.num_spikes(), 1);

    // every group saw exactly the events its cells are wired for
    assert!(sim.group(0).delivered().is_empty());
    assert_eq!(
        sim.group(1).delivered(),
        &[
            SynapticEvent::new(site(1, 1), 15.0, 2.0),
            SynapticEvent::new(site(1, 0), 65.0, 1.0),
        ]
    );
    assert_eq!(
        sim.group(2).delivered(),
        &[SynapticEvent::new(site(2, 2), 27.0, 3.0)]
    );
    assert_eq!(
        sim.group(3).delivered(),
        &[SynapticEvent::new(site(3, 3), 21.0, 4.0)]
    );
}

#[test]
fn events_are_delivered_in_the_epoch_covering_their_time_never_earlier() {
    // spike at t = 3 over a delay-7 connection: the event at t = 10 must not
    // reach the target in any epoch ending at or before 10
    let mut recipe = VecRecipe::new(2).with_connections(vec![Connection::new(
        site(0, 0),
        site(1, 0),
        1.0,
        7.0,
    )]);
    recipe.set_description(0, CellDescription::SpikeSource(Schedule::explicit(vec![3.0])));

    let ctx = test_context();
    let mut sim =
        Simulation::new(&recipe, DomainDecomposition::single_rank(2), &ctx).unwrap();
    assert_eq!(sim.min_delay(), 7.0);

    sim.run(9.0, 5.0).unwrap();
    assert_eq!(sim.num_spikes(), 1);
    assert!(
        sim.group(1).delivered().is_empty(),
        "event at t=10 must not be delivered by t=9"
    );

    sim.run(12.0, 5.0).unwrap();
    assert_eq!(
        sim.group(1).delivered(),
        &[SynapticEvent::new(site(1, 0), 10.0, 1.0)]
    );
}

#[test]
fn identical_runs_are_byte_identical() {
    let build = || {
        let mut recipe = ring_recipe();
        for gid in 0..4 {
            recipe.set_description(
                gid,
                CellDescription::SpikeSource(
                    Schedule::poisson(0.0, 40.0, 50.0, 100 + gid as u64).unwrap(),
                ),
            );
        }
        recipe
    };

    let observe = |recipe: &VecRecipe| {
        let ctx = test_context();
        let mut sim =
            Simulation::new(recipe, DomainDecomposition::single_rank(4), &ctx).unwrap();
        let stream: Arc<Mutex<Vec<Spike>>> = Arc::default();
        let sink = Arc::clone(&stream);
        sim.set_global_spike_callback(move |spikes| {
            sink.lock().unwrap().extend_from_slice(spikes);
        });
        sim.run(50.0, 1.0).unwrap();
        let delivered: Vec<Vec<SynapticEvent>> = (0..sim.num_local_groups())
            .map(|i| sim.group(i).delivered().to_vec())
            .collect();
        let spikes = stream.lock().unwrap().clone();
        (spikes, delivered, sim.num_spikes())
    };

    let a = observe(&build());
    let b = observe(&build());
    assert_eq!(a.0, b.0, "global spike streams must be identical");
    assert_eq!(a.1, b.1, "delivered events must be identical");
    assert_eq!(a.2, b.2, "spike counts must be identical");
    assert!(a.2 > 0, "poisson sources at 40 Hz should have fired");
}

#[test]
fn reset_returns_to_the_constructed_state() {
    let ctx = test_context();
    let mut sim = Simulation::new(&ring_recipe(), DomainDecomposition::single_rank(4), &ctx)
        .unwrap();

    sim.run(70.0, 5.0).unwrap();
    let first: Vec<_> = sim.group(1).delivered().to_vec();
    assert_eq!(sim.num_spikes(), 1);

    sim.reset();
    assert_eq!(sim.num_spikes(), 0);
    assert_eq!(sim.time(), 0.0);
    assert_eq!(sim.min_delay(), 10.0);
    for i in 0..sim.num_local_groups() {
        assert!(sim.group(i).delivered().is_empty());
    }

    // a replay after reset reproduces the first run
    sim.run(70.0, 5.0).unwrap();
    assert_eq!(sim.group(1).delivered(), first.as_slice());
    assert_eq!(sim.num_spikes(), 1);
}

#[test]
fn injected_events_reach_their_targets() {
    let recipe = VecRecipe::new(2);
    let ctx = test_context();
    let mut sim =
        Simulation::new(&recipe, DomainDecomposition::single_rank(2), &ctx).unwrap();

    sim.inject_events(&[SynapticEvent::new(site(1, 0), 0.5, 2.0)])
        .unwrap();
    sim.run(2.0, 1.0).unwrap();
    assert_eq!(
        sim.group(1).delivered(),
        &[SynapticEvent::new(site(1, 0), 0.5, 2.0)]
    );

    // injection is only legal before the first run
    let err = sim
        .inject_events(&[SynapticEvent::new(site(1, 0), 5.0, 1.0)])
        .unwrap_err();
    assert!(matches!(err, CoreError::Precondition { .. }));
}

#[test]
fn event_generators_pre_seed_their_targets() {
    let mut recipe = VecRecipe::new(1);
    recipe.add_generator(
        0,
        EventGenerator::new(
            site(0, 1),
            0.75,
            Schedule::regular(0.0, 1.0, 3.0).unwrap(),
        ),
    );
    let ctx = test_context();
    let mut sim =
        Simulation::new(&recipe, DomainDecomposition::single_rank(1), &ctx).unwrap();
    sim.run(5.0, 1.0).unwrap();
    assert_eq!(
        sim.group(0).delivered(),
        &[
            SynapticEvent::new(site(0, 1), 0.0, 0.75),
            SynapticEvent::new(site(0, 1), 1.0, 0.75),
            SynapticEvent::new(site(0, 1), 2.0, 0.75),
        ]
    );
}

#[test]
fn external_spikes_join_the_exchange() {
    let recipe = VecRecipe::new(2).with_connections(vec![Connection::new(
        site(0, 0),
        site(1, 0),
        1.5,
        2.0,
    )]);
    let ctx = test_context();
    let mut sim =
        Simulation::new(&recipe, DomainDecomposition::single_rank(2), &ctx).unwrap();

    sim.set_external_spike_callback(|t_from| {
        if t_from == 0.0 {
            Ok(vec![Spike::new(CellSite::new(0, 0), 0.25)])
        } else {
            Ok(Vec::new())
        }
    });
    sim.run(5.0, 1.0).unwrap();
    assert_eq!(sim.num_spikes(), 1);
    assert_eq!(
        sim.group(1).delivered(),
        &[SynapticEvent::new(site(1, 0), 2.25, 1.5)]
    );
}

#[test]
fn a_failing_external_callback_poisons_the_run_until_reset() {
    let recipe = ring_recipe();
    let ctx = test_context();
    let mut sim =
        Simulation::new(&recipe, DomainDecomposition::single_rank(4), &ctx).unwrap();
    sim.set_external_spike_callback(|_| Err("foreign simulator went away".to_string()));

    let err = sim.run(10.0, 1.0).unwrap_err();
    assert!(matches!(err, CoreError::Callback { .. }));

    // without a reset, run refuses to continue
    let err = sim.run(10.0, 1.0).unwrap_err();
    assert!(matches!(err, CoreError::Precondition { .. }));

    // reset clears the poisoned state; the callback itself still fails
    sim.reset();
    let err = sim.run(10.0, 1.0).unwrap_err();
    assert!(matches!(err, CoreError::Callback { .. }));
}

/// Transport that reduces fine at construction but drops every gather.
struct FlakyTransport;

impl Collective for FlakyTransport {
    fn rank(&self) -> usize {
        0
    }

    fn num_ranks(&self) -> usize {
        1
    }

    fn gather_spikes(&self, _local: &[Spike]) -> synfire_engine::Result<Vec<Spike>> {
        Err(CoreError::Transport {
            rank: 0,
            what: "interconnect went away".to_string(),
        })
    }

    fn min_reduce(&self, value: f64) -> synfire_engine::Result<f64> {
        Ok(value)
    }
}

#[test]
fn a_transport_failure_aborts_the_run_until_reset() {
    let ctx = ExecutionContext::with_collective(
        &RuntimeConfig {
            threads: 2,
            seed: 0,
        },
        Arc::new(FlakyTransport),
    )
    .unwrap();
    let mut sim = Simulation::new(&ring_recipe(), DomainDecomposition::single_rank(4), &ctx)
        .unwrap();

    // the first exchange surfaces the failure directly; no retry, no count
    let err = sim.run(10.0, 1.0).unwrap_err();
    assert!(matches!(err, CoreError::Transport { rank: 0, .. }));
    assert_eq!(sim.num_spikes(), 0);

    // terminal for the run: only reset is legal next
    let err = sim.run(10.0, 1.0).unwrap_err();
    assert!(matches!(err, CoreError::Precondition { .. }));

    sim.reset();
    let err = sim.run(10.0, 1.0).unwrap_err();
    assert!(matches!(err, CoreError::Transport { .. }));
}

#[test]
fn local_and_global_callbacks_see_each_exchange() {
    let ctx = test_context();
    let mut sim = Simulation::new(&ring_recipe(), DomainDecomposition::single_rank(4), &ctx)
        .unwrap();

    let local_total = Arc::new(Mutex::new(0usize));
    let global_total = Arc::new(Mutex::new(0usize));
    let l = Arc::clone(&local_total);
    let g = Arc::clone(&global_total);
    sim.set_local_spike_callback(move |spikes| *l.lock().unwrap() += spikes.len());
    sim.set_global_spike_callback(move |spikes| *g.lock().unwrap() += spikes.len());

    sim.run(20.0, 5.0).unwrap();
    // single rank: the local and global vectors coincide
    assert_eq!(*local_total.lock().unwrap(), 1);
    assert_eq!(*global_total.lock().unwrap(), 1);
}

#[test]
fn regular_binning_quantises_delivered_times() {
    let mut recipe = VecRecipe::new(2).with_connections(vec![Connection::new(
        site(0, 0),
        site(1, 0),
        1.0,
        1.3,
    )]);
    recipe.set_description(0, CellDescription::SpikeSource(Schedule::explicit(vec![0.3])));
    let ctx = test_context();
    let mut sim =
        Simulation::new(&recipe, DomainDecomposition::single_rank(2), &ctx).unwrap();
    sim.set_binning_policy(BinningPolicy::Regular(0.5)).unwrap();
    sim.run(5.0, 0.5).unwrap();
    // raw delivery time 0.3 + 1.3 = 1.6, quantised down to the 0.5 grid
    assert_eq!(sim.group(1).delivered().len(), 1);
    assert_eq!(sim.group(1).delivered()[0].time, 1.5);

    assert!(sim
        .set_binning_policy(BinningPolicy::Regular(0.0))
        .is_err());
}

#[test]
fn an_unconnected_network_runs_under_the_epoch_ceiling() {
    let recipe = VecRecipe::new(1);
    let ctx = test_context();
    let mut sim =
        Simulation::new(&recipe, DomainDecomposition::single_rank(1), &ctx).unwrap();
    assert_eq!(sim.min_delay(), f64::INFINITY);
    let reached = sim.run(3.0, 10.0).unwrap();
    assert_eq!(reached, 3.0);
    assert_eq!(sim.num_spikes(), 0);
}

#[test]
fn min_delay_setter_only_tightens() {
    let ctx = test_context();
    let mut sim = Simulation::new(&ring_recipe(), DomainDecomposition::single_rank(4), &ctx)
        .unwrap();
    assert_eq!(sim.clamp_min_delay(50.0), 10.0);
    assert_eq!(sim.clamp_min_delay(2.0), 2.0);
    assert_eq!(sim.min_delay(), 2.0);
}

#[test]
fn config_drives_the_epoch_loop() {
    let config = EngineConfig::from_toml_str(
        r#"
        [runtime]
        threads = 1

        [simulation]
        t_final = 30.0
        dt = 5.0
        "#,
    )
    .unwrap();
    let ctx = ExecutionContext::local(&config.runtime).unwrap();
    let mut sim = Simulation::new(&ring_recipe(), DomainDecomposition::single_rank(4), &ctx)
        .unwrap();
    sim.set_binning_policy(config.simulation.binning_policy())
        .unwrap();
    let reached = sim
        .run(config.simulation.t_final, config.simulation.dt)
        .unwrap();
    assert_eq!(reached, 30.0);
    assert_eq!(sim.num_spikes(), 1);
}
