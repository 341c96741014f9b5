use super::*;
use crate::agent::AgentState;
use crate::config::PolicyKind;
use crate::spatial::chebyshev;

fn single_fisher_config() -> SimConfig {
    SimConfig {
        width: 30,
        height: 30,
        num_agents: 1,
        seed: 7,
        ..SimConfig::default()
    }
}

/// One fisher already fishing at the centre of a lake that only has fish
/// under it, with a certain catch on every attempt.
fn fishing_world(abundance: u32) -> (World, AgentId) {
    let config = SimConfig {
        width: 21,
        height: 21,
        num_agents: 1,
        spawn: SpawnMode::Center,
        catch_threshold: 1.0,
        max_catch_probability: 1.0,
        ..SimConfig::default()
    };
    let field = ResourceField::from_cells(21, 21, &[([10, 10], abundance)]).unwrap();
    let mut world = World::with_resource_field(config, field, vec![[10, 10]]).unwrap();
    let id = world.agent_ids()[0];
    world.agents[id].state = AgentState::Fishing;
    (world, id)
}

#[test]
fn fresh_fisher_moves_then_fishes_on_arrival() {
    let mut world = World::new(single_fisher_config());
    let id = world.agent_ids()[0];
    let start = world.agent(id).unwrap().position();
    assert_eq!(world.agent(id).unwrap().state(), AgentState::Initial);

    world.step();
    let agent = world.agent(id).unwrap();
    assert_eq!(agent.state(), AgentState::Moving);
    let destination = agent.destination().unwrap();
    assert!(chebyshev(destination, start) <= 5);
    assert_ne!(destination, start);
    assert_eq!(chebyshev(agent.position(), start), 1);

    let mut guard = 0;
    while world.agent(id).unwrap().position() != destination {
        world.step();
        assert_eq!(world.agent(id).unwrap().state(), AgentState::Moving);
        guard += 1;
        assert!(guard < 5, "walk should take at most five ticks");
    }

    world.step();
    let agent = world.agent(id).unwrap();
    assert_eq!(agent.state(), AgentState::Fishing);
    assert_eq!(agent.position(), destination);
    assert_eq!(agent.fishing_time(), 1);
    assert!(agent.history().is_empty(), "setup tick makes no attempt");
    assert_eq!(world.occupants(destination), vec![id]);
}

#[test]
fn every_fisher_acts_on_the_first_tick() {
    let mut world = World::new(SimConfig {
        num_agents: 25,
        ..SimConfig::default()
    });
    world.step();
    assert!(world
        .agents()
        .all(|agent| agent.state() == AgentState::Moving));
    assert_eq!(world.decisions_last_step, 25);
}

#[test]
fn centre_spawn_stacks_fishers() {
    let world = World::new(SimConfig {
        num_agents: 4,
        spawn: SpawnMode::Center,
        ..SimConfig::default()
    });
    assert_eq!(world.occupants([50, 50]).len(), 4);
}

#[test]
fn bout_ends_after_max_fishing_time_and_high_rate_keeps_fishing() {
    let (mut world, id) = fishing_world(1_000);
    for _ in 0..10 {
        world.step();
    }
    let agent = world.agent(id).unwrap();
    assert_eq!(agent.fishing_time(), 10);
    assert_eq!(agent.total_catch(), 9);
    assert_eq!(agent.history().rate(), 1.0);

    world.step();
    let agent = world.agent(id).unwrap();
    assert_eq!(agent.state(), AgentState::Fishing);
    assert_eq!(agent.position(), [10, 10]);
    assert_eq!(agent.fishing_time(), 1, "re-decision starts a new bout");
    assert!(agent.history().is_empty());
    assert_eq!(agent.observed_rates().get(&[10, 10]), Some(&1.0));
}

#[test]
fn depletion_stops_at_zero() {
    let (mut world, id) = fishing_world(3);
    for _ in 0..9 {
        world.step();
    }
    assert_eq!(world.agent(id).unwrap().total_catch(), 3);
    assert_eq!(world.resource_field().abundance_at([10, 10]), Ok(0));
    assert_eq!(world.resource_field().total(), 0);
}

#[test]
fn catches_are_drawn_from_the_shared_resource() {
    let mut world = World::new(SimConfig {
        num_agents: 12,
        catch_threshold: 2.0,
        ..SimConfig::default()
    });
    let initial = world.resource_field().total();
    let summary = world.run_experiment(300, 50);
    assert_eq!(
        initial - summary.resource_remaining,
        summary.final_total_catch
    );
    assert_eq!(
        summary.agent_catches.iter().sum::<u64>(),
        summary.final_total_catch
    );
}

#[test]
fn same_seed_reproduces_the_run() {
    let config = SimConfig {
        num_agents: 8,
        policy: PolicyKind::GreedyBayes,
        width: 40,
        height: 40,
        ..SimConfig::default()
    };
    let a = World::new(config.clone()).run_experiment(120, 20);
    let b = World::new(config).run_experiment(120, 20);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn experiment_samples_on_interval_and_final_step() {
    let mut world = World::new(single_fisher_config());
    let summary = world.run_experiment(10, 3);
    let steps: Vec<usize> = summary.samples.iter().map(|s| s.step).collect();
    assert_eq!(steps, vec![3, 6, 9, 10]);
    assert_eq!(summary.schema_version, 1);
    assert_eq!(summary.seed, 7);
}

#[test]
fn experiment_rejects_bad_bounds() {
    let mut world = World::new(single_fisher_config());
    assert_eq!(
        world.try_run_experiment(10, 0).unwrap_err(),
        ExperimentError::InvalidSampleEvery
    );
    assert!(matches!(
        world.try_run_experiment(World::MAX_EXPERIMENT_STEPS + 1, 1),
        Err(ExperimentError::TooManySteps { .. })
    ));
    assert!(matches!(
        world.try_run_experiment(World::MAX_EXPERIMENT_SAMPLES + 1, 1),
        Err(ExperimentError::TooManySamples { .. })
    ));
}

#[test]
fn invalid_config_is_rejected() {
    let result = World::try_new(SimConfig {
        far_radius: 0,
        ..SimConfig::default()
    });
    assert!(matches!(result, Err(WorldInitError::Config(_))));
}

#[test]
fn resource_extent_must_match_config() {
    let result = World::with_resource_field(
        SimConfig::default(),
        ResourceField::new(10, 10, 1),
        Vec::new(),
    );
    assert!(matches!(
        result,
        Err(WorldInitError::ResourceExtentMismatch { .. })
    ));
}

#[test]
fn sensing_sees_only_peers_in_range() {
    let (mut world, id) = fishing_world(10);
    let near = world.spawn_fisher([13, 12], DecisionPolicy::Random).unwrap();
    world.spawn_fisher([16, 10], DecisionPolicy::Random).unwrap();
    let peers = world.sense_peers(id).unwrap();
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].id, near);
    assert_eq!(peers[0].position, [13, 12]);
}

#[test]
fn belief_refresh_records_fishing_peers() {
    let (mut world, id) = fishing_world(10);
    let peer = world.spawn_fisher([12, 10], DecisionPolicy::Random).unwrap();
    world.agents[peer].state = AgentState::Fishing;
    world.agents[peer].history.record(true);
    world.agents[peer].history.record(false);

    let peers = world.sense_peers(id).unwrap();
    world.refresh_belief(id, &peers).unwrap();
    let agent = world.agent(id).unwrap();
    assert_eq!(agent.observed_rates().get(&[12, 10]), Some(&0.5));
    assert!(agent.belief().social().get([12, 10]).unwrap() > 0.0);
    assert!((agent.belief().belief().sum() - 1.0).abs() < 1e-9);
}

#[test]
fn imitator_walks_toward_successful_peer() {
    let (mut world, id) = fishing_world(0);
    world.agents[id].policy = DecisionPolicy::Imitator;
    world.agents[id].fishing_time = world.config.max_fishing_time;
    let peer = world.spawn_fisher([13, 10], DecisionPolicy::Random).unwrap();
    world.agents[peer].state = AgentState::Fishing;
    world.agents[peer].fishing_time = 1;
    for _ in 0..5 {
        world.agents[peer].history.record(true);
    }

    world.redecide(id).unwrap();
    let agent = world.agent(id).unwrap();
    assert_eq!(agent.state(), AgentState::Moving);
    assert_eq!(agent.destination(), Some([13, 10]));
}

#[test]
fn radii_larger_than_the_lake_stay_in_bounds() {
    let mut world = World::new(SimConfig {
        width: 20,
        height: 20,
        num_agents: 4,
        far_radius: 30_000,
        sensing_radius: 30_000,
        social_radius: 30_000,
        ..SimConfig::default()
    });
    let grid = world.grid();
    for _ in 0..20 {
        world.step();
        for agent in world.agents() {
            assert!(grid.contains(agent.position()));
            if let Some(destination) = agent.destination() {
                assert!(grid.contains(destination));
            }
        }
    }
}

#[test]
fn social_layer_never_exceeds_unit_weight() {
    let mut world = World::new(SimConfig {
        width: 20,
        height: 20,
        num_agents: 6,
        spawn: SpawnMode::Center,
        social_weight: 1.0,
        ..SimConfig::default()
    });
    for _ in 0..30 {
        world.step();
        for agent in world.agents() {
            assert!(agent.belief().social().max_value() <= 1.0);
        }
    }
}

#[test]
fn replicates_match_individual_runs() {
    let config = SimConfig {
        num_agents: 3,
        width: 40,
        height: 40,
        ..SimConfig::default()
    };
    let summaries = run_replicates(&config, &[1, 2, 3], 60, 20).unwrap();
    assert_eq!(summaries.len(), 3);
    let direct = World::new(SimConfig {
        seed: 2,
        ..config
    })
    .run_experiment(60, 20);
    assert_eq!(summaries[1].seed, 2);
    assert_eq!(summaries[1].agent_catches, direct.agent_catches);
    assert_eq!(summaries[1].resource_remaining, direct.resource_remaining);
}
