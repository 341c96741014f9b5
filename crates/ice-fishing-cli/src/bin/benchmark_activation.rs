use ice_fishing_core::config::{PolicyKind, SimConfig};
use ice_fishing_core::world::World;
use std::time::Instant;

fn main() {
    let num_agents = 200;
    let policies = [
        PolicyKind::Random,
        PolicyKind::Imitator,
        PolicyKind::GreedyBayes,
        PolicyKind::BeliefSoftmax,
    ];
    let steps = 200;

    for policy in policies {
        println!("Benchmarking {:?} with {} agents on a 100x100 lake", policy, num_agents);
        let config = SimConfig {
            num_agents,
            policy,
            seed: 42,
            ..SimConfig::default()
        };
        let mut world1 = World::new(config.clone());
        let mut world2 = World::new(config);

        // Run WITHOUT metrics
        let start = Instant::now();
        let mut decision_us = 0;
        let mut action_us = 0;
        for _ in 0..steps {
            let timings = world1.step();
            decision_us += timings.decision_us;
            action_us += timings.action_us;
        }
        let duration_no_metrics = start.elapsed();
        println!("  Time for {} steps WITHOUT metrics: {:?}", steps, duration_no_metrics);
        println!("  Avg time per step (no metrics): {:?}", duration_no_metrics / steps as u32);
        println!(
            "  Decision {:.1} us/step, action {:.1} us/step",
            decision_us as f64 / steps as f64,
            action_us as f64 / steps as f64
        );

        // Run WITH metrics (every step)
        let start = Instant::now();
        world2.run_experiment(steps, 1);
        let duration_metrics = start.elapsed();
        println!("  Time for {} steps WITH metrics: {:?}", steps, duration_metrics);

        let diff = duration_metrics.saturating_sub(duration_no_metrics);
        println!("  Avg metrics overhead per step: {:?}", diff / steps as u32);
    }
}
