use super::World;
use crate::agent::AgentState;
use crate::config::PolicyKind;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default)]
pub struct StepTimings {
    /// Belief refresh plus policy evaluation, summed over re-deciding fishers.
    pub decision_us: u64,
    pub action_us: u64,
    pub total_us: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StepMetrics {
    pub step: usize,
    pub total_catch: u64,
    pub catches: u64,
    pub decisions: usize,
    pub fishing_agents: usize,
    pub moving_agents: usize,
    /// Mean windowed catch rate over fishers with a non-empty history.
    pub mean_catch_rate: f64,
    pub mean_catch_ratio: f64,
    pub resource_remaining: u64,
    pub depleted_cells: usize,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub policy: PolicyKind,
    pub steps: usize,
    pub sample_every: usize,
    pub samples: Vec<StepMetrics>,
    /// Cumulative catch per fisher, in id order.
    #[serde(default)]
    pub agent_catches: Vec<u64>,
    pub final_total_catch: u64,
    #[serde(default)]
    pub resource_remaining: u64,
}

impl World {
    pub(crate) fn collect_step_metrics(&self, step: usize) -> StepMetrics {
        let mut fishing_agents = 0;
        let mut moving_agents = 0;
        let mut rate_sum = 0.0;
        let mut rated = 0usize;
        let mut ratio_sum = 0.0;
        for agent in self.agents.values() {
            match agent.state() {
                AgentState::Fishing => fishing_agents += 1,
                AgentState::Moving => moving_agents += 1,
                AgentState::Initial => {}
            }
            if !agent.history().is_empty() {
                rate_sum += agent.history().rate();
                rated += 1;
            }
            ratio_sum += agent.history().mean_ratio();
        }
        let n = self.agents.len();
        StepMetrics {
            step,
            total_catch: self.total_catch(),
            catches: self.catches_last_step,
            decisions: self.decisions_last_step,
            fishing_agents,
            moving_agents,
            mean_catch_rate: if rated > 0 {
                rate_sum / rated as f64
            } else {
                0.0
            },
            mean_catch_ratio: if n > 0 { ratio_sum / n as f64 } else { 0.0 },
            resource_remaining: self.resource_field.total(),
            depleted_cells: self.resource_field.depleted_cells(),
        }
    }
}
