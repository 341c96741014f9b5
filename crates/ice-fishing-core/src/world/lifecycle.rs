use super::metrics::StepTimings;
use super::{World, WorldError};
use crate::agent::{AgentId, AgentState, FishOutcome};
use crate::policy::{DecisionContext, PeerObservation};
use crate::spatial::Grid;
use rand::seq::SliceRandom;
use std::time::Instant;
use tracing::{debug, trace};

impl World {
    /// Advance one tick. Panics on an internal inconsistency; see `try_step`.
    pub fn step(&mut self) -> StepTimings {
        self.try_step().unwrap_or_else(|e| panic!("{e}"))
    }

    /// Advance one tick: every fisher is activated exactly once, in an order
    /// reshuffled each tick, and each activation sees the effects of those
    /// before it.
    pub fn try_step(&mut self) -> Result<StepTimings, WorldError> {
        let total_start = Instant::now();
        self.step_index = self.step_index.saturating_add(1);
        self.catches_last_step = 0;
        self.decisions_last_step = 0;

        let mut order = std::mem::take(&mut self.activation_order);
        order.clear();
        order.extend(self.agents.keys());
        order.shuffle(&mut self.rng);

        let mut timings = StepTimings::default();
        let result = order
            .iter()
            .try_for_each(|&id| self.activate(id, &mut timings));
        self.activation_order = order;
        result?;

        timings.total_us = total_start.elapsed().as_micros() as u64;
        Ok(timings)
    }

    fn activate(&mut self, id: AgentId, timings: &mut StepTimings) -> Result<(), WorldError> {
        let complete = self
            .agents
            .get(id)
            .ok_or(WorldError::MissingAgent(id))?
            .action_complete(self.config.max_fishing_time);
        if complete {
            let t0 = Instant::now();
            self.redecide(id)?;
            timings.decision_us += t0.elapsed().as_micros() as u64;
        }
        let t1 = Instant::now();
        self.execute(id)?;
        timings.action_us += t1.elapsed().as_micros() as u64;
        Ok(())
    }

    /// Peers of `id` within the sensing radius, ordered by id.
    pub(crate) fn sense_peers(&self, id: AgentId) -> Result<Vec<PeerObservation>, WorldError> {
        let agent = self.agents.get(id).ok_or(WorldError::MissingAgent(id))?;
        self.occupancy
            .within(agent.position(), self.config.sensing_radius)
            .into_iter()
            .filter(|loc| loc.data != id)
            .map(|loc| {
                let peer = self
                    .agents
                    .get(loc.data)
                    .ok_or(WorldError::MissingAgent(loc.data))?;
                Ok(PeerObservation {
                    id: loc.data,
                    position: peer.position(),
                    state: peer.state(),
                    attempts: peer.history().len(),
                    recent_successes: peer.history().successes(),
                    catch_rate: peer.history().rate(),
                })
            })
            .collect()
    }

    /// Fold fresh observations into the fisher's catch memory and rebuild its
    /// social and catch layers, then fuse with the policy's strategy.
    pub(crate) fn refresh_belief(
        &mut self,
        id: AgentId,
        peers: &[PeerObservation],
    ) -> Result<(), WorldError> {
        let config = &self.config;
        let agent = self.agents.get_mut(id).ok_or(WorldError::MissingAgent(id))?;

        if agent.state == AgentState::Fishing && !agent.history.is_empty() {
            let rate = agent.history.rate();
            agent.record_observation(agent.position, rate);
        }
        let mut fishing_peers = Vec::new();
        for peer in peers.iter().filter(|p| p.state == AgentState::Fishing) {
            fishing_peers.push(peer.position);
            if peer.attempts > 0 {
                agent.record_observation(peer.position, peer.catch_rate);
            }
        }

        agent
            .belief
            .update_social(&fishing_peers, config.social_radius, config.social_weight)?;
        let (cells, rates) = agent.observations();
        agent
            .belief
            .update_catch(&cells, &rates, config.catch_radius)?;
        let strategy = agent.policy.fusion(config);
        agent.belief.fuse(strategy);
        Ok(())
    }

    pub(crate) fn redecide(&mut self, id: AgentId) -> Result<(), WorldError> {
        let peers = self.sense_peers(id)?;
        self.refresh_belief(id, &peers)?;

        let agent = self.agents.get(id).ok_or(WorldError::MissingAgent(id))?;
        let ctx = DecisionContext {
            grid: self.grid,
            position: agent.position,
            state: agent.state,
            catch_rate: agent.history.rate(),
            peers: &peers,
            belief: &agent.belief,
            far_radius: self.config.far_radius,
            near_radius: self.config.near_radius,
        };
        let decision = agent.policy.choose_next(&ctx, &mut self.rng)?;

        let agent = self
            .agents
            .get_mut(id)
            .ok_or(WorldError::MissingAgent(id))?;
        debug!(
            agent = ?id,
            from = ?agent.state,
            to = ?decision.state,
            destination = ?decision.destination,
            catch_rate = agent.history.rate(),
            "re-decision"
        );
        agent.apply_decision(decision);
        self.decisions_last_step += 1;
        Ok(())
    }

    fn execute(&mut self, id: AgentId) -> Result<(), WorldError> {
        let agent = self
            .agents
            .get_mut(id)
            .ok_or(WorldError::MissingAgent(id))?;
        match agent.state {
            // Initial always re-decides first, so there is nothing to execute.
            AgentState::Initial => {}
            AgentState::Moving => {
                if let Some(destination) = agent.destination {
                    let from = agent.position;
                    let to = Grid::step_toward(from, destination);
                    self.grid.check(to)?;
                    agent.position = to;
                    if !self.occupancy.relocate(id, from, to) {
                        return Err(WorldError::OccupancyDesync(id));
                    }
                }
            }
            AgentState::Fishing => {
                let outcome =
                    agent.fish(&mut self.resource_field, &self.catch_model, &mut self.rng)?;
                if outcome == FishOutcome::Catch {
                    self.catches_last_step += 1;
                    trace!(
                        agent = ?id,
                        cell = ?agent.position,
                        total = agent.total_catch,
                        "catch"
                    );
                }
            }
        }
        Ok(())
    }
}
