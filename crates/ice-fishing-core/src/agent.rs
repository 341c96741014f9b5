use crate::belief::BeliefModel;
use crate::catch::CatchHistory;
use crate::policy::{Decision, DecisionPolicy};
use crate::resource::ResourceField;
use crate::spatial::{Cell, FieldError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::collections::BTreeMap;

new_key_type! {
    /// Stable handle for fishers in the world arena.
    pub struct AgentId;
}

/// Finite action state of a fisher. The machine cycles indefinitely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// No action taken yet.
    #[default]
    Initial,
    Moving,
    Fishing,
}

/// Result of one tick spent fishing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FishOutcome {
    /// First tick of a bout: drilling the hole, no attempt made.
    Setup,
    Catch,
    Miss,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CatchModel {
    /// Abundance at which the catch probability reaches `max_probability`.
    pub threshold: f64,
    pub max_probability: f64,
}

impl CatchModel {
    /// Saturating catch probability for a cell holding `abundance` units.
    pub fn probability(&self, abundance: u32) -> f64 {
        (abundance as f64 / self.threshold).min(self.max_probability)
    }
}

#[derive(Clone, Debug)]
pub struct Fisher {
    pub(crate) id: AgentId,
    pub(crate) position: Cell,
    pub(crate) state: AgentState,
    pub(crate) destination: Option<Cell>,
    pub(crate) fishing_time: u32,
    pub(crate) total_catch: u64,
    pub(crate) history: CatchHistory,
    pub(crate) belief: BeliefModel,
    pub(crate) policy: DecisionPolicy,
    /// Last catch rate observed at each cell, own bouts and peers alike.
    pub(crate) observed_rates: BTreeMap<Cell, f64>,
}

impl Fisher {
    pub fn new(
        id: AgentId,
        position: Cell,
        policy: DecisionPolicy,
        belief: BeliefModel,
        window: usize,
    ) -> Self {
        Self {
            id,
            position,
            state: AgentState::Initial,
            destination: None,
            fishing_time: 0,
            total_catch: 0,
            history: CatchHistory::new(window),
            belief,
            policy,
            observed_rates: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn position(&self) -> Cell {
        self.position
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn destination(&self) -> Option<Cell> {
        self.destination
    }

    pub fn fishing_time(&self) -> u32 {
        self.fishing_time
    }

    pub fn total_catch(&self) -> u64 {
        self.total_catch
    }

    pub fn history(&self) -> &CatchHistory {
        &self.history
    }

    pub fn belief(&self) -> &BeliefModel {
        &self.belief
    }

    pub fn policy(&self) -> DecisionPolicy {
        self.policy
    }

    pub fn observed_rates(&self) -> &BTreeMap<Cell, f64> {
        &self.observed_rates
    }

    /// Whether the current action has run its course and a re-decision is due.
    pub fn action_complete(&self, max_fishing_time: u32) -> bool {
        match self.state {
            AgentState::Initial => true,
            AgentState::Fishing => self.fishing_time >= max_fishing_time,
            AgentState::Moving => match self.destination {
                None => true,
                Some(dest) => dest == self.position,
            },
        }
    }

    pub(crate) fn record_observation(&mut self, cell: Cell, rate: f64) {
        self.observed_rates.insert(cell, rate);
    }

    pub(crate) fn observations(&self) -> (Vec<Cell>, Vec<f64>) {
        self.observed_rates.iter().map(|(c, r)| (*c, *r)).unzip()
    }

    /// Adopt a new decision and start a fresh bout.
    pub(crate) fn apply_decision(&mut self, decision: Decision) {
        self.state = decision.state;
        self.destination = decision.destination;
        self.history.clear();
        self.fishing_time = 0;
    }

    /// One fishing tick at the current position.
    ///
    /// The first tick of a bout only sets up; later ticks draw against the
    /// saturating catch probability and deplete the cell on success.
    pub(crate) fn fish<R: Rng + ?Sized>(
        &mut self,
        resource: &mut ResourceField,
        model: &CatchModel,
        rng: &mut R,
    ) -> Result<FishOutcome, FieldError> {
        let abundance = resource.abundance_at(self.position)?;
        self.fishing_time += 1;
        if self.fishing_time == 1 {
            return Ok(FishOutcome::Setup);
        }
        if rng.random::<f64>() < model.probability(abundance) {
            resource.deplete(self.position)?;
            self.total_catch += 1;
            self.history.record(true);
            Ok(FishOutcome::Catch)
        } else {
            self.history.record(false);
            Ok(FishOutcome::Miss)
        }
    }
}
