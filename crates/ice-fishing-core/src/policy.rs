use crate::agent::{AgentId, AgentState};
use crate::belief::{BeliefModel, FusionStrategy};
use crate::config::{PolicyKind, SimConfig};
use crate::spatial::{chebyshev, Cell, FieldError, Grid};
use rand::seq::IndexedRandom;
use rand::Rng;

/// Below this windowed catch rate a fisher relocates far.
pub const LOW_RATE: f64 = 1.0 / 3.0;
/// At or above this rate a fisher keeps fishing in place.
pub const HIGH_RATE: f64 = 2.0 / 3.0;

/// Next action chosen at a re-decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub state: AgentState,
    pub destination: Option<Cell>,
}

impl Decision {
    pub fn fish_here() -> Self {
        Self {
            state: AgentState::Fishing,
            destination: None,
        }
    }

    pub fn move_to(destination: Cell) -> Self {
        Self {
            state: AgentState::Moving,
            destination: Some(destination),
        }
    }

    /// Fish in place if `target` is the current cell, otherwise walk there.
    fn toward(target: Cell, position: Cell) -> Self {
        if target == position {
            Self::fish_here()
        } else {
            Self::move_to(target)
        }
    }
}

/// What a fisher can see of a peer inside its sensing range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeerObservation {
    pub id: AgentId,
    pub position: Cell,
    pub state: AgentState,
    /// Attempts in the peer's current window.
    pub attempts: usize,
    /// Summed successes in the peer's current window.
    pub recent_successes: usize,
    pub catch_rate: f64,
}

/// Everything a policy reads at a re-decision. The belief has already been
/// refreshed by the caller.
#[derive(Clone, Copy, Debug)]
pub struct DecisionContext<'a> {
    pub grid: Grid,
    pub position: Cell,
    pub state: AgentState,
    pub catch_rate: f64,
    /// Peers within sensing range, ordered by id.
    pub peers: &'a [PeerObservation],
    pub belief: &'a BeliefModel,
    pub far_radius: i32,
    pub near_radius: i32,
}

/// Closed set of decision strategies, fixed per fisher at construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DecisionPolicy {
    /// Threshold rule with uniformly random destinations.
    Random,
    /// Threshold rule that walks to the most successful neighbor when one exists.
    Imitator,
    /// Argmax of the Bayes-fused belief, with probability `exploration` of a far random move.
    GreedyBayes { exploration: f64 },
    /// Argmax of the softmax-fused belief; fishes in place when the argmax is
    /// the current cell. Ties resolve to the first maximum in row-major order,
    /// so fishers sharing a belief that is flat across a disk all head for the
    /// same cell.
    BeliefSoftmax,
}

impl DecisionPolicy {
    pub fn from_config(config: &SimConfig) -> Self {
        match config.policy {
            PolicyKind::Random => DecisionPolicy::Random,
            PolicyKind::Imitator => DecisionPolicy::Imitator,
            PolicyKind::GreedyBayes => DecisionPolicy::GreedyBayes {
                exploration: config.exploration_probability,
            },
            PolicyKind::BeliefSoftmax => DecisionPolicy::BeliefSoftmax,
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            DecisionPolicy::Random => PolicyKind::Random,
            DecisionPolicy::Imitator => PolicyKind::Imitator,
            DecisionPolicy::GreedyBayes { .. } => PolicyKind::GreedyBayes,
            DecisionPolicy::BeliefSoftmax => PolicyKind::BeliefSoftmax,
        }
    }

    /// Fusion applied when this policy's fisher refreshes its belief.
    pub fn fusion(&self, config: &SimConfig) -> FusionStrategy {
        match self {
            DecisionPolicy::GreedyBayes { .. } => config.bayes_fusion(),
            DecisionPolicy::BeliefSoftmax => config.softmax_fusion(),
            DecisionPolicy::Random | DecisionPolicy::Imitator => config.default_fusion_strategy(),
        }
    }

    pub fn choose_next<R: Rng + ?Sized>(
        &self,
        ctx: &DecisionContext<'_>,
        rng: &mut R,
    ) -> Result<Decision, FieldError> {
        match ctx.state {
            AgentState::Initial => {
                random_destination(ctx, ctx.far_radius, rng).map(Decision::move_to)
            }
            AgentState::Moving => Ok(Decision::fish_here()),
            AgentState::Fishing => match *self {
                DecisionPolicy::Random => threshold_rule(ctx, |radius| {
                    random_destination(ctx, radius, rng).map(Decision::move_to)
                }),
                DecisionPolicy::Imitator => threshold_rule(ctx, |radius| {
                    match best_neighbor(ctx, radius) {
                        Some(target) => Ok(Decision::move_to(target)),
                        None => random_destination(ctx, radius, rng).map(Decision::move_to),
                    }
                }),
                DecisionPolicy::GreedyBayes { exploration } => {
                    if rng.random::<f64>() < exploration {
                        return random_destination(ctx, ctx.far_radius, rng).map(Decision::move_to);
                    }
                    let maxima = ctx.belief.belief().maxima();
                    match maxima.choose(rng) {
                        Some(&target) => Ok(Decision::toward(target, ctx.position)),
                        None => random_destination(ctx, ctx.far_radius, rng).map(Decision::move_to),
                    }
                }
                DecisionPolicy::BeliefSoftmax => match ctx.belief.belief().argmax() {
                    Some(target) => Ok(Decision::toward(target, ctx.position)),
                    None => Ok(Decision::fish_here()),
                },
            },
        }
    }
}

/// Coarse explore/exploit split on the windowed catch rate; `relocate` picks
/// the destination for the given search radius.
fn threshold_rule(
    ctx: &DecisionContext<'_>,
    relocate: impl FnOnce(i32) -> Result<Decision, FieldError>,
) -> Result<Decision, FieldError> {
    if ctx.catch_rate < LOW_RATE {
        relocate(ctx.far_radius)
    } else if ctx.catch_rate < HIGH_RATE {
        relocate(ctx.near_radius)
    } else {
        Ok(Decision::fish_here())
    }
}

/// Uniform cell within Chebyshev `radius` of the fisher, excluding its own cell.
/// A grid with no other cell in range leaves the fisher where it is.
pub fn random_destination<R: Rng + ?Sized>(
    ctx: &DecisionContext<'_>,
    radius: i32,
    rng: &mut R,
) -> Result<Cell, FieldError> {
    let cells = ctx.grid.neighborhood(ctx.position, radius, false)?;
    Ok(cells.choose(rng).copied().unwrap_or(ctx.position))
}

/// Position of the peer within `radius` with the most recent successes; the
/// first one encountered wins ties. None if no peer has caught anything.
fn best_neighbor(ctx: &DecisionContext<'_>, radius: i32) -> Option<Cell> {
    let mut best: Option<&PeerObservation> = None;
    for peer in ctx.peers {
        if chebyshev(peer.position, ctx.position) > radius || peer.recent_successes == 0 {
            continue;
        }
        if best.map_or(true, |b| peer.recent_successes > b.recent_successes) {
            best = Some(peer);
        }
    }
    best.map(|peer| peer.position)
}
