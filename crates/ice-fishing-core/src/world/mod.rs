pub mod lifecycle;
pub mod metrics;
#[cfg(test)]
mod tests;

pub use metrics::*;

use crate::agent::{AgentId, CatchModel, Fisher};
use crate::belief::BeliefModel;
use crate::config::{SimConfig, SimConfigError, SpawnMode};
use crate::policy::DecisionPolicy;
use crate::resource::{ResourceField, ResourceGenerationError};
use crate::spatial::{AgentLocation, Cell, FieldError, Grid, OccupancyIndex};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rayon::prelude::*;
use slotmap::SlotMap;
use thiserror::Error;
use tracing::info;

/// The frozen lake: grid, shared resource, fishers and the single seeded RNG
/// that drives every stochastic choice.
pub struct World {
    pub(crate) agents: SlotMap<AgentId, Fisher>,
    pub(crate) occupancy: OccupancyIndex,
    pub(crate) grid: Grid,
    pub(crate) resource_field: ResourceField,
    pub(crate) cluster_centers: Vec<Cell>,
    pub(crate) config: SimConfig,
    pub(crate) catch_model: CatchModel,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) step_index: usize,
    pub(crate) catches_last_step: u64,
    pub(crate) decisions_last_step: usize,
    /// Reused buffer for the per-tick activation order.
    pub(crate) activation_order: Vec<AgentId>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldInitError {
    #[error(transparent)]
    Config(#[from] SimConfigError),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("resource generation failed: {0}")]
    ResourceGeneration(#[from] ResourceGenerationError),
    #[error("resource field is {actual:?} but config expects {expected:?}")]
    ResourceExtentMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("agent {0:?} is not in the world")]
    MissingAgent(AgentId),
    #[error("occupancy index lost track of agent {0:?}")]
    OccupancyDesync(AgentId),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExperimentError {
    #[error("sample_every must be positive")]
    InvalidSampleEvery,
    #[error("steps ({actual}) exceed supported maximum ({max})")]
    TooManySteps { max: usize, actual: usize },
    #[error("sample count ({actual}) exceeds supported maximum ({max})")]
    TooManySamples { max: usize, actual: usize },
    #[error("world construction failed: {0}")]
    Init(#[from] WorldInitError),
    #[error("step failed: {0}")]
    Step(#[from] WorldError),
}

impl World {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;

    pub fn new(config: SimConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Validate `config`, generate a clustered lake and spawn `num_agents` fishers.
    pub fn try_new(config: SimConfig) -> Result<Self, WorldInitError> {
        config.validate()?;
        let mut rng = ChaCha12Rng::seed_from_u64(config.seed);
        let (resource_field, centers) = ResourceField::generate_clustered(
            config.width,
            config.height,
            &config.resource,
            &mut rng,
        )?;
        Self::assemble(config, resource_field, centers, rng)
    }

    /// Build a world over an explicit resource field. `prior_seeds` stands in
    /// for the cluster centres when `informed_prior` is set.
    pub fn with_resource_field(
        config: SimConfig,
        resource_field: ResourceField,
        prior_seeds: Vec<Cell>,
    ) -> Result<Self, WorldInitError> {
        config.validate()?;
        let actual = (resource_field.width(), resource_field.height());
        if actual != (config.width, config.height) {
            return Err(WorldInitError::ResourceExtentMismatch {
                expected: (config.width, config.height),
                actual,
            });
        }
        let grid = resource_field.grid();
        for &seed in &prior_seeds {
            grid.check(seed)?;
        }
        let rng = ChaCha12Rng::seed_from_u64(config.seed);
        Self::assemble(config, resource_field, prior_seeds, rng)
    }

    fn assemble(
        config: SimConfig,
        resource_field: ResourceField,
        cluster_centers: Vec<Cell>,
        mut rng: ChaCha12Rng,
    ) -> Result<Self, WorldInitError> {
        let grid = resource_field.grid();
        let template = Self::initial_belief(&config, &cluster_centers)?;
        let policy = DecisionPolicy::from_config(&config);

        let mut agents = SlotMap::with_capacity_and_key(config.num_agents);
        let mut locations = Vec::with_capacity(config.num_agents);
        for _ in 0..config.num_agents {
            let position = Self::spawn_position(grid, config.spawn, &mut rng);
            let id = agents.insert_with_key(|id| {
                Fisher::new(id, position, policy, template.clone(), config.window_size)
            });
            locations.push(AgentLocation::new(position, id));
        }

        let catch_model = CatchModel {
            threshold: config.catch_threshold,
            max_probability: config.max_catch_probability,
        };
        info!(
            width = config.width,
            height = config.height,
            agents = config.num_agents,
            policy = ?config.policy,
            abundance = resource_field.total(),
            "world initialised"
        );
        Ok(Self {
            agents,
            occupancy: OccupancyIndex::build(locations),
            grid,
            resource_field,
            cluster_centers,
            config,
            catch_model,
            rng,
            step_index: 0,
            catches_last_step: 0,
            decisions_last_step: 0,
            activation_order: Vec::new(),
        })
    }

    fn initial_belief(config: &SimConfig, centers: &[Cell]) -> Result<BeliefModel, FieldError> {
        if config.informed_prior && !centers.is_empty() {
            BeliefModel::with_prior(config.width, config.height, centers, config.prior_radius)
        } else {
            Ok(BeliefModel::new(config.width, config.height))
        }
    }

    fn spawn_position<R: Rng + ?Sized>(grid: Grid, mode: SpawnMode, rng: &mut R) -> Cell {
        match mode {
            SpawnMode::Center => grid.center(),
            SpawnMode::Random => [
                rng.random_range(0..grid.width as i32),
                rng.random_range(0..grid.height as i32),
            ],
        }
    }

    /// Add a fisher at `position` using `policy`. The new fisher starts in
    /// the initial state with the world's prior.
    pub fn spawn_fisher(
        &mut self,
        position: Cell,
        policy: DecisionPolicy,
    ) -> Result<AgentId, WorldInitError> {
        self.grid.check(position)?;
        let belief = Self::initial_belief(&self.config, &self.cluster_centers)?;
        let window = self.config.window_size;
        let id = self
            .agents
            .insert_with_key(|id| Fisher::new(id, position, policy, belief, window));
        self.occupancy.place(id, position);
        Ok(id)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn resource_field(&self) -> &ResourceField {
        &self.resource_field
    }

    pub fn cluster_centers(&self) -> &[Cell] {
        &self.cluster_centers
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Fishers in id order.
    pub fn agents(&self) -> impl Iterator<Item = &Fisher> + '_ {
        self.agents.values()
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.keys().collect()
    }

    pub fn agent(&self, id: AgentId) -> Option<&Fisher> {
        self.agents.get(id)
    }

    /// Agents standing on `cell`, sorted by id.
    pub fn occupants(&self, cell: Cell) -> Vec<AgentId> {
        self.occupancy.occupants(cell)
    }

    pub fn total_catch(&self) -> u64 {
        self.agents.values().map(Fisher::total_catch).sum()
    }

    pub fn run_experiment(&mut self, steps: usize, sample_every: usize) -> RunSummary {
        self.try_run_experiment(steps, sample_every)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        let estimated_samples = Self::check_experiment_bounds(steps, sample_every)?;

        info!(
            steps,
            sample_every,
            seed = self.config.seed,
            policy = ?self.config.policy,
            "experiment started"
        );
        let mut samples = Vec::with_capacity(estimated_samples);
        for step in 1..=steps {
            self.try_step()?;
            if step % sample_every == 0 || step == steps {
                samples.push(self.collect_step_metrics(step));
            }
        }
        let summary = RunSummary {
            schema_version: 1,
            seed: self.config.seed,
            policy: self.config.policy,
            steps,
            sample_every,
            samples,
            agent_catches: self.agents.values().map(Fisher::total_catch).collect(),
            final_total_catch: self.total_catch(),
            resource_remaining: self.resource_field.total(),
        };
        info!(
            total_catch = summary.final_total_catch,
            resource_remaining = summary.resource_remaining,
            "experiment finished"
        );
        Ok(summary)
    }

    fn check_experiment_bounds(steps: usize, sample_every: usize) -> Result<usize, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }
        Ok(estimated_samples)
    }
}

/// Run one independent world per seed in parallel. Summaries come back in
/// seed order; each world keeps strictly sequential activation internally.
pub fn run_replicates(
    config: &SimConfig,
    seeds: &[u64],
    steps: usize,
    sample_every: usize,
) -> Result<Vec<RunSummary>, ExperimentError> {
    World::check_experiment_bounds(steps, sample_every)?;
    seeds
        .par_iter()
        .map(|&seed| {
            let mut world = World::try_new(SimConfig {
                seed,
                ..config.clone()
            })?;
            world.try_run_experiment(steps, sample_every)
        })
        .collect()
}
