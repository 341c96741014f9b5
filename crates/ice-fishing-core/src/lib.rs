//! Agent-based simulation of ice fishers foraging a depletable, spatially
//! clustered resource on a discrete lake grid.

pub mod agent;
pub mod belief;
pub mod catch;
pub mod config;
pub mod policy;
pub mod resource;
pub mod spatial;
pub mod world;

pub use agent::{AgentId, AgentState, Fisher};
pub use belief::{BeliefField, BeliefModel, FusionStrategy};
pub use config::{PolicyKind, SimConfig};
pub use policy::DecisionPolicy;
pub use world::{run_replicates, RunSummary, World};
