use crate::belief::{FusionStrategy, DEFAULT_BELIEF_FLOOR};
use crate::catch::DEFAULT_WINDOW;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which decision policy every fisher in the world uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    Random,
    Imitator,
    GreedyBayes,
    BeliefSoftmax,
}

/// Where fishers are placed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnMode {
    #[default]
    Random,
    Center,
}

/// Fusion used for belief inspection by policies that do not act on belief.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionKind {
    #[default]
    Bayes,
    Softmax,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub clusters: usize,
    /// Cluster standard deviation in cells.
    pub cluster_std: f64,
    /// Total units across the lake.
    pub total_abundance: u64,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            clusters: 5,
            cluster_std: 3.0,
            total_abundance: 2000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub width: usize,
    pub height: usize,
    pub num_agents: usize,
    pub seed: u64,
    pub policy: PolicyKind,
    pub spawn: SpawnMode,
    /// Attempts per fishing bout before a re-decision.
    pub max_fishing_time: u32,
    /// Abundance at which catch probability reaches its cap.
    pub catch_threshold: f64,
    pub max_catch_probability: f64,
    pub window_size: usize,
    pub far_radius: i32,
    pub near_radius: i32,
    pub sensing_radius: i32,
    pub prior_radius: i32,
    pub social_radius: i32,
    pub catch_radius: i32,
    pub social_weight: f64,
    pub belief_floor: f64,
    pub fusion_weights: [f64; 3],
    pub softmax_temperature: Option<f64>,
    pub default_fusion: FusionKind,
    pub exploration_probability: f64,
    /// Seed each prior with the generated cluster centres instead of a uniform prior.
    pub informed_prior: bool,
    pub resource: ResourceConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            num_agents: 5,
            seed: 42,
            policy: PolicyKind::Random,
            spawn: SpawnMode::Random,
            max_fishing_time: 10,
            catch_threshold: 10.0,
            max_catch_probability: 0.8,
            window_size: DEFAULT_WINDOW,
            far_radius: 5,
            near_radius: 1,
            sensing_radius: 5,
            prior_radius: 3,
            social_radius: 3,
            catch_radius: 1,
            social_weight: 1.0,
            belief_floor: DEFAULT_BELIEF_FLOOR,
            fusion_weights: [1.0 / 3.0; 3],
            softmax_temperature: None,
            default_fusion: FusionKind::Bayes,
            exploration_probability: 0.05,
            informed_prior: true,
            resource: ResourceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimConfigError {
    #[error("grid extent must be positive and at most {max} cells per side, got {width}x{height}")]
    InvalidExtent {
        width: usize,
        height: usize,
        max: usize,
    },
    #[error("num_agents must be between 1 and {max}, got {actual}")]
    InvalidAgentCount { max: usize, actual: usize },
    #[error("max_fishing_time must be positive")]
    InvalidBoutLength,
    #[error("window_size must be positive")]
    InvalidWindow,
    #[error("{name} must be positive, got {value}")]
    NonPositiveRadius { name: &'static str, value: i32 },
    #[error("catch_threshold must be positive and finite")]
    InvalidCatchThreshold,
    #[error("{name} must lie in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("fusion_weights must be non-negative and sum to 1, got {0:?}")]
    InvalidFusionWeights([f64; 3]),
    #[error("softmax_temperature must be positive and finite")]
    InvalidTemperature,
    #[error("belief_floor must be positive and finite")]
    InvalidBeliefFloor,
    #[error("resource.clusters must be positive")]
    NoClusters,
    #[error("resource.cluster_std must be positive and finite")]
    InvalidClusterStd,
    #[error("resource.total_abundance must be at most {max}, got {actual}")]
    TooMuchAbundance { max: u64, actual: u64 },
}

impl SimConfig {
    pub const MAX_GRID_EXTENT: usize = 4096;
    pub const MAX_AGENTS: usize = 10_000;
    /// Generation draws one sample per unit, so this bounds construction time.
    pub const MAX_TOTAL_ABUNDANCE: u64 = 10_000_000;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        if self.width == 0
            || self.height == 0
            || self.width > Self::MAX_GRID_EXTENT
            || self.height > Self::MAX_GRID_EXTENT
        {
            return Err(SimConfigError::InvalidExtent {
                width: self.width,
                height: self.height,
                max: Self::MAX_GRID_EXTENT,
            });
        }
        if self.num_agents == 0 || self.num_agents > Self::MAX_AGENTS {
            return Err(SimConfigError::InvalidAgentCount {
                max: Self::MAX_AGENTS,
                actual: self.num_agents,
            });
        }
        if self.max_fishing_time == 0 {
            return Err(SimConfigError::InvalidBoutLength);
        }
        if self.window_size == 0 {
            return Err(SimConfigError::InvalidWindow);
        }
        for (name, value) in [
            ("far_radius", self.far_radius),
            ("near_radius", self.near_radius),
            ("sensing_radius", self.sensing_radius),
            ("prior_radius", self.prior_radius),
            ("social_radius", self.social_radius),
            ("catch_radius", self.catch_radius),
        ] {
            if value <= 0 {
                return Err(SimConfigError::NonPositiveRadius { name, value });
            }
        }
        if !(self.catch_threshold.is_finite() && self.catch_threshold > 0.0) {
            return Err(SimConfigError::InvalidCatchThreshold);
        }
        for (name, value) in [
            ("max_catch_probability", self.max_catch_probability),
            ("exploration_probability", self.exploration_probability),
            ("social_weight", self.social_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimConfigError::InvalidProbability { name, value });
            }
        }
        let weight_sum: f64 = self.fusion_weights.iter().sum();
        if self
            .fusion_weights
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
            || (weight_sum - 1.0).abs() > 1e-9
        {
            return Err(SimConfigError::InvalidFusionWeights(self.fusion_weights));
        }
        if let Some(t) = self.softmax_temperature {
            if !(t.is_finite() && t > 0.0) {
                return Err(SimConfigError::InvalidTemperature);
            }
        }
        if !(self.belief_floor.is_finite() && self.belief_floor > 0.0) {
            return Err(SimConfigError::InvalidBeliefFloor);
        }
        if self.resource.clusters == 0 {
            return Err(SimConfigError::NoClusters);
        }
        if !(self.resource.cluster_std.is_finite() && self.resource.cluster_std > 0.0) {
            return Err(SimConfigError::InvalidClusterStd);
        }
        if self.resource.total_abundance > Self::MAX_TOTAL_ABUNDANCE {
            return Err(SimConfigError::TooMuchAbundance {
                max: Self::MAX_TOTAL_ABUNDANCE,
                actual: self.resource.total_abundance,
            });
        }
        Ok(())
    }

    pub fn bayes_fusion(&self) -> FusionStrategy {
        FusionStrategy::Bayes {
            floor: self.belief_floor,
        }
    }

    pub fn softmax_fusion(&self) -> FusionStrategy {
        FusionStrategy::Softmax {
            weights: self.fusion_weights,
            temperature: self.softmax_temperature,
        }
    }

    pub fn default_fusion_strategy(&self) -> FusionStrategy {
        match self.default_fusion {
            FusionKind::Bayes => self.bayes_fusion(),
            FusionKind::Softmax => self.softmax_fusion(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_non_positive_radius() {
        let config = SimConfig {
            near_radius: 0,
            ..SimConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::NonPositiveRadius {
                name: "near_radius",
                value: 0
            })
        );
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let config = SimConfig {
            fusion_weights: [0.5, 0.5, 0.5],
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::InvalidFusionWeights(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_probability_and_temperature() {
        let config = SimConfig {
            exploration_probability: 1.5,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::InvalidProbability { .. })
        ));
        let config = SimConfig {
            softmax_temperature: Some(0.0),
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidTemperature));
    }

    #[test]
    fn social_weight_is_a_probability() {
        for weight in [1.5, -0.1, f64::NAN] {
            let config = SimConfig {
                social_weight: weight,
                ..SimConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(SimConfigError::InvalidProbability {
                    name: "social_weight",
                    ..
                })
            ));
        }
        let config = SimConfig {
            social_weight: 0.0,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn caps_total_abundance() {
        let mut config = SimConfig::default();
        config.resource.total_abundance = SimConfig::MAX_TOTAL_ABUNDANCE;
        assert_eq!(config.validate(), Ok(()));
        config.resource.total_abundance = u64::MAX;
        assert_eq!(
            config.validate(),
            Err(SimConfigError::TooMuchAbundance {
                max: SimConfig::MAX_TOTAL_ABUNDANCE,
                actual: u64::MAX,
            })
        );
    }

    #[test]
    fn rejects_empty_grid_and_population() {
        let config = SimConfig {
            width: 0,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::InvalidExtent { .. })
        ));
        let config = SimConfig {
            num_agents: 0,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::InvalidAgentCount { .. })
        ));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{"num_agents": 12, "policy": "greedy_bayes"}"#).unwrap();
        assert_eq!(config.num_agents, 12);
        assert_eq!(config.policy, PolicyKind::GreedyBayes);
        assert_eq!(config.width, 100);
        assert_eq!(config.resource, ResourceConfig::default());
    }
}
