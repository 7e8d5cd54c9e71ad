//! Run configuration for the traffic simulation

use anyhow::{bail, Result};

use super::types::{
    Position, DEFAULT_CONGESTION_FACTOR, DEFAULT_SPAWN_INTERVAL, DIAGONAL_WEIGHT_MULTIPLIER,
    LANE_CHANGE_COOLDOWN, VISION_THRESHOLD,
};

/// Which light state makes an edge into the light more expensive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightPhase {
    Pass,
    Stop,
}

/// Weight multiplier applied to edges that end on a traffic light.
///
/// The phase is read once when the city graph is built; later toggles do not
/// touch edge weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CongestionPolicy {
    pub factor: f32,
    pub applies_when: LightPhase,
}

impl Default for CongestionPolicy {
    fn default() -> Self {
        Self {
            factor: DEFAULT_CONGESTION_FACTOR,
            applies_when: LightPhase::Stop,
        }
    }
}

impl CongestionPolicy {
    /// Multiplier for an edge entering a light in the given state
    pub fn multiplier(&self, light_state: bool) -> f32 {
        let phase = if light_state {
            LightPhase::Pass
        } else {
            LightPhase::Stop
        };
        if phase == self.applies_when {
            self.factor
        } else {
            1.0
        }
    }
}

/// What happens when a spawn is due on an entry that still holds a car
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpawnPolicy {
    /// Drop the spawn for this round
    #[default]
    Skip,
    /// Remember the spawn and retry every step until the entry frees up
    Queue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnConfig {
    /// Entry cells; `None` uses the corner cells of the grid
    pub entry_points: Option<Vec<Position>>,
    /// Steps between spawn waves; `None` only spawns at initialization
    pub interval: Option<u64>,
    pub policy: SpawnPolicy,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            entry_points: None,
            interval: Some(DEFAULT_SPAWN_INTERVAL),
            policy: SpawnPolicy::Skip,
        }
    }
}

/// Configuration for one simulation run
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Seed for the simulation RNG; `None` draws one from the OS
    pub seed: Option<u64>,
    /// Cars in the vision window needed to consider a lane change
    pub vision_threshold: usize,
    /// Minimum steps between two lane changes of the same car
    pub lane_change_cooldown: u32,
    /// Weight multiplier for diagonal lane-change edges
    pub diagonal_weight: f32,
    pub congestion: CongestionPolicy,
    pub spawn: SpawnConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            vision_threshold: VISION_THRESHOLD,
            lane_change_cooldown: LANE_CHANGE_COOLDOWN,
            diagonal_weight: DIAGONAL_WEIGHT_MULTIPLIER,
            congestion: CongestionPolicy::default(),
            spawn: SpawnConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Reject settings that would break the planner or the spawn schedule
    pub fn validate(&self) -> Result<()> {
        // Edge costs must stay at or above the straight-line distance for the
        // A* heuristic to remain admissible.
        if self.diagonal_weight.is_nan() || self.diagonal_weight < std::f32::consts::SQRT_2 {
            bail!(
                "Diagonal weight {} is below the diagonal distance of sqrt(2)",
                self.diagonal_weight
            );
        }
        if self.congestion.factor.is_nan() || self.congestion.factor < 1.0 {
            bail!(
                "Congestion factor {} must be at least 1.0",
                self.congestion.factor
            );
        }
        if self.vision_threshold == 0 {
            bail!("Vision threshold must be at least 1");
        }
        if self.spawn.interval == Some(0) {
            bail!("Spawn interval must be positive");
        }
        Ok(())
    }
}
