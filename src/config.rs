//! Configuration constants and tunable profiles for the tank simulation.

use crate::types::TankKind;

// Grid layout
pub const CELL_SIZE: f64 = 20.0; // Pixel size of one square grid cell
pub const GRID_ROWS: usize = 30; // Rows in a standard level
pub const GRID_COLS: usize = 40; // Columns in a standard level

// Tanks
pub const TANK_SIZE: f64 = 18.0; // Tank bounding box side length
pub const MUZZLE_OFFSET: f64 = 25.0; // Distance from tank centre to projectile spawn
pub const RECOIL_PERIOD: f64 = 5.0; // Ticks a tank pauses after firing
pub const PLAYER_SPEED: f64 = 2.0;
pub const PLAYER_MAX_SHOTS: u32 = 5;

// Runner
pub const MAX_TICKS: u64 = 20_000; // Default tick budget for a headless run
pub const TICK_DELTA: f64 = 1.0; // Elapsed-time factor per tick at 60 fps

// Projectiles
pub const PROJECTILE_SPEED: f64 = 6.5; // Pixels per tick at delta 1.0
pub const PROJECTILE_RADIUS: f64 = 4.0;
pub const PROJECTILE_MAX_BOUNCES: u32 = 0; // Any bounce beyond this destroys the projectile

// Danger field
pub const BULLET_DANGER_FACTOR: f64 = 1.0;
pub const TARGET_DANGER_FACTOR: f64 = 1.0;
pub const TARGET_DANGER_FALLOFF: f64 = 0.1; // Danger lost per cell of Chebyshev distance
pub const DANGER_PREDICTION_STEPS: u32 = 25;

/// How a rule-based tank moves between shots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementPolicy {
    /// Turret only; never leaves the spawn cell.
    Stationary,
    /// Walks toward low-danger cells with A* and dodges incoming fire.
    Patrol {
        speed: f64,
        /// Search radius (in cells) for the next destination.
        destination_radius: i32,
        /// Ticks between forced re-plans after bumping into a wall.
        replan_cooldown: f64,
        /// Distance (px) at which a waypoint counts as reached.
        waypoint_reach: f64,
        /// Projectiles predicted closer than this (px) trigger dodging.
        dodge_threshold: f64,
    },
}

impl MovementPolicy {
    pub fn patrol(speed: f64) -> Self {
        MovementPolicy::Patrol {
            speed,
            destination_radius: 15,
            replan_cooldown: 120.0,
            waypoint_reach: 1.0,
            dodge_threshold: 120.0,
        }
    }
}

/// Data that distinguishes one rule-based archetype from another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArchetypeProfile {
    pub kind: TankKind,
    /// Delay range (ticks) before the very first shot.
    pub first_shot_delay: (f64, f64),
    /// Delay range (ticks) redrawn after every eligible shot window.
    pub shot_delay: (f64, f64),
    pub max_shots: u32,
    /// Probability of attempting a direct shot rather than a reflected one.
    pub direct_shot_chance: f64,
    /// Horizon (ticks of projectile travel) for threat prediction.
    pub threat_horizon: f64,
    /// Only threats whose current position is closer than this (px) count.
    pub threat_radius: f64,
    pub movement: MovementPolicy,
}

impl ArchetypeProfile {
    pub fn brown() -> Self {
        ArchetypeProfile {
            kind: TankKind::Brown,
            first_shot_delay: (80.0, 100.0),
            shot_delay: (80.0, 300.0),
            max_shots: 1,
            direct_shot_chance: 0.6,
            threat_horizon: 50.0,
            threat_radius: 50.0,
            movement: MovementPolicy::Stationary,
        }
    }

    pub fn grey() -> Self {
        ArchetypeProfile {
            kind: TankKind::Grey,
            first_shot_delay: (80.0, 300.0),
            shot_delay: (80.0, 300.0),
            max_shots: 3,
            movement: MovementPolicy::patrol(1.4),
            ..Self::brown()
        }
    }

    pub fn green() -> Self {
        ArchetypeProfile {
            kind: TankKind::Green,
            first_shot_delay: (60.0, 200.0),
            shot_delay: (60.0, 200.0),
            max_shots: 4,
            movement: MovementPolicy::patrol(1.75),
            ..Self::brown()
        }
    }

    pub fn pink() -> Self {
        ArchetypeProfile {
            kind: TankKind::Pink,
            first_shot_delay: (40.0, 150.0),
            shot_delay: (40.0, 150.0),
            max_shots: 5,
            movement: MovementPolicy::patrol(2.0),
            ..Self::brown()
        }
    }

    /// Profile for a rule-based kind; `None` for the player and learning tanks.
    pub fn for_kind(kind: TankKind) -> Option<Self> {
        match kind {
            TankKind::Brown => Some(Self::brown()),
            TankKind::Grey => Some(Self::grey()),
            TankKind::Green => Some(Self::green()),
            TankKind::Pink => Some(Self::pink()),
            TankKind::Player | TankKind::Learning => None,
        }
    }

    pub fn speed(&self) -> f64 {
        match self.movement {
            MovementPolicy::Stationary => 0.0,
            MovementPolicy::Patrol { speed, .. } => speed,
        }
    }
}

/// Which discrete actions the learning tank may choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSpace {
    /// Eight movement directions.
    MoveOnly,
    /// Eight movement directions followed by eight shoot directions.
    MoveAndShoot,
}

impl ActionSpace {
    pub fn len(&self) -> usize {
        match self {
            ActionSpace::MoveOnly => 8,
            ActionSpace::MoveAndShoot => 16,
        }
    }
}

/// Reward weights for the learning tank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardWeights {
    pub alive: f32,
    pub hit_enemy: f32,
    pub got_hit: f32,
    pub self_hit: f32,
    pub shoot: f32,
    pub wall: f32,
}

impl Default for RewardWeights {
    fn default() -> Self {
        RewardWeights {
            alive: 1.0,
            hit_enemy: 100.0,
            got_hit: -50.0,
            self_hit: -100.0,
            shoot: -1.0,
            wall: -5.0,
        }
    }
}

/// Settings for the reinforcement-learning control loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningConfig {
    pub speed: f64,
    pub max_shots: u32,
    pub action_space: ActionSpace,
    pub epsilon_start: f64,
    pub epsilon_decay: f64,
    pub epsilon_min: f64,
    pub gamma: f32,
    pub replay_capacity: usize,
    /// Buffer occupancy required before any training pass.
    pub train_threshold: usize,
    /// Training runs on steps that are a multiple of this interval.
    pub train_interval: u64,
    pub batch_size: usize,
    /// Encoded grid dimensions; levels of another size are cropped or zero-padded.
    pub grid_rows: usize,
    pub grid_cols: usize,
    pub max_encoded_tanks: usize,
    pub max_encoded_projectiles: usize,
    /// Fill value for unused slots in the auxiliary state vector.
    pub pad_value: f32,
    pub rewards: RewardWeights,
}

/// Floats per encoded tank or projectile: x, y, vx, vy, heading.
pub const ENTITY_FEATURES: usize = 5;

impl LearningConfig {
    pub fn aux_len(&self) -> usize {
        (self.max_encoded_tanks + self.max_encoded_projectiles) * ENTITY_FEATURES
    }

    pub fn grid_len(&self) -> usize {
        self.grid_rows * self.grid_cols
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        LearningConfig {
            speed: 2.0,
            max_shots: 5,
            action_space: ActionSpace::MoveAndShoot,
            epsilon_start: 1.0,
            epsilon_decay: 0.9995,
            epsilon_min: 0.01,
            gamma: 0.95,
            replay_capacity: 10_000,
            train_threshold: 1000,
            train_interval: 1000,
            batch_size: 32,
            grid_rows: GRID_ROWS,
            grid_cols: GRID_COLS,
            max_encoded_tanks: 8,
            max_encoded_projectiles: 5,
            pad_value: -1.0,
            rewards: RewardWeights::default(),
        }
    }
}

/// What occupies the player spawn cell (level code 3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerSlot {
    Human,
    Archetype(TankKind),
    Learning,
}

/// Top-level simulation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub player_slot: PlayerSlot,
    pub seed: u64,
    pub learning: LearningConfig,
    /// Per-kind overrides; kinds without an entry use their built-in profile.
    pub profiles: Vec<ArchetypeProfile>,
}

impl SimConfig {
    pub fn profile(&self, kind: TankKind) -> Option<ArchetypeProfile> {
        self.profiles
            .iter()
            .find(|p| p.kind == kind)
            .copied()
            .or_else(|| ArchetypeProfile::for_kind(kind))
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            player_slot: PlayerSlot::Human,
            seed: 0,
            learning: LearningConfig::default(),
            profiles: Vec::new(),
        }
    }
}
