//! Tank battle simulation core: levels, tanks, projectiles, rule-based and
//! learning AI, and the per-tick orchestrator.

pub mod ai;
pub mod assets;
pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod level;
pub mod logging;
pub mod pathfinder;
pub mod projectile;
pub mod simulation;
pub mod tank;
pub mod types;

pub use error::LevelError;
pub use simulation::{RoundOutcome, Simulation, TickReport};
