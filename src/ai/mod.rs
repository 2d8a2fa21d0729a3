//! Tank decision making: player control, rule-based archetypes and the learning tank

pub mod learning;
pub mod model;
pub mod player;
pub mod replay;
pub mod tactical;
pub mod tactics;

use crate::geometry::CollisionLine;
use crate::grid::Grid;
use crate::projectile::{Projectile, Shot};
use crate::tank::{TankBody, TankSnapshot};
use crate::types::{PlayerInput, TankId, Team};
use rand::rngs::StdRng;

pub use learning::LearningBrain;
pub use player::PlayerControl;
pub use replay::{Experience, ReplayBuffer, State};
pub use tactical::TacticalBrain;

/// Read-only view of the world for one tank update.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub delta: f64,
    pub grid: &'a Grid,
    pub lines: &'a [CollisionLine],
    pub projectiles: &'a [Projectile],
    /// Every living tank, including the one being updated.
    pub tanks: &'a [TankSnapshot],
    pub input: &'a PlayerInput,
}

impl<'a> TickContext<'a> {
    pub fn enemies_of(&self, team: Team) -> impl Iterator<Item = &'a TankSnapshot> + 'a {
        let tanks = self.tanks;
        tanks.iter().filter(move |t| t.team != team)
    }

    /// Team-mates of `id`, excluding `id` itself.
    pub fn allies_of(&self, id: TankId, team: Team) -> impl Iterator<Item = &'a TankSnapshot> + 'a {
        let tanks = self.tanks;
        tanks.iter().filter(move |t| t.team == team && t.id != id)
    }
}

/// What a tank produced this tick.
#[derive(Debug, Clone, Default)]
pub struct TankOutput {
    pub shot: Option<Shot>,
    pub experience: Option<Experience>,
}

impl TankOutput {
    pub fn shot(shot: Option<Shot>) -> Self {
        TankOutput { shot, experience: None }
    }
}

/// Decision function run once per tick for a tank.
///
/// Behaviours may move and fire their own body; everything else is visible
/// only through the context.
pub trait Behavior {
    fn update(&mut self, body: &mut TankBody, ctx: &TickContext<'_>, rng: &mut StdRng) -> TankOutput;

    fn name(&self) -> &'static str;
}
