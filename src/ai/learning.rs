//! Reinforcement-learning tank.
//!
//! Every tick the tank encodes what it sees, picks an action epsilon-greedily
//! from the shared model, acts, scores the outcome and hands the transition
//! back to the simulation as an [`Experience`].

use super::model::ModelHandle;
use super::replay::{Experience, State};
use super::{Behavior, TankOutput, TickContext};
use crate::config::{ENTITY_FEATURES, LearningConfig, RewardWeights};
use crate::projectile::Shot;
use crate::tank::TankBody;
use crate::types::Point;
use rand::Rng;
use rand::rngs::StdRng;
use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::sync::Arc;

/// Unit vectors in action order: up, down, left, right, up-left, up-right,
/// down-left, down-right.
const DIRECTIONS: [Point; 8] = [
    Point { x: 0.0, y: -1.0 },
    Point { x: 0.0, y: 1.0 },
    Point { x: -1.0, y: 0.0 },
    Point { x: 1.0, y: 0.0 },
    Point { x: -FRAC_1_SQRT_2, y: -FRAC_1_SQRT_2 },
    Point { x: FRAC_1_SQRT_2, y: -FRAC_1_SQRT_2 },
    Point { x: -FRAC_1_SQRT_2, y: FRAC_1_SQRT_2 },
    Point { x: FRAC_1_SQRT_2, y: FRAC_1_SQRT_2 },
];

/// Decoded action index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Move(Point),
    Shoot(Point),
}

impl Action {
    /// Indices 0..8 move, 8..16 shoot, both in [`DIRECTIONS`] order.
    pub fn from_index(index: usize) -> Option<Action> {
        match index {
            0..8 => Some(Action::Move(DIRECTIONS[index])),
            8..16 => Some(Action::Shoot(DIRECTIONS[index - 8])),
            _ => None,
        }
    }

    pub fn is_shoot(&self) -> bool {
        matches!(self, Action::Shoot(_))
    }
}

fn push_entity(aux: &mut Vec<f32>, position: Point, velocity: Point, heading: f64, width: f64, height: f64) {
    aux.extend_from_slice(&[
        (position.x / width) as f32,
        (position.y / height) as f32,
        velocity.x as f32,
        velocity.y as f32,
        (heading / PI) as f32,
    ]);
}

/// Auxiliary state vector: `max_encoded_tanks` tank slots (this tank first,
/// then the others in roster order) followed by `max_encoded_projectiles`
/// projectile slots. Each slot is centre x / level width, centre y / level
/// height, vx, vy and heading / pi. Unused slots hold `pad_value`.
pub fn encode_aux(body: &TankBody, ctx: &TickContext<'_>, config: &LearningConfig) -> Vec<f32> {
    let width = ctx.grid.width().max(1.0);
    let height = ctx.grid.height().max(1.0);
    let mut aux = Vec::with_capacity(config.aux_len());

    if config.max_encoded_tanks > 0 {
        push_entity(&mut aux, body.center(), body.velocity, body.heading, width, height);
    }
    for tank in ctx
        .tanks
        .iter()
        .filter(|t| t.id != body.id)
        .take(config.max_encoded_tanks.saturating_sub(1))
    {
        push_entity(&mut aux, tank.center(), tank.velocity, tank.heading, width, height);
    }
    aux.resize(config.max_encoded_tanks * ENTITY_FEATURES, config.pad_value);

    for projectile in ctx.projectiles.iter().take(config.max_encoded_projectiles) {
        push_entity(
            &mut aux,
            projectile.position,
            projectile.velocity,
            projectile.velocity.angle(),
            width,
            height,
        );
    }
    aux.resize(config.aux_len(), config.pad_value);
    aux
}

/// Scores the last tick from the body's event flags and clears them.
pub fn calculate_reward(body: &mut TankBody, shot: bool, weights: &RewardWeights) -> f32 {
    let mut reward = 0.0;
    if body.alive {
        reward += weights.alive;
    }
    if std::mem::take(&mut body.hit_enemy) {
        reward += weights.hit_enemy;
    }
    if std::mem::take(&mut body.got_hit) {
        reward += weights.got_hit;
    }
    if std::mem::take(&mut body.got_hit_by_self) {
        reward += weights.self_hit;
    }
    if shot {
        reward += weights.shoot;
    }
    if std::mem::take(&mut body.hit_wall) {
        reward += weights.wall;
    }
    reward
}

/// Index of the largest value; the first one wins ties.
fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

pub struct LearningBrain {
    config: LearningConfig,
    model: ModelHandle,
    epsilon: f64,
    /// Wall flags of the current level. Walls never change while a level is
    /// loaded and brains are rebuilt on every load.
    walls: Option<Arc<[f32]>>,
}

impl std::fmt::Debug for LearningBrain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearningBrain")
            .field("epsilon", &self.epsilon)
            .finish()
    }
}

impl LearningBrain {
    pub fn new(config: LearningConfig, model: ModelHandle) -> Self {
        LearningBrain {
            epsilon: config.epsilon_start,
            config,
            model,
            walls: None,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn decay_epsilon(&mut self) {
        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);
    }

    fn walls(&mut self, ctx: &TickContext<'_>) -> Arc<[f32]> {
        let (rows, cols) = (self.config.grid_rows, self.config.grid_cols);
        Arc::clone(
            self.walls
                .get_or_insert_with(|| Arc::from(ctx.grid.wall_flags(rows, cols))),
        )
    }

    pub fn encode_state(&mut self, body: &TankBody, ctx: &TickContext<'_>) -> State {
        State {
            grid: self.walls(ctx),
            aux: encode_aux(body, ctx, &self.config),
        }
    }

    /// Random action with probability epsilon, otherwise the model's best.
    pub fn choose_action(&self, state: &State, rng: &mut StdRng) -> usize {
        let actions = self.config.action_space.len();
        if rng.r#gen::<f64>() < self.epsilon {
            return rng.gen_range(0..actions);
        }
        let q_values = self.model.predict(&state.grid, &state.aux);
        let limit = q_values.len().min(actions);
        argmax(&q_values[..limit]).unwrap_or_else(|| rng.gen_range(0..actions))
    }

    fn perform(&self, body: &mut TankBody, ctx: &TickContext<'_>, action: Action) -> Option<Shot> {
        match action {
            Action::Move(direction) => {
                if !body.is_recoiling() {
                    body.try_move(direction * (body.speed * ctx.delta), ctx.grid);
                }
                None
            }
            Action::Shoot(direction) => {
                body.turret_angle = direction.angle();
                body.fire()
            }
        }
    }
}

impl Behavior for LearningBrain {
    fn update(&mut self, body: &mut TankBody, ctx: &TickContext<'_>, rng: &mut StdRng) -> TankOutput {
        body.tick_recoil(ctx.delta);

        let state = self.encode_state(body, ctx);
        self.decay_epsilon();
        let index = self.choose_action(&state, rng);
        let Some(action) = Action::from_index(index) else {
            return TankOutput::default();
        };

        let shot = self.perform(body, ctx, action);
        let reward = calculate_reward(body, action.is_shoot(), &self.config.rewards);
        let next_state = self.encode_state(body, ctx);
        crate::debug_learn!(
            body.id;
            "action {} reward {:.1} epsilon {:.4}",
            index,
            reward,
            self.epsilon
        );

        TankOutput {
            shot,
            experience: Some(Experience {
                state,
                action: index,
                reward,
                next_state,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "learning"
    }
}
