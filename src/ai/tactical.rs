use super::tactics;
use super::{Behavior, TankOutput, TickContext};
use crate::config::{ArchetypeProfile, MovementPolicy};
use crate::grid::CellCoord;
use crate::pathfinder::Pathfinder;
use crate::projectile::Shot;
use crate::tank::TankBody;
use crate::types::{Point, Rect};
use rand::Rng;
use rand::rngs::StdRng;
use std::collections::VecDeque;

fn draw_delay<R: Rng>(range: (f64, f64), rng: &mut R) -> f64 {
    let (low, high) = range;
    if high > low { rng.gen_range(low..high) } else { low }
}

/// Rule-based tank driven entirely by an [`ArchetypeProfile`].
#[derive(Debug, Clone)]
pub struct TacticalBrain {
    profile: ArchetypeProfile,
    shot_timer: f64,
    shot_delay: f64,
    replan_timer: f64,
    destination: Option<CellCoord>,
    path: VecDeque<CellCoord>,
}

impl TacticalBrain {
    pub fn new<R: Rng>(profile: ArchetypeProfile, rng: &mut R) -> Self {
        TacticalBrain {
            shot_delay: draw_delay(profile.first_shot_delay, rng),
            profile,
            shot_timer: 0.0,
            replan_timer: 0.0,
            destination: None,
            path: VecDeque::new(),
        }
    }

    pub fn destination(&self) -> Option<CellCoord> {
        self.destination
    }

    /// Advances the shot timer; true once per elapsed delay.
    fn shot_window(&mut self, delta: f64, rng: &mut StdRng) -> bool {
        self.shot_timer += delta;
        if self.shot_timer > self.shot_delay {
            self.shot_timer = 0.0;
            self.shot_delay = draw_delay(self.profile.shot_delay, rng);
            true
        } else {
            false
        }
    }

    fn choose_shot(&self, body: &mut TankBody, ctx: &TickContext<'_>, rng: &mut StdRng) -> Option<Shot> {
        let own = body.rect();
        if let Some(threat) =
            tactics::incoming_threat(&own, ctx.projectiles, self.profile.threat_horizon, self.profile.threat_radius)
        {
            crate::debug_tank!(body.id; "defending against projectile at ({:.1}, {:.1})", threat.x, threat.y);
            body.aim_at(threat);
            return body.fire();
        }

        let center = body.center();
        let target = tactics::nearest_target(center, ctx.enemies_of(body.team))?.center();
        let allies: Vec<Rect> = ctx.allies_of(body.id, body.team).map(|t| t.rect).collect();

        let aim = if rng.r#gen::<f64>() < self.profile.direct_shot_chance {
            tactics::direct_shot_clear(center, target, ctx.lines, &allies).then_some(target)
        } else {
            tactics::reflected_shot(center, target, ctx.lines, &allies)
        }?;

        body.aim_at(aim);
        body.fire()
    }

    fn replan(&mut self, body: &TankBody, ctx: &TickContext<'_>, radius: i32, rng: &mut StdRng) {
        let current = ctx.grid.coord_at(body.center());
        self.destination = tactics::safe_destination(ctx.grid, current, radius, rng);
        self.path = match self.destination {
            Some(goal) => Pathfinder::new(ctx.grid).find_path(current, goal).into(),
            None => VecDeque::new(),
        };
        crate::debug_path!(
            "Tank {} heading to {:?} via {} waypoints",
            body.id,
            self.destination,
            self.path.len()
        );
    }

    fn patrol(&mut self, body: &mut TankBody, ctx: &TickContext<'_>, rng: &mut StdRng) {
        let MovementPolicy::Patrol {
            speed,
            destination_radius,
            replan_cooldown,
            waypoint_reach,
            dodge_threshold,
        } = self.profile.movement
        else {
            return;
        };

        let current = ctx.grid.coord_at(body.center());
        if self.destination.is_none_or(|d| d == current) || self.path.is_empty() {
            self.replan(body, ctx, destination_radius, rng);
        }

        let step = speed * ctx.delta;
        let dodge = tactics::dodge_vector(body.center(), ctx.projectiles, ctx.delta, dodge_threshold);
        let displacement = if !dodge.is_zero() {
            dodge * step
        } else if let Some(&next) = self.path.front() {
            let to_waypoint = ctx.grid.cell_center(next) - body.center();
            let distance = to_waypoint.length();
            if distance < waypoint_reach {
                self.path.pop_front();
                Point::default()
            } else {
                to_waypoint.normalized() * step.min(distance)
            }
        } else {
            Point::default()
        };

        if !body.try_move(displacement, ctx.grid) && self.replan_timer > replan_cooldown {
            self.replan_timer = 0.0;
            crate::debug_tank!(body.id; "blocked by a wall, re-planning");
            self.replan(body, ctx, destination_radius, rng);
        }
    }
}

impl Behavior for TacticalBrain {
    fn update(&mut self, body: &mut TankBody, ctx: &TickContext<'_>, rng: &mut StdRng) -> TankOutput {
        body.tick_recoil(ctx.delta);
        self.replan_timer += ctx.delta;

        let shot = if self.shot_window(ctx.delta, rng) {
            self.choose_shot(body, ctx, rng)
        } else {
            None
        };

        if !body.is_recoiling() {
            self.patrol(body, ctx, rng);
        }
        TankOutput::shot(shot)
    }

    fn name(&self) -> &'static str {
        self.profile.kind.name()
    }
}
