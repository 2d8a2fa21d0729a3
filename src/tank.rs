use crate::ai::{Behavior, TankOutput, TickContext};
use crate::config;
use crate::grid::Grid;
use crate::projectile::Shot;
use crate::types::{Point, Rect, TankId, TankKind, Team};
use rand::rngs::StdRng;

/// Physical state shared by every tank, whoever controls it.
#[derive(Debug, Clone, PartialEq)]
pub struct TankBody {
    pub id: TankId,
    pub team: Team,
    pub kind: TankKind,
    /// Top-left corner of the bounding box.
    pub position: Point,
    pub size: f64,
    pub speed: f64,
    /// Turret direction in radians.
    pub turret_angle: f64,
    /// Direction of the last successful move, in radians.
    pub heading: f64,
    /// Displacement applied by the last successful move.
    pub velocity: Point,
    /// Projectiles currently in flight.
    pub fired_bullets: u32,
    pub max_shots: u32,
    /// Ticks left before the tank may move again after firing.
    pub recoil: f64,
    pub alive: bool,
    // Edge-triggered events, cleared by whoever consumes them
    pub hit_enemy: bool,
    pub got_hit: bool,
    pub got_hit_by_self: bool,
    pub hit_wall: bool,
}

impl TankBody {
    pub fn new(id: TankId, team: Team, kind: TankKind, position: Point, speed: f64, max_shots: u32) -> Self {
        TankBody {
            id,
            team,
            kind,
            position,
            size: config::TANK_SIZE,
            speed,
            turret_angle: 0.0,
            heading: 0.0,
            velocity: Point::default(),
            fired_bullets: 0,
            max_shots,
            recoil: 0.0,
            alive: true,
            hit_enemy: false,
            got_hit: false,
            got_hit_by_self: false,
            hit_wall: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size, self.size)
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }

    pub fn aim_at(&mut self, target: Point) {
        self.turret_angle = (target - self.center()).angle();
    }

    pub fn is_recoiling(&self) -> bool {
        self.recoil > 0.0
    }

    pub fn tick_recoil(&mut self, delta: f64) {
        if self.recoil > 0.0 {
            self.recoil -= delta;
        }
    }

    /// Spawns a projectile at the muzzle if fewer than `max_shots` are in flight.
    pub fn fire(&mut self) -> Option<Shot> {
        if self.fired_bullets >= self.max_shots {
            crate::debug_tank!(self.id; "cannot fire, {} shots in flight", self.fired_bullets);
            return None;
        }
        let direction = Point::new(self.turret_angle.cos(), self.turret_angle.sin());
        let origin = self.center() + direction * config::MUZZLE_OFFSET;
        self.fired_bullets += 1;
        self.recoil = config::RECOIL_PERIOD;
        crate::debug_tank!(
            self.id;
            "fired at {:.2} rad ({}/{} in flight)",
            self.turret_angle,
            self.fired_bullets,
            self.max_shots
        );
        Some(Shot {
            owner: self.id,
            owner_team: self.team,
            origin,
            angle: self.turret_angle,
        })
    }

    /// Called when one of this tank's projectiles leaves play.
    pub fn projectile_removed(&mut self) {
        self.fired_bullets = self.fired_bullets.saturating_sub(1);
    }

    /// Moves by `displacement`, reverting if the new box overlaps a wall or
    /// hole. Returns false (and raises `hit_wall`) when the move was reverted.
    pub fn try_move(&mut self, displacement: Point, grid: &Grid) -> bool {
        if displacement.is_zero() {
            self.velocity = Point::default();
            return true;
        }
        let previous = self.position;
        self.position = self.position + displacement;
        if grid.overlaps_blocked(&self.rect()) {
            self.position = previous;
            self.velocity = Point::default();
            self.hit_wall = true;
            return false;
        }
        self.velocity = displacement;
        self.heading = displacement.angle();
        true
    }

    pub fn snapshot(&self) -> TankSnapshot {
        TankSnapshot {
            id: self.id,
            team: self.team,
            kind: self.kind,
            rect: self.rect(),
            velocity: self.velocity,
            heading: self.heading,
        }
    }
}

/// Read-only view of a tank handed to behaviours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankSnapshot {
    pub id: TankId,
    pub team: Team,
    pub kind: TankKind,
    pub rect: Rect,
    pub velocity: Point,
    pub heading: f64,
}

impl TankSnapshot {
    pub fn center(&self) -> Point {
        self.rect.center()
    }
}

/// A tank on the roster: its body plus whatever drives it.
pub struct Tank {
    pub body: TankBody,
    behavior: Box<dyn Behavior>,
}

impl Tank {
    pub fn new(body: TankBody, behavior: Box<dyn Behavior>) -> Self {
        Tank { body, behavior }
    }

    pub fn update(&mut self, ctx: &TickContext<'_>, rng: &mut StdRng) -> TankOutput {
        self.behavior.update(&mut self.body, ctx, rng)
    }

    pub fn behavior_name(&self) -> &'static str {
        self.behavior.name()
    }
}

impl std::fmt::Debug for Tank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tank")
            .field("body", &self.body)
            .field("behavior", &self.behavior.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::tests::grid_from_ascii;
    use assert_approx_eq::assert_approx_eq;

    fn body(position: Point) -> TankBody {
        TankBody::new(TankId(1), Team::A, TankKind::Player, position, 2.0, 2)
    }

    #[test]
    fn test_fire_spawns_at_muzzle_and_respects_limit() {
        let mut tank = body(Point::new(100.0, 100.0));
        tank.aim_at(Point::new(500.0, 109.0));
        let shot = tank.fire().unwrap();
        assert_approx_eq!(shot.origin.x, 109.0 + config::MUZZLE_OFFSET);
        assert_approx_eq!(shot.origin.y, 109.0);
        assert_eq!(shot.owner, TankId(1));
        assert!(tank.is_recoiling());

        assert!(tank.fire().is_some());
        assert!(tank.fire().is_none());
        tank.projectile_removed();
        assert!(tank.fire().is_some());
    }

    #[test]
    fn test_recoil_wears_off() {
        let mut tank = body(Point::new(100.0, 100.0));
        tank.fire();
        for _ in 0..5 {
            tank.tick_recoil(1.0);
        }
        assert!(!tank.is_recoiling());
    }

    #[test]
    fn test_move_reverts_on_wall() {
        let grid = grid_from_ascii(&["....", "..#.", "...."]);
        let mut tank = body(Point::new(1.0, 1.0));
        assert!(tank.try_move(Point::new(1.0, 0.0), &grid));
        assert_eq!(tank.position, Point::new(2.0, 1.0));
        assert!(!tank.hit_wall);

        // Moving into the wall cell at (2,1) reverts.
        let mut tank = body(Point::new(21.0, 21.0));
        assert!(!tank.try_move(Point::new(5.0, 0.0), &grid));
        assert_eq!(tank.position, Point::new(21.0, 21.0));
        assert!(tank.hit_wall);
    }
}
