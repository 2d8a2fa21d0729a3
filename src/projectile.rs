use crate::config;
use crate::geometry::{self, CollisionLine};
use crate::types::{Point, ProjectileId, Rect, TankId, Team};

/// A projectile requested by a tank; the orchestrator turns it into a live
/// [`Projectile`] with a fresh id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub owner: TankId,
    pub owner_team: Team,
    pub origin: Point,
    /// Travel direction in radians.
    pub angle: f64,
}

/// Result of advancing a projectile by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileUpdate {
    /// No collision; the proposed position was committed.
    Moved,
    /// Reflected off a collision line and still within its bounce budget.
    Bounced,
    /// Predicted to meet another projectile; both must be destroyed.
    Collided(ProjectileId),
    /// Ran out of bounces.
    Destroyed,
}

/// Future position of a live projectile, taken before any projectile moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuturePosition {
    pub id: ProjectileId,
    pub position: Point,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: ProjectileId,
    pub owner: TankId,
    pub owner_team: Team,
    /// Centre of the projectile.
    pub position: Point,
    /// Pixels per tick at delta 1.0.
    pub velocity: Point,
    pub radius: f64,
    pub bounces: u32,
    pub max_bounces: u32,
    pub to_destroy: bool,
}

impl Projectile {
    pub fn new(id: ProjectileId, shot: Shot) -> Self {
        Projectile {
            id,
            owner: shot.owner,
            owner_team: shot.owner_team,
            position: shot.origin,
            velocity: Point::new(
                shot.angle.cos() * config::PROJECTILE_SPEED,
                shot.angle.sin() * config::PROJECTILE_SPEED,
            ),
            radius: config::PROJECTILE_RADIUS,
            bounces: 0,
            max_bounces: config::PROJECTILE_MAX_BOUNCES,
            to_destroy: false,
        }
    }

    pub fn future_position(&self, delta: f64) -> Point {
        self.position + self.velocity * delta
    }

    pub fn snapshot(&self, delta: f64) -> FuturePosition {
        FuturePosition {
            id: self.id,
            position: self.future_position(delta),
            radius: self.radius,
        }
    }

    /// Bounding box used for tank overlap tests.
    pub fn rect(&self) -> Rect {
        Rect::around(self.position, self.radius)
    }

    pub fn is_outside(&self, bounds: &Rect) -> bool {
        !geometry::point_in_rect(self.position, bounds)
    }

    /// Advances one tick.
    ///
    /// `others` holds the future positions of every live projectile (this one
    /// may be included and is skipped). A projectile collision ends the update
    /// before any wall test; the caller must destroy the returned partner too.
    pub fn update(
        &mut self,
        delta: f64,
        lines: &[CollisionLine],
        others: &[FuturePosition],
    ) -> ProjectileUpdate {
        let next = self.future_position(delta);

        for other in others {
            if other.id == self.id {
                continue;
            }
            if next.distance(&other.position) < self.radius + other.radius {
                self.to_destroy = true;
                crate::debug_bullet!("Projectile {} collided with {}", self.id.0, other.id.0);
                return ProjectileUpdate::Collided(other.id);
            }
        }

        let Some(line) = self.most_relevant_hit(next, lines) else {
            self.position = next;
            return ProjectileUpdate::Moved;
        };

        if line.is_more_horizontal() {
            self.velocity.y = -self.velocity.y;
        } else {
            self.velocity.x = -self.velocity.x;
        }
        self.bounces += 1;

        if self.bounces > self.max_bounces {
            self.to_destroy = true;
            crate::debug_bullet!(
                "Projectile {} destroyed after {} bounce(s)",
                self.id.0,
                self.bounces
            );
            ProjectileUpdate::Destroyed
        } else {
            ProjectileUpdate::Bounced
        }
    }

    /// Of all lines crossed by the movement segment, the one whose crossing
    /// point lies furthest from the proposed position along the dominant
    /// velocity axis. Earlier lines win ties.
    fn most_relevant_hit<'a>(&self, next: Point, lines: &'a [CollisionLine]) -> Option<&'a CollisionLine> {
        let horizontal = self.velocity.x.abs() > self.velocity.y.abs();
        let mut best: Option<(&CollisionLine, f64)> = None;
        for line in lines {
            let Some(hit) = geometry::segment_intersection_point(self.position, next, line.start, line.end)
            else {
                continue;
            };
            let overlap = if horizontal {
                (hit.x - next.x).abs()
            } else {
                (hit.y - next.y).abs()
            };
            if best.is_none_or(|(_, current)| overlap > current) {
                best = Some((line, overlap));
            }
        }
        best.map(|(line, _)| line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn projectile(id: u64, position: Point, velocity: Point) -> Projectile {
        Projectile {
            id: ProjectileId(id),
            owner: TankId(1),
            owner_team: Team::A,
            position,
            velocity,
            radius: config::PROJECTILE_RADIUS,
            bounces: 0,
            max_bounces: 0,
            to_destroy: false,
        }
    }

    #[test]
    fn test_spawn_velocity_follows_angle() {
        let shot = Shot {
            owner: TankId(3),
            owner_team: Team::B,
            origin: Point::new(100.0, 100.0),
            angle: std::f64::consts::FRAC_PI_2,
        };
        let p = Projectile::new(ProjectileId(9), shot);
        assert_approx_eq!(p.velocity.x, 0.0);
        assert_approx_eq!(p.velocity.y, config::PROJECTILE_SPEED);
        assert_eq!(p.max_bounces, 0);
        assert_eq!(p.owner, TankId(3));
    }

    #[test]
    fn test_free_flight_commits_position() {
        let mut p = projectile(1, Point::new(10.0, 10.0), Point::new(3.0, -1.0));
        assert_eq!(p.update(2.0, &[], &[]), ProjectileUpdate::Moved);
        assert_approx_eq!(p.position.x, 16.0);
        assert_approx_eq!(p.position.y, 8.0);
        assert!(!p.to_destroy);
    }

    #[test]
    fn test_projectile_collision_is_symmetric() {
        let mut a = projectile(1, Point::new(0.0, 0.0), Point::new(5.0, 0.0));
        let mut b = projectile(2, Point::new(14.0, 0.0), Point::new(-5.0, 0.0));
        let snapshot = [a.snapshot(1.0), b.snapshot(1.0)];

        assert_eq!(a.update(1.0, &[], &snapshot), ProjectileUpdate::Collided(ProjectileId(2)));
        assert_eq!(b.update(1.0, &[], &snapshot), ProjectileUpdate::Collided(ProjectileId(1)));
        assert!(a.to_destroy && b.to_destroy);
        // Neither moved.
        assert_eq!(a.position, Point::new(0.0, 0.0));
        assert_eq!(b.position, Point::new(14.0, 0.0));
    }

    #[test]
    fn test_projectile_collision_beats_wall_bounce() {
        let wall = [CollisionLine::new(3.0, -10.0, 3.0, 10.0)];
        let mut a = projectile(1, Point::new(0.0, 0.0), Point::new(5.0, 0.0));
        let b = projectile(2, Point::new(12.0, 0.0), Point::new(-5.0, 0.0));
        let snapshot = [a.snapshot(1.0), b.snapshot(1.0)];
        assert_eq!(a.update(1.0, &wall, &snapshot), ProjectileUpdate::Collided(ProjectileId(2)));
        assert_eq!(a.bounces, 0);
        assert_approx_eq!(a.velocity.x, 5.0);
    }

    #[test]
    fn test_horizontal_line_flips_vertical_velocity() {
        let floor = [CollisionLine::new(0.0, 20.0, 100.0, 20.0)];
        let mut p = projectile(1, Point::new(50.0, 17.0), Point::new(2.0, 5.0));
        p.max_bounces = 1;
        assert_eq!(p.update(1.0, &floor, &[]), ProjectileUpdate::Bounced);
        assert_approx_eq!(p.velocity.x, 2.0);
        assert_approx_eq!(p.velocity.y, -5.0);
        // The bounce does not move the projectile.
        assert_eq!(p.position, Point::new(50.0, 17.0));
        assert_eq!(p.bounces, 1);
        assert!(!p.to_destroy);
    }

    #[test]
    fn test_vertical_line_flips_horizontal_velocity() {
        let wall = [CollisionLine::new(20.0, 0.0, 20.0, 100.0)];
        let mut p = projectile(1, Point::new(17.0, 50.0), Point::new(5.0, -2.0));
        p.max_bounces = 3;
        assert_eq!(p.update(1.0, &wall, &[]), ProjectileUpdate::Bounced);
        assert_approx_eq!(p.velocity.x, -5.0);
        assert_approx_eq!(p.velocity.y, -2.0);
    }

    #[test]
    fn test_default_bounce_budget_destroys() {
        let wall = [CollisionLine::new(20.0, 0.0, 20.0, 100.0)];
        let mut p = projectile(1, Point::new(17.0, 50.0), Point::new(5.0, 0.0));
        assert_eq!(p.update(1.0, &wall, &[]), ProjectileUpdate::Destroyed);
        assert!(p.to_destroy);
    }

    #[test]
    fn test_larger_overlap_on_dominant_axis_wins() {
        // Moving mostly along x; crosses a vertical line at x=5 (overlap 5)
        // and a horizontal line at y=1.5 (crossing x=7.5, overlap 2.5).
        let lines = [
            CollisionLine::new(-10.0, 1.5, 20.0, 1.5),
            CollisionLine::new(5.0, -10.0, 5.0, 10.0),
        ];
        let mut p = projectile(1, Point::new(0.0, 0.0), Point::new(10.0, 2.0));
        p.max_bounces = 1;
        p.update(1.0, &lines, &[]);
        assert_approx_eq!(p.velocity.x, -10.0);
        assert_approx_eq!(p.velocity.y, 2.0);
    }

    #[test]
    fn test_outside_bounds() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(!projectile(1, Point::new(50.0, 50.0), Point::default()).is_outside(&bounds));
        assert!(projectile(1, Point::new(-1.0, 50.0), Point::default()).is_outside(&bounds));
    }
}
