//! Targeting and evasion geometry used by the rule-based tanks.
//!
//! All functions are pure: they read positions and return an aim point,
//! steering vector or destination without touching the tanks themselves.

use crate::geometry::{self, CollisionLine};
use crate::grid::{CellCoord, Grid, is_wall_or_hole};
use crate::projectile::Projectile;
use crate::tank::TankSnapshot;
use crate::types::{Point, Rect};
use rand::Rng;
use rand::seq::SliceRandom;

/// Margin added around a tank's box for threat and team-mate clearance tests.
pub const BOX_MARGIN: f64 = 1.0;

/// Closest tank by centre distance; the first one wins ties.
pub fn nearest_target<'a, I>(from: Point, candidates: I) -> Option<&'a TankSnapshot>
where
    I: IntoIterator<Item = &'a TankSnapshot>,
{
    let mut best: Option<(&TankSnapshot, f64)> = None;
    for tank in candidates {
        let distance = from.distance(&tank.center());
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((tank, distance));
        }
    }
    best.map(|(tank, _)| tank)
}

/// Position of the nearest projectile whose path over `horizon` ticks
/// crosses the tank's expanded box. Only projectiles currently closer than
/// `radius` are considered.
pub fn incoming_threat(own: &Rect, projectiles: &[Projectile], horizon: f64, radius: f64) -> Option<Point> {
    let center = own.center();
    let hitbox = own.expanded(BOX_MARGIN);
    let mut closest: Option<Point> = None;
    let mut min_distance = radius;
    for projectile in projectiles {
        let end = projectile.position + projectile.velocity * horizon;
        if !geometry::path_intersects_rect(projectile.position, end, &hitbox) {
            continue;
        }
        let distance = center.distance(&projectile.position);
        if distance < min_distance {
            min_distance = distance;
            closest = Some(projectile.position);
        }
    }
    closest
}

/// True when the straight line `from`→`target` crosses no collision line and
/// no team-mate box.
pub fn direct_shot_clear<'a, I>(from: Point, target: Point, lines: &[CollisionLine], allies: I) -> bool
where
    I: IntoIterator<Item = &'a Rect>,
{
    if geometry::crosses_any_line(from, target, lines) {
        return false;
    }
    !allies
        .into_iter()
        .any(|ally| geometry::path_intersects_rect(from, target, ally))
}

/// Best single-bounce aim point off a collision line, if any.
///
/// The target is mirrored across each line and the ray from `from` towards
/// the mirror image is intersected with that line. A candidate survives when
/// its line is the first one the ray meets, the bounce leg to the target is
/// clear of every other line, and neither leg clips an (expanded) team-mate
/// box. The shortest total path wins.
pub fn reflected_shot(from: Point, target: Point, lines: &[CollisionLine], allies: &[Rect]) -> Option<Point> {
    let expanded: Vec<Rect> = allies.iter().map(|r| r.expanded(BOX_MARGIN)).collect();
    let mut best: Option<(Point, f64)> = None;

    for (i, line) in lines.iter().enumerate() {
        let mirrored = geometry::reflect_point_over_line(target, line.start, line.end);
        let Some(aim) = geometry::segment_intersection_point(from, mirrored, line.start, line.end) else {
            continue;
        };
        let aim_distance = from.distance(&aim);

        let blocked_earlier = lines.iter().enumerate().any(|(j, other)| {
            j != i
                && geometry::segment_intersection_point(from, mirrored, other.start, other.end)
                    .is_some_and(|p| from.distance(&p) < aim_distance)
        });
        if blocked_earlier {
            continue;
        }

        let others = lines.iter().enumerate().filter(|(j, _)| *j != i).map(|(_, l)| l);
        if geometry::crosses_any_line(aim, target, others) {
            continue;
        }

        let clips_ally = expanded.iter().any(|ally| {
            geometry::path_intersects_rect(from, aim, ally) || geometry::path_intersects_rect(aim, target, ally)
        });
        if clips_ally {
            continue;
        }

        let total = aim_distance + aim.distance(&target);
        if best.is_none_or(|(_, d)| total < d) {
            best = Some((aim, total));
        }
    }

    best.map(|(aim, _)| aim)
}

/// Unit steering vector away from projectiles heading towards `position`
/// whose next position falls within `threshold`. Zero when nothing threatens.
pub fn dodge_vector(position: Point, projectiles: &[Projectile], delta: f64, threshold: f64) -> Point {
    let mut dodge = Point::default();
    for projectile in projectiles {
        let to_tank = position - projectile.position;
        if projectile.velocity.dot(&to_tank) <= 0.0 {
            continue;
        }
        let future = projectile.future_position(delta);
        if position.distance(&future) < threshold {
            dodge = dodge + (position - future).normalized();
        }
    }
    dodge.normalized()
}

/// Lowest-danger cell within `radius` cells of `current`, other than `current`
/// itself, that is neither a wall or hole nor touching one. Ties are broken
/// uniformly at random.
pub fn safe_destination<R: Rng>(grid: &Grid, current: CellCoord, radius: i32, rng: &mut R) -> Option<CellCoord> {
    let mut lowest = f64::INFINITY;
    let mut candidates = Vec::new();
    for dr in -radius..=radius {
        for dc in -radius..=radius {
            if dr == 0 && dc == 0 {
                continue;
            }
            let coord = CellCoord::new(current.col + dc, current.row + dr);
            let Some(cell) = grid.cell(coord) else {
                continue;
            };
            if is_wall_or_hole(cell) || grid.is_adjacent_to_wall_or_hole(coord) {
                continue;
            }
            if cell.danger < lowest {
                lowest = cell.danger;
                candidates.clear();
                candidates.push(coord);
            } else if cell.danger == lowest {
                candidates.push(coord);
            }
        }
    }
    candidates.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::tests::grid_from_ascii;
    use crate::types::{ProjectileId, TankId, TankKind, Team};
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn snapshot(id: u32, x: f64, y: f64) -> TankSnapshot {
        TankSnapshot {
            id: TankId(id),
            team: Team::A,
            kind: TankKind::Player,
            rect: Rect::new(x, y, 18.0, 18.0),
            velocity: Point::default(),
            heading: 0.0,
        }
    }

    fn projectile(position: Point, velocity: Point) -> Projectile {
        Projectile {
            id: ProjectileId(1),
            owner: TankId(9),
            owner_team: Team::A,
            position,
            velocity,
            radius: 4.0,
            bounces: 0,
            max_bounces: 0,
            to_destroy: false,
        }
    }

    #[test]
    fn test_nearest_target() {
        let tanks = [snapshot(1, 300.0, 0.0), snapshot(2, 50.0, 40.0), snapshot(3, 50.0, 40.0)];
        let nearest = nearest_target(Point::new(0.0, 0.0), &tanks).unwrap();
        assert_eq!(nearest.id, TankId(2));
        assert!(nearest_target(Point::default(), &[]).is_none());
    }

    #[test]
    fn test_incoming_threat_picks_nearest_on_course() {
        let own = Rect::new(100.0, 100.0, 18.0, 18.0);
        let projectiles = [
            // On course, 30 px away.
            projectile(Point::new(79.0, 109.0), Point::new(6.5, 0.0)),
            // On course, 20 px away.
            projectile(Point::new(109.0, 129.0), Point::new(0.0, -6.5)),
            // Close but flying away.
            projectile(Point::new(109.0, 90.0), Point::new(0.0, -6.5)),
        ];
        let threat = incoming_threat(&own, &projectiles, 50.0, 50.0).unwrap();
        assert_eq!(threat, Point::new(109.0, 129.0));
    }

    #[test]
    fn test_incoming_threat_ignores_distant_projectiles() {
        let own = Rect::new(100.0, 100.0, 18.0, 18.0);
        let far = [projectile(Point::new(0.0, 109.0), Point::new(6.5, 0.0))];
        assert!(incoming_threat(&own, &far, 50.0, 50.0).is_none());
    }

    #[test]
    fn test_direct_shot_blocked_by_line_or_ally() {
        let from = Point::new(0.0, 0.0);
        let target = Point::new(100.0, 0.0);
        let wall = [CollisionLine::new(50.0, -10.0, 50.0, 10.0)];
        assert!(!direct_shot_clear(from, target, &wall, &[]));
        let ally = [Rect::new(40.0, -5.0, 10.0, 10.0)];
        assert!(!direct_shot_clear(from, target, &[], &ally));
        assert!(direct_shot_clear(from, target, &[], &[]));
    }

    #[test]
    fn test_reflected_shot_off_a_single_wall() {
        let wall = [CollisionLine::new(0.0, 0.0, 200.0, 0.0)];
        let aim = reflected_shot(Point::new(50.0, 50.0), Point::new(150.0, 50.0), &wall, &[]).unwrap();
        assert_approx_eq!(aim.x, 100.0);
        assert_approx_eq!(aim.y, 0.0);
    }

    #[test]
    fn test_reflected_shot_prefers_shorter_path() {
        let lines = [
            CollisionLine::new(0.0, 0.0, 200.0, 0.0),
            CollisionLine::new(0.0, 80.0, 200.0, 80.0),
        ];
        // Target sits closer to the lower line.
        let aim = reflected_shot(Point::new(50.0, 60.0), Point::new(150.0, 60.0), &lines, &[]).unwrap();
        assert_approx_eq!(aim.y, 80.0);
    }

    #[test]
    fn test_reflected_shot_rejects_blocked_legs() {
        let lines = [
            CollisionLine::new(0.0, 0.0, 200.0, 0.0),
            // Blocks the bounce leg from (100, 0) to the target.
            CollisionLine::new(110.0, -5.0, 140.0, 45.0),
        ];
        let from = Point::new(50.0, 50.0);
        let target = Point::new(150.0, 50.0);
        assert!(reflected_shot(from, target, &lines[..1], &[]).is_some());
        let aim = reflected_shot(from, target, &lines, &[]);
        assert!(aim.is_none_or(|p| p.y != 0.0));

        let ally = [Rect::new(70.0, 20.0, 10.0, 10.0)];
        assert!(reflected_shot(from, target, &lines[..1], &ally).is_none());
    }

    #[test]
    fn test_dodge_vector() {
        let position = Point::new(100.0, 100.0);
        let incoming = [projectile(Point::new(40.0, 100.0), Point::new(6.5, 0.0))];
        let dodge = dodge_vector(position, &incoming, 1.0, 120.0);
        assert_approx_eq!(dodge.x, 1.0);
        assert_approx_eq!(dodge.y, 0.0);

        let receding = [projectile(Point::new(40.0, 100.0), Point::new(-6.5, 0.0))];
        assert!(dodge_vector(position, &receding, 1.0, 120.0).is_zero());

        let distant = [projectile(Point::new(-100.0, 100.0), Point::new(6.5, 0.0))];
        assert!(dodge_vector(position, &distant, 1.0, 120.0).is_zero());
    }

    #[test]
    fn test_safe_destination_avoids_walls_and_danger() {
        let mut grid = grid_from_ascii(&[
            "#.......",
            "........",
            "........",
            "........",
        ]);
        grid.update_danger(std::iter::empty(), Some(Point::new(10.0, 70.0)));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let dest = safe_destination(&grid, CellCoord::new(3, 2), 15, &mut rng).unwrap();
            assert!(!grid.is_blocked(dest));
            assert!(!grid.is_adjacent_to_wall_or_hole(dest));
            // Danger from the target at (0,3) fades to zero nowhere on this
            // small grid, so the farthest column is always safest.
            assert_eq!(dest.col, 7);
        }
    }

    #[test]
    fn test_safe_destination_never_returns_current_cell() {
        // Every cell ties at zero danger, so only the exclusion keeps the
        // tank's own cell out of the draw.
        let grid = grid_from_ascii(&["...", "...", "..."]);
        let mut rng = StdRng::seed_from_u64(3);
        let current = CellCoord::new(1, 1);
        for _ in 0..50 {
            let dest = safe_destination(&grid, current, 1, &mut rng).unwrap();
            assert_ne!(dest, current);
        }
        assert!(safe_destination(&grid, current, 0, &mut rng).is_none());
    }

    #[test]
    fn test_safe_destination_none_when_everything_blocked() {
        let grid = grid_from_ascii(&["###", "#.#", "###"]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(safe_destination(&grid, CellCoord::new(1, 1), 5, &mut rng).is_none());
    }
}
