use super::{Behavior, TankOutput, TickContext};
use crate::tank::TankBody;
use crate::types::{PlayerInput, Point};
use rand::rngs::StdRng;
use std::f64::consts::FRAC_1_SQRT_2;

/// Drives a tank from [`PlayerInput`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PlayerControl;

/// Movement direction for the input; diagonals are scaled to unit length.
pub fn input_direction(input: &PlayerInput) -> Point {
    let dx = input.move_x.clamp(-1.0, 1.0);
    let dy = input.move_y.clamp(-1.0, 1.0);
    if dx != 0.0 && dy != 0.0 {
        Point::new(dx * FRAC_1_SQRT_2, dy * FRAC_1_SQRT_2)
    } else {
        Point::new(dx, dy)
    }
}

impl Behavior for PlayerControl {
    fn update(&mut self, body: &mut TankBody, ctx: &TickContext<'_>, _rng: &mut StdRng) -> TankOutput {
        let input = ctx.input;
        body.aim_at(input.aim);
        body.tick_recoil(ctx.delta);

        // Movement is locked while the last shot's recoil lasts
        if !body.is_recoiling() {
            let direction = input_direction(input);
            body.try_move(direction * (body.speed * ctx.delta), ctx.grid);
        }

        let shot = if input.fire { body.fire() } else { None };
        TankOutput::shot(shot)
    }

    fn name(&self) -> &'static str {
        "player"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::tank::TankSnapshot;
    use crate::types::{TankId, TankKind, Team};
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;

    fn run(body: &mut TankBody, input: PlayerInput) -> TankOutput {
        let grid = Grid::new(30, 40);
        let tanks: Vec<TankSnapshot> = Vec::new();
        let ctx = TickContext {
            delta: 1.0,
            grid: &grid,
            lines: &[],
            projectiles: &[],
            tanks: &tanks,
            input: &input,
        };
        let mut rng = StdRng::seed_from_u64(0);
        PlayerControl.update(body, &ctx, &mut rng)
    }

    fn player() -> TankBody {
        TankBody::new(TankId(1), Team::A, TankKind::Player, Point::new(100.0, 100.0), 2.0, 5)
    }

    #[test]
    fn test_diagonal_is_normalised() {
        let d = input_direction(&PlayerInput { move_x: 1.0, move_y: -1.0, ..Default::default() });
        assert_approx_eq!(d.length(), 1.0);
        assert!(input_direction(&PlayerInput::default()).is_zero());
    }

    #[test]
    fn test_moves_and_aims() {
        let mut tank = player();
        let input = PlayerInput {
            move_x: 1.0,
            move_y: 0.0,
            aim: Point::new(109.0, 300.0),
            fire: false,
        };
        assert!(run(&mut tank, input).shot.is_none());
        assert_approx_eq!(tank.position.x, 102.0);
        assert_approx_eq!(tank.turret_angle, std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn test_firing_pauses_movement() {
        let mut tank = player();
        let input = PlayerInput {
            move_x: 1.0,
            move_y: 0.0,
            aim: Point::new(500.0, 109.0),
            fire: true,
        };
        // First tick moves, then fires; the recoil blocks the next five moves.
        assert!(run(&mut tank, input).shot.is_some());
        assert_approx_eq!(tank.position.x, 102.0);
        let hold = PlayerInput { fire: false, ..input };
        for _ in 0..4 {
            run(&mut tank, hold);
        }
        assert_approx_eq!(tank.position.x, 102.0);
        run(&mut tank, hold);
        assert_approx_eq!(tank.position.x, 104.0);
    }
}
