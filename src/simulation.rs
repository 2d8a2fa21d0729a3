use crate::ai::model::{self, ModelHandle};
use crate::ai::{LearningBrain, PlayerControl, ReplayBuffer, TacticalBrain, TickContext};
use crate::config::{self, PlayerSlot, SimConfig};
use crate::error::LevelError;
use crate::grid::Grid;
use crate::level::{LevelData, LevelSource, SpawnPoint};
use crate::projectile::{FuturePosition, Projectile, ProjectileUpdate, Shot};
use crate::tank::{Tank, TankBody, TankSnapshot};
use crate::types::{PlayerInput, Point, ProjectileId, Rect, TankId, TankKind, Team};
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Only the player's side was left. The next level is loaded, or the
    /// cleared one is replayed if the next level failed to load.
    LevelCleared { level: usize },
    /// The player's side was wiped out; the level restarts.
    LevelLost { level: usize },
    /// The last level was cleared. Further ticks do nothing.
    CampaignComplete,
}

/// Summary of one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub step: u64,
    pub shots_fired: usize,
    pub destroyed: Vec<TankId>,
    /// A model training pass ran this tick.
    pub trained: bool,
    pub outcome: Option<RoundOutcome>,
}

/// The simulation encapsulates one campaign: the loaded level, the tank
/// roster, projectiles in flight and the learning state.
pub struct Simulation {
    config: SimConfig,
    levels: Box<dyn LevelSource>,
    level_number: usize,
    /// Pristine copy of the current level, used for restarts.
    level: LevelData,
    /// Working grid; its danger values change every tick.
    grid: Grid,
    tanks: Vec<Tank>,
    projectiles: Vec<Projectile>,
    rng: StdRng,
    step: u64,
    next_projectile_id: u64,
    replay: ReplayBuffer,
    model: ModelHandle,
    level_loaded: bool,
    finished: bool,
}

impl Simulation {
    /// Starts at level 1 with the process-wide shared model.
    pub fn new(config: SimConfig, levels: Box<dyn LevelSource>) -> Result<Self, LevelError> {
        let model = model::shared_model(config.learning.action_space.len(), config.learning.aux_len());
        Self::with_model(config, levels, model)
    }

    /// Starts at level 1 with an explicit model.
    pub fn with_model(config: SimConfig, levels: Box<dyn LevelSource>, model: ModelHandle) -> Result<Self, LevelError> {
        let level = levels.level(1)?;
        info!(
            "Simulation starting: player slot {:?}, seed {}",
            config.player_slot, config.seed
        );
        let mut sim = Simulation {
            rng: StdRng::seed_from_u64(config.seed),
            replay: ReplayBuffer::new(config.learning.replay_capacity),
            config,
            levels,
            level_number: 1,
            grid: level.grid.clone(),
            level,
            tanks: Vec::new(),
            projectiles: Vec::new(),
            step: 0,
            next_projectile_id: 0,
            model,
            level_loaded: false,
            finished: false,
        };
        sim.rebuild();
        Ok(sim)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn level_number(&self) -> usize {
        self.level_number
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn level(&self) -> &LevelData {
        &self.level
    }

    pub fn tanks(&self) -> &[Tank] {
        &self.tanks
    }

    pub fn tank(&self, id: TankId) -> Option<&Tank> {
        self.tanks.iter().find(|t| t.body.id == id)
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn replay(&self) -> &ReplayBuffer {
        &self.replay
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn is_level_loaded(&self) -> bool {
        self.level_loaded
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Loads level `number`. On failure the current level stays in place.
    pub fn load_level(&mut self, number: usize) -> Result<(), LevelError> {
        let level = self.levels.level(number)?;
        self.level = level;
        self.level_number = number;
        self.rebuild();
        Ok(())
    }

    /// Tears down the current round and respawns from the pristine level.
    pub fn rebuild(&mut self) {
        self.level_loaded = false;
        self.grid = self.level.grid.clone();
        self.projectiles.clear();

        let spawns = self.level.spawns.clone();
        let tanks: Vec<Tank> = spawns
            .iter()
            .enumerate()
            .map(|(i, spawn)| self.spawn_tank(TankId(i as u32 + 1), spawn))
            .collect();
        self.tanks = tanks;

        self.level_loaded = true;
        info!(
            "Level {} loaded: {}x{} grid, {} collision lines, {} tanks",
            self.level_number,
            self.grid.cols(),
            self.grid.rows(),
            self.level.lines.len(),
            self.tanks.len()
        );
    }

    /// The kind occupying the player spawn cell.
    fn player_kind(&self) -> TankKind {
        match self.config.player_slot {
            PlayerSlot::Human => TankKind::Player,
            PlayerSlot::Learning => TankKind::Learning,
            PlayerSlot::Archetype(kind) if self.config.profile(kind).is_some() => kind,
            PlayerSlot::Archetype(kind) => {
                warn!("{} cannot fill the player slot, using a human player", kind.name());
                TankKind::Player
            }
        }
    }

    fn spawn_tank(&mut self, id: TankId, spawn: &SpawnPoint) -> Tank {
        let (team, kind) = match spawn.kind {
            TankKind::Player => (Team::A, self.player_kind()),
            kind => (Team::B, kind),
        };
        let rect = Rect::around(self.grid.cell_center(spawn.coord), config::TANK_SIZE / 2.0);
        let position = Point::new(rect.x, rect.y);

        match kind {
            TankKind::Learning => {
                let learning = self.config.learning;
                let body = TankBody::new(id, team, kind, position, learning.speed, learning.max_shots);
                Tank::new(body, Box::new(LearningBrain::new(learning, self.model.clone())))
            }
            _ => match self.config.profile(kind) {
                Some(profile) => {
                    let body = TankBody::new(id, team, kind, position, profile.speed(), profile.max_shots);
                    Tank::new(body, Box::new(TacticalBrain::new(profile, &mut self.rng)))
                }
                None => {
                    let body = TankBody::new(
                        id,
                        team,
                        TankKind::Player,
                        position,
                        config::PLAYER_SPEED,
                        config::PLAYER_MAX_SHOTS,
                    );
                    Tank::new(body, Box::new(PlayerControl))
                }
            },
        }
    }

    /// Adds a projectile to play and returns its id.
    pub fn spawn_projectile(&mut self, shot: Shot) -> ProjectileId {
        self.next_projectile_id += 1;
        let id = ProjectileId(self.next_projectile_id);
        self.projectiles.push(Projectile::new(id, shot));
        id
    }

    /// Advances the simulation by one tick scaled by `delta`.
    pub fn tick(&mut self, delta: f64, input: &PlayerInput) -> TickReport {
        let mut report = TickReport {
            step: self.step,
            ..Default::default()
        };
        if !self.level_loaded {
            return report;
        }
        self.step += 1;
        report.step = self.step;
        crate::debug_sim!(
            "Tick {} level {}: {} tanks, {} projectiles",
            self.step,
            self.level_number,
            self.tanks.len(),
            self.projectiles.len()
        );

        // Phase 1: Danger field
        self.update_danger();

        // Phase 2: Hit flags
        self.flag_hits();

        // Phase 3 and 4: Team A, then team B
        for team in [Team::A, Team::B] {
            report.shots_fired += self.run_team(team, delta, input);
        }

        // Phase 5: Projectiles
        report.destroyed = self.update_projectiles(delta);

        // Phase 6: Prune the dead
        self.tanks.retain(|t| t.body.alive);

        report.trained = self.maybe_train();

        // Phase 7: Round end and level progression
        report.outcome = self.check_round();
        report
    }

    fn update_danger(&mut self) {
        let target = self
            .tanks
            .iter()
            .find(|t| t.body.alive && t.body.team == Team::A)
            .map(|t| t.body.center());
        let trajectories: Vec<(Point, Point)> = self
            .projectiles
            .iter()
            .map(|p| (p.position, p.velocity))
            .collect();
        self.grid.update_danger(trajectories, target);
    }

    /// Raises event flags for every projectile currently touching a tank.
    fn flag_hits(&mut self) {
        for projectile in &self.projectiles {
            let rect = projectile.rect();
            let mut enemy_hit = false;
            for tank in self
                .tanks
                .iter_mut()
                .filter(|t| t.body.alive && t.body.rect().overlaps(&rect))
            {
                // Team-mates' projectiles raise no flags.
                if tank.body.id == projectile.owner {
                    tank.body.got_hit_by_self = true;
                } else if tank.body.team != projectile.owner_team {
                    tank.body.got_hit = true;
                    enemy_hit = true;
                }
            }
            if enemy_hit {
                if let Some(owner) = self.tanks.iter_mut().find(|t| t.body.id == projectile.owner) {
                    owner.body.hit_enemy = true;
                }
            }
        }
    }

    /// Updates every living tank of `team` against one roster snapshot and
    /// returns the number of shots fired.
    fn run_team(&mut self, team: Team, delta: f64, input: &PlayerInput) -> usize {
        let snapshots: Vec<TankSnapshot> = self
            .tanks
            .iter()
            .filter(|t| t.body.alive)
            .map(|t| t.body.snapshot())
            .collect();
        let ctx = TickContext {
            delta,
            grid: &self.grid,
            lines: &self.level.lines,
            projectiles: &self.projectiles,
            tanks: &snapshots,
            input,
        };

        let mut shots = Vec::new();
        for tank in self
            .tanks
            .iter_mut()
            .filter(|t| t.body.alive && t.body.team == team)
        {
            let output = tank.update(&ctx, &mut self.rng);
            if let Some(shot) = output.shot {
                shots.push(shot);
            }
            if let Some(experience) = output.experience {
                self.replay.push(experience);
            }
        }

        let fired = shots.len();
        for shot in shots {
            self.spawn_projectile(shot);
        }
        fired
    }

    /// Resolves tank hits, then moves, bounces and destroys projectiles.
    /// Returns the tanks destroyed this tick.
    fn update_projectiles(&mut self, delta: f64) -> Vec<TankId> {
        let mut destroyed = Vec::new();
        for projectile in &mut self.projectiles {
            let rect = projectile.rect();
            if let Some(tank) = self
                .tanks
                .iter_mut()
                .find(|t| t.body.alive && t.body.rect().overlaps(&rect))
            {
                tank.body.alive = false;
                projectile.to_destroy = true;
                destroyed.push(tank.body.id);
                info!(
                    target: "sim",
                    "Tank {} ({}) destroyed by tank {}",
                    tank.body.id,
                    tank.behavior_name(),
                    projectile.owner
                );
            }
        }

        let futures: Vec<FuturePosition> = self
            .projectiles
            .iter()
            .filter(|p| !p.to_destroy)
            .map(|p| p.snapshot(delta))
            .collect();
        let bounds = self.grid.bounds();
        let mut partners = Vec::new();
        for projectile in self.projectiles.iter_mut().filter(|p| !p.to_destroy) {
            if let ProjectileUpdate::Collided(other) = projectile.update(delta, &self.level.lines, &futures) {
                partners.push(other);
            }
            if projectile.is_outside(&bounds) {
                crate::debug_bullet!("Projectile {} left the level", projectile.id.0);
                projectile.to_destroy = true;
            }
        }
        for projectile in &mut self.projectiles {
            if partners.contains(&projectile.id) {
                projectile.to_destroy = true;
            }
        }

        let (gone, live): (Vec<Projectile>, Vec<Projectile>) =
            std::mem::take(&mut self.projectiles).into_iter().partition(|p| p.to_destroy);
        self.projectiles = live;
        for projectile in gone {
            if let Some(owner) = self.tanks.iter_mut().find(|t| t.body.id == projectile.owner) {
                owner.body.projectile_removed();
            }
        }
        destroyed
    }

    fn maybe_train(&mut self) -> bool {
        let learning = &self.config.learning;
        if self.replay.len() < learning.train_threshold
            || learning.train_interval == 0
            || self.step % learning.train_interval != 0
        {
            return false;
        }
        self.model
            .train_from(&self.replay, learning.batch_size, learning.gamma, &mut self.rng)
    }

    fn check_round(&mut self) -> Option<RoundOutcome> {
        let player_side = self.tanks.iter().any(|t| t.body.team == Team::A);
        let enemy_side = self.tanks.iter().any(|t| t.body.team == Team::B);
        let level = self.level_number;

        if !player_side {
            info!("Level {} lost at step {}, restarting", level, self.step);
            self.rebuild();
            return Some(RoundOutcome::LevelLost { level });
        }
        if enemy_side {
            return None;
        }

        info!("Level {} cleared at step {}", level, self.step);
        match self.load_level(level + 1) {
            Ok(()) => Some(RoundOutcome::LevelCleared { level }),
            Err(LevelError::Missing(_)) => {
                info!("Campaign complete after {} levels", level);
                self.level_loaded = false;
                self.finished = true;
                Some(RoundOutcome::CampaignComplete)
            }
            Err(e) => {
                warn!("Could not load level {}: {}; replaying level {}", level + 1, e, level);
                self.rebuild();
                Some(RoundOutcome::LevelCleared { level })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::model::LinearQModel;
    use crate::config::ArchetypeProfile;
    use crate::level::InMemoryLevels;

    const DUEL: &str = "\
1 1 1 1 1 1 1 1
1 3 0 0 0 0 4 1
1 1 1 1 1 1 1 1
";

    fn private_model(config: &SimConfig) -> ModelHandle {
        ModelHandle::new(Box::new(LinearQModel::new(
            config.learning.action_space.len(),
            config.learning.aux_len(),
            7,
        )))
    }

    fn sim_with(config: SimConfig, levels: &[&str]) -> Simulation {
        let model = private_model(&config);
        let source = InMemoryLevels::new(levels.iter().copied());
        Simulation::with_model(config, Box::new(source), model).unwrap()
    }

    fn idle() -> PlayerInput {
        PlayerInput::default()
    }

    fn shoot_right() -> PlayerInput {
        PlayerInput {
            aim: Point::new(130.0, 30.0),
            fire: true,
            ..Default::default()
        }
    }

    /// Ticks until a round outcome or the tick budget runs out.
    fn run_until_outcome(sim: &mut Simulation, first: PlayerInput, ticks: usize) -> Option<TickReport> {
        let mut input = first;
        for _ in 0..ticks {
            let report = sim.tick(1.0, &input);
            input = idle();
            if report.outcome.is_some() {
                return Some(report);
            }
        }
        None
    }

    #[test]
    fn test_spawns_fill_teams() {
        let sim = sim_with(SimConfig::default(), &[DUEL]);
        assert!(sim.is_level_loaded());
        assert_eq!(sim.tanks().len(), 2);

        let player = &sim.tanks()[0];
        assert_eq!(player.body.team, Team::A);
        assert_eq!(player.body.kind, TankKind::Player);
        assert_eq!(player.body.position, Point::new(21.0, 21.0));

        let brown = &sim.tanks()[1];
        assert_eq!(brown.body.team, Team::B);
        assert_eq!(brown.behavior_name(), "brown");
        assert_eq!(brown.body.max_shots, 1);
    }

    #[test]
    fn test_archetype_in_player_slot() {
        let config = SimConfig {
            player_slot: PlayerSlot::Archetype(TankKind::Grey),
            ..SimConfig::default()
        };
        let sim = sim_with(config, &[DUEL]);
        assert_eq!(sim.tanks()[0].body.team, Team::A);
        assert_eq!(sim.tanks()[0].behavior_name(), "grey");
    }

    #[test]
    fn test_bad_first_level_is_an_error() {
        let source = InMemoryLevels::new(["1 1\n1 9\n"]);
        let config = SimConfig::default();
        let model = private_model(&config);
        assert!(Simulation::with_model(config, Box::new(source), model).is_err());
    }

    #[test]
    fn test_hit_flags() {
        let mut sim = sim_with(SimConfig::default(), &[DUEL]);
        let brown_center = sim.tanks()[1].body.center();
        let player_center = sim.tanks()[0].body.center();
        sim.spawn_projectile(Shot {
            owner: TankId(1),
            owner_team: Team::A,
            origin: brown_center,
            angle: 0.0,
        });
        sim.spawn_projectile(Shot {
            owner: TankId(1),
            owner_team: Team::A,
            origin: player_center,
            angle: 0.0,
        });
        sim.flag_hits();

        let player = &sim.tanks()[0].body;
        let brown = &sim.tanks()[1].body;
        assert!(brown.got_hit);
        assert!(player.hit_enemy);
        assert!(player.got_hit_by_self);
        assert!(!player.got_hit);
    }

    #[test]
    fn test_friendly_fire_raises_no_flags() {
        let level = "\
1 1 1 1 1 1 1 1
1 3 0 4 0 4 0 1
1 1 1 1 1 1 1 1
";
        let mut sim = sim_with(SimConfig::default(), &[level]);
        let teammate_center = sim.tanks()[2].body.center();
        sim.spawn_projectile(Shot {
            owner: TankId(2),
            owner_team: Team::B,
            origin: teammate_center,
            angle: 0.0,
        });
        sim.flag_hits();

        let shooter = &sim.tanks()[1].body;
        let teammate = &sim.tanks()[2].body;
        assert!(!teammate.got_hit);
        assert!(!shooter.hit_enemy);
        assert!(!shooter.got_hit_by_self);
    }

    #[test]
    fn test_projectile_leaving_level_frees_the_slot() {
        let mut sim = sim_with(SimConfig::default(), &[DUEL]);
        let input = PlayerInput {
            aim: Point::new(30.0, 0.0),
            fire: true,
            ..Default::default()
        };
        let report = sim.tick(1.0, &input);
        assert_eq!(report.shots_fired, 1);
        assert!(sim.projectiles().is_empty());
        assert_eq!(sim.tanks()[0].body.fired_bullets, 0);
    }

    #[test]
    fn test_clearing_last_level_completes_campaign() {
        let mut sim = sim_with(SimConfig::default(), &[DUEL]);
        let report = run_until_outcome(&mut sim, shoot_right(), 40).unwrap();
        assert_eq!(report.destroyed, vec![TankId(2)]);
        assert_eq!(report.outcome, Some(RoundOutcome::CampaignComplete));
        assert!(sim.is_finished());

        let step = sim.step();
        assert_eq!(sim.tick(1.0, &idle()).step, step);
    }

    #[test]
    fn test_clearing_advances_to_next_level() {
        let mut sim = sim_with(SimConfig::default(), &[DUEL, DUEL]);
        let report = run_until_outcome(&mut sim, shoot_right(), 40).unwrap();
        assert_eq!(report.outcome, Some(RoundOutcome::LevelCleared { level: 1 }));
        assert_eq!(sim.level_number(), 2);
        assert_eq!(sim.tanks().len(), 2);
        assert!(sim.projectiles().is_empty());
    }

    #[test]
    fn test_broken_next_level_replays_current() {
        let mut sim = sim_with(SimConfig::default(), &[DUEL, "1 x\n"]);
        let report = run_until_outcome(&mut sim, shoot_right(), 40).unwrap();
        assert_eq!(report.outcome, Some(RoundOutcome::LevelCleared { level: 1 }));
        assert_eq!(sim.level_number(), 1);
        assert_eq!(sim.tanks().len(), 2);
    }

    #[test]
    fn test_losing_restarts_level() {
        let mut brown = ArchetypeProfile::brown();
        brown.direct_shot_chance = 1.0;
        let config = SimConfig {
            profiles: vec![brown],
            ..SimConfig::default()
        };
        let mut sim = sim_with(config, &[DUEL]);
        let report = run_until_outcome(&mut sim, idle(), 200).unwrap();
        assert_eq!(report.destroyed, vec![TankId(1)]);
        assert_eq!(report.outcome, Some(RoundOutcome::LevelLost { level: 1 }));
        assert_eq!(sim.level_number(), 1);
        assert_eq!(sim.tanks().len(), 2);
        assert!(sim.tanks().iter().all(|t| t.body.fired_bullets == 0));
    }

    #[test]
    fn test_learning_tank_feeds_replay_and_trains() {
        let mut config = SimConfig {
            player_slot: PlayerSlot::Learning,
            ..SimConfig::default()
        };
        config.learning.train_threshold = 4;
        config.learning.train_interval = 5;
        config.learning.batch_size = 2;
        let mut sim = sim_with(config, &[DUEL]);
        assert_eq!(sim.tanks()[0].behavior_name(), "learning");

        let mut trained = Vec::new();
        for _ in 0..5 {
            trained.push(sim.tick(1.0, &idle()).trained);
        }
        assert_eq!(sim.replay().len(), 5);
        assert_eq!(trained, vec![false, false, false, false, true]);
        assert_eq!(sim.model().training_passes(), 1);
    }

    #[test]
    fn test_tick_is_gated_while_unloaded() {
        let mut sim = sim_with(SimConfig::default(), &[DUEL]);
        sim.level_loaded = false;
        let report = sim.tick(1.0, &idle());
        assert_eq!(report.step, 0);
        assert_eq!(sim.step(), 0);
    }
}
