use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process;
use tankbattle::config::{self, PlayerSlot, SimConfig};
use tankbattle::level::{EmbeddedLevels, FileLevels, LevelSource};
use tankbattle::{assets, logging};
use tankbattle::types::{PlayerInput, TankKind};
use tankbattle::{RoundOutcome, Simulation};

/// Who occupies the player spawn cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Slot {
    /// Human tank fed with idle input.
    Human,
    Brown,
    Grey,
    Green,
    Pink,
    Learning,
}

impl From<Slot> for PlayerSlot {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Human => PlayerSlot::Human,
            Slot::Brown => PlayerSlot::Archetype(TankKind::Brown),
            Slot::Grey => PlayerSlot::Archetype(TankKind::Grey),
            Slot::Green => PlayerSlot::Archetype(TankKind::Green),
            Slot::Pink => PlayerSlot::Archetype(TankKind::Pink),
            Slot::Learning => PlayerSlot::Learning,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless tank battle campaign runner", long_about = None)]
struct Args {
    /// Level files played in order. The built-in campaign is used when empty.
    levels: Vec<PathBuf>,

    /// Maximum number of ticks to simulate.
    #[arg(long, default_value_t = config::MAX_TICKS)]
    ticks: u64,

    /// Elapsed-time factor applied to every tick.
    #[arg(long, default_value_t = config::TICK_DELTA)]
    delta: f64,

    /// Tank placed in the player spawn cell.
    #[arg(long, value_enum, default_value_t = Slot::Learning)]
    player: Slot,

    /// Seed for every random decision in the run.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Debug filter to specify log topics (e.g., "tank,path")
    /// Available topics: sim, tank, bullet, path, learn, level
    #[arg(long)]
    debug_filter: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    let unknown = args.debug_filter.as_deref().map(logging::unknown_topics).unwrap_or_default();
    if let Err(e) = logging::init_logger(logging::level_from_str(&args.log_level), args.debug_filter) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    if !unknown.is_empty() {
        warn!(
            "Unknown debug topics {:?}; known topics are {}",
            unknown,
            logging::TOPICS.join(",")
        );
    }

    let levels: Box<dyn LevelSource> = if args.levels.is_empty() {
        info!("Using the built-in campaign ({} levels)", assets::embedded_level_count());
        Box::new(EmbeddedLevels)
    } else {
        info!("Using {} level file(s)", args.levels.len());
        Box::new(FileLevels::new(args.levels))
    };

    let sim_config = SimConfig {
        player_slot: args.player.into(),
        seed: args.seed,
        ..SimConfig::default()
    };
    let mut sim = match Simulation::new(sim_config, levels) {
        Ok(sim) => sim,
        Err(e) => {
            error!("Could not load the first level: {}", e);
            process::exit(1);
        }
    };

    let input = PlayerInput::default();
    let (mut cleared, mut lost, mut passes) = (0u32, 0u32, 0u32);
    info!("Simulating for a maximum of {} ticks.", args.ticks);
    for _ in 0..args.ticks {
        let report = sim.tick(args.delta, &input);
        passes += u32::from(report.trained);
        match report.outcome {
            Some(RoundOutcome::LevelCleared { .. }) => cleared += 1,
            Some(RoundOutcome::LevelLost { .. }) => lost += 1,
            Some(RoundOutcome::CampaignComplete) => {
                cleared += 1;
                break;
            }
            None => {}
        }
    }

    info!(
        "Finished after {} ticks on level {}: {} level(s) cleared, {} lost, {} training pass(es), {} experiences buffered{}",
        sim.step(),
        sim.level_number(),
        cleared,
        lost,
        passes,
        sim.replay().len(),
        if sim.is_finished() { ", campaign complete" } else { "" }
    );
}
