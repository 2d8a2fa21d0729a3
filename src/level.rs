//! Level text format.
//!
//! A level is a block of grid rows (space separated cell codes), an empty
//! line, and an optional block of collision lines (`x1 y1 x2 y2` in pixels).
//!
//! Cell codes: 0 path, 1 wall, 2 hole, 3 player slot, 4 brown, 5 grey,
//! 6 green, 7 pink.

use crate::assets;
use crate::error::LevelError;
use crate::geometry::CollisionLine;
use crate::grid::{CellCoord, CellKind, Grid};
use crate::types::TankKind;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// A tank spawn marker. `TankKind::Player` marks the player slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub coord: CellCoord,
    pub kind: TankKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelData {
    pub grid: Grid,
    pub lines: Vec<CollisionLine>,
    /// Spawns in row-major order.
    pub spawns: Vec<SpawnPoint>,
}

fn cell_kind(code: i64) -> Option<CellKind> {
    let kind = match code {
        0 => CellKind::Path,
        1 => CellKind::Wall,
        2 => CellKind::Hole,
        3 => CellKind::Spawn(TankKind::Player),
        4 => CellKind::Spawn(TankKind::Brown),
        5 => CellKind::Spawn(TankKind::Grey),
        6 => CellKind::Spawn(TankKind::Green),
        7 => CellKind::Spawn(TankKind::Pink),
        _ => return None,
    };
    Some(kind)
}

pub fn parse_level(text: &str) -> Result<LevelData, LevelError> {
    let normalized = text.replace("\r\n", "\n");
    let mut lines = normalized
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .skip_while(|(_, l)| l.is_empty())
        .peekable();

    let mut rows: Vec<Vec<CellKind>> = Vec::new();
    let mut spawns = Vec::new();
    while let Some((line_no, line)) = lines.next_if(|(_, l)| !l.is_empty()) {
        let mut row = Vec::new();
        for token in line.split_whitespace() {
            let code: i64 = token.parse().map_err(|_| LevelError::BadToken {
                line: line_no,
                token: token.to_string(),
            })?;
            let kind = cell_kind(code).ok_or(LevelError::UnknownCell { line: line_no, code })?;
            if let CellKind::Spawn(tank) = kind {
                spawns.push(SpawnPoint {
                    coord: CellCoord::new(row.len() as i32, rows.len() as i32),
                    kind: tank,
                });
            }
            row.push(kind);
        }
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(LevelError::RaggedRow {
                    line: line_no,
                    expected: first.len(),
                    found: row.len(),
                });
            }
        }
        rows.push(row);
    }

    if rows.is_empty() || rows[0].is_empty() {
        return Err(LevelError::EmptyGrid);
    }

    let mut collision_lines = Vec::new();
    for (line_no, line) in lines.filter(|(_, l)| !l.is_empty()) {
        let coords = line
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| LevelError::BadToken {
                    line: line_no,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        match coords[..] {
            [x1, y1, x2, y2] => collision_lines.push(CollisionLine::new(x1, y1, x2, y2)),
            _ => warn!(
                target: "level",
                "line {}: expected 4 coordinates, found {}; skipped",
                line_no,
                coords.len()
            ),
        }
    }

    Ok(LevelData {
        grid: Grid::from_kinds(rows),
        lines: collision_lines,
        spawns,
    })
}

pub fn load_level(path: impl AsRef<Path>) -> Result<LevelData, LevelError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let level = parse_level(&text)?;
    info!(
        target: "level",
        "Loaded {} ({}x{} grid, {} collision lines)",
        path.display(),
        level.grid.cols(),
        level.grid.rows(),
        level.lines.len()
    );
    Ok(level)
}

/// Numbered campaign levels, starting at 1.
pub trait LevelSource {
    /// `LevelError::Missing` when no level with that number exists.
    fn level(&self, number: usize) -> Result<LevelData, LevelError>;
}

/// Levels compiled into the binary from `levels/`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedLevels;

impl LevelSource for EmbeddedLevels {
    fn level(&self, number: usize) -> Result<LevelData, LevelError> {
        let bytes = assets::get_level_bytes(number).ok_or(LevelError::Missing(number))?;
        parse_level(&String::from_utf8_lossy(&bytes))
    }
}

/// An explicit list of level files; level N is the Nth path.
#[derive(Debug, Clone)]
pub struct FileLevels {
    paths: Vec<PathBuf>,
}

impl FileLevels {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        FileLevels { paths }
    }
}

impl LevelSource for FileLevels {
    fn level(&self, number: usize) -> Result<LevelData, LevelError> {
        let path = number
            .checked_sub(1)
            .and_then(|i| self.paths.get(i))
            .ok_or(LevelError::Missing(number))?;
        load_level(path)
    }
}

/// Levels held as text, mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLevels {
    levels: Vec<String>,
}

impl InMemoryLevels {
    pub fn new<S: Into<String>>(levels: impl IntoIterator<Item = S>) -> Self {
        InMemoryLevels {
            levels: levels.into_iter().map(Into::into).collect(),
        }
    }
}

impl LevelSource for InMemoryLevels {
    fn level(&self, number: usize) -> Result<LevelData, LevelError> {
        let text = number
            .checked_sub(1)
            .and_then(|i| self.levels.get(i))
            .ok_or(LevelError::Missing(number))?;
        parse_level(text)
    }
}
