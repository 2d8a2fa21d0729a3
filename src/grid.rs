use crate::config::{self, CELL_SIZE};
use crate::types::{Point, Rect, TankKind};

/// Column/row address of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub col: i32,
    pub row: i32,
}

impl CellCoord {
    pub const fn new(col: i32, row: i32) -> Self {
        CellCoord { col, row }
    }

    /// Chebyshev (king-move) distance between two cells.
    pub fn chebyshev(&self, other: &CellCoord) -> i32 {
        (self.col - other.col).abs().max((self.row - other.row).abs())
    }
}

/// What occupies a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Path,
    Wall,
    Hole,
    /// Spawn marker; passable like a path cell once the level is built.
    Spawn(TankKind),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub kind: CellKind,
    /// Transient threat estimate, rebuilt every tick.
    pub danger: f64,
}

impl Cell {
    pub fn new(kind: CellKind) -> Self {
        Cell { kind, danger: 0.0 }
    }
}

pub fn is_wall_or_hole(cell: &Cell) -> bool {
    matches!(cell.kind, CellKind::Wall | CellKind::Hole)
}

/// Fixed-size level grid in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Builds a grid of `rows * cols` path cells.
    pub fn new(rows: usize, cols: usize) -> Self {
        Grid {
            rows,
            cols,
            cells: vec![Cell::new(CellKind::Path); rows * cols],
        }
    }

    /// Builds a grid from rows of cell kinds. Callers guarantee every row has
    /// the same length; level parsing rejects ragged input before this point.
    pub(crate) fn from_kinds(kinds: Vec<Vec<CellKind>>) -> Self {
        let rows = kinds.len();
        let cols = kinds.first().map_or(0, Vec::len);
        debug_assert!(kinds.iter().all(|row| row.len() == cols), "ragged grid rows");
        let cells = kinds.into_iter().flatten().map(Cell::new).collect();
        Grid { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Pixel width of the whole grid.
    pub fn width(&self) -> f64 {
        self.cols as f64 * CELL_SIZE
    }

    /// Pixel height of the whole grid.
    pub fn height(&self) -> f64 {
        self.rows as f64 * CELL_SIZE
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width(), self.height())
    }

    pub fn in_bounds(&self, coord: CellCoord) -> bool {
        coord.col >= 0
            && coord.row >= 0
            && (coord.col as usize) < self.cols
            && (coord.row as usize) < self.rows
    }

    fn index(&self, coord: CellCoord) -> Option<usize> {
        if self.in_bounds(coord) {
            Some(coord.row as usize * self.cols + coord.col as usize)
        } else {
            None
        }
    }

    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.index(coord).map(|i| &self.cells[i])
    }

    /// Out-of-bounds coordinates count as blocked.
    pub fn is_blocked(&self, coord: CellCoord) -> bool {
        self.cell(coord).is_none_or(is_wall_or_hole)
    }

    /// True if any of the eight neighbours of `coord` is a wall or hole.
    pub fn is_adjacent_to_wall_or_hole(&self, coord: CellCoord) -> bool {
        for dr in -1..=1 {
            for dc in -1..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let neighbor = CellCoord::new(coord.col + dc, coord.row + dr);
                if self.cell(neighbor).is_some_and(is_wall_or_hole) {
                    return true;
                }
            }
        }
        false
    }

    /// Cell containing the given pixel position (may be out of bounds).
    pub fn coord_at(&self, point: Point) -> CellCoord {
        CellCoord::new(
            (point.x / CELL_SIZE).floor() as i32,
            (point.y / CELL_SIZE).floor() as i32,
        )
    }

    /// Pixel centre of a cell.
    pub fn cell_center(&self, coord: CellCoord) -> Point {
        Point::new(
            (coord.col as f64 + 0.5) * CELL_SIZE,
            (coord.row as f64 + 0.5) * CELL_SIZE,
        )
    }

    pub fn cell_rect(&self, coord: CellCoord) -> Rect {
        Rect::new(
            coord.col as f64 * CELL_SIZE,
            coord.row as f64 * CELL_SIZE,
            CELL_SIZE,
            CELL_SIZE,
        )
    }

    /// True if `rect` overlaps any wall or hole cell, or leaves the grid.
    pub fn overlaps_blocked(&self, rect: &Rect) -> bool {
        if rect.x < 0.0 || rect.y < 0.0 || rect.right() > self.width() || rect.bottom() > self.height() {
            return true;
        }
        let first = self.coord_at(Point::new(rect.x, rect.y));
        let last = self.coord_at(Point::new(rect.right(), rect.bottom()));
        for row in first.row..=last.row {
            for col in first.col..=last.col {
                let coord = CellCoord::new(col, row);
                if self.cell(coord).is_some_and(is_wall_or_hole) && self.cell_rect(coord).overlaps(rect) {
                    return true;
                }
            }
        }
        false
    }

    /// Bresenham walk between two cells; true if a wall or hole lies on it.
    pub fn is_sight_blocked(&self, from: CellCoord, to: CellCoord) -> bool {
        let dx = (to.col - from.col).abs();
        let dy = (to.row - from.row).abs();
        let sx = if from.col < to.col { 1 } else { -1 };
        let sy = if from.row < to.row { 1 } else { -1 };
        let mut err = dx - dy;
        let mut current = from;
        loop {
            if self.cell(current).is_some_and(is_wall_or_hole) {
                return true;
            }
            if current == to {
                return false;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                current.col += sx;
            }
            if e2 < dx {
                err += dx;
                current.row += sy;
            }
        }
    }

    /// Recomputes every cell's danger value from projectile trajectories and
    /// the primary target's position.
    ///
    /// Each projectile adds `BULLET_DANGER_FACTOR / (step + 1)` to the cell it
    /// is predicted to occupy at every step of the prediction horizon. The
    /// target adds `TARGET_DANGER_FACTOR - falloff * distance` to every cell it
    /// can see.
    pub fn update_danger<I>(&mut self, projectiles: I, target: Option<Point>)
    where
        I: IntoIterator<Item = (Point, Point)>,
    {
        for cell in &mut self.cells {
            cell.danger = 0.0;
        }

        for (position, velocity) in projectiles {
            for step in 0..=config::DANGER_PREDICTION_STEPS {
                let predicted = position + velocity * step as f64;
                if let Some(i) = self.index(self.coord_at(predicted)) {
                    self.cells[i].danger += config::BULLET_DANGER_FACTOR / (step as f64 + 1.0);
                }
            }
        }

        let Some(target) = target else {
            return;
        };
        let origin = self.coord_at(target);
        if !self.in_bounds(origin) {
            return;
        }
        for row in 0..self.rows as i32 {
            for col in 0..self.cols as i32 {
                let coord = CellCoord::new(col, row);
                let danger = config::TARGET_DANGER_FACTOR
                    - config::TARGET_DANGER_FALLOFF * origin.chebyshev(&coord) as f64;
                if danger > 0.0 && !self.is_sight_blocked(origin, coord) {
                    if let Some(i) = self.index(coord) {
                        self.cells[i].danger += danger;
                    }
                }
            }
        }
    }

    /// Wall occupancy flags (wall = 1, anything else = 0) cropped or
    /// zero-padded to `rows * cols`.
    pub fn wall_flags(&self, rows: usize, cols: usize) -> Vec<f32> {
        let mut flags = vec![0.0; rows * cols];
        for row in 0..rows.min(self.rows) {
            for col in 0..cols.min(self.cols) {
                if self.cells[row * self.cols + col].kind == CellKind::Wall {
                    flags[row * cols + col] = 1.0;
                }
            }
        }
        flags
    }
}
