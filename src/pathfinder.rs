//! A* search over the level grid.
//!
//! Moves are 8-connected with Euclidean step costs and a Euclidean heuristic.
//! Tanks are kept away from walls and holes entirely: besides the usual
//! corner-cutting rule, no move may enter a cell that touches a wall or hole.
//!
//! NOTE: the wall-clearance rule also blocks orthogonal moves, so a goal cell
//! that touches a wall is unreachable and one-cell corridors are impassable.
//! Patrol tanks only pick wall-free destinations, which hides this in play, but
//! it is probably stricter than intended.

use crate::grid::{CellCoord, Grid};

/// Per-search bookkeeping for one grid cell.
#[derive(Debug, Clone, Copy)]
struct Node {
    g_cost: f64,
    h_cost: f64,
    f_cost: f64,
    parent: Option<usize>,
    open: bool,
    closed: bool,
}

impl Default for Node {
    fn default() -> Self {
        Node {
            g_cost: f64::INFINITY,
            h_cost: 0.0,
            f_cost: f64::INFINITY,
            parent: None,
            open: false,
            closed: false,
        }
    }
}

fn euclidean(a: CellCoord, b: CellCoord) -> f64 {
    let dx = (a.col - b.col) as f64;
    let dy = (a.row - b.row) as f64;
    (dx * dx + dy * dy).sqrt()
}

pub struct Pathfinder<'a> {
    grid: &'a Grid,
}

impl<'a> Pathfinder<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        Pathfinder { grid }
    }

    fn index(&self, coord: CellCoord) -> usize {
        coord.row as usize * self.grid.cols() + coord.col as usize
    }

    fn coord(&self, index: usize) -> CellCoord {
        let cols = self.grid.cols();
        CellCoord::new((index % cols) as i32, (index / cols) as i32)
    }

    /// Neighbours of `coord` a tank may step into.
    pub fn neighbors(&self, coord: CellCoord) -> Vec<CellCoord> {
        let mut result = Vec::with_capacity(8);
        for dc in -1..=1 {
            for dr in -1..=1 {
                if dc == 0 && dr == 0 {
                    continue;
                }
                let next = CellCoord::new(coord.col + dc, coord.row + dr);
                if !self.grid.in_bounds(next) || self.grid.is_blocked(next) {
                    continue;
                }
                if dc != 0 && dr != 0 {
                    let side_a = CellCoord::new(next.col, coord.row);
                    let side_b = CellCoord::new(coord.col, next.row);
                    if self.grid.is_blocked(side_a) || self.grid.is_blocked(side_b) {
                        continue;
                    }
                }
                if self.grid.is_adjacent_to_wall_or_hole(next) {
                    continue;
                }
                result.push(next);
            }
        }
        result
    }

    /// Cells from `start` (exclusive) to `goal` (inclusive); empty when the
    /// goal is unreachable, out of bounds, or equal to `start`.
    pub fn find_path(&self, start: CellCoord, goal: CellCoord) -> Vec<CellCoord> {
        if !self.grid.in_bounds(start) || !self.grid.in_bounds(goal) || start == goal {
            return Vec::new();
        }

        let mut nodes = vec![Node::default(); self.grid.rows() * self.grid.cols()];
        let start_index = self.index(start);
        let goal_index = self.index(goal);

        nodes[start_index].g_cost = 0.0;
        nodes[start_index].h_cost = euclidean(start, goal);
        nodes[start_index].f_cost = nodes[start_index].h_cost;
        nodes[start_index].open = true;

        // Insertion-ordered open set; the first node with the lowest f-cost wins ties.
        let mut open: Vec<usize> = vec![start_index];

        while !open.is_empty() {
            let mut best = 0;
            for (pos, &index) in open.iter().enumerate().skip(1) {
                if nodes[index].f_cost < nodes[open[best]].f_cost {
                    best = pos;
                }
            }
            let current = open.remove(best);

            if current == goal_index {
                return self.retrace(&nodes, start_index, goal_index);
            }

            nodes[current].open = false;
            nodes[current].closed = true;
            let current_coord = self.coord(current);

            for neighbor in self.neighbors(current_coord) {
                let n = self.index(neighbor);
                if nodes[n].closed {
                    continue;
                }
                let cost = nodes[current].g_cost + euclidean(current_coord, neighbor);
                if cost < nodes[n].g_cost || !nodes[n].open {
                    nodes[n].g_cost = cost;
                    nodes[n].h_cost = euclidean(neighbor, goal);
                    nodes[n].f_cost = cost + nodes[n].h_cost;
                    nodes[n].parent = Some(current);
                    if !nodes[n].open {
                        nodes[n].open = true;
                        open.push(n);
                    }
                }
            }
        }

        crate::debug_path!(
            "No path from ({}, {}) to ({}, {})",
            start.col,
            start.row,
            goal.col,
            goal.row
        );
        Vec::new()
    }

    fn retrace(&self, nodes: &[Node], start: usize, goal: usize) -> Vec<CellCoord> {
        let mut path = Vec::new();
        let mut current = goal;
        while current != start {
            path.push(self.coord(current));
            match nodes[current].parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }
}

/// Total Euclidean length of a path starting at `start`.
pub fn path_length(start: CellCoord, path: &[CellCoord]) -> f64 {
    let mut previous = start;
    let mut total = 0.0;
    for &step in path {
        total += euclidean(previous, step);
        previous = step;
    }
    total
}
