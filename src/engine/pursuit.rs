use crate::constants::{FLEE_CORNER_SEARCH, FLEE_STEP};
use crate::maze::Maze;
use crate::routing::RoutingTable;
use crate::types::{Cell, PursuerMode};

use super::movement::Mover;
use super::utils::manhattan;

#[derive(Clone, Debug)]
pub struct Pursuer {
    pub id: usize,
    pub mover: Mover,
    pub mode: PursuerMode,
    spawn: Cell,
}

impl Pursuer {
    pub fn new(id: usize, spawn: Cell, maze: &Maze, speed: f32, cell_size: f32) -> Self {
        assert!(
            maze.in_bounds(spawn) && maze.is_open(spawn),
            "pursuer {id} spawn {spawn:?} is not an open cell"
        );
        Self {
            id,
            mover: Mover::new(spawn, speed, cell_size),
            mode: PursuerMode::Hunting,
            spawn,
        }
    }

    pub fn spawn(&self) -> Cell {
        self.spawn
    }

    pub fn is_parked(&self) -> bool {
        self.mode == PursuerMode::AtSpawn
    }

    /// Power-up start: anyone not parked at spawn becomes catchable.
    pub fn frighten(&mut self) {
        if self.mode != PursuerMode::AtSpawn {
            self.mode = PursuerMode::Vulnerable;
        }
    }

    /// Power-up end: both vulnerable and parked pursuers resume the hunt.
    pub fn release(&mut self) {
        self.mode = PursuerMode::Hunting;
    }

    /// Caught while vulnerable: park at spawn until the power-up ends.
    pub fn send_home(&mut self, cell_size: f32) {
        self.mode = PursuerMode::AtSpawn;
        self.mover.place(self.spawn, cell_size);
    }

    /// Cell handed to the routing query this tick.
    pub fn goal(&self, player_cell: Cell, flee: &FleePlan, maze: &Maze, routing: &RoutingTable) -> Cell {
        match self.mode {
            PursuerMode::Hunting => player_cell,
            PursuerMode::Vulnerable => flee.flee_cell(self.mover.cell, player_cell, maze, routing),
            PursuerMode::AtSpawn => self.spawn,
        }
    }
}

/// Corner cells vulnerable pursuers run toward, fixed per maze load.
#[derive(Clone, Debug, Default)]
pub struct FleePlan {
    corners: Vec<Cell>,
}

impl FleePlan {
    /// The four cells just inside the maze corners, each nudged to a nearby
    /// open cell when it is a wall. Corners with no open cell close by are
    /// dropped.
    pub fn from_maze(maze: &Maze) -> Self {
        let lo_x = 1.min(maze.cols() - 1);
        let lo_y = 1.min(maze.rows() - 1);
        let hi_x = (maze.cols() - 2).max(0);
        let hi_y = (maze.rows() - 2).max(0);
        let mut corners = Vec::new();
        for corner in [
            Cell::new(lo_x, lo_y),
            Cell::new(hi_x, lo_y),
            Cell::new(lo_x, hi_y),
            Cell::new(hi_x, hi_y),
        ] {
            if let Some(open) = maze.nearest_open(corner, FLEE_CORNER_SEARCH) {
                if !corners.contains(&open) {
                    corners.push(open);
                }
            }
        }
        Self { corners }
    }

    pub fn corners(&self) -> &[Cell] {
        &self.corners
    }

    /// Reachable corner farthest (Manhattan) from the player, first one on
    /// ties. Falls back to a short step away from the player.
    pub fn flee_cell(&self, from: Cell, player: Cell, maze: &Maze, routing: &RoutingTable) -> Cell {
        let mut best: Option<(i32, Cell)> = None;
        for &corner in &self.corners {
            if !routing.is_reachable(from, corner) {
                continue;
            }
            let dist = manhattan(corner, player);
            if best.map(|(d, _)| dist > d).unwrap_or(true) {
                best = Some((dist, corner));
            }
        }
        match best {
            Some((_, corner)) => corner,
            None => step_away(from, player, maze),
        }
    }
}

/// Two cells further from the player along the axis they are most separated
/// on, clamped to the grid and nudged onto an open cell.
pub fn step_away(from: Cell, player: Cell, maze: &Maze) -> Cell {
    let dx = from.x - player.x;
    let dy = from.y - player.y;
    let target = if dx.abs() >= dy.abs() {
        let sx = if dx >= 0 { 1 } else { -1 };
        Cell::new((from.x + FLEE_STEP * sx).clamp(0, maze.cols() - 1), from.y)
    } else {
        let sy = if dy >= 0 { 1 } else { -1 };
        Cell::new(from.x, (from.y + FLEE_STEP * sy).clamp(0, maze.rows() - 1))
    };
    maze.nearest_open(target, FLEE_CORNER_SEARCH).unwrap_or(from)
}
