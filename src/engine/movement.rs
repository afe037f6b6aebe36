use crate::maze::Maze;
use crate::routing::RoutingTable;
use crate::types::{Cell, Direction, ScreenPos};

use super::utils::cell_center;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Motion {
    /// Sitting on a cell center, ready to pick the next hop.
    Idle,
    /// Travelling toward `target` in `dir`; `teleport` hops cross the border
    /// and jump instead of sliding.
    Transiting {
        target: Cell,
        dir: Direction,
        teleport: bool,
    },
}

/// How an agent picks its next cell when it is idle.
#[derive(Clone, Copy, Debug)]
pub enum Steering<'a> {
    Heading(Direction),
    Route {
        routing: &'a RoutingTable,
        goal: Cell,
    },
}

/// Grid position, interpolated screen position and transit state shared by
/// every agent.
#[derive(Clone, Debug)]
pub struct Mover {
    pub cell: Cell,
    pub pos: ScreenPos,
    pub motion: Motion,
    pub speed: f32,
}

impl Mover {
    pub fn new(cell: Cell, speed: f32, cell_size: f32) -> Self {
        Self {
            cell,
            pos: cell_center(cell, cell_size),
            motion: Motion::Idle,
            speed,
        }
    }

    pub fn place(&mut self, cell: Cell, cell_size: f32) {
        self.cell = cell;
        self.pos = cell_center(cell, cell_size);
        self.motion = Motion::Idle;
    }

    pub fn target(&self) -> Option<Cell> {
        match self.motion {
            Motion::Idle => None,
            Motion::Transiting { target, .. } => Some(target),
        }
    }

    pub fn heading(&self) -> Direction {
        match self.motion {
            Motion::Idle => Direction::None,
            Motion::Transiting { dir, .. } => dir,
        }
    }

    /// Runs one tick of movement. Returns the cell that was entered if the
    /// agent arrived at its target this tick.
    pub fn advance(&mut self, maze: &Maze, steering: Steering<'_>, cell_size: f32) -> Option<Cell> {
        if self.motion == Motion::Idle {
            let desired = match steering {
                Steering::Heading(Direction::None) => None,
                Steering::Heading(dir) => Some((maze.wrap_step(self.cell, dir), dir)),
                Steering::Route { routing, goal } => {
                    let next = routing.next_hop(self.cell, goal).unwrap_or(self.cell);
                    let dir = maze.hop_direction(self.cell, next).unwrap_or(Direction::None);
                    Some((next, dir))
                }
            };
            if let Some((next, dir)) = desired.filter(|(cell, _)| maze.is_open(*cell)) {
                self.motion = Motion::Transiting {
                    target: next,
                    dir,
                    teleport: maze.crosses_border(self.cell, dir),
                };
            }
        }

        let Motion::Transiting {
            target, teleport, ..
        } = self.motion
        else {
            return None;
        };
        let center = cell_center(target, cell_size);
        let remaining = self.pos.distance_to(center);
        if teleport || remaining <= self.speed {
            self.pos = center;
            self.cell = target;
            self.motion = Motion::Idle;
            return Some(target);
        }

        self.pos.x += (center.x - self.pos.x) / remaining * self.speed;
        self.pos.y += (center.y - self.pos.y) / remaining * self.speed;
        None
    }
}

/// The player's mover plus its buffered turn.
///
/// `desired_dir` is whatever input arrived last; it only becomes
/// `current_dir` once the neighbor in that direction is open, and is retried
/// on every idle tick until then.
#[derive(Clone, Debug)]
pub struct Player {
    pub mover: Mover,
    pub desired_dir: Direction,
    pub current_dir: Direction,
}

impl Player {
    pub fn new(cell: Cell, speed: f32, cell_size: f32) -> Self {
        Self {
            mover: Mover::new(cell, speed, cell_size),
            desired_dir: Direction::None,
            current_dir: Direction::None,
        }
    }

    pub fn steer(&mut self, dir: Direction) {
        self.desired_dir = dir;
    }

    pub fn advance(&mut self, maze: &Maze, cell_size: f32) -> Option<Cell> {
        if self.mover.motion == Motion::Idle
            && self.desired_dir != Direction::None
            && maze.is_open(maze.wrap_step(self.mover.cell, self.desired_dir))
        {
            self.current_dir = self.desired_dir;
        }
        self.mover
            .advance(maze, Steering::Heading(self.current_dir), cell_size)
    }
}
