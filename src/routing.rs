use std::collections::HashMap;

use crate::maze::Maze;
use crate::types::Cell;

const UNREACHABLE: u16 = u16::MAX;
const INF: u16 = u16::MAX;

/// All-pairs next-hop table over the open cells of a maze.
///
/// Built once per maze load with Floyd–Warshall. Adjacency includes the wrap
/// edges between opposite borders, so the graph is a torus with the walls
/// punched out. `next[i * n + j]` is always a direct neighbor of `i` (or `i`
/// itself on the diagonal).
#[derive(Clone, Debug)]
pub struct RoutingTable {
    index_of: HashMap<Cell, u16>,
    cells: Vec<Cell>,
    dist: Vec<u16>,
    next: Vec<u16>,
}

impl RoutingTable {
    pub fn build(maze: &Maze) -> Self {
        let cells: Vec<Cell> = maze.open_cells().collect();
        let index_of: HashMap<Cell, u16> = cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| (*cell, idx as u16))
            .collect();
        let n = cells.len();
        let mut dist = vec![INF; n * n];
        let mut next = vec![UNREACHABLE; n * n];

        for (i, cell) in cells.iter().enumerate() {
            dist[i * n + i] = 0;
            next[i * n + i] = i as u16;
            for neighbor in maze.open_neighbors(*cell) {
                let Some(&j) = index_of.get(&neighbor) else {
                    continue;
                };
                let j = j as usize;
                if i == j {
                    continue;
                }
                dist[i * n + j] = 1;
                next[i * n + j] = j as u16;
            }
        }

        let mut via = vec![INF; n];
        for k in 0..n {
            via.copy_from_slice(&dist[k * n..(k + 1) * n]);
            for i in 0..n {
                let to_k = dist[i * n + k];
                if to_k == INF || i == k {
                    continue;
                }
                let hop = next[i * n + k];
                let row = i * n;
                for (j, &from_k) in via.iter().enumerate() {
                    if from_k == INF {
                        continue;
                    }
                    let candidate = to_k as u32 + from_k as u32;
                    if candidate < dist[row + j] as u32 {
                        dist[row + j] = candidate as u16;
                        next[row + j] = hop;
                    }
                }
            }
        }

        Self {
            index_of,
            cells,
            dist,
            next,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.index_of.contains_key(&cell)
    }

    fn slot(&self, from: Cell, to: Cell) -> Option<usize> {
        let i = *self.index_of.get(&from)? as usize;
        let j = *self.index_of.get(&to)? as usize;
        Some(i * self.cells.len() + j)
    }

    /// The neighbor of `from` to step onto on a shortest path to `to`.
    /// `None` when either end is a wall or the two cells are disconnected.
    pub fn next_hop(&self, from: Cell, to: Cell) -> Option<Cell> {
        let slot = self.slot(from, to)?;
        match self.next[slot] {
            UNREACHABLE => None,
            idx => self.cells.get(idx as usize).copied(),
        }
    }

    /// Length of the shortest path in steps.
    pub fn distance(&self, from: Cell, to: Cell) -> Option<u32> {
        let slot = self.slot(from, to)?;
        match self.dist[slot] {
            INF => None,
            steps => Some(steps as u32),
        }
    }

    pub fn is_reachable(&self, from: Cell, to: Cell) -> bool {
        self.distance(from, to).is_some()
    }
}
