use std::path::Path;

use crate::constants::{MAX_MAZE_SIDE, MAX_OPEN_CELLS};
use crate::error::MazeError;
use crate::rng::Rng;
use crate::types::{Cell, Direction, TileKind};

/// Static maze layout plus the consumable pickups laid on it.
///
/// Spawn markers are kept apart from the tile array; the cells they sit on
/// are always `Empty`. Accessors treat any coordinate outside the declared
/// bounds as a wall.
#[derive(Clone, Debug)]
pub struct Maze {
    rows: i32,
    cols: i32,
    tiles: Vec<TileKind>,
    player_spawn: Cell,
    pursuer_spawns: Vec<Cell>,
    pickups_left: usize,
}

impl Maze {
    pub fn load(path: &Path) -> Result<Self, MazeError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parses the text format: row count, column count, then one line per row
    /// using `#` wall, `.` pickup, `C` power pickup, `0` empty, `P` player
    /// spawn and `G` pursuer spawn.
    pub fn parse(text: &str) -> Result<Self, MazeError> {
        let mut lines = text.lines().enumerate();
        let rows = parse_dimension(lines.next(), "row count")?;
        let cols = parse_dimension(lines.next(), "column count")?;
        if rows > MAX_MAZE_SIDE || cols > MAX_MAZE_SIDE {
            return Err(MazeError::DimensionTooLarge {
                rows,
                cols,
                max: MAX_MAZE_SIDE,
            });
        }

        let mut tiles = Vec::with_capacity(rows * cols);
        let mut player_spawn = None;
        let mut pursuer_spawns = Vec::new();
        let mut pickups_left = 0;

        for row in 0..rows {
            let Some((_, line)) = lines.next() else {
                return Err(MazeError::RowCountMismatch {
                    declared: rows,
                    actual: row,
                });
            };
            let actual = line.chars().count();
            if actual != cols {
                return Err(MazeError::RowLengthMismatch {
                    row,
                    declared: cols,
                    actual,
                });
            }
            for (col, glyph) in line.chars().enumerate() {
                let kind = match glyph {
                    '0' => TileKind::Empty,
                    '#' => TileKind::Wall,
                    '.' => {
                        pickups_left += 1;
                        TileKind::Pickup
                    }
                    'C' => TileKind::PowerPickup,
                    'P' => {
                        if player_spawn.is_some() {
                            return Err(MazeError::DuplicatePlayerSpawn { row, col });
                        }
                        player_spawn = Some(Cell::new(col as i32, row as i32));
                        TileKind::Empty
                    }
                    'G' => {
                        pursuer_spawns.push(Cell::new(col as i32, row as i32));
                        TileKind::Empty
                    }
                    _ => return Err(MazeError::UnknownTile { row, col, glyph }),
                };
                tiles.push(kind);
            }
        }

        let extra = lines.filter(|(_, line)| !line.trim().is_empty()).count();
        if extra > 0 {
            return Err(MazeError::RowCountMismatch {
                declared: rows,
                actual: rows + extra,
            });
        }

        let player_spawn = player_spawn.ok_or(MazeError::MissingPlayerSpawn)?;
        let open = tiles.iter().filter(|kind| kind.is_open()).count();
        if open > MAX_OPEN_CELLS {
            return Err(MazeError::TooManyOpenCells {
                open,
                max: MAX_OPEN_CELLS,
            });
        }
        Ok(Self {
            rows: rows as i32,
            cols: cols as i32,
            tiles,
            player_spawn,
            pursuer_spawns,
            pickups_left,
        })
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn player_spawn(&self) -> Cell {
        self.player_spawn
    }

    pub fn pursuer_spawns(&self) -> &[Cell] {
        &self.pursuer_spawns
    }

    pub fn pickups_left(&self) -> usize {
        self.pickups_left
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.cols && cell.y < self.rows
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        if !self.in_bounds(cell) {
            return None;
        }
        Some((cell.y * self.cols + cell.x) as usize)
    }

    pub fn kind(&self, cell: Cell) -> TileKind {
        self.index(cell)
            .and_then(|idx| self.tiles.get(idx).copied())
            .unwrap_or(TileKind::Wall)
    }

    pub fn is_open(&self, cell: Cell) -> bool {
        self.kind(cell).is_open()
    }

    /// One step in `dir`, wrapping to the opposite edge when the step would
    /// leave the grid. The result may be a wall.
    pub fn wrap_step(&self, cell: Cell, dir: Direction) -> Cell {
        let (dx, dy) = dir.delta();
        Cell::new(
            (cell.x + dx).rem_euclid(self.cols),
            (cell.y + dy).rem_euclid(self.rows),
        )
    }

    /// True when one step in `dir` leaves the grid and comes back in on the
    /// opposite edge.
    pub fn crosses_border(&self, cell: Cell, dir: Direction) -> bool {
        let (dx, dy) = dir.delta();
        !self.in_bounds(Cell::new(cell.x + dx, cell.y + dy))
    }

    /// Direction of a single hop between neighbors. When a direct step and a
    /// wrapping step both land on `to` (two-wide grids) the direct one wins.
    pub fn hop_direction(&self, from: Cell, to: Cell) -> Option<Direction> {
        let mut wrapped = None;
        for dir in [Direction::Up, Direction::Down, Direction::Left, Direction::Right] {
            if self.wrap_step(from, dir) != to {
                continue;
            }
            if !self.crosses_border(from, dir) {
                return Some(dir);
            }
            wrapped.get_or_insert(dir);
        }
        wrapped
    }

    /// Open cells one step away, wrap edges included, in up/down/left/right order.
    pub fn open_neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
            .into_iter()
            .map(move |dir| self.wrap_step(cell, dir))
            .filter(move |next| self.is_open(*next))
    }

    /// Every non-wall cell in row-major order.
    pub fn open_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.rows)
            .flat_map(move |y| (0..self.cols).map(move |x| Cell::new(x, y)))
            .filter(move |cell| self.is_open(*cell))
    }

    /// Empties the cell and returns what was there.
    pub fn consume(&mut self, cell: Cell) -> TileKind {
        let Some(idx) = self.index(cell) else {
            return TileKind::Wall;
        };
        let previous = self.tiles[idx];
        if matches!(previous, TileKind::Pickup | TileKind::PowerPickup) {
            self.tiles[idx] = TileKind::Empty;
            if previous == TileKind::Pickup {
                self.pickups_left -= 1;
            }
        }
        previous
    }

    pub fn power_pickup_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|kind| **kind == TileKind::PowerPickup)
            .count()
    }

    /// Drops `count` power pickups on random empty cells, away from spawn
    /// markers. Pickups are never replaced, so the win condition is unchanged.
    /// Does nothing if the layout already defines any power pickup.
    pub fn scatter_power_pickups(&mut self, rng: &mut Rng, count: usize) -> Vec<Cell> {
        if count == 0 || self.power_pickup_count() > 0 {
            return Vec::new();
        }
        let candidates: Vec<Cell> = self
            .open_cells()
            .filter(|cell| self.kind(*cell) == TileKind::Empty)
            .filter(|cell| *cell != self.player_spawn && !self.pursuer_spawns.contains(cell))
            .collect();
        let chosen = rng.take_distinct(candidates, count);
        for cell in &chosen {
            if let Some(idx) = self.index(*cell) {
                self.tiles[idx] = TileKind::PowerPickup;
            }
        }
        chosen
    }

    /// First open cell within `radius` of `cell`, scanning rows top to bottom.
    pub fn nearest_open(&self, cell: Cell, radius: i32) -> Option<Cell> {
        if self.is_open(cell) {
            return Some(cell);
        }
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let candidate = Cell::new(cell.x + dx, cell.y + dy);
                if self.is_open(candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// True when both mazes have the same dimensions and wall placement.
    pub fn same_layout(&self, other: &Maze) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self
                .tiles
                .iter()
                .zip(other.tiles.iter())
                .all(|(a, b)| a.is_open() == b.is_open())
    }

    pub fn tile_rows(&self) -> Vec<String> {
        self.tiles
            .chunks(self.cols.max(1) as usize)
            .map(|row| row.iter().map(|kind| kind.glyph()).collect())
            .collect()
    }
}

fn parse_dimension(
    line: Option<(usize, &str)>,
    field: &'static str,
) -> Result<usize, MazeError> {
    let (idx, raw) = line.ok_or(MazeError::MissingHeader(field))?;
    let value = raw.trim();
    match value.parse::<usize>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(MazeError::InvalidDimension {
            line: idx + 1,
            field,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::Maze;
    use crate::error::MazeError;
    use crate::rng::Rng;
    use crate::types::{Cell, Direction, TileKind};

    const SMALL: &str = "4\n5\n#####\n0P.CG\n0.#.0\n#####\n";

    #[test]
    fn parses_tiles_and_spawns() {
        let maze = Maze::parse(SMALL).expect("valid maze");
        assert_eq!(maze.rows(), 4);
        assert_eq!(maze.cols(), 5);
        assert_eq!(maze.player_spawn(), Cell::new(1, 1));
        assert_eq!(maze.pursuer_spawns(), &[Cell::new(4, 1)]);
        assert_eq!(maze.kind(Cell::new(1, 1)), TileKind::Empty);
        assert_eq!(maze.kind(Cell::new(2, 1)), TileKind::Pickup);
        assert_eq!(maze.kind(Cell::new(3, 1)), TileKind::PowerPickup);
        assert_eq!(maze.kind(Cell::new(2, 2)), TileKind::Wall);
        assert_eq!(maze.pickups_left(), 3);
    }

    #[test]
    fn accepts_crlf_and_trailing_blank_lines() {
        let text = SMALL.replace('\n', "\r\n") + "\r\n\r\n";
        let maze = Maze::parse(&text).expect("crlf maze");
        assert_eq!(maze.tile_rows()[1], "00.C0");
    }

    #[test]
    fn out_of_bounds_reads_as_wall() {
        let maze = Maze::parse(SMALL).expect("valid maze");
        assert_eq!(maze.kind(Cell::new(-1, 0)), TileKind::Wall);
        assert_eq!(maze.kind(Cell::new(5, 1)), TileKind::Wall);
        assert_eq!(maze.kind(Cell::new(0, 4)), TileKind::Wall);
    }

    #[test]
    fn rejects_size_mismatches() {
        assert!(matches!(
            Maze::parse("3\n3\n#P#\n###\n"),
            Err(MazeError::RowCountMismatch {
                declared: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            Maze::parse("2\n3\n#P#\n####\n"),
            Err(MazeError::RowLengthMismatch { row: 1, .. })
        ));
        assert!(matches!(
            Maze::parse("1\n3\n#P#\n###\n"),
            Err(MazeError::RowCountMismatch {
                declared: 1,
                actual: 2
            })
        ));
        assert!(matches!(
            Maze::parse("x\n3\n#P#\n"),
            Err(MazeError::InvalidDimension { line: 1, .. })
        ));
        assert!(matches!(
            Maze::parse("1\n"),
            Err(MazeError::MissingHeader("column count"))
        ));
        assert!(matches!(
            Maze::parse("101\n2\n"),
            Err(MazeError::DimensionTooLarge { .. })
        ));
    }

    #[test]
    fn rejects_mazes_with_too_many_open_cells() {
        let side = 60;
        let mut text = format!("{side}\n{side}\n");
        for row in 0..side {
            let line = if row == 0 {
                format!("P{}", "0".repeat(side - 1))
            } else {
                "0".repeat(side)
            };
            text.push_str(&line);
            text.push('\n');
        }
        assert!(matches!(
            Maze::parse(&text),
            Err(MazeError::TooManyOpenCells {
                open: 3_600,
                max: 2_500
            })
        ));

        let walled = text.replacen(&"0".repeat(side), &"#".repeat(side), 20);
        let maze = Maze::parse(&walled).expect("2400 open cells fit");
        assert_eq!(maze.open_cells().count(), 2_400);
    }

    #[test]
    fn rejects_missing_or_duplicate_player_and_unknown_tiles() {
        assert!(matches!(
            Maze::parse("1\n3\n#G#\n"),
            Err(MazeError::MissingPlayerSpawn)
        ));
        assert!(matches!(
            Maze::parse("1\n3\nP#P\n"),
            Err(MazeError::DuplicatePlayerSpawn { row: 0, col: 2 })
        ));
        assert!(matches!(
            Maze::parse("1\n3\nP#x\n"),
            Err(MazeError::UnknownTile { glyph: 'x', .. })
        ));
    }

    #[test]
    fn wrap_step_crosses_edges() {
        let maze = Maze::parse(SMALL).expect("valid maze");
        assert_eq!(maze.wrap_step(Cell::new(0, 1), Direction::Left), Cell::new(4, 1));
        assert_eq!(maze.wrap_step(Cell::new(4, 1), Direction::Right), Cell::new(0, 1));
        assert_eq!(maze.wrap_step(Cell::new(1, 0), Direction::Up), Cell::new(1, 3));
        assert_eq!(maze.wrap_step(Cell::new(1, 1), Direction::None), Cell::new(1, 1));
        let neighbors: Vec<Cell> = maze.open_neighbors(Cell::new(0, 1)).collect();
        assert_eq!(neighbors, vec![Cell::new(0, 2), Cell::new(4, 1), Cell::new(1, 1)]);
    }

    #[test]
    fn hop_direction_is_measured_against_the_grid_size() {
        let narrow = Maze::parse("1\n2\nP.\n").expect("two-wide maze");
        assert!(narrow.crosses_border(Cell::new(0, 0), Direction::Left));
        assert!(!narrow.crosses_border(Cell::new(0, 0), Direction::Right));
        assert_eq!(narrow.hop_direction(Cell::new(1, 0), Cell::new(0, 0)), Some(Direction::Left));
        assert_eq!(narrow.hop_direction(Cell::new(0, 0), Cell::new(1, 0)), Some(Direction::Right));

        let maze = Maze::parse(SMALL).expect("valid maze");
        assert_eq!(maze.hop_direction(Cell::new(0, 1), Cell::new(4, 1)), Some(Direction::Left));
        assert_eq!(maze.hop_direction(Cell::new(1, 1), Cell::new(1, 2)), Some(Direction::Down));
        assert_eq!(maze.hop_direction(Cell::new(1, 1), Cell::new(3, 1)), None);
    }

    #[test]
    fn consuming_pickups_is_monotonic() {
        let mut maze = Maze::parse(SMALL).expect("valid maze");
        assert_eq!(maze.consume(Cell::new(2, 1)), TileKind::Pickup);
        assert_eq!(maze.pickups_left(), 2);
        assert_eq!(maze.consume(Cell::new(2, 1)), TileKind::Empty);
        assert_eq!(maze.pickups_left(), 2);
        assert_eq!(maze.consume(Cell::new(3, 1)), TileKind::PowerPickup);
        assert_eq!(maze.pickups_left(), 2);
        assert_eq!(maze.consume(Cell::new(2, 2)), TileKind::Wall);
        assert_eq!(maze.kind(Cell::new(2, 2)), TileKind::Wall);
    }

    #[test]
    fn scattering_only_fills_mazes_without_power_pickups() {
        let mut with_power = Maze::parse(SMALL).expect("valid maze");
        assert!(with_power.scatter_power_pickups(&mut Rng::new(1), 4).is_empty());

        let mut plain = Maze::parse("3\n6\n######\nP.00.G\n######\n").expect("plain maze");
        let placed = plain.scatter_power_pickups(&mut Rng::new(1), 4);
        assert_eq!(placed.len(), 2);
        assert_eq!(plain.power_pickup_count(), 2);
        assert_eq!(plain.pickups_left(), 2);
        assert_eq!(plain.kind(Cell::new(1, 1)), TileKind::Pickup);
        assert_eq!(plain.kind(Cell::new(4, 1)), TileKind::Pickup);
        assert!(placed.contains(&Cell::new(2, 1)));
        assert!(placed.contains(&Cell::new(3, 1)));
    }

    #[test]
    fn scattering_never_replaces_pickups() {
        let mut dotted = Maze::parse("3\n5\n#####\nP...G\n#####\n").expect("dotted maze");
        assert!(dotted.scatter_power_pickups(&mut Rng::new(1), 4).is_empty());
        assert_eq!(dotted.pickups_left(), 3);
        assert_eq!(dotted.power_pickup_count(), 0);
    }

    #[test]
    fn nearest_open_scans_around_walls() {
        let maze = Maze::parse("3\n3\n###\n#P#\n###\n").expect("valid maze");
        assert_eq!(maze.nearest_open(Cell::new(0, 0), 2), Some(Cell::new(1, 1)));
        assert_eq!(maze.nearest_open(Cell::new(0, 0), 0), None);
    }

    #[test]
    fn layout_comparison_ignores_pickups() {
        let a = Maze::parse("1\n3\nP.0\n").expect("a");
        let b = Maze::parse("1\n3\nP0.\n").expect("b");
        let c = Maze::parse("1\n3\nP#.\n").expect("c");
        assert!(a.same_layout(&b));
        assert!(!a.same_layout(&c));
    }
}
