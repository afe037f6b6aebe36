use crate::constants::{capture_radius, ticks_to_seconds_ceil, POWER_UP_ENDING_TICKS};
use crate::error::MazeError;
use crate::maze::Maze;
use crate::rng::Rng;
use crate::routing::RoutingTable;
use crate::types::{
    Cell, Direction, GameConfig, GamePhase, GameSummary, PlayerView, PursuerMode, PursuerView,
    RuntimeEvent, Snapshot, TileKind,
};

mod movement;
mod pursuit;
mod utils;

pub use self::movement::{Motion, Mover, Player, Steering};
pub use self::pursuit::{step_away, FleePlan, Pursuer};

#[derive(Clone, Debug, Default)]
struct SessionStats {
    pickups: u32,
    power_pickups: u32,
    captures: u32,
}

/// One local chase: maze, routing, agents and the score/power-up/phase state.
///
/// `step` is the whole fixed-step tick; nothing else mutates the game except
/// `steer` (which only writes the player's buffered direction), `restart`
/// and `load`.
#[derive(Clone, Debug)]
pub struct GameEngine {
    pub config: GameConfig,

    source: Maze,
    maze: Maze,
    routing: RoutingTable,
    flee: FleePlan,
    rng: Rng,
    player: Player,
    pursuers: Vec<Pursuer>,

    score: u32,
    power_up_active: bool,
    power_up_ticks: u32,
    phase: GamePhase,
    tick_counter: u64,
    events: Vec<RuntimeEvent>,
    stats: SessionStats,
}

impl GameEngine {
    pub fn new(source: Maze, config: GameConfig) -> Self {
        let routing = RoutingTable::build(&source);
        let flee = FleePlan::from_maze(&source);
        let mut rng = Rng::new(config.seed);
        let mut maze = source.clone();
        maze.scatter_power_pickups(&mut rng, config.scatter_power_pickups);
        let (player, pursuers) = spawn_agents(&maze, &config);

        Self {
            config,
            source,
            maze,
            routing,
            flee,
            rng,
            player,
            pursuers,
            score: 0,
            power_up_active: false,
            power_up_ticks: 0,
            phase: GamePhase::Playing,
            tick_counter: 0,
            events: Vec::new(),
            stats: SessionStats::default(),
        }
    }

    pub fn from_text(text: &str, config: GameConfig) -> Result<Self, MazeError> {
        Ok(Self::new(Maze::parse(text)?, config))
    }

    /// Starts over on the same maze source. The routing table is kept unless
    /// the reloaded layout differs from the one it was built for.
    pub fn restart(&mut self) {
        let mut maze = self.source.clone();
        maze.scatter_power_pickups(&mut self.rng, self.config.scatter_power_pickups);
        if !maze.same_layout(&self.maze) {
            self.routing = RoutingTable::build(&maze);
            self.flee = FleePlan::from_maze(&maze);
        }
        self.maze = maze;
        self.reset_session();
    }

    /// Swaps in a different maze; always rebuilds routing.
    pub fn load(&mut self, source: Maze) {
        self.routing = RoutingTable::build(&source);
        self.flee = FleePlan::from_maze(&source);
        let mut maze = source.clone();
        maze.scatter_power_pickups(&mut self.rng, self.config.scatter_power_pickups);
        self.source = source;
        self.maze = maze;
        self.reset_session();
    }

    fn reset_session(&mut self) {
        let (player, pursuers) = spawn_agents(&self.maze, &self.config);
        self.player = player;
        self.pursuers = pursuers;
        self.score = 0;
        self.power_up_active = false;
        self.power_up_ticks = 0;
        self.phase = GamePhase::Playing;
        self.tick_counter = 0;
        self.stats = SessionStats::default();
        self.events.clear();
        self.events.push(RuntimeEvent::Restarted);
    }

    /// Latches a direction intent into the player's buffer; last writer wins.
    pub fn steer(&mut self, dir: Direction) {
        self.player.steer(dir);
    }

    pub fn step(&mut self) {
        if self.phase != GamePhase::Playing {
            return;
        }
        self.tick_counter += 1;

        self.update_power_up();
        self.update_player();
        self.update_pursuers();
        self.resolve_collisions();
        self.check_cleared();
    }

    pub fn is_running(&self) -> bool {
        self.phase == GamePhase::Playing
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn power_up_active(&self) -> bool {
        self.power_up_active
    }

    pub fn power_up_ticks_left(&self) -> u32 {
        self.power_up_ticks
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn flee_plan(&self) -> &FleePlan {
        &self.flee
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn pursuers(&self) -> &[Pursuer] {
        &self.pursuers
    }

    pub fn player_view(&self) -> PlayerView {
        PlayerView {
            cell: self.player.mover.cell,
            next_cell: self.player.mover.target(),
            pos: self.player.mover.pos,
            dir: self.player.current_dir,
            desired_dir: self.player.desired_dir,
        }
    }

    pub fn pursuer_views(&self) -> Vec<PursuerView> {
        self.pursuers
            .iter()
            .map(|pursuer| PursuerView {
                id: pursuer.id,
                cell: pursuer.mover.cell,
                pos: pursuer.mover.pos,
                dir: pursuer.mover.heading(),
                mode: pursuer.mode,
                spawn: pursuer.spawn(),
            })
            .collect()
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        Snapshot {
            tick: self.tick_counter,
            phase: self.phase,
            score: self.score,
            power_up_active: self.power_up_active,
            power_up_ticks_left: self.power_up_ticks,
            power_up_seconds_left: ticks_to_seconds_ceil(self.power_up_ticks, self.config.tick_ms),
            power_up_ending: self.power_up_active && self.power_up_ticks < POWER_UP_ENDING_TICKS,
            pickups_left: self.maze.pickups_left(),
            tiles: self.maze.tile_rows(),
            player: self.player_view(),
            pursuers: self.pursuer_views(),
            events: if include_events {
                std::mem::take(&mut self.events)
            } else {
                Vec::new()
            },
        }
    }

    pub fn build_summary(&self) -> GameSummary {
        GameSummary {
            phase: self.phase,
            ticks: self.tick_counter,
            score: self.score,
            pickups_eaten: self.stats.pickups,
            power_pickups_eaten: self.stats.power_pickups,
            captures: self.stats.captures,
        }
    }

    fn update_power_up(&mut self) {
        if !self.power_up_active {
            return;
        }
        self.power_up_ticks = self.power_up_ticks.saturating_sub(1);
        if self.power_up_ticks > 0 {
            return;
        }
        self.power_up_active = false;
        for pursuer in &mut self.pursuers {
            pursuer.release();
        }
        self.events.push(RuntimeEvent::PowerUpEnded);
    }

    fn activate_power_up(&mut self) {
        self.power_up_active = true;
        self.power_up_ticks = self.config.power_up_ticks;
        for pursuer in &mut self.pursuers {
            pursuer.frighten();
        }
        self.events.push(RuntimeEvent::PowerUpStarted {
            ticks: self.config.power_up_ticks,
        });
    }

    fn update_player(&mut self) {
        let Some(cell) = self.player.advance(&self.maze, self.config.cell_size) else {
            return;
        };
        match self.maze.consume(cell) {
            TileKind::Pickup => {
                self.score = self.score.saturating_add(self.config.pickup_score);
                self.stats.pickups += 1;
                self.events.push(RuntimeEvent::PickupEaten {
                    x: cell.x,
                    y: cell.y,
                });
            }
            TileKind::PowerPickup => {
                self.score = self.score.saturating_add(self.config.power_pickup_score);
                self.stats.power_pickups += 1;
                self.events.push(RuntimeEvent::PowerPickupEaten {
                    x: cell.x,
                    y: cell.y,
                });
                self.activate_power_up();
            }
            TileKind::Empty | TileKind::Wall => {}
        }
    }

    fn update_pursuers(&mut self) {
        let player_cell = self.player.mover.cell;
        for pursuer in &mut self.pursuers {
            if pursuer.is_parked() {
                continue;
            }
            let goal = pursuer.goal(player_cell, &self.flee, &self.maze, &self.routing);
            pursuer.mover.advance(
                &self.maze,
                Steering::Route {
                    routing: &self.routing,
                    goal,
                },
                self.config.cell_size,
            );
        }
    }

    fn resolve_collisions(&mut self) {
        let player_pos = self.player.mover.pos;
        let radius = capture_radius(self.config.cell_size);
        for pursuer in &mut self.pursuers {
            if pursuer.is_parked() || player_pos.distance_to(pursuer.mover.pos) >= radius {
                continue;
            }
            match pursuer.mode {
                PursuerMode::Vulnerable => {
                    pursuer.send_home(self.config.cell_size);
                    self.score = self.score.saturating_add(self.config.capture_score);
                    self.stats.captures += 1;
                    self.events.push(RuntimeEvent::PursuerCaptured {
                        pursuer_id: pursuer.id,
                    });
                }
                PursuerMode::Hunting => {
                    if self.phase == GamePhase::Playing {
                        self.phase = GamePhase::Lost;
                        self.events.push(RuntimeEvent::PlayerCaught {
                            pursuer_id: pursuer.id,
                        });
                    }
                }
                PursuerMode::AtSpawn => {}
            }
        }
    }

    fn check_cleared(&mut self) {
        if self.phase == GamePhase::Playing && self.maze.pickups_left() == 0 {
            self.phase = GamePhase::Won;
            self.events.push(RuntimeEvent::MazeCleared);
        }
    }
}

fn spawn_agents(maze: &Maze, config: &GameConfig) -> (Player, Vec<Pursuer>) {
    let player = Player::new(maze.player_spawn(), config.player_speed, config.cell_size);
    let pursuers = maze
        .pursuer_spawns()
        .iter()
        .enumerate()
        .map(|(id, spawn)| Pursuer::new(id, *spawn, maze, config.pursuer_speed, config.cell_size))
        .collect();
    (player, pursuers)
}

/// Cell the player would enter next if it kept its current heading.
pub fn lookahead(maze: &Maze, cell: Cell, dir: Direction) -> Option<Cell> {
    if dir == Direction::None {
        return None;
    }
    let next = maze.wrap_step(cell, dir);
    maze.is_open(next).then_some(next)
}
