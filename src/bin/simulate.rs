use chrono::{SecondsFormat, Utc};
use clap::Parser;
use pacman_chase_sim::clock::{spawn_clock, ClockCommand};
use pacman_chase_sim::constants::TICK_RATE;
use pacman_chase_sim::engine::{lookahead, GameEngine};
use pacman_chase_sim::maze::Maze;
use pacman_chase_sim::routing::RoutingTable;
use pacman_chase_sim::types::{
    Cell, Direction, GameConfig, GamePhase, GameSummary, PursuerMode, RuntimeEvent, Snapshot,
    TileKind,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const DEMO_MAZE: &str = include_str!("../../demos/classic.txt");
const DEFAULT_MAX_TICKS: u64 = TICK_RATE as u64 * 60 * 5;
/// Routing distance at which the autopilot starts backing off a hunter.
const DANGER_STEPS: u32 = 3;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Maze file; the bundled demo maze is used when omitted.
    #[arg(long)]
    maze: Option<PathBuf>,
    /// JSON file with `GameConfig` overrides.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    tick_ms: Option<u64>,
    #[arg(long)]
    player_speed: Option<f32>,
    #[arg(long)]
    pursuer_speed: Option<f32>,
    #[arg(long)]
    power_up_ticks: Option<u32>,
    /// Power pickups to scatter on mazes that define none.
    #[arg(long)]
    scatter_power_pickups: Option<usize>,
    /// Scripted input such as `right:40,down:12`; autopilot when omitted.
    #[arg(long)]
    moves: Option<String>,
    #[arg(long)]
    max_ticks: Option<u64>,
    /// Run through the real-time clock instead of a tight loop.
    #[arg(long)]
    realtime: bool,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct MoveStep {
    dir: Direction,
    ticks: u64,
}

#[derive(Clone, Debug)]
enum Pilot {
    Script(Vec<MoveStep>),
    Autopilot,
}

impl Pilot {
    fn name(&self) -> &'static str {
        match self {
            Self::Script(_) => "script",
            Self::Autopilot => "autopilot",
        }
    }

    fn decide(&self, view: &Observation<'_>) -> Option<Direction> {
        match self {
            Self::Script(steps) => scripted_direction(steps, view.snapshot.tick),
            Self::Autopilot => autopilot_direction(view),
        }
    }
}

/// What a pilot may look at: the maze as the player sees it, the routing
/// table and the latest published snapshot.
struct Observation<'a> {
    maze: &'a Maze,
    routing: &'a RoutingTable,
    snapshot: &'a Snapshot,
}

#[derive(Clone, Debug, Serialize)]
struct RunResultLine {
    seed: u32,
    maze: String,
    mode: &'static str,
    pilot: &'static str,
    #[serde(rename = "pickupsLeft")]
    pickups_left: usize,
    #[serde(flatten)]
    summary: GameSummary,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    #[serde(rename = "timestampIso")]
    timestamp_iso: String,
    level: String,
    event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

/// Invariant checks applied between consecutive snapshots.
#[derive(Default)]
struct Watchdog {
    previous: Option<(u32, usize)>,
    anomalies: Vec<String>,
}

impl Watchdog {
    fn observe(&mut self, snapshot: &Snapshot, seed: u32) {
        for message in collect_snapshot_anomalies(self.previous, snapshot) {
            emit_log("warn", "anomaly_detected", Some(seed), Some(snapshot.tick), json!({ "message": message }));
            if !self.anomalies.contains(&message) {
                self.anomalies.push(message);
            }
        }
        self.previous = Some((snapshot.score, snapshot.pickups_left));
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(error) => {
            emit_log("error", "config_invalid", None, None, json!({ "error": error }));
            std::process::exit(2);
        }
    };
    let seed = config.seed;
    let (maze_name, maze) = match load_maze(cli.maze.as_deref()) {
        Ok(loaded) => loaded,
        Err(error) => {
            emit_log("error", "maze_invalid", Some(seed), None, json!({ "error": error }));
            std::process::exit(2);
        }
    };
    let pilot = match cli.moves.as_deref().map(parse_moves).transpose() {
        Ok(Some(steps)) => Pilot::Script(steps),
        Ok(None) => Pilot::Autopilot,
        Err(error) => {
            emit_log("error", "moves_invalid", Some(seed), None, json!({ "error": error }));
            std::process::exit(2);
        }
    };
    let max_ticks = cli.max_ticks.unwrap_or(DEFAULT_MAX_TICKS);

    let engine = GameEngine::new(maze, config);
    emit_log(
        "info",
        "run_started",
        Some(seed),
        None,
        json!({
            "maze": maze_name,
            "rows": engine.maze().rows(),
            "cols": engine.maze().cols(),
            "pursuers": engine.pursuers().len(),
            "pickups": engine.maze().pickups_left(),
            "powerPickups": engine.maze().power_pickup_count(),
            "pilot": pilot.name(),
            "realtime": cli.realtime,
            "maxTicks": max_ticks,
        }),
    );

    let mut watchdog = Watchdog::default();
    let finished = if cli.realtime {
        run_realtime(engine, &pilot, max_ticks, &mut watchdog).await
    } else {
        Ok(run_headless(engine, &pilot, max_ticks, &mut watchdog))
    };
    let engine = match finished {
        Ok(engine) => engine,
        Err(error) => {
            emit_log("error", "clock_failed", Some(seed), None, json!({ "error": error }));
            std::process::exit(1);
        }
    };

    let summary = engine.build_summary();
    let result = RunResultLine {
        seed,
        maze: maze_name,
        mode: if cli.realtime { "realtime" } else { "headless" },
        pilot: pilot.name(),
        pickups_left: engine.maze().pickups_left(),
        summary,
        anomalies: watchdog.anomalies,
    };

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &result) {
            emit_log(
                "error",
                "summary_write_failed",
                Some(seed),
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        Some(seed),
        Some(result.summary.ticks),
        json!({
            "phase": result.summary.phase,
            "score": result.summary.score,
            "anomalyCount": result.anomalies.len(),
            "summaryOut": summary_out_written,
        }),
    );
    println!(
        "{}",
        serde_json::to_string(&result).expect("run result should serialize")
    );

    if !result.anomalies.is_empty() {
        std::process::exit(1);
    }
}

fn run_headless(
    mut engine: GameEngine,
    pilot: &Pilot,
    max_ticks: u64,
    watchdog: &mut Watchdog,
) -> GameEngine {
    let seed = engine.config.seed;
    let mut snapshot = engine.build_snapshot(true);
    while engine.is_running() && engine.tick() < max_ticks {
        let decision = pilot.decide(&Observation {
            maze: engine.maze(),
            routing: engine.routing(),
            snapshot: &snapshot,
        });
        if let Some(dir) = decision {
            engine.steer(dir);
        }
        engine.step();
        snapshot = engine.build_snapshot(true);
        log_runtime_events(seed, &snapshot);
        watchdog.observe(&snapshot, seed);
    }
    engine
}

async fn run_realtime(
    engine: GameEngine,
    pilot: &Pilot,
    max_ticks: u64,
    watchdog: &mut Watchdog,
) -> Result<GameEngine, String> {
    let seed = engine.config.seed;
    // The clock owns the engine; the pilot plays on a mirror kept current
    // from the published pickup events.
    let mut mirror = engine.maze().clone();
    let routing = engine.routing().clone();
    let (commands, mut snapshots, handle) = spawn_clock(engine);
    let mut latest = snapshots.borrow_and_update().clone();

    while latest.phase == GamePhase::Playing && latest.tick < max_ticks {
        let decision = pilot.decide(&Observation {
            maze: &mirror,
            routing: &routing,
            snapshot: &latest,
        });
        if let Some(dir) = decision {
            if commands.send(ClockCommand::Steer(dir)).await.is_err() {
                break;
            }
        }
        if snapshots.changed().await.is_err() {
            break;
        }
        latest = snapshots.borrow_and_update().clone();
        for event in &latest.events {
            if let RuntimeEvent::PickupEaten { x, y } | RuntimeEvent::PowerPickupEaten { x, y } = event {
                mirror.consume(Cell::new(*x, *y));
            }
        }
        log_runtime_events(seed, &latest);
        watchdog.observe(&latest, seed);
    }

    // the clock may already be gone if it panicked; the join below reports that
    let _ = commands.send(ClockCommand::Stop).await;
    handle.await.map_err(|error| error.to_string())
}

fn resolve_config(cli: &Cli) -> Result<GameConfig, String> {
    let mut config = match cli.config.as_ref() {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|error| format!("{}: {error}", path.to_string_lossy()))?;
            parse_config(&text)?
        }
        None => GameConfig::default(),
    };
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_ms = tick_ms;
    }
    if let Some(speed) = cli.player_speed {
        config.player_speed = speed;
    }
    if let Some(speed) = cli.pursuer_speed {
        config.pursuer_speed = speed;
    }
    if let Some(ticks) = cli.power_up_ticks {
        config.power_up_ticks = ticks;
    }
    if let Some(count) = cli.scatter_power_pickups {
        config.scatter_power_pickups = count;
    }
    match cli.seed {
        Some(seed) => config.seed = normalize_seed(seed),
        None if cli.config.is_none() => config.seed = rand::random::<u32>(),
        None => {}
    }
    validate_config(&config)?;
    Ok(config)
}

fn parse_config(text: &str) -> Result<GameConfig, String> {
    serde_json::from_str(text).map_err(|error| error.to_string())
}

fn validate_config(config: &GameConfig) -> Result<(), String> {
    if config.tick_ms == 0 {
        return Err("tickMs must be positive".to_string());
    }
    if !config.cell_size.is_finite() || config.cell_size <= 0.0 {
        return Err("cellSize must be a positive number".to_string());
    }
    for (name, speed) in [
        ("playerSpeed", config.player_speed),
        ("pursuerSpeed", config.pursuer_speed),
    ] {
        if !speed.is_finite() || speed < 0.0 {
            return Err(format!("{name} must be a finite, non-negative number"));
        }
    }
    Ok(())
}

fn load_maze(path: Option<&Path>) -> Result<(String, Maze), String> {
    match path {
        Some(path) => {
            let maze = Maze::load(path).map_err(|error| error.to_string())?;
            Ok((path.to_string_lossy().to_string(), maze))
        }
        None => {
            let maze = Maze::parse(DEMO_MAZE).map_err(|error| error.to_string())?;
            Ok(("demo".to_string(), maze))
        }
    }
}

fn parse_moves(script: &str) -> Result<Vec<MoveStep>, String> {
    script
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (dir, ticks) = part
                .split_once(':')
                .ok_or_else(|| format!("`{part}` is not dir:ticks"))?;
            let dir = Direction::parse_move(&dir.trim().to_ascii_lowercase())
                .ok_or_else(|| format!("unknown direction `{dir}`"))?;
            let ticks = ticks
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("`{ticks}` is not a tick count"))?;
            Ok(MoveStep { dir, ticks })
        })
        .collect()
}

/// Direction the script asks for after `tick` completed ticks; `None` once the
/// script has run out and the player just coasts.
fn scripted_direction(steps: &[MoveStep], tick: u64) -> Option<Direction> {
    let mut start = 0u64;
    for step in steps {
        if tick < start + step.ticks {
            return Some(step.dir);
        }
        start += step.ticks;
    }
    None
}

fn autopilot_direction(view: &Observation<'_>) -> Option<Direction> {
    let maze = view.maze;
    let routing = view.routing;
    // decide for the cell the player is about to stand on
    let from = view.snapshot.player.next_cell.unwrap_or(view.snapshot.player.cell);

    let threat = view
        .snapshot
        .pursuers
        .iter()
        .filter(|pursuer| pursuer.mode == PursuerMode::Hunting)
        .filter_map(|pursuer| routing.distance(from, pursuer.cell).map(|d| (d, pursuer.cell)))
        .min();
    if let Some((steps, hunter)) = threat {
        if steps <= DANGER_STEPS {
            return retreat_direction(maze, routing, from, hunter);
        }
    }

    let goal = maze
        .open_cells()
        .filter(|cell| matches!(maze.kind(*cell), TileKind::Pickup | TileKind::PowerPickup))
        .filter_map(|cell| routing.distance(from, cell).map(|d| (d, cell)))
        .min()
        .map(|(_, cell)| cell)?;
    let hop = routing.next_hop(from, goal)?;
    maze.hop_direction(from, hop)
}

fn retreat_direction(maze: &Maze, routing: &RoutingTable, from: Cell, hunter: Cell) -> Option<Direction> {
    [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
        .into_iter()
        .filter_map(|dir| lookahead(maze, from, dir).map(|next| (dir, next)))
        .filter_map(|(dir, next)| routing.distance(next, hunter).map(|d| (d, dir)))
        .max_by_key(|(d, _)| *d)
        .map(|(_, dir)| dir)
}

fn collect_snapshot_anomalies(previous: Option<(u32, usize)>, snapshot: &Snapshot) -> Vec<String> {
    let mut anomalies = Vec::new();
    if let Some((score, pickups_left)) = previous {
        if snapshot.score < score {
            anomalies.push(format!("score decreased: {score} -> {}", snapshot.score));
        }
        if snapshot.pickups_left > pickups_left {
            anomalies.push(format!(
                "pickups grew: {pickups_left} -> {}",
                snapshot.pickups_left
            ));
        }
    }
    for pursuer in &snapshot.pursuers {
        if pursuer.mode == PursuerMode::Vulnerable && !snapshot.power_up_active {
            anomalies.push(format!("pursuer {} vulnerable without power-up", pursuer.id));
        }
        if pursuer.mode == PursuerMode::AtSpawn && pursuer.cell != pursuer.spawn {
            anomalies.push(format!("parked pursuer {} away from spawn", pursuer.id));
        }
    }
    if snapshot.phase == GamePhase::Won && snapshot.pickups_left > 0 {
        anomalies.push(format!("won with {} pickups left", snapshot.pickups_left));
    }
    anomalies
}

fn log_runtime_events(seed: u32, snapshot: &Snapshot) {
    for event in &snapshot.events {
        let details = serde_json::to_value(event).unwrap_or(Value::Null);
        emit_log("info", "runtime_event", Some(seed), Some(snapshot.tick), details);
    }
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn emit_log(level: &str, event: &str, seed: Option<u32>, tick: Option<u64>, details: Value) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        timestamp_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        level: level.to_string(),
        event: event.to_string(),
        seed,
        tick,
        details,
    };
    eprintln!(
        "{}",
        serde_json::to_string(&log_line).expect("structured log should serialize")
    );
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, result: &RunResultLine) -> io::Result<()> {
    let text = serde_json::to_string_pretty(result).expect("run result should serialize");
    std::fs::write(path, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> GameConfig {
        GameConfig {
            scatter_power_pickups: 0,
            ..GameConfig::default()
        }
    }

    #[test]
    fn demo_maze_parses() {
        let maze = Maze::parse(DEMO_MAZE).expect("demo maze");
        assert_eq!(maze.pursuer_spawns().len(), 4);
        assert_eq!(maze.power_pickup_count(), 4);
        let routing = RoutingTable::build(&maze);
        for spawn in maze.pursuer_spawns() {
            assert!(routing.is_reachable(*spawn, maze.player_spawn()));
        }
    }

    #[test]
    fn parse_moves_reads_dir_tick_pairs() {
        let steps = parse_moves("right:40, D:12,l:3").expect("valid script");
        assert_eq!(
            steps,
            vec![
                MoveStep { dir: Direction::Right, ticks: 40 },
                MoveStep { dir: Direction::Down, ticks: 12 },
                MoveStep { dir: Direction::Left, ticks: 3 },
            ]
        );
        assert!(parse_moves("right").is_err());
        assert!(parse_moves("north:3").is_err());
        assert!(parse_moves("up:-1").is_err());
    }

    #[test]
    fn scripted_direction_follows_the_windows() {
        let steps = parse_moves("right:2,down:3").expect("valid script");
        let dirs: Vec<Option<Direction>> = (0..6).map(|tick| scripted_direction(&steps, tick)).collect();
        assert_eq!(
            dirs,
            vec![
                Some(Direction::Right),
                Some(Direction::Right),
                Some(Direction::Down),
                Some(Direction::Down),
                Some(Direction::Down),
                None,
            ]
        );
    }

    #[test]
    fn config_rejects_bad_values_and_keeps_defaults() {
        let config = parse_config(r#"{"pursuerSpeed": 3.5}"#).expect("partial config");
        assert_eq!(config.pursuer_speed, 3.5);
        assert_eq!(config.player_speed, GameConfig::default().player_speed);
        assert!(validate_config(&config).is_ok());
        let tick_zero = parse_config(r#"{"tickMs": 0}"#).expect("parses");
        assert!(validate_config(&tick_zero).is_err());
        let negative_cell = parse_config(r#"{"cellSize": -1}"#).expect("parses");
        assert!(validate_config(&negative_cell).is_err());
        assert!(parse_config("not json").is_err());
    }

    #[test]
    fn non_finite_speeds_are_rejected() {
        for speed in [f32::NAN, f32::INFINITY, -1.0] {
            let player = GameConfig {
                player_speed: speed,
                ..GameConfig::default()
            };
            assert!(validate_config(&player).is_err(), "player speed {speed}");
            let pursuer = GameConfig {
                pursuer_speed: speed,
                ..GameConfig::default()
            };
            assert!(validate_config(&pursuer).is_err(), "pursuer speed {speed}");
        }
        let nan = Cli::try_parse_from(["simulate", "--player-speed", "NaN"]).expect("clap parses NaN");
        assert!(resolve_config(&nan).is_err());
    }

    #[test]
    fn command_line_overrides_individual_rules() {
        let cli = Cli::try_parse_from([
            "simulate",
            "--seed",
            "7",
            "--pursuer-speed",
            "2.5",
            "--power-up-ticks",
            "120",
            "--scatter-power-pickups",
            "0",
            "--tick-ms",
            "10",
        ])
        .expect("valid arguments");
        let config = resolve_config(&cli).expect("valid config");
        assert_eq!(config.seed, 7);
        assert_eq!(config.pursuer_speed, 2.5);
        assert_eq!(config.power_up_ticks, 120);
        assert_eq!(config.scatter_power_pickups, 0);
        assert_eq!(config.tick_ms, 10);
        assert_eq!(config.player_speed, GameConfig::default().player_speed);
    }

    #[test]
    fn autopilot_heads_for_the_nearest_pickup() {
        let mut engine =
            GameEngine::from_text("3\n7\n#######\n#.0P00#\n#######\n", quiet()).expect("lane");
        let snapshot = engine.build_snapshot(false);
        let dir = autopilot_direction(&Observation {
            maze: engine.maze(),
            routing: engine.routing(),
            snapshot: &snapshot,
        });
        assert_eq!(dir, Some(Direction::Left));
    }

    #[test]
    fn autopilot_backs_off_a_close_hunter() {
        let mut engine = GameEngine::from_text("3\n9\n#########\n#..PG...#\n#########\n", quiet())
            .expect("lane");
        let snapshot = engine.build_snapshot(false);
        let dir = autopilot_direction(&Observation {
            maze: engine.maze(),
            routing: engine.routing(),
            snapshot: &snapshot,
        });
        assert_eq!(dir, Some(Direction::Left));
    }

    #[test]
    fn headless_run_ends_and_stays_consistent() {
        let engine = GameEngine::new(Maze::parse(DEMO_MAZE).expect("demo"), GameConfig::default());
        let mut watchdog = Watchdog::default();
        let engine = run_headless(engine, &Pilot::Autopilot, 3_000, &mut watchdog);
        assert!(!engine.is_running() || engine.tick() == 3_000);
        assert!(watchdog.anomalies.is_empty(), "{:?}", watchdog.anomalies);
        let summary = engine.build_summary();
        assert!(summary.pickups_eaten > 0);
    }

    #[test]
    fn anomalies_flag_shrinking_score_and_growing_pickups() {
        let mut engine = GameEngine::from_text("3\n5\n#####\n#P.G#\n#####\n", quiet()).expect("lane");
        let snapshot = engine.build_snapshot(false);
        assert!(collect_snapshot_anomalies(Some((0, 1)), &snapshot).is_empty());
        let found = collect_snapshot_anomalies(Some((30, 0)), &snapshot);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!("pacman-chase-missing-{}", now_ms()))
            .join("summary.json");
        let result = RunResultLine {
            seed: 1,
            maze: "demo".to_string(),
            mode: "headless",
            pilot: "autopilot",
            pickups_left: 0,
            summary: GameSummary {
                phase: GamePhase::Won,
                ticks: 10,
                score: 10,
                pickups_eaten: 1,
                power_pickups_eaten: 0,
                captures: 0,
            },
            anomalies: Vec::new(),
        };
        assert!(write_summary(&target, &result).is_err());
    }
}
