use serde::{Deserialize, Serialize};

use crate::constants::{
    CAPTURE_SCORE, CELL_SIZE, PICKUP_SCORE, PLAYER_SPEED, POWER_PICKUP_SCORE, POWER_UP_TICKS,
    PURSUER_SPEED, SCATTER_POWER_PICKUPS, TICK_MS,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" | "u" => Some(Self::Up),
            "down" | "d" => Some(Self::Down),
            "left" | "l" => Some(Self::Left),
            "right" | "r" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::None => (0, 0),
        }
    }
}

/// Grid coordinate: `x` is the column, `y` the row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Continuous screen-space position.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize)]
pub struct ScreenPos {
    pub x: f32,
    pub y: f32,
}

impl ScreenPos {
    pub fn distance_to(self, other: ScreenPos) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Empty,
    Wall,
    Pickup,
    PowerPickup,
}

impl TileKind {
    pub fn is_open(self) -> bool {
        self != Self::Wall
    }

    pub fn glyph(self) -> char {
        match self {
            Self::Empty => '0',
            Self::Wall => '#',
            Self::Pickup => '.',
            Self::PowerPickup => 'C',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Playing,
    Won,
    Lost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PursuerMode {
    Hunting,
    Vulnerable,
    AtSpawn,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    #[serde(rename = "tickMs")]
    pub tick_ms: u64,
    #[serde(rename = "cellSize")]
    pub cell_size: f32,
    #[serde(rename = "playerSpeed")]
    pub player_speed: f32,
    #[serde(rename = "pursuerSpeed")]
    pub pursuer_speed: f32,
    #[serde(rename = "pickupScore")]
    pub pickup_score: u32,
    #[serde(rename = "powerPickupScore")]
    pub power_pickup_score: u32,
    #[serde(rename = "captureScore")]
    pub capture_score: u32,
    #[serde(rename = "powerUpTicks")]
    pub power_up_ticks: u32,
    #[serde(rename = "scatterPowerPickups")]
    pub scatter_power_pickups: usize,
    pub seed: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            cell_size: CELL_SIZE,
            player_speed: PLAYER_SPEED,
            pursuer_speed: PURSUER_SPEED,
            pickup_score: PICKUP_SCORE,
            power_pickup_score: POWER_PICKUP_SCORE,
            capture_score: CAPTURE_SCORE,
            power_up_ticks: POWER_UP_TICKS,
            scatter_power_pickups: SCATTER_POWER_PICKUPS,
            seed: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub cell: Cell,
    /// Cell being walked into, if mid-transit.
    #[serde(rename = "nextCell")]
    pub next_cell: Option<Cell>,
    pub pos: ScreenPos,
    pub dir: Direction,
    #[serde(rename = "desiredDir")]
    pub desired_dir: Direction,
}

#[derive(Clone, Debug, Serialize)]
pub struct PursuerView {
    pub id: usize,
    pub cell: Cell,
    pub pos: ScreenPos,
    pub dir: Direction,
    pub mode: PursuerMode,
    pub spawn: Cell,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    PickupEaten {
        x: i32,
        y: i32,
    },
    PowerPickupEaten {
        x: i32,
        y: i32,
    },
    PowerUpStarted {
        ticks: u32,
    },
    PowerUpEnded,
    PursuerCaptured {
        #[serde(rename = "pursuerId")]
        pursuer_id: usize,
    },
    PlayerCaught {
        #[serde(rename = "pursuerId")]
        pursuer_id: usize,
    },
    MazeCleared,
    Restarted,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub phase: GamePhase,
    pub score: u32,
    #[serde(rename = "powerUpActive")]
    pub power_up_active: bool,
    #[serde(rename = "powerUpTicksLeft")]
    pub power_up_ticks_left: u32,
    #[serde(rename = "powerUpSecondsLeft")]
    pub power_up_seconds_left: u64,
    #[serde(rename = "powerUpEnding")]
    pub power_up_ending: bool,
    #[serde(rename = "pickupsLeft")]
    pub pickups_left: usize,
    pub tiles: Vec<String>,
    pub player: PlayerView,
    pub pursuers: Vec<PursuerView>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameSummary {
    pub phase: GamePhase,
    pub ticks: u64,
    pub score: u32,
    #[serde(rename = "pickupsEaten")]
    pub pickups_eaten: u32,
    #[serde(rename = "powerPickupsEaten")]
    pub power_pickups_eaten: u32,
    pub captures: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_fills_missing_fields_with_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{"captureScore": 400, "powerUpTicks": 120}"#)
                .expect("partial config parses");
        assert_eq!(config.capture_score, 400);
        assert_eq!(config.power_up_ticks, 120);
        assert_eq!(config.pickup_score, PICKUP_SCORE);
        assert_eq!(config.tick_ms, TICK_MS);
    }

    #[test]
    fn direction_parsing_accepts_short_forms() {
        assert_eq!(Direction::parse_move("l"), Some(Direction::Left));
        assert_eq!(Direction::parse_move("down"), Some(Direction::Down));
        assert_eq!(Direction::parse_move("sideways"), None);
    }

    #[test]
    fn runtime_events_serialize_with_type_tag() {
        let json = serde_json::to_value(RuntimeEvent::PursuerCaptured { pursuer_id: 2 })
            .expect("event serializes");
        assert_eq!(json["type"], "pursuer_captured");
        assert_eq!(json["pursuerId"], 2);
    }
}
