pub const TICK_RATE: u32 = 50;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const CELL_SIZE: f32 = 30.0;
pub const PLAYER_SPEED: f32 = 5.0;
pub const PURSUER_SPEED: f32 = 4.0;

pub const PICKUP_SCORE: u32 = 10;
pub const POWER_PICKUP_SCORE: u32 = 50;
pub const CAPTURE_SCORE: u32 = 200;

pub const POWER_UP_TICKS: u32 = 300;
/// Below this many remaining ticks renderers flash vulnerable pursuers.
pub const POWER_UP_ENDING_TICKS: u32 = 50;
pub const SCATTER_POWER_PICKUPS: usize = 4;

pub const MAX_MAZE_SIDE: usize = 100;
/// The routing table is n² in memory and n³ to build over open cells.
pub const MAX_OPEN_CELLS: usize = 2_500;
/// How far (per axis) a walled corner may be nudged to find an open flee cell.
pub const FLEE_CORNER_SEARCH: i32 = 2;
pub const FLEE_STEP: i32 = 2;

pub fn capture_radius(cell_size: f32) -> f32 {
    cell_size / 2.0
}

pub fn ticks_to_seconds_ceil(ticks: u32, tick_ms: u64) -> u64 {
    (ticks as u64 * tick_ms).div_ceil(1000)
}
