use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::engine::GameEngine;
use crate::types::{Direction, Snapshot};

const COMMAND_QUEUE: usize = 64;

/// Inputs accepted by a running clock. Steering is last-writer-wins.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClockCommand {
    Steer(Direction),
    Restart,
    Stop,
}

/// Drives `engine` at its configured tick rate until `Stop` arrives or every
/// command sender is dropped, then hands the engine back.
///
/// A snapshot (with the events drained since the previous one) is published
/// after every tick and after a restart. Once the game is won or lost no
/// further ticks are scheduled until a `Restart`.
pub async fn run_clock(
    mut engine: GameEngine,
    mut commands: mpsc::Receiver<ClockCommand>,
    snapshots: watch::Sender<Snapshot>,
) -> GameEngine {
    let period = Duration::from_millis(engine.config.tick_ms.max(1));
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(ClockCommand::Steer(dir)) => engine.steer(dir),
                Some(ClockCommand::Restart) => {
                    engine.restart();
                    interval.reset();
                    snapshots.send_replace(engine.build_snapshot(true));
                }
                Some(ClockCommand::Stop) | None => break,
            },
            _ = interval.tick(), if engine.is_running() => {
                engine.step();
                snapshots.send_replace(engine.build_snapshot(true));
            }
        }
    }
    engine
}

/// Spawns `run_clock` on the current runtime.
pub fn spawn_clock(
    mut engine: GameEngine,
) -> (
    mpsc::Sender<ClockCommand>,
    watch::Receiver<Snapshot>,
    JoinHandle<GameEngine>,
) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
    let (snapshot_tx, snapshot_rx) = watch::channel(engine.build_snapshot(false));
    let handle = tokio::spawn(run_clock(engine, command_rx, snapshot_tx));
    (command_tx, snapshot_rx, handle)
}
