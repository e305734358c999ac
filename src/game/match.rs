//! Match actor: the single task that owns and mutates the match

use parking_lot::RwLock;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::config::GameConfig;

use super::arena::Position;
use super::broadcast::Broadcaster;
use super::controller::MatchController;
use super::state::MatchPhase;
use super::ticker::spawn_ticker;
use super::SessionId;

/// Capacity of the match command queue
const COMMAND_QUEUE: usize = 1024;

/// Unit of work for the match task. Commands are applied one at a time.
#[derive(Debug, Clone)]
pub enum MatchCommand {
    Join {
        session: SessionId,
        name: Option<String>,
    },
    Move {
        session: SessionId,
        x: f32,
        y: f32,
    },
    Disconnect {
        session: SessionId,
    },
    Tick,
}

/// Read-only view of the match published after every command
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub phase: MatchPhase,
    pub players: usize,
    pub alive_players: usize,
    pub tick: u64,
}

impl Default for MatchSummary {
    fn default() -> Self {
        Self {
            phase: MatchPhase::Waiting,
            players: 0,
            alive_players: 0,
            tick: 0,
        }
    }
}

/// Handle to the running match
#[derive(Clone)]
pub struct MatchHandle {
    commands: mpsc::Sender<MatchCommand>,
    summary: Arc<RwLock<MatchSummary>>,
}

impl MatchHandle {
    /// Queue a command. Returns false once the match task is gone.
    pub async fn send(&self, cmd: MatchCommand) -> bool {
        self.commands.send(cmd).await.is_ok()
    }

    pub fn summary(&self) -> MatchSummary {
        *self.summary.read()
    }

    /// Handle with no match behind it; commands land in the returned queue
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::Receiver<MatchCommand>) {
        let (commands, rx) = mpsc::channel(COMMAND_QUEUE);
        let handle = Self {
            commands,
            summary: Arc::new(RwLock::new(MatchSummary::default())),
        };
        (handle, rx)
    }
}

/// The authoritative match
pub struct GameMatch {
    controller: MatchController,
    commands: mpsc::Receiver<MatchCommand>,
    ticker_tx: mpsc::Sender<MatchCommand>,
    summary: Arc<RwLock<MatchSummary>>,
    tick_period: Duration,
}

impl GameMatch {
    pub fn new(config: GameConfig, out: Arc<dyn Broadcaster>, seed: u64) -> (Self, MatchHandle) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE);
        let summary = Arc::new(RwLock::new(MatchSummary::default()));

        let handle = MatchHandle {
            commands: commands_tx.clone(),
            summary: summary.clone(),
        };

        let tick_period = config.tick_period;
        let game_match = Self {
            controller: MatchController::new(config, out, ChaCha8Rng::seed_from_u64(seed)),
            commands: commands_rx,
            ticker_tx: commands_tx,
            summary,
            tick_period,
        };

        (game_match, handle)
    }

    /// Apply commands until `shutdown` flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let GameMatch {
            mut controller,
            mut commands,
            ticker_tx,
            summary,
            tick_period,
        } = self;

        info!(tick_ms = tick_period.as_millis() as u64, "Match loop started");
        let ticker = spawn_ticker(tick_period, ticker_tx);
        let dt = controller.config().tick_delta();

        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    apply(&mut controller, cmd, dt);
                    *summary.write() = summarize(&controller);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        ticker.cancel();
        info!(tick = controller.state().tick, "Match loop stopped");
    }
}

fn apply(controller: &mut MatchController, cmd: MatchCommand, dt: f32) {
    match cmd {
        MatchCommand::Join { session, name } => {
            controller.on_join(session, name);
        }
        MatchCommand::Move { session, x, y } => {
            if !controller.on_move(session, Position::new(x, y)) {
                debug!(session_id = %session, "Move not applied");
            }
        }
        MatchCommand::Disconnect { session } => {
            controller.on_disconnect(session);
        }
        MatchCommand::Tick => controller.tick(dt),
    }
}

fn summarize(controller: &MatchController) -> MatchSummary {
    let state = controller.state();
    MatchSummary {
        phase: state.phase,
        players: state.player_count(),
        alive_players: state.alive_count(),
        tick: state.tick,
    }
}
