//! Fixed-rate simulation step and the timer that drives it

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

use crate::util::scheduler::{self, ScheduledTask};
use crate::ws::protocol::ServerMsg;

use super::controller::MatchController;
use super::r#match::MatchCommand;
use super::state::MatchPhase;

impl MatchController {
    /// Advance the match by one tick of `dt` seconds, then broadcast the
    /// phase's periodic update.
    pub fn tick(&mut self, dt: f32) {
        self.state.tick += 1;

        match self.state.phase {
            MatchPhase::Waiting => {}
            MatchPhase::Matching => {
                self.state.matching_countdown -= dt;
                if self.state.matching_countdown <= 0.0 {
                    self.start_game();
                }

                self.out.send_to_all(ServerMsg::MatchingUpdate {
                    countdown: self.state.matching_countdown.max(0.0),
                    player_count: self.state.player_count(),
                });
            }
            MatchPhase::Playing => {
                if self.state.bomb.holder.is_some() {
                    self.state.bomb.time_remaining -= dt;
                    if self.state.bomb.time_remaining <= 0.0 {
                        self.explode_bomb();
                    }
                }

                self.out.send_to_all(ServerMsg::GameState {
                    players: self.state.player_infos(),
                    bomb: self.state.bomb.info(),
                });
            }
            MatchPhase::GameOver => {
                self.state.game_over_countdown -= dt;
                if self.state.game_over_countdown <= 0.0 {
                    self.reset_and_restart();
                }

                self.out.send_to_all(ServerMsg::GameOverUpdate {
                    countdown: self.state.game_over_countdown.max(0.0),
                });
            }
        }
    }
}

/// Enqueue a `Tick` into the match queue every `period`. A full queue skips
/// the tick instead of waiting.
pub fn spawn_ticker(period: Duration, commands: mpsc::Sender<MatchCommand>) -> ScheduledTask {
    scheduler::every(period, move || {
        if let Err(mpsc::error::TrySendError::Full(_)) = commands.try_send(MatchCommand::Tick) {
            warn!("Match queue full, skipping tick");
        }
    })
}
