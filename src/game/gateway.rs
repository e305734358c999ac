//! Session gateway: turns connection events into match mutations

use tracing::{debug, info, warn};

use crate::ws::protocol::ServerMsg;

use super::arena::Position;
use super::controller::MatchController;
use super::state::{MatchPhase, Player};
use super::SessionId;

/// Display names longer than this are cut
pub const MAX_NAME_CHARS: usize = 24;

impl MatchController {
    /// Register a player for `session` and bring everyone up to date
    pub fn on_join(&mut self, session: SessionId, requested_name: Option<String>) -> Option<Player> {
        if self.state.contains(session) {
            warn!(session_id = %session, "Session already joined");
            return None;
        }

        let name = sanitize_name(requested_name.as_deref())
            .unwrap_or_else(|| format!("Player{}", self.state.player_count() + 1));
        let player = self.state.add_player(session, name);

        self.out.send_to(
            session,
            ServerMsg::InitialState {
                self_id: session,
                players: self.state.player_infos(),
                bomb: self.state.bomb.info(),
                phase: self.state.phase,
                matching_countdown: self.state.matching_countdown.max(0.0),
                game_over_countdown: self.state.game_over_countdown.max(0.0),
            },
        );
        self.out.send_to_all_except(
            session,
            ServerMsg::PlayerJoined {
                player: player.info(),
            },
        );

        info!(
            session_id = %session,
            name = %player.name,
            phase = ?self.state.phase,
            players = self.state.player_count(),
            "Player joined"
        );

        if self.state.player_count() == 1 && self.state.phase == MatchPhase::Waiting {
            self.start_matching();
        }

        Some(player)
    }

    /// Apply a movement intent. Only living players move, and only while playing.
    pub fn on_move(&mut self, session: SessionId, candidate: Position) -> bool {
        if !candidate.is_finite() {
            debug!(session_id = %session, "Dropping non-finite move");
            return false;
        }
        if self.state.phase != MatchPhase::Playing {
            return false;
        }

        let clamped = self.state.arena().clamp(candidate);
        if !self.state.set_position(session, clamped) {
            return false;
        }

        if self.state.bomb.holder == Some(session) {
            self.try_transfer(session);
        }

        self.out.send_to_all_except(
            session,
            ServerMsg::PlayerMoved {
                id: session,
                x: clamped.x,
                y: clamped.y,
            },
        );
        true
    }

    /// Drop the session's player, repair the bomb and phase, tell everyone
    pub fn on_disconnect(&mut self, session: SessionId) -> Option<Player> {
        let had_bomb = self.state.bomb.holder == Some(session);
        let removed = self.state.remove_player(session)?;

        info!(
            session_id = %session,
            name = %removed.name,
            had_bomb,
            "Player left"
        );

        self.handle_departure(session, had_bomb);
        self.out.send_to_all(ServerMsg::PlayerLeft {
            session_id: session,
        });

        Some(removed)
    }
}

/// Trimmed, length-capped name, or `None` when nothing printable is left
fn sanitize_name(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_NAME_CHARS).collect())
}
