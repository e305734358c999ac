//! Match phase state machine: matching, bomb handout, eliminations, restarts

use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::ws::protocol::ServerMsg;

use super::arena::distance;
use super::broadcast::Broadcaster;
use super::state::{MatchPhase, MatchState};
use super::SessionId;

/// Owns the match state and drives every phase transition
pub struct MatchController {
    pub(super) state: MatchState,
    pub(super) config: GameConfig,
    pub(super) out: Arc<dyn Broadcaster>,
}

impl MatchController {
    pub fn new(config: GameConfig, out: Arc<dyn Broadcaster>, rng: ChaCha8Rng) -> Self {
        Self {
            state: MatchState::new(&config, rng),
            config,
            out,
        }
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// WAITING -> MATCHING. No-op in any other phase.
    pub fn start_matching(&mut self) {
        if self.state.phase != MatchPhase::Waiting {
            return;
        }

        self.state.phase = MatchPhase::Matching;
        self.state.matching_countdown = self.config.matching_duration;

        info!(
            countdown = self.state.matching_countdown,
            players = self.state.player_count(),
            "Matching phase started"
        );
        self.out.send_to_all(ServerMsg::PhaseChange {
            phase: MatchPhase::Matching,
            countdown: Some(self.state.matching_countdown),
        });
    }

    /// MATCHING -> PLAYING with a random living holder
    pub fn start_game(&mut self) {
        self.state.phase = MatchPhase::Playing;
        self.state.bomb.time_remaining = self.config.bomb_duration;
        self.state.bomb.holder = self.state.pick_random_alive();

        match self.state.bomb.holder.and_then(|id| self.state.player(id)) {
            Some(holder) => info!(holder = %holder.id, name = %holder.name, "Game started"),
            None => warn!("Game started with nobody to hold the bomb"),
        }

        self.out.send_to_all(ServerMsg::PhaseChange {
            phase: MatchPhase::Playing,
            countdown: None,
        });
    }

    /// Bomb timer ran out: eliminate the holder and decide what happens next
    pub fn explode_bomb(&mut self) {
        let Some(victim_id) = self.state.bomb.holder else {
            return;
        };

        match self.state.player(victim_id).cloned() {
            Some(victim) => {
                self.state.mark_eliminated(victim_id);
                info!(victim = %victim_id, name = %victim.name, "Bomb exploded");
                self.out.send_to_all(ServerMsg::BombExploded {
                    victim_id,
                    victim_name: victim.name,
                });
            }
            None => {
                // Holder vanished without going through disconnect handling
                warn!(holder = %victim_id, "Bomb holder missing from roster");
                self.state.bomb.holder = None;
            }
        }

        let alive = self.state.alive_ids();
        match alive.len() {
            0 => self.end_game(None),
            1 => self.end_game(Some(alive[0])),
            _ => self.hand_bomb_to_random(),
        }
    }

    /// PLAYING -> GAME_OVER
    pub fn end_game(&mut self, winner: Option<SessionId>) {
        self.state.phase = MatchPhase::GameOver;
        self.state.game_over_countdown = self.config.game_over_duration;
        self.state.bomb.holder = None;

        let winner = winner
            .and_then(|id| self.state.player(id))
            .map(|p| p.info());

        info!(
            winner = winner.as_ref().map(|w| w.name.as_str()).unwrap_or("none"),
            restart_in = self.state.game_over_countdown,
            "Game over"
        );
        self.out.send_to_all(ServerMsg::GameOver {
            winner,
            restart_countdown: self.state.game_over_countdown,
        });
    }

    /// GAME_OVER -> WAITING, and straight on to MATCHING if anyone is still here
    pub fn reset_and_restart(&mut self) {
        self.state.reset();
        self.state.phase = MatchPhase::Waiting;
        info!(players = self.state.player_count(), "Match reset");

        if self.state.player_count() > 0 {
            self.start_matching();
        }
    }

    /// Pass the bomb from `from` to the first living player in range, in
    /// registration order. At most one transfer per call.
    pub fn try_transfer(&mut self, from: SessionId) -> bool {
        if self.state.phase != MatchPhase::Playing || self.state.bomb.holder != Some(from) {
            return false;
        }
        let Some(holder) = self.state.player(from) else {
            return false;
        };

        let radius = self.config.transfer_radius;
        let target = self
            .state
            .roster()
            .filter(|p| p.id != from && p.alive)
            .find(|p| distance(holder.position, p.position) < radius)
            .cloned();

        let Some(target) = target else {
            return false;
        };

        let from_name = holder.name.clone();
        self.state.bomb.holder = Some(target.id);

        info!(from = %from, to = %target.id, "Bomb transferred: {} -> {}", from_name, target.name);
        self.out.send_to_all(ServerMsg::BombTransferred {
            from_id: from,
            to_id: target.id,
            from_name,
            to_name: target.name,
        });
        true
    }

    /// Fix up phase and bomb after `removed` left the roster
    pub fn handle_departure(&mut self, removed: SessionId, had_bomb: bool) {
        if self.state.player_count() == 0 {
            self.state.phase = MatchPhase::Waiting;
            self.state.bomb.holder = None;
            info!("No players left, back to waiting");
            return;
        }

        if self.state.phase != MatchPhase::Playing {
            return;
        }

        if had_bomb {
            debug!(previous = %removed, "Bomb holder left, reassigning");
            self.hand_bomb_to_random();
        }

        if self.state.phase == MatchPhase::Playing && self.state.alive_count() == 0 {
            self.end_game(None);
        }
    }

    /// New random living holder with a fresh timer. Used after eliminations
    /// and after the holder disconnects.
    fn hand_bomb_to_random(&mut self) {
        self.state.bomb.holder = self.state.pick_random_alive();
        self.state.bomb.time_remaining = self.config.bomb_duration;

        if let Some(holder) = self.state.bomb.holder {
            debug!(holder = %holder, "Bomb handed to new holder");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::game::arena::Position;
    use crate::game::broadcast::testing::{Audience, RecordingBroadcaster};
    use rand::SeedableRng;
    use uuid::Uuid;

    pub(crate) fn controller_with_seed(
        seed: u64,
    ) -> (MatchController, Arc<RecordingBroadcaster>) {
        let out = Arc::new(RecordingBroadcaster::default());
        let ctl = MatchController::new(
            GameConfig::default(),
            out.clone(),
            ChaCha8Rng::seed_from_u64(seed),
        );
        (ctl, out)
    }

    fn add(ctl: &mut MatchController, name: &str) -> SessionId {
        let id = Uuid::new_v4();
        ctl.state.add_player(id, name.to_string());
        id
    }

    fn playing_with(ctl: &mut MatchController, names: &[&str]) -> Vec<SessionId> {
        let ids: Vec<SessionId> = names.iter().map(|n| add(ctl, n)).collect();
        ctl.start_matching();
        ctl.start_game();
        ids
    }

    #[test]
    fn start_matching_only_from_waiting() {
        let (mut ctl, out) = controller_with_seed(1);
        add(&mut ctl, "Alice");

        ctl.start_matching();
        assert_eq!(ctl.state.phase, MatchPhase::Matching);
        assert_eq!(ctl.state.matching_countdown, 30.0);

        ctl.state.matching_countdown = 12.0;
        ctl.start_matching();
        assert_eq!(ctl.state.matching_countdown, 12.0);

        let msgs = out.messages();
        assert_eq!(
            msgs,
            vec![ServerMsg::PhaseChange {
                phase: MatchPhase::Matching,
                countdown: Some(30.0),
            }]
        );
    }

    #[test]
    fn start_game_assigns_living_holder() {
        let (mut ctl, _out) = controller_with_seed(2);
        let ids = playing_with(&mut ctl, &["a", "b", "c"]);

        assert_eq!(ctl.state.phase, MatchPhase::Playing);
        let holder = ctl.state.bomb.holder.expect("holder assigned");
        assert!(ids.contains(&holder));
        assert_eq!(ctl.state.bomb.time_remaining, 15.0);
    }

    #[test]
    fn start_game_with_empty_roster_leaves_no_holder() {
        let (mut ctl, _out) = controller_with_seed(3);
        ctl.state.phase = MatchPhase::Matching;
        ctl.start_game();

        assert_eq!(ctl.state.phase, MatchPhase::Playing);
        assert_eq!(ctl.state.bomb.holder, None);
    }

    #[test]
    fn holder_selection_covers_every_player() {
        let mut seen = std::collections::HashSet::new();
        for seed in 0..64 {
            let (mut ctl, _out) = controller_with_seed(seed);
            let ids = playing_with(&mut ctl, &["a", "b", "c"]);
            let holder = ctl.state.bomb.holder.unwrap();
            seen.insert(ids.iter().position(|id| *id == holder).unwrap());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn transfer_picks_first_in_registration_order() {
        let (mut ctl, out) = controller_with_seed(4);
        let ids = playing_with(&mut ctl, &["a", "b", "c"]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        ctl.state.bomb.holder = Some(a);

        ctl.state.set_position(a, Position::new(100.0, 100.0));
        // c is nearer but b registered first
        ctl.state.set_position(b, Position::new(140.0, 100.0));
        ctl.state.set_position(c, Position::new(105.0, 100.0));
        out.clear();

        assert!(ctl.try_transfer(a));
        assert_eq!(ctl.state.bomb.holder, Some(b));

        let transfers: Vec<_> = out
            .take()
            .into_iter()
            .filter(|(_, m)| matches!(m, ServerMsg::BombTransferred { .. }))
            .collect();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].0, Audience::All);
    }

    #[test]
    fn transfer_requires_strictly_inside_radius_and_alive() {
        let (mut ctl, _out) = controller_with_seed(5);
        let ids = playing_with(&mut ctl, &["a", "b", "c"]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        ctl.state.bomb.holder = Some(a);

        ctl.state.set_position(a, Position::new(0.0, 0.0));
        ctl.state.set_position(b, Position::new(50.0, 0.0));
        ctl.state.set_position(c, Position::new(10.0, 0.0));
        ctl.state.mark_eliminated(c);

        assert!(!ctl.try_transfer(a));
        assert_eq!(ctl.state.bomb.holder, Some(a));
    }

    #[test]
    fn transfer_ignored_for_non_holder() {
        let (mut ctl, _out) = controller_with_seed(6);
        let ids = playing_with(&mut ctl, &["a", "b"]);
        ctl.state.bomb.holder = Some(ids[0]);
        ctl.state.set_position(ids[0], Position::new(0.0, 0.0));
        ctl.state.set_position(ids[1], Position::new(1.0, 0.0));

        assert!(!ctl.try_transfer(ids[1]));
        assert_eq!(ctl.state.bomb.holder, Some(ids[0]));
    }

    #[test]
    fn explosion_with_survivors_rearms_bomb() {
        let (mut ctl, out) = controller_with_seed(7);
        let ids = playing_with(&mut ctl, &["a", "b", "c"]);
        ctl.state.bomb.holder = Some(ids[0]);
        ctl.state.bomb.time_remaining = -0.05;
        out.clear();

        ctl.explode_bomb();

        assert_eq!(ctl.state.phase, MatchPhase::Playing);
        assert!(!ctl.state.player(ids[0]).unwrap().alive);
        let holder = ctl.state.bomb.holder.unwrap();
        assert!(holder == ids[1] || holder == ids[2]);
        assert_eq!(ctl.state.bomb.time_remaining, 15.0);
        assert_eq!(
            out.messages()[0],
            ServerMsg::BombExploded {
                victim_id: ids[0],
                victim_name: "a".into(),
            }
        );
    }

    #[test]
    fn last_survivor_wins() {
        let (mut ctl, out) = controller_with_seed(8);
        let ids = playing_with(&mut ctl, &["a", "b"]);
        ctl.state.bomb.holder = Some(ids[0]);
        out.clear();

        ctl.explode_bomb();

        assert_eq!(ctl.state.phase, MatchPhase::GameOver);
        assert_eq!(ctl.state.bomb.holder, None);
        assert_eq!(ctl.state.game_over_countdown, 10.0);
        let winner = ctl.state.player(ids[1]).unwrap().info();
        assert_eq!(
            out.messages().last().cloned(),
            Some(ServerMsg::GameOver {
                winner: Some(winner),
                restart_countdown: 10.0,
            })
        );
    }

    #[test]
    fn reset_with_players_restarts_matching() {
        let (mut ctl, _out) = controller_with_seed(9);
        let ids = playing_with(&mut ctl, &["a", "b"]);
        ctl.state.bomb.holder = Some(ids[0]);
        ctl.explode_bomb();

        ctl.reset_and_restart();

        assert_eq!(ctl.state.phase, MatchPhase::Matching);
        assert_eq!(ctl.state.matching_countdown, 30.0);
        assert_eq!(ctl.state.alive_count(), 2);
        assert_eq!(ctl.state.bomb.holder, None);
    }

    #[test]
    fn reset_without_players_stays_waiting() {
        let (mut ctl, out) = controller_with_seed(10);
        ctl.state.phase = MatchPhase::GameOver;

        ctl.reset_and_restart();

        assert_eq!(ctl.state.phase, MatchPhase::Waiting);
        assert!(out.messages().is_empty());
    }

    #[test]
    fn holder_departure_reassigns_with_fresh_timer() {
        let (mut ctl, _out) = controller_with_seed(11);
        let ids = playing_with(&mut ctl, &["a", "b", "c"]);
        ctl.state.bomb.holder = Some(ids[0]);
        ctl.state.bomb.time_remaining = 3.0;

        ctl.state.remove_player(ids[0]);
        ctl.handle_departure(ids[0], true);

        assert_eq!(ctl.state.phase, MatchPhase::Playing);
        let holder = ctl.state.bomb.holder.unwrap();
        assert!(holder == ids[1] || holder == ids[2]);
        assert_eq!(ctl.state.bomb.time_remaining, 15.0);
    }

    #[test]
    fn departure_leaving_only_the_dead_ends_round() {
        let (mut ctl, _out) = controller_with_seed(12);
        let ids = playing_with(&mut ctl, &["a", "b"]);
        ctl.state.mark_eliminated(ids[1]);
        ctl.state.bomb.holder = Some(ids[0]);

        ctl.state.remove_player(ids[0]);
        ctl.handle_departure(ids[0], true);

        assert_eq!(ctl.state.phase, MatchPhase::GameOver);
        assert_eq!(ctl.state.bomb.holder, None);
    }

    #[test]
    fn empty_roster_forces_waiting_from_any_phase() {
        for phase in [MatchPhase::Matching, MatchPhase::Playing, MatchPhase::GameOver] {
            let (mut ctl, _out) = controller_with_seed(13);
            let id = add(&mut ctl, "solo");
            ctl.state.phase = phase;
            ctl.state.bomb.holder = Some(id);

            let had_bomb = ctl.state.bomb.holder == Some(id);
            ctl.state.remove_player(id);
            ctl.handle_departure(id, had_bomb);

            assert_eq!(ctl.state.phase, MatchPhase::Waiting);
            assert_eq!(ctl.state.bomb.holder, None);
        }
    }
}
