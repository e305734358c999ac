//! Authoritative match state: roster, bomb and phase timers

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::GameConfig;
use crate::ws::protocol::{BombInfo, PlayerInfo};

use super::arena::{Arena, Position};
use super::SessionId;

/// Fixed palette handed out round-robin on join
pub const PLAYER_COLORS: [&str; 5] = ["#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899"];

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchPhase {
    /// Nobody has joined yet
    Waiting,
    /// Countdown before the round, joins welcome
    Matching,
    /// Bomb is live
    Playing,
    /// Round finished, countdown to restart
    GameOver,
}

/// Player state (authoritative)
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: SessionId,
    pub name: String,
    pub position: Position,
    pub color: &'static str,
    pub alive: bool,
}

impl Player {
    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            name: self.name.clone(),
            x: self.position.x,
            y: self.position.y,
            color: self.color.to_string(),
            is_alive: self.alive,
        }
    }
}

/// The single bomb. `holder` is only a reference into the roster.
#[derive(Debug, Clone, PartialEq)]
pub struct BombState {
    pub holder: Option<SessionId>,
    pub time_remaining: f32,
}

impl BombState {
    pub fn info(&self) -> BombInfo {
        BombInfo {
            holder_id: self.holder,
            time_remaining: self.time_remaining.max(0.0),
        }
    }
}

/// Match state (owned by the match task)
pub struct MatchState {
    pub phase: MatchPhase,
    pub tick: u64,
    players: HashMap<SessionId, Player>,
    /// Registration order, drives transfer tie-breaks
    join_order: Vec<SessionId>,
    pub bomb: BombState,
    pub matching_countdown: f32,
    pub game_over_countdown: f32,
    arena: Arena,
    bomb_duration: f32,
    next_color: usize,
    rng: ChaCha8Rng,
}

impl MatchState {
    pub fn new(config: &GameConfig, rng: ChaCha8Rng) -> Self {
        Self {
            phase: MatchPhase::Waiting,
            tick: 0,
            players: HashMap::new(),
            join_order: Vec::new(),
            bomb: BombState {
                holder: None,
                time_remaining: config.bomb_duration,
            },
            matching_countdown: config.matching_duration,
            game_over_countdown: config.game_over_duration,
            arena: Arena::from_config(config),
            bomb_duration: config.bomb_duration,
            next_color: 0,
            rng,
        }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Spawn a fresh, alive player and register it
    pub fn add_player(&mut self, id: SessionId, name: String) -> Player {
        let color = PLAYER_COLORS[self.next_color % PLAYER_COLORS.len()];
        self.next_color = self.next_color.wrapping_add(1);

        let player = Player {
            id,
            name,
            position: self.arena.random_spawn(&mut self.rng),
            color,
            alive: true,
        };

        if self.players.insert(id, player.clone()).is_none() {
            self.join_order.push(id);
        }
        player
    }

    /// Remove a player; clears the bomb if they held it
    pub fn remove_player(&mut self, id: SessionId) -> Option<Player> {
        let removed = self.players.remove(&id)?;
        self.join_order.retain(|other| *other != id);
        if self.bomb.holder == Some(id) {
            self.bomb.holder = None;
        }
        Some(removed)
    }

    /// Move a living player. Unknown or eliminated players are ignored.
    pub fn set_position(&mut self, id: SessionId, pos: Position) -> bool {
        match self.players.get_mut(&id) {
            Some(player) if player.alive => {
                player.position = pos;
                true
            }
            _ => false,
        }
    }

    pub fn mark_eliminated(&mut self, id: SessionId) {
        if let Some(player) = self.players.get_mut(&id) {
            player.alive = false;
        }
    }

    /// Revive and respawn everyone, disarm the bomb
    pub fn reset(&mut self) {
        for id in &self.join_order {
            if let Some(player) = self.players.get_mut(id) {
                player.alive = true;
                player.position = self.arena.random_spawn(&mut self.rng);
            }
        }
        self.bomb.holder = None;
        self.bomb.time_remaining = self.bomb_duration;
    }

    pub fn player(&self, id: SessionId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Players in registration order
    pub fn roster(&self) -> impl Iterator<Item = &Player> + '_ {
        self.join_order.iter().filter_map(|id| self.players.get(id))
    }

    pub fn alive_ids(&self) -> Vec<SessionId> {
        self.roster().filter(|p| p.alive).map(|p| p.id).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.alive).count()
    }

    /// Uniform pick among living players, `None` when nobody is alive
    pub fn pick_random_alive(&mut self) -> Option<SessionId> {
        let alive = self.alive_ids();
        alive.choose(&mut self.rng).copied()
    }

    pub fn player_infos(&self) -> Vec<PlayerInfo> {
        self.roster().map(Player::info).collect()
    }
}
