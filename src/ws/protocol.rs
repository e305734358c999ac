//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::MatchPhase;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Enter the arena under a display name
    Join {
        /// Blank or missing names get a generated one
        #[serde(default)]
        name: Option<String>,
    },

    /// Desired new position; clamped by the server
    Move { x: f32, y: f32 },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Full snapshot for a client that just joined
    #[serde(rename_all = "camelCase")]
    InitialState {
        self_id: Uuid,
        players: Vec<PlayerInfo>,
        bomb: BombInfo,
        phase: MatchPhase,
        matching_countdown: f32,
        game_over_countdown: f32,
    },

    /// Player joined the arena
    PlayerJoined { player: PlayerInfo },

    /// Player left the arena
    #[serde(rename_all = "camelCase")]
    PlayerLeft { session_id: Uuid },

    /// Authoritative position of another player
    PlayerMoved { id: Uuid, x: f32, y: f32 },

    /// Match entered a new phase
    PhaseChange {
        phase: MatchPhase,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        countdown: Option<f32>,
    },

    /// Per-tick countdown while matching
    #[serde(rename_all = "camelCase")]
    MatchingUpdate { countdown: f32, player_count: usize },

    /// Per-tick roster and bomb while playing
    GameState {
        players: Vec<PlayerInfo>,
        bomb: BombInfo,
    },

    /// Bomb changed hands by proximity
    #[serde(rename_all = "camelCase")]
    BombTransferred {
        from_id: Uuid,
        to_id: Uuid,
        from_name: String,
        to_name: String,
    },

    /// Bomb went off on its holder
    #[serde(rename_all = "camelCase")]
    BombExploded { victim_id: Uuid, victim_name: String },

    /// Round finished
    #[serde(rename_all = "camelCase")]
    GameOver {
        winner: Option<PlayerInfo>,
        restart_countdown: f32,
    },

    /// Per-tick countdown until the next round
    GameOverUpdate { countdown: f32 },

    /// Rejected inbound message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Player as seen by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: Uuid,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub color: String,
    pub is_alive: bool,
}

/// Bomb as seen by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BombInfo {
    pub holder_id: Option<Uuid>,
    /// Never negative on the wire
    pub time_remaining: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_client_messages() {
        let join: ClientMsg = serde_json::from_str(r#"{"type":"join","name":"Alice"}"#).unwrap();
        assert!(matches!(join, ClientMsg::Join { name: Some(ref n) } if n == "Alice"));

        let anon: ClientMsg = serde_json::from_str(r#"{"type":"join"}"#).unwrap();
        assert!(matches!(anon, ClientMsg::Join { name: None }));

        let mv: ClientMsg = serde_json::from_str(r#"{"type":"move","x":12.5,"y":3}"#).unwrap();
        assert!(matches!(mv, ClientMsg::Move { x, y } if x == 12.5 && y == 3.0));
    }

    #[test]
    fn rejects_non_numeric_move() {
        let result = serde_json::from_str::<ClientMsg>(r#"{"type":"move","x":"left","y":3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn server_messages_use_camel_case_wire_names() {
        let id = Uuid::nil();
        let msg = ServerMsg::BombTransferred {
            from_id: id,
            to_id: id,
            from_name: "A".into(),
            to_name: "B".into(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "bombTransferred",
                "fromId": id,
                "toId": id,
                "fromName": "A",
                "toName": "B",
            })
        );

        let phase = ServerMsg::PhaseChange {
            phase: MatchPhase::Playing,
            countdown: None,
        };
        assert_eq!(
            serde_json::to_value(&phase).unwrap(),
            json!({ "type": "phaseChange", "phase": "PLAYING" })
        );
    }

    #[test]
    fn game_over_without_winner_serializes_null() {
        let msg = ServerMsg::GameOver {
            winner: None,
            restart_countdown: 10.0,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "type": "gameOver", "winner": null, "restartCountdown": 10.0 })
        );
    }
}
