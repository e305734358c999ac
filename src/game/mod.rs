//! Game simulation modules

pub mod arena;
pub mod broadcast;
pub mod controller;
pub mod gateway;
pub mod r#match;
pub mod state;
pub mod ticker;

pub use broadcast::Broadcaster;
pub use r#match::{GameMatch, MatchCommand, MatchHandle};
pub use state::MatchPhase;

use uuid::Uuid;

/// Opaque identity of one connection for as long as it stays open
pub type SessionId = Uuid;
