//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::MatchHandle;
use crate::ws::SessionRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,
    pub game: MatchHandle,
}

impl AppState {
    pub fn new(config: Arc<Config>, sessions: Arc<SessionRegistry>, game: MatchHandle) -> Self {
        Self {
            config,
            sessions,
            game,
        }
    }
}
