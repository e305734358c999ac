//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (comma-separated)
    pub client_origin: String,

    /// Gameplay tuning, fixed for the lifetime of the process
    pub game: GameConfig,

    /// Seed for the match RNG, random when unset
    pub match_seed: Option<u64>,
    /// Max inbound messages per second per connection
    pub input_rate_limit: u32,
    /// How long a connection may stay open without joining
    pub join_timeout: Duration,
}

/// Arena and timing parameters used by the match simulation
#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub arena_width: f32,
    pub arena_height: f32,
    /// Edge length of a player's box; positions are its top-left corner
    pub player_size: f32,
    /// Seconds on the bomb when it is handed out
    pub bomb_duration: f32,
    /// Bomb passes when holder and target are strictly closer than this
    pub transfer_radius: f32,
    pub matching_duration: f32,
    pub game_over_duration: f32,
    pub tick_period: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            arena_width: 800.0,
            arena_height: 600.0,
            player_size: 40.0,
            bomb_duration: 15.0,
            transfer_radius: 50.0,
            matching_duration: 30.0,
            game_over_duration: 10.0,
            tick_period: Duration::from_millis(100),
        }
    }
}

impl GameConfig {
    /// Seconds of simulated time consumed by one tick
    pub fn tick_delta(&self) -> f32 {
        self.tick_period.as_secs_f32()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.arena_width.is_finite() || !self.arena_height.is_finite() {
            return Err(ConfigError::Invalid("ARENA_WIDTH/ARENA_HEIGHT"));
        }
        if !self.player_size.is_finite() || self.player_size < 0.0 {
            return Err(ConfigError::Invalid("PLAYER_SIZE"));
        }
        if self.arena_width <= self.player_size || self.arena_height <= self.player_size {
            return Err(ConfigError::Invalid("ARENA_WIDTH/ARENA_HEIGHT must exceed PLAYER_SIZE"));
        }
        positive("BOMB_DURATION_SECS", self.bomb_duration)?;
        positive("TRANSFER_RADIUS", self.transfer_radius)?;
        positive("MATCHING_DURATION_SECS", self.matching_duration)?;
        positive("GAME_OVER_DURATION_SECS", self.game_over_duration)?;
        if self.tick_period.is_zero() {
            return Err(ConfigError::Invalid("TICK_MS"));
        }
        Ok(())
    }
}

/// Finite and strictly positive. NaN fails the comparison.
fn positive(key: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(key))
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
        };

        let defaults = GameConfig::default();
        let game = GameConfig {
            arena_width: parse_or(&lookup, "ARENA_WIDTH", defaults.arena_width)?,
            arena_height: parse_or(&lookup, "ARENA_HEIGHT", defaults.arena_height)?,
            player_size: parse_or(&lookup, "PLAYER_SIZE", defaults.player_size)?,
            bomb_duration: parse_or(&lookup, "BOMB_DURATION_SECS", defaults.bomb_duration)?,
            transfer_radius: parse_or(&lookup, "TRANSFER_RADIUS", defaults.transfer_radius)?,
            matching_duration: parse_or(
                &lookup,
                "MATCHING_DURATION_SECS",
                defaults.matching_duration,
            )?,
            game_over_duration: parse_or(
                &lookup,
                "GAME_OVER_DURATION_SECS",
                defaults.game_over_duration,
            )?,
            tick_period: Duration::from_millis(parse_or(&lookup, "TICK_MS", 100u64)?),
        };
        game.validate()?;

        let match_seed = match lookup("MATCH_SEED") {
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("MATCH_SEED"))?,
            ),
            None => None,
        };

        let input_rate_limit = parse_or(&lookup, "INPUT_RATE_LIMIT", 90u32)?;
        if input_rate_limit == 0 {
            return Err(ConfigError::Invalid("INPUT_RATE_LIMIT"));
        }

        let join_timeout = Duration::from_secs(parse_or(&lookup, "JOIN_TIMEOUT_SECS", 15u64)?);
        if join_timeout.is_zero() {
            return Err(ConfigError::Invalid("JOIN_TIMEOUT_SECS"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origin: lookup("CLIENT_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            game,
            match_seed,
            input_rate_limit,
            join_timeout,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
