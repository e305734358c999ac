//! Arena geometry - spawn points, boundary clamping, distances

use rand::Rng;

use crate::config::GameConfig;

/// A point in arena coordinates (top-left corner of a player's box)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Playable rectangle `[0, max_x] x [0, max_y]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    max_x: f32,
    max_y: f32,
}

impl Arena {
    pub fn new(width: f32, height: f32, player_size: f32) -> Self {
        Self {
            max_x: (width - player_size).max(0.0),
            max_y: (height - player_size).max(0.0),
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(config.arena_width, config.arena_height, config.player_size)
    }

    /// Uniform random point inside the playable rectangle
    pub fn random_spawn<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        Position {
            x: rng.gen_range(0.0..=self.max_x),
            y: rng.gen_range(0.0..=self.max_y),
        }
    }

    /// Project a candidate position into the playable rectangle.
    /// `f32::max` discards NaN, so the result is always inside the bounds.
    pub fn clamp(&self, pos: Position) -> Position {
        Position {
            x: pos.x.max(0.0).min(self.max_x),
            y: pos.y.max(0.0).min(self.max_y),
        }
    }
}

/// Euclidean distance between two positions
pub fn distance(a: Position, b: Position) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}
