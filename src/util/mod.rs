//! Shared helpers

pub mod rate_limit;
pub mod scheduler;
pub mod time;
