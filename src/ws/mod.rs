//! WebSocket transport

pub mod handler;
pub mod protocol;
pub mod sessions;

pub use sessions::SessionRegistry;
