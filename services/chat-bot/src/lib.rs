//! Chat-driven collection game service.
//!
//! Chat lines and operator commands flow into a single engine [`actor`]; loot and leaderboard
//! overlays fan out through the [`broadcaster`] to WebSocket clients served by [`api`].

pub mod actor;
pub mod api;
pub mod broadcaster;
pub mod commands;
pub mod config_watch;
pub mod console;
