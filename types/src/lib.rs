//! Common types shared by the chatcollect engine and its service.
//!
//! Everything here is plain data: player records as persisted in the ledger file, loot
//! outcomes, the hot-swappable game configuration, and the payloads mirrored to overlay
//! subscribers.

pub mod config;
pub mod loot;
pub mod overlay;
pub mod player;
pub mod status;

pub use config::{
    render, CommandConfig, ConfigError, CooldownConfig, EventConfig, EventNames, GameConfig,
    LeaderboardConfig, LootConfig, MessageTemplates, RankTier, TickConfig,
};
pub use loot::{format_item_name, ItemPools, LootOutcome, Rarity};
pub use overlay::{LeaderboardRow, OverlayEvent};
pub use player::{normalize_username, PlayerRecord};
pub use status::{ContestPhase, EventStatus};
