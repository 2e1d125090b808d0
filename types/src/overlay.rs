//! Payloads pushed to overlay subscribers.
//!
//! The overlay page keys off the `event` tag and reads snake_case fields, so these shapes are a
//! wire contract.

use serde::{Deserialize, Serialize};

use crate::loot::Rarity;

/// One row of a leaderboard snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    /// 1-based position.
    pub rank: usize,
    pub username: String,
    pub score: u64,
    pub shinies: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OverlayEvent {
    Loot {
        user: String,
        rank: String,
        score: u64,
        item: String,
        is_legendary: bool,
        rarity: Rarity,
        trigger_explosion: bool,
        ranked_up: bool,
        show_banner: bool,
    },
    LeaderboardUpdate {
        show: bool,
        data: Vec<LeaderboardRow>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loot_wire_shape() {
        let event = OverlayEvent::Loot {
            user: "alice".to_string(),
            rank: "Novice Collector".to_string(),
            score: 3,
            item: "donut.png".to_string(),
            is_legendary: false,
            rarity: Rarity::Golden,
            trigger_explosion: true,
            ranked_up: false,
            show_banner: true,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "loot");
        assert_eq!(value["user"], "alice");
        assert_eq!(value["rarity"], "golden");
        assert_eq!(value["trigger_explosion"], true);
        assert_eq!(value["show_banner"], true);
    }

    #[test]
    fn test_leaderboard_wire_shape() {
        let event = OverlayEvent::LeaderboardUpdate {
            show: true,
            data: vec![LeaderboardRow {
                rank: 1,
                username: "bob".to_string(),
                score: 40,
                shinies: 2,
            }],
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "leaderboard_update");
        assert_eq!(value["show"], true);
        assert_eq!(value["data"][0]["rank"], 1);
        assert_eq!(value["data"][0]["shinies"], 2);
    }
}
