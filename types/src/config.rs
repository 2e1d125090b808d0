//! Game configuration.
//!
//! The document is owned by the operator and may be swapped between commands. Every section
//! is `#[serde(default)]`, so a partial file only overrides the keys it names and everything
//! else keeps the built-in defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::loot::ItemPools;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{field} is invalid: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Chat trigger tokens for each command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    pub loot: String,
    pub leaderboard: String,
    pub contest: String,
    #[serde(rename = "use")]
    pub use_points: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            loot: "!loot".to_string(),
            leaderboard: "!leaderboard".to_string(),
            contest: "!contest".to_string(),
            use_points: "!use".to_string(),
        }
    }
}

/// Reply and announcement templates. Placeholders are written `{name}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTemplates {
    pub cooldown: String,
    pub loot_success: String,
    pub loot_legendary: String,
    pub loot_shiny: String,
    pub loot_golden: String,
    pub loot_ruined: String,
    pub loot_stolen: String,
    pub rank_up: String,
    pub use_success: String,
    pub use_cooldown: String,
    pub not_enough_points: String,
    pub invalid_amount: String,
    pub not_registered: String,
    pub contest_start: String,
    pub contest_joined: String,
    pub contest_already_joined: String,
    pub contest_entry_too_low: String,
    pub contest_winner: String,
    pub rush_hour_start: String,
    pub loot_drive_start: String,
    pub bounty_hunter_spawn: String,
    pub bounty_hunter_satisfied: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            cooldown: "⏳ @{username}, resting...... wait {remaining}s.".to_string(),
            loot_success:
                "🍞 @{username} looted a {item}! (+{points} pts) ({rank}) | Score: {score}"
                    .to_string(),
            loot_legendary:
                "✨ @{username} looted a LEGENDARY {item}! ✨ (+{points} pts) ({rank}) | Score: {score}"
                    .to_string(),
            loot_shiny:
                "💎✨ SHINY!! @{username} looted a SHINY {item}! Unlocked a Badge! (+{points} pts)"
                    .to_string(),
            loot_golden: "🌟 MASTERPIECE! @{username} looted a GOLDEN {item}! (+{points} pts)"
                .to_string(),
            loot_ruined:
                "🔥 @{username} tried to loot a {item} but fell asleep! It's RUINED! ({points} pts)"
                    .to_string(),
            loot_stolen:
                "🦝 @{username} looted a {item}, but @{thief} snatched it! (+{points} pts to {thief})"
                    .to_string(),
            rank_up: "🎉 {username} ranked up to {rank}!".to_string(),
            use_success:
                "🍽️ @{username} used {amount} points! Luck increased by {added}% (Total: {total}%). Good luck on your next loot!"
                    .to_string(),
            use_cooldown: "⏳ @{username}, you're too full! Wait {remaining}s.".to_string(),
            not_enough_points: "@{username}, you don't have enough points! (Current: {score})"
                .to_string(),
            invalid_amount: "@{username}, that's not a valid amount.".to_string(),
            not_registered: "@{username}, you need to loot something first!".to_string(),
            contest_start: "⚔️ CONTEST STARTED! Type {command} to enter! (Entry: {cost} pts)"
                .to_string(),
            contest_joined: "⚔️ @{username} joined the {contest}! (Pool: {pool})".to_string(),
            contest_already_joined: "@{username}, you are already in the {contest}!".to_string(),
            contest_entry_too_low: "@{username}, you need {cost} points to join!".to_string(),
            contest_winner: "🏆 {username} WON THE CONTEST! Prize: {prize} pts!".to_string(),
            rush_hour_start: "🚀 RUSH HOUR STARTED! Faster looting for {minutes} minutes!"
                .to_string(),
            loot_drive_start: "🎒 LOOT DRIVE STARTED! Community Goal: {target} Items!".to_string(),
            bounty_hunter_spawn: "🧐 BOUNTY HUNTER ARRIVED! He wants a {item}!".to_string(),
            bounty_hunter_satisfied: "🧐 {username} satisfied the Bounty Hunter! (+{points} pts)"
                .to_string(),
        }
    }
}

/// Display names for the four community events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventNames {
    pub rush_hour_name: String,
    pub loot_drive_name: String,
    pub bounty_hunter_name: String,
    pub contest_name: String,
}

impl Default for EventNames {
    fn default() -> Self {
        Self {
            rush_hour_name: "Rush Hour".to_string(),
            loot_drive_name: "Loot Drive".to_string(),
            bounty_hunter_name: "Bounty Hunter".to_string(),
            contest_name: "Contest".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankTier {
    pub score: u64,
    pub title: String,
}

impl RankTier {
    fn new(score: u64, title: &str) -> Self {
        Self {
            score,
            title: title.to_string(),
        }
    }
}

fn default_ranks() -> Vec<RankTier> {
    vec![
        RankTier::new(0, "Novice Collector"),
        RankTier::new(50, "Rookie Scavenger"),
        RankTier::new(250, "Apprentice Hunter"),
        RankTier::new(750, "Loot Specialist"),
        RankTier::new(2_000, "Treasure Expert"),
        RankTier::new(5_000, "Hoard Master"),
        RankTier::new(10_000, "Legendary Collector"),
        RankTier::new(25_000, "Artifact Hunter"),
        RankTier::new(50_000, "Celestial Hoarder"),
        RankTier::new(100_000, "God of Loot"),
    ]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    /// Seconds between accepted loots.
    pub loot_secs: f64,
    /// Seconds between accepted uses.
    pub use_secs: f64,
    /// Loot cooldown divisor while Rush Hour is active.
    pub rush_hour_divisor: f64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            loot_secs: 60.0,
            use_secs: 300.0,
            rush_hour_divisor: 6.0,
        }
    }
}

/// Probabilities and point tables for loot resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootConfig {
    pub base_shiny_chance: f64,
    pub ruined_chance: f64,
    pub base_golden_chance: f64,
    /// Chance that a non-shiny roll substitutes a legendary item.
    pub legendary_chance: f64,
    pub theft_chance: f64,
    /// Luck gained per point spent with the use command.
    pub luck_per_point: f64,
    pub standard_points_min: u64,
    pub standard_points_max: u64,
    pub golden_points: u64,
    pub shiny_points: u64,
    pub ruined_points: u64,
    /// Minimum award for a legendary item.
    pub legendary_points: u64,
    pub bounty_bonus: u64,
}

impl Default for LootConfig {
    fn default() -> Self {
        Self {
            base_shiny_chance: 0.0001,
            ruined_chance: 0.05,
            base_golden_chance: 0.05,
            legendary_chance: 0.001,
            theft_chance: 0.02,
            luck_per_point: 5.0,
            standard_points_min: 1,
            standard_points_max: 1,
            golden_points: 3,
            shiny_points: 10,
            ruined_points: 0,
            legendary_points: 5,
            bounty_bonus: 50,
        }
    }
}

/// Durations and targets for the community events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub rush_hour_minutes: f64,
    pub loot_drive_minutes: f64,
    pub loot_drive_target: u32,
    /// Loot replies carry a progress note every this many drive items.
    pub loot_drive_progress_every: u32,
    pub bounty_hunter_minutes: f64,
    pub contest_minutes: f64,
    pub contest_entry_cost: u64,
    pub contest_refund: u64,
    pub contest_resolve_delay_secs: f64,
    /// Fraction of the join window after which the reminder is sent.
    pub contest_reminder_fraction: f64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            rush_hour_minutes: 2.0,
            loot_drive_minutes: 20.0,
            loot_drive_target: 150,
            loot_drive_progress_every: 10,
            bounty_hunter_minutes: 10.0,
            contest_minutes: 2.0,
            contest_entry_cost: 10,
            contest_refund: 10,
            contest_resolve_delay_secs: 30.0,
            contest_reminder_fraction: 0.5,
        }
    }
}

/// Scheduler cadence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    pub active_ms: u64,
    pub idle_ms: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            active_ms: 1_000,
            idle_ms: 5_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    pub chat_size: usize,
    pub overlay_size: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            chat_size: 5,
            overlay_size: 10,
        }
    }
}

/// The complete game configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub commands: CommandConfig,
    pub messages: MessageTemplates,
    pub events: EventNames,
    #[serde(default = "default_ranks")]
    pub ranks: Vec<RankTier>,
    pub cooldowns: CooldownConfig,
    pub loot: LootConfig,
    pub event_settings: EventConfig,
    pub ticks: TickConfig,
    pub leaderboard: LeaderboardConfig,
    pub items: ItemPools,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            commands: CommandConfig::default(),
            messages: MessageTemplates::default(),
            events: EventNames::default(),
            ranks: default_ranks(),
            cooldowns: CooldownConfig::default(),
            loot: LootConfig::default(),
            event_settings: EventConfig::default(),
            ticks: TickConfig::default(),
            leaderboard: LeaderboardConfig::default(),
            items: ItemPools::default(),
        }
    }
}

impl GameConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()
    }

    /// Load a config file, choosing the format from the extension (`.json` or YAML).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        }
    }

    /// Check cross-field consistency and normalise the item pools.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.ranks.is_empty() {
            return Err(invalid("ranks", "at least one rank is required"));
        }
        let probabilities = [
            ("loot.base_shiny_chance", self.loot.base_shiny_chance),
            ("loot.ruined_chance", self.loot.ruined_chance),
            ("loot.base_golden_chance", self.loot.base_golden_chance),
            ("loot.legendary_chance", self.loot.legendary_chance),
            ("loot.theft_chance", self.loot.theft_chance),
            (
                "event_settings.contest_reminder_fraction",
                self.event_settings.contest_reminder_fraction,
            ),
        ];
        for (field, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, format!("{value} is outside [0, 1]")));
            }
        }
        if self.loot.standard_points_min > self.loot.standard_points_max {
            return Err(invalid(
                "loot.standard_points_min",
                "must not exceed standard_points_max",
            ));
        }
        if !(self.loot.luck_per_point >= 0.0) {
            return Err(invalid("loot.luck_per_point", "must be non-negative"));
        }
        if !(self.cooldowns.loot_secs >= 0.0) || !(self.cooldowns.use_secs >= 0.0) {
            return Err(invalid("cooldowns", "cooldowns must be non-negative"));
        }
        if !(self.cooldowns.rush_hour_divisor >= 1.0) {
            return Err(invalid("cooldowns.rush_hour_divisor", "must be at least 1"));
        }
        let events = &self.event_settings;
        let durations = [
            ("event_settings.rush_hour_minutes", events.rush_hour_minutes),
            ("event_settings.loot_drive_minutes", events.loot_drive_minutes),
            ("event_settings.bounty_hunter_minutes", events.bounty_hunter_minutes),
            ("event_settings.contest_minutes", events.contest_minutes),
        ];
        for (field, value) in durations {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(field, format!("{value} is not a positive duration")));
            }
        }
        let delay = events.contest_resolve_delay_secs;
        if !delay.is_finite() || delay < 0.0 {
            return Err(invalid(
                "event_settings.contest_resolve_delay_secs",
                format!("{delay} is not a non-negative duration"),
            ));
        }
        if self.event_settings.loot_drive_target == 0 {
            return Err(invalid("event_settings.loot_drive_target", "must be greater than zero"));
        }
        if self.ticks.active_ms == 0 || self.ticks.idle_ms == 0 {
            return Err(invalid("ticks", "tick intervals must be greater than zero"));
        }
        self.items = self.items.with_fallback();
        Ok(self)
    }

    /// Title for `score`: the highest threshold not above it, else the lowest tier.
    pub fn rank_title(&self, score: u64) -> &str {
        let mut ranks: Vec<&RankTier> = self.ranks.iter().collect();
        ranks.sort_by(|a, b| b.score.cmp(&a.score));
        ranks
            .iter()
            .find(|tier| score >= tier.score)
            .or(ranks.last())
            .map(|tier| tier.title.as_str())
            .unwrap_or("Novice")
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Substitute `{key}` placeholders in `template`. Unknown placeholders are kept verbatim.
pub fn render(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match values.iter().find(|(name, _)| *name == key) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = GameConfig::default().validate().unwrap();
        assert_eq!(config.ranks.len(), 10);
        assert_eq!(config.commands.use_points, "!use");
    }

    #[test]
    fn test_partial_json_overlays_defaults() {
        let raw = r#"{
            "commands": {"loot": "!bake"},
            "messages": {"cooldown": "wait {remaining}"},
            "loot": {"theft_chance": 0.0}
        }"#;
        let config = GameConfig::from_json_str(raw).unwrap();
        assert_eq!(config.commands.loot, "!bake");
        assert_eq!(config.commands.leaderboard, "!leaderboard");
        assert_eq!(config.messages.cooldown, "wait {remaining}");
        assert_eq!(
            config.messages.loot_success,
            MessageTemplates::default().loot_success
        );
        assert_eq!(config.loot.theft_chance, 0.0);
        assert_eq!(config.loot.ruined_chance, 0.05);
    }

    #[test]
    fn test_yaml_config() {
        let raw = "event_settings:\n  loot_drive_target: 3\nranks:\n  - score: 0\n    title: Crumb\n  - score: 10\n    title: Loaf\n";
        let config = GameConfig::from_yaml_str(raw).unwrap();
        assert_eq!(config.event_settings.loot_drive_target, 3);
        assert_eq!(config.rank_title(9), "Crumb");
        assert_eq!(config.rank_title(10), "Loaf");
    }

    #[test]
    fn test_load_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("chatcollect_config.json");
        std::fs::write(&json_path, r#"{"commands": {"use": "!eat"}}"#).unwrap();
        let config = GameConfig::load(&json_path).unwrap();
        assert_eq!(config.commands.use_points, "!eat");

        let missing = GameConfig::load(&dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = GameConfig::default();
        config.loot.ruined_chance = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "loot.ruined_chance", .. })
        ));

        let config = GameConfig {
            ranks: Vec::new(),
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.loot.standard_points_min = 4;
        config.loot.standard_points_max = 2;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.cooldowns.rush_hour_divisor = 0.5;
        assert!(config.validate().is_err());

        for minutes in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut config = GameConfig::default();
            config.event_settings.rush_hour_minutes = minutes;
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Invalid { field: "event_settings.rush_hour_minutes", .. })
            ));
        }

        let mut config = GameConfig::default();
        config.event_settings.contest_minutes = 0.0;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.event_settings.contest_resolve_delay_secs = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "event_settings.contest_resolve_delay_secs", .. })
        ));

        let mut config = GameConfig::default();
        config.event_settings.contest_resolve_delay_secs = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nan_duration_in_yaml_is_rejected() {
        let raw = "event_settings:\n  rush_hour_minutes: .nan\n";
        assert!(matches!(
            GameConfig::from_yaml_str(raw),
            Err(ConfigError::Invalid { field: "event_settings.rush_hour_minutes", .. })
        ));
    }

    #[test]
    fn test_rank_title_unsorted_table() {
        let config = GameConfig {
            ranks: vec![
                RankTier::new(100, "Hundred"),
                RankTier::new(10, "Ten"),
                RankTier::new(50, "Fifty"),
            ],
            ..GameConfig::default()
        };
        assert_eq!(config.rank_title(0), "Ten");
        assert_eq!(config.rank_title(49), "Ten");
        assert_eq!(config.rank_title(50), "Fifty");
        assert_eq!(config.rank_title(1_000), "Hundred");
    }

    #[test]
    fn test_render_placeholders() {
        let text = render(
            "@{username} got {points} pts {unknown} {",
            &[("username", "alice".to_string()), ("points", "3".to_string())],
        );
        assert_eq!(text, "@alice got 3 pts {unknown} {");
    }
}
