use serde::{Deserialize, Serialize};

/// Lifecycle of the contest event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestPhase {
    #[default]
    Inactive,
    Joining,
    Resolving,
}

impl ContestPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContestPhase::Inactive => "inactive",
            ContestPhase::Joining => "joining",
            ContestPhase::Resolving => "resolving",
        }
    }
}

/// Snapshot of the four community events, recomputed on every scheduler tick.
///
/// Remaining times are whole seconds, zero for an inactive event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStatus {
    pub rush_hour_active: bool,
    pub rush_hour_remaining: u64,
    pub loot_drive_active: bool,
    pub loot_drive_remaining: u64,
    /// `"current/target"` while active, `"Inactive"` otherwise.
    pub loot_drive_progress: String,
    pub bounty_hunter_active: bool,
    /// Display name of the craved item, `"None"` while inactive.
    pub bounty_hunter_craving: String,
    pub bounty_hunter_remaining: u64,
    pub contest_state: ContestPhase,
    pub contest_pool: u64,
    /// Seconds until entries close (joining) or the winner is drawn (resolving).
    pub contest_timer: u64,
}

impl Default for EventStatus {
    fn default() -> Self {
        Self {
            rush_hour_active: false,
            rush_hour_remaining: 0,
            loot_drive_active: false,
            loot_drive_remaining: 0,
            loot_drive_progress: "Inactive".to_string(),
            bounty_hunter_active: false,
            bounty_hunter_craving: "None".to_string(),
            bounty_hunter_remaining: 0,
            contest_state: ContestPhase::Inactive,
            contest_pool: 0,
            contest_timer: 0,
        }
    }
}

impl EventStatus {
    pub fn any_active(&self) -> bool {
        self.rush_hour_active
            || self.loot_drive_active
            || self.bounty_hunter_active
            || self.contest_state != ContestPhase::Inactive
    }
}
