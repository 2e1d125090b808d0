/// Canonical ledger key for a chat user.
///
/// Chat names are case-insensitive, so every lookup goes through this. Returns `None` for names
/// the ledger file cannot hold: empty, containing the `|` delimiter or a control character, or
/// starting with the `#` comment marker.
pub fn normalize_username(name: &str) -> Option<String> {
    let key = name.trim().trim_start_matches('@').to_lowercase();
    let usable = !key.is_empty()
        && !key.starts_with('#')
        && !key.chars().any(|c| c == '|' || c.is_control());
    usable.then_some(key)
}

/// Durable per-user economy state, one line of the ledger file.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerRecord {
    pub username: String,
    pub score: u64,
    /// Unix seconds of the last accepted loot (0 = never).
    pub last_loot_time: f64,
    /// Accumulated luck, consumed by the next loot.
    pub luck: f64,
    /// Unix seconds of the last accepted use (0 = never).
    pub last_use_time: f64,
    pub prestige_stars: u32,
    pub shinies: u32,
}

impl PlayerRecord {
    /// A zero-valued record for a user seen for the first time.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            score: 0,
            last_loot_time: 0.0,
            luck: 0.0,
            last_use_time: 0.0,
            prestige_stars: 0,
            shinies: 0,
        }
    }

    /// Remove `amount` points if the balance covers it.
    ///
    /// Returns `false` (and leaves the score untouched) otherwise, so the score can never go
    /// negative.
    pub fn try_debit(&mut self, amount: u64) -> bool {
        match self.score.checked_sub(amount) {
            Some(remaining) => {
                self.score = remaining;
                true
            }
            None => false,
        }
    }

    pub fn credit(&mut self, amount: u64) {
        self.score = self.score.saturating_add(amount);
    }
}
