use chatcollect_types::{ContestPhase, EventConfig, PlayerRecord};

use crate::rng::{choose, LootRng};

/// Contest economics, captured at start so a config swap cannot change a running contest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContestSettings {
    pub entry_cost: u64,
    /// Returned to each participant when the contest is stopped manually.
    pub refund: u64,
    pub resolve_delay_secs: f64,
    pub reminder_fraction: f64,
}

impl From<&EventConfig> for ContestSettings {
    fn from(config: &EventConfig) -> Self {
        Self {
            entry_cost: config.contest_entry_cost,
            refund: config.contest_refund,
            resolve_delay_secs: config.contest_resolve_delay_secs,
            reminder_fraction: config.contest_reminder_fraction,
        }
    }
}

impl Default for ContestSettings {
    fn default() -> Self {
        Self::from(&EventConfig::default())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinError {
    NotJoining,
    AlreadyJoined,
    InsufficientScore { cost: u64 },
}

/// Transitions reported by [`Contest::tick`].
#[derive(Clone, Debug, PartialEq)]
pub enum ContestNotice {
    Reminder { remaining_secs: u64 },
    Cancelled,
    EntriesClosed {
        participants: Vec<String>,
        pool: u64,
        resolve_delay_secs: u64,
    },
    /// The pool goes to `username`.
    Winner { username: String, prize: u64 },
}

/// Pay-to-enter raffle: joining → resolving → inactive.
#[derive(Clone, Debug, Default)]
pub struct Contest {
    phase: ContestPhase,
    settings: ContestSettings,
    start_time: f64,
    join_end_time: f64,
    resolve_time: f64,
    participants: Vec<String>,
    pool: u64,
    reminder_sent: bool,
}

impl Contest {
    /// Open entries for `duration_secs`. Returns `false` unless the contest was inactive.
    pub fn start(&mut self, now: f64, duration_secs: f64, settings: ContestSettings) -> bool {
        if self.phase != ContestPhase::Inactive {
            return false;
        }
        *self = Self {
            phase: ContestPhase::Joining,
            settings,
            start_time: now,
            join_end_time: now + duration_secs,
            resolve_time: 0.0,
            participants: Vec::new(),
            pool: 0,
            reminder_sent: false,
        };
        true
    }

    pub fn phase(&self) -> ContestPhase {
        self.phase
    }

    pub fn pool(&self) -> u64 {
        self.pool
    }

    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    pub fn settings(&self) -> &ContestSettings {
        &self.settings
    }

    pub fn has_joined(&self, username: &str) -> bool {
        self.participants.iter().any(|name| name == username)
    }

    /// Seconds until entries close or the winner is drawn.
    pub fn timer(&self, now: f64) -> u64 {
        let deadline = match self.phase {
            ContestPhase::Inactive => return 0,
            ContestPhase::Joining => self.join_end_time,
            ContestPhase::Resolving => self.resolve_time,
        };
        (deadline - now).max(0.0) as u64
    }

    /// Charge the entry cost and enter `record`. Returns the new pool.
    pub fn join(&mut self, record: &mut PlayerRecord) -> Result<u64, JoinError> {
        if self.phase != ContestPhase::Joining {
            return Err(JoinError::NotJoining);
        }
        if self.has_joined(&record.username) {
            return Err(JoinError::AlreadyJoined);
        }
        let cost = self.settings.entry_cost;
        if !record.try_debit(cost) {
            return Err(JoinError::InsufficientScore { cost });
        }
        self.participants.push(record.username.clone());
        self.pool = self.pool.saturating_add(cost);
        Ok(self.pool)
    }

    /// Advance timers. The reminder fires at most once per contest.
    pub fn tick<R: LootRng + ?Sized>(&mut self, now: f64, rng: &mut R) -> Vec<ContestNotice> {
        let mut notices = Vec::new();
        match self.phase {
            ContestPhase::Inactive => {}
            ContestPhase::Joining => {
                if !self.reminder_sent {
                    let window = self.join_end_time - self.start_time;
                    if now - self.start_time >= window * self.settings.reminder_fraction {
                        self.reminder_sent = true;
                        if now <= self.join_end_time {
                            notices.push(ContestNotice::Reminder {
                                remaining_secs: (self.join_end_time - now) as u64,
                            });
                        }
                    }
                }
                if now > self.join_end_time {
                    if self.participants.is_empty() {
                        self.reset();
                        notices.push(ContestNotice::Cancelled);
                    } else {
                        self.phase = ContestPhase::Resolving;
                        self.resolve_time = now + self.settings.resolve_delay_secs;
                        notices.push(ContestNotice::EntriesClosed {
                            participants: self.participants.clone(),
                            pool: self.pool,
                            resolve_delay_secs: self.settings.resolve_delay_secs.max(0.0) as u64,
                        });
                    }
                }
            }
            ContestPhase::Resolving => {
                if now > self.resolve_time {
                    let winner = choose(&self.participants, rng).cloned();
                    let prize = self.pool;
                    self.reset();
                    if let Some(username) = winner {
                        notices.push(ContestNotice::Winner { username, prize });
                    }
                }
            }
        }
        notices
    }

    /// Manual stop from joining or resolving.
    ///
    /// Returns `None` if nothing was running, otherwise the participants owed a refund (empty
    /// when the pool was empty).
    pub fn stop(&mut self) -> Option<Vec<String>> {
        if self.phase == ContestPhase::Inactive {
            return None;
        }
        let refunds = if self.pool > 0 {
            std::mem::take(&mut self.participants)
        } else {
            Vec::new()
        };
        self.reset();
        Some(refunds)
    }

    fn reset(&mut self) {
        self.phase = ContestPhase::Inactive;
        self.participants.clear();
        self.pool = 0;
    }
}

/// `Xm Ys` for a minute or more, otherwise `Ys`.
pub fn format_remaining(secs: u64) -> String {
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::ScriptedRng;

    fn player(name: &str, score: u64) -> PlayerRecord {
        let mut record = PlayerRecord::new(name);
        record.score = score;
        record
    }

    #[test]
    fn test_join_rules() {
        let mut contest = Contest::default();
        let mut alice = player("alice", 25);
        let mut bob = player("bob", 5);
        assert_eq!(contest.join(&mut alice), Err(JoinError::NotJoining));

        contest.start(0.0, 120.0, ContestSettings::default());
        assert_eq!(contest.join(&mut alice), Ok(10));
        assert_eq!(alice.score, 15);
        assert_eq!(contest.join(&mut alice), Err(JoinError::AlreadyJoined));
        assert_eq!(
            contest.join(&mut bob),
            Err(JoinError::InsufficientScore { cost: 10 })
        );
        assert_eq!(bob.score, 5);
        assert_eq!(contest.pool(), 10);
    }

    #[test]
    fn test_no_entries_cancels() {
        let mut contest = Contest::default();
        let mut rng = ScriptedRng::new();
        contest.start(0.0, 120.0, ContestSettings::default());
        assert_eq!(contest.tick(121.0, &mut rng), vec![ContestNotice::Cancelled]);
        assert_eq!(contest.phase(), ContestPhase::Inactive);
    }

    #[test]
    fn test_reminder_once_at_halfway() {
        let mut contest = Contest::default();
        let mut rng = ScriptedRng::new();
        contest.start(0.0, 150.0, ContestSettings::default());
        assert!(contest.tick(74.0, &mut rng).is_empty());
        assert_eq!(
            contest.tick(75.0, &mut rng),
            vec![ContestNotice::Reminder { remaining_secs: 75 }]
        );
        assert!(contest.tick(76.0, &mut rng).is_empty());
        assert_eq!(format_remaining(75), "1m 15s");
        assert_eq!(format_remaining(42), "42s");
    }

    #[test]
    fn test_full_lifecycle_pays_pool() {
        let mut contest = Contest::default();
        let mut rng = ScriptedRng::new();
        rng.push_index(1);
        contest.start(0.0, 120.0, ContestSettings::default());
        let mut alice = player("alice", 10);
        let mut bob = player("bob", 30);
        contest.join(&mut alice).unwrap();
        contest.join(&mut bob).unwrap();

        contest.tick(60.0, &mut rng);
        let closed = contest.tick(121.0, &mut rng);
        assert_eq!(
            closed,
            vec![ContestNotice::EntriesClosed {
                participants: vec!["alice".to_string(), "bob".to_string()],
                pool: 20,
                resolve_delay_secs: 30,
            }]
        );
        assert_eq!(contest.phase(), ContestPhase::Resolving);
        assert_eq!(contest.timer(121.0), 30);
        assert!(contest.tick(151.0, &mut rng).is_empty());

        let won = contest.tick(151.5, &mut rng);
        assert_eq!(
            won,
            vec![ContestNotice::Winner {
                username: "bob".to_string(),
                prize: 20,
            }]
        );
        assert_eq!(contest.phase(), ContestPhase::Inactive);
        assert_eq!(contest.pool(), 0);
    }

    #[test]
    fn test_stop_refunds_participants() {
        let mut contest = Contest::default();
        assert_eq!(contest.stop(), None);

        contest.start(0.0, 120.0, ContestSettings::default());
        assert_eq!(contest.stop(), Some(Vec::new()));

        contest.start(0.0, 120.0, ContestSettings::default());
        let mut alice = player("alice", 10);
        contest.join(&mut alice).unwrap();
        assert_eq!(contest.stop(), Some(vec!["alice".to_string()]));
        assert_eq!(contest.phase(), ContestPhase::Inactive);
    }
}
