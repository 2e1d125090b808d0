//! Community event scheduler.
//!
//! Four independent timed state machines share one clock:
//!
//! - [`RushHour`]: shortens the loot cooldown while active.
//! - [`LootDrive`]: community item goal; completion awards a prestige star to every participant.
//! - [`BountyHunter`]: craves one item; the first loot of that item earns a bonus.
//! - [`Contest`]: pay-to-enter raffle with a join window and a delayed draw.
//!
//! Every machine is pure over its own state and an explicit `now` (Unix seconds). Transitions
//! fire on the first tick strictly after a deadline. Effects on player records are returned to
//! the caller, which applies them in the same step.

mod bounty_hunter;
mod contest;
mod loot_drive;
mod rush_hour;

use std::time::Duration;

use chatcollect_types::{format_item_name, EventStatus, TickConfig};

pub use bounty_hunter::BountyHunter;
pub use contest::{format_remaining, Contest, ContestNotice, ContestSettings, JoinError};
pub use loot_drive::{DriveProgress, LootDrive};
pub use rush_hour::RushHour;

use crate::rng::LootRng;

/// The four community events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    RushHour,
    LootDrive,
    BountyHunter,
    Contest,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::RushHour,
        EventKind::LootDrive,
        EventKind::BountyHunter,
        EventKind::Contest,
    ];
}

/// Transition observed during a scheduler tick.
#[derive(Clone, Debug, PartialEq)]
pub enum EventNotice {
    RushHourEnded,
    LootDriveFailed { current: u32, target: u32 },
    BountyHunterLeft,
    Contest(ContestNotice),
}

#[derive(Clone, Debug, Default)]
pub struct EventScheduler {
    rush_hour: RushHour,
    loot_drive: LootDrive,
    bounty_hunter: BountyHunter,
    contest: Contest,
}

impl EventScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rush_hour(&self) -> &RushHour {
        &self.rush_hour
    }

    pub fn rush_hour_mut(&mut self) -> &mut RushHour {
        &mut self.rush_hour
    }

    pub fn loot_drive(&self) -> &LootDrive {
        &self.loot_drive
    }

    pub fn loot_drive_mut(&mut self) -> &mut LootDrive {
        &mut self.loot_drive
    }

    pub fn bounty_hunter(&self) -> &BountyHunter {
        &self.bounty_hunter
    }

    pub fn bounty_hunter_mut(&mut self) -> &mut BountyHunter {
        &mut self.bounty_hunter
    }

    pub fn contest(&self) -> &Contest {
        &self.contest
    }

    pub fn contest_mut(&mut self) -> &mut Contest {
        &mut self.contest
    }

    pub fn is_active(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::RushHour => self.rush_hour.is_active(),
            EventKind::LootDrive => self.loot_drive.is_active(),
            EventKind::BountyHunter => self.bounty_hunter.is_active(),
            EventKind::Contest => {
                self.contest.phase() != chatcollect_types::ContestPhase::Inactive
            }
        }
    }

    pub fn any_active(&self) -> bool {
        EventKind::ALL.iter().any(|kind| self.is_active(*kind))
    }

    /// Evaluate every machine once, in a fixed order.
    pub fn tick<R: LootRng + ?Sized>(&mut self, now: f64, rng: &mut R) -> Vec<EventNotice> {
        let mut notices = Vec::new();
        if self.rush_hour.tick(now) {
            notices.push(EventNotice::RushHourEnded);
        }
        if let Some((current, target)) = self.loot_drive.tick(now) {
            notices.push(EventNotice::LootDriveFailed { current, target });
        }
        if self.bounty_hunter.tick(now) {
            notices.push(EventNotice::BountyHunterLeft);
        }
        notices.extend(
            self.contest
                .tick(now, rng)
                .into_iter()
                .map(EventNotice::Contest),
        );
        notices
    }

    /// Delay before the next tick: short while anything runs, long while idle.
    pub fn next_interval(&self, ticks: &TickConfig) -> Duration {
        if self.any_active() {
            Duration::from_millis(ticks.active_ms)
        } else {
            Duration::from_millis(ticks.idle_ms)
        }
    }

    pub fn status(&self, now: f64) -> EventStatus {
        let loot_drive_progress = match self.loot_drive.progress() {
            Some((current, target)) => format!("{current}/{target}"),
            None => "Inactive".to_string(),
        };
        let bounty_hunter_craving = self
            .bounty_hunter
            .craving()
            .map(format_item_name)
            .unwrap_or_else(|| "None".to_string());
        EventStatus {
            rush_hour_active: self.rush_hour.is_active(),
            rush_hour_remaining: self.rush_hour.remaining(now),
            loot_drive_active: self.loot_drive.is_active(),
            loot_drive_remaining: self.loot_drive.remaining(now),
            loot_drive_progress,
            bounty_hunter_active: self.bounty_hunter.is_active(),
            bounty_hunter_craving,
            bounty_hunter_remaining: self.bounty_hunter.remaining(now),
            contest_state: self.contest.phase(),
            contest_pool: self.contest.pool(),
            contest_timer: self.contest.timer(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::ScriptedRng;
    use chatcollect_types::ContestPhase;

    #[test]
    fn test_idle_status() {
        let scheduler = EventScheduler::new();
        assert_eq!(scheduler.status(0.0), EventStatus::default());
        assert_eq!(
            scheduler.next_interval(&TickConfig::default()),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_active_status_and_cadence() {
        let mut scheduler = EventScheduler::new();
        scheduler.rush_hour_mut().start(0.0, 120.0);
        scheduler.loot_drive_mut().start(0.0, 1_200.0, 150);
        scheduler
            .bounty_hunter_mut()
            .start(0.0, 600.0, "cherry_pie.png".to_string());
        scheduler
            .contest_mut()
            .start(0.0, 120.0, ContestSettings::default());
        scheduler.loot_drive_mut().record("alice");

        let status = scheduler.status(20.0);
        assert!(status.rush_hour_active);
        assert_eq!(status.rush_hour_remaining, 100);
        assert_eq!(status.loot_drive_progress, "1/150");
        assert_eq!(status.loot_drive_remaining, 1_180);
        assert_eq!(status.bounty_hunter_craving, "Cherry Pie");
        assert_eq!(status.contest_state, ContestPhase::Joining);
        assert_eq!(status.contest_timer, 100);
        assert_eq!(
            scheduler.next_interval(&TickConfig::default()),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_tick_expires_each_event_once() {
        let mut scheduler = EventScheduler::new();
        let mut rng = ScriptedRng::new();
        scheduler.rush_hour_mut().start(0.0, 10.0);
        scheduler.loot_drive_mut().start(0.0, 10.0, 150);
        scheduler
            .bounty_hunter_mut()
            .start(0.0, 10.0, "donut.png".to_string());

        assert!(scheduler.tick(10.0, &mut rng).is_empty());
        let notices = scheduler.tick(11.0, &mut rng);
        assert_eq!(
            notices,
            vec![
                EventNotice::RushHourEnded,
                EventNotice::LootDriveFailed {
                    current: 0,
                    target: 150
                },
                EventNotice::BountyHunterLeft,
            ]
        );
        assert!(scheduler.tick(12.0, &mut rng).is_empty());
        assert!(!scheduler.any_active());
    }

    #[test]
    fn test_contest_counts_as_active() {
        let mut scheduler = EventScheduler::new();
        scheduler
            .contest_mut()
            .start(0.0, 120.0, ContestSettings::default());
        assert!(scheduler.is_active(EventKind::Contest));
        assert_eq!(
            scheduler.next_interval(&TickConfig::default()),
            Duration::from_secs(1)
        );
    }
}
