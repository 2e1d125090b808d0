use std::collections::BTreeSet;

/// Community goal: collect `target` items before the timer runs out.
#[derive(Clone, Debug, Default)]
pub struct LootDrive {
    state: Option<Drive>,
}

#[derive(Clone, Debug)]
struct Drive {
    target: u32,
    current: u32,
    end_time: f64,
    participants: BTreeSet<String>,
}

/// Effect of one loot on the drive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriveProgress {
    /// No drive running.
    Inactive,
    Counted { current: u32, target: u32 },
    /// The goal was reached by this loot; every participant earns a prestige star.
    Completed { participants: Vec<String>, target: u32 },
}

impl LootDrive {
    /// Returns `false` (and changes nothing) if already active.
    pub fn start(&mut self, now: f64, duration_secs: f64, target: u32) -> bool {
        if self.state.is_some() {
            return false;
        }
        self.state = Some(Drive {
            target: target.max(1),
            current: 0,
            end_time: now + duration_secs,
            participants: BTreeSet::new(),
        });
        true
    }

    /// Manual stop. No stars are awarded.
    pub fn stop(&mut self) -> Option<(u32, u32)> {
        self.state.take().map(|drive| (drive.current, drive.target))
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// `(current, target)` while active.
    pub fn progress(&self) -> Option<(u32, u32)> {
        self.state
            .as_ref()
            .map(|drive| (drive.current, drive.target))
    }

    pub fn remaining(&self, now: f64) -> u64 {
        self.state
            .as_ref()
            .map(|drive| (drive.end_time - now).max(0.0) as u64)
            .unwrap_or(0)
    }

    /// Count one loot by `username`.
    ///
    /// Every loot advances the counter; a participant is recorded once no matter how many
    /// items they contribute.
    pub fn record(&mut self, username: &str) -> DriveProgress {
        let Some(drive) = self.state.as_mut() else {
            return DriveProgress::Inactive;
        };
        drive.current = drive.current.saturating_add(1);
        drive.participants.insert(username.to_string());
        if drive.current < drive.target {
            return DriveProgress::Counted {
                current: drive.current,
                target: drive.target,
            };
        }

        let target = drive.target;
        let participants = self
            .state
            .take()
            .map(|drive| drive.participants.into_iter().collect())
            .unwrap_or_default();
        DriveProgress::Completed {
            participants,
            target,
        }
    }

    /// Fail the drive once `now` passes its end. Returns the final `(current, target)`.
    pub fn tick(&mut self, now: f64) -> Option<(u32, u32)> {
        let expired = self
            .state
            .as_ref()
            .is_some_and(|drive| now > drive.end_time);
        if expired {
            self.stop()
        } else {
            None
        }
    }
}
