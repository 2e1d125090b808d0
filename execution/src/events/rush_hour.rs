/// Timed window during which the loot cooldown is divided.
#[derive(Clone, Debug, Default)]
pub struct RushHour {
    end_time: Option<f64>,
}

impl RushHour {
    /// Returns `false` (and changes nothing) if already active.
    pub fn start(&mut self, now: f64, duration_secs: f64) -> bool {
        if self.end_time.is_some() {
            return false;
        }
        self.end_time = Some(now + duration_secs);
        true
    }

    /// Returns whether the event was active.
    pub fn stop(&mut self) -> bool {
        self.end_time.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn remaining(&self, now: f64) -> u64 {
        self.end_time
            .map(|end| (end - now).max(0.0) as u64)
            .unwrap_or(0)
    }

    /// Expire the window once `now` passes its end. Returns `true` on the expiring tick only.
    pub fn tick(&mut self, now: f64) -> bool {
        match self.end_time {
            Some(end) if now > end => {
                self.end_time = None;
                true
            }
            _ => false,
        }
    }

    /// Loot cooldown in effect. While active it is `base / divisor`, never below one second.
    pub fn loot_cooldown(&self, base_secs: f64, divisor: f64) -> f64 {
        if self.is_active() && divisor > 0.0 {
            (base_secs / divisor).max(1.0)
        } else {
            base_secs
        }
    }
}
