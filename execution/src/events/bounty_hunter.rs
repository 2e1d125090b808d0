/// A visitor craving one specific normal item.
#[derive(Clone, Debug, Default)]
pub struct BountyHunter {
    state: Option<Craving>,
}

#[derive(Clone, Debug)]
struct Craving {
    item: String,
    end_time: f64,
}

impl BountyHunter {
    /// Returns `false` (and changes nothing) if already active.
    pub fn start(&mut self, now: f64, duration_secs: f64, item: String) -> bool {
        if self.state.is_some() {
            return false;
        }
        self.state = Some(Craving {
            item,
            end_time: now + duration_secs,
        });
        true
    }

    pub fn stop(&mut self) -> bool {
        self.state.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    pub fn craving(&self) -> Option<&str> {
        self.state.as_ref().map(|craving| craving.item.as_str())
    }

    pub fn remaining(&self, now: f64) -> u64 {
        self.state
            .as_ref()
            .map(|craving| (craving.end_time - now).max(0.0) as u64)
            .unwrap_or(0)
    }

    /// Deliver `item`. The first exact match satisfies the hunter, who leaves immediately.
    pub fn try_satisfy(&mut self, item: &str) -> bool {
        if self.craving() != Some(item) {
            return false;
        }
        self.state = None;
        true
    }

    /// Leave once `now` passes the end. Returns `true` on the expiring tick only.
    pub fn tick(&mut self, now: f64) -> bool {
        let expired = self
            .state
            .as_ref()
            .is_some_and(|craving| now > craving.end_time);
        if expired {
            self.state = None;
        }
        expired
    }
}
