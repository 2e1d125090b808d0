//! Deterministic stand-ins for tests.

use std::collections::VecDeque;

use crate::rng::LootRng;

/// Draw value used once the unit script is exhausted.
///
/// With default probabilities it lands in the standard band and fails both the legendary
/// substitution and the theft check.
pub const NEUTRAL_UNIT: f64 = 0.5;

/// RNG that replays scripted draws.
///
/// Unit and index draws come from separate queues. An exhausted unit queue yields
/// [`NEUTRAL_UNIT`] and an exhausted index queue yields `0`. Scripted indices are clamped to
/// the requested range.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRng {
    units: VecDeque<f64>,
    indices: VecDeque<usize>,
}

impl ScriptedRng {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_units(units: impl IntoIterator<Item = f64>) -> Self {
        Self {
            units: units.into_iter().collect(),
            indices: VecDeque::new(),
        }
    }

    pub fn push_unit(&mut self, unit: f64) -> &mut Self {
        self.units.push_back(unit);
        self
    }

    pub fn push_index(&mut self, index: usize) -> &mut Self {
        self.indices.push_back(index);
        self
    }

    /// Draws still queued, as `(units, indices)`.
    pub fn pending(&self) -> (usize, usize) {
        (self.units.len(), self.indices.len())
    }
}

impl LootRng for ScriptedRng {
    fn unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(NEUTRAL_UNIT)
    }

    fn below(&mut self, n: usize) -> usize {
        self.indices
            .pop_front()
            .unwrap_or(0)
            .min(n.saturating_sub(1))
    }
}
