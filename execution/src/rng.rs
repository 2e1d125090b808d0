//! Randomness seam for loot resolution and event draws.
//!
//! Production code plugs any [`rand::Rng`] in; tests script every draw through
//! [`crate::mocks::ScriptedRng`].

use rand::Rng;

/// Source of the two kinds of draws the game makes.
pub trait LootRng {
    /// Uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform index in `[0, n)`. `n` is always non-zero.
    fn below(&mut self, n: usize) -> usize;
}

impl<R: Rng> LootRng for R {
    fn unit(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn below(&mut self, n: usize) -> usize {
        self.gen_range(0..n)
    }
}

/// Pick one element uniformly, `None` for an empty slice.
pub fn choose<'a, T, R: LootRng + ?Sized>(items: &'a [T], rng: &mut R) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.below(items.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_rand_draws_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let unit = LootRng::unit(&mut rng);
            assert!((0.0..1.0).contains(&unit));
            assert!(rng.below(3) < 3);
        }
    }

    #[test]
    fn test_choose_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        let empty: [u8; 0] = [];
        assert!(choose(&empty, &mut rng).is_none());
        assert_eq!(choose(&[9], &mut rng), Some(&9));
    }
}
