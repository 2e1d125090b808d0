//! Rarity resolution.
//!
//! One uniform draw is compared against cumulative thresholds in the fixed order
//! shiny → ruined → golden → standard. Luck widens the shiny and golden bands only; the ruined
//! band is flat. When luck pushes the first three bands past 1 the later bands are clipped, so
//! standard (and possibly golden) become unreachable while the ordering stays intact.
//!
//! Draw order for one resolution (relevant when scripting draws in tests):
//! 1. `unit` for the rarity band;
//! 2. shiny: `below` over normal + legendary items;
//!    otherwise: `unit` for legendary substitution (only when a legendary pool exists), then
//!    `below` over the chosen pool;
//! 3. standard with a point range wider than one: `below` for the point offset.

use chatcollect_types::{loot::FALLBACK_ITEMS, ItemPools, LootConfig, Rarity};

use crate::rng::{choose, LootRng};

/// Shiny band widens by `luck / SHINY_LUCK_DIVISOR`.
pub const SHINY_LUCK_DIVISOR: f64 = 1_000.0;
/// Golden band widens by `luck / GOLDEN_LUCK_DIVISOR`.
pub const GOLDEN_LUCK_DIVISOR: f64 = 200.0;

/// Effective width of each band for a given luck. The four widths always sum to 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RarityBands {
    pub shiny: f64,
    pub ruined: f64,
    pub golden: f64,
    pub standard: f64,
}

impl RarityBands {
    pub fn for_luck(luck: f64, config: &LootConfig) -> Self {
        let luck = luck.max(0.0);
        let shiny_p = (config.base_shiny_chance + luck / SHINY_LUCK_DIVISOR).clamp(0.0, 1.0);
        let ruined_p = config.ruined_chance.clamp(0.0, 1.0);
        let golden_p = (config.base_golden_chance + luck / GOLDEN_LUCK_DIVISOR).max(0.0);

        let shiny = shiny_p;
        let ruined = ruined_p.min(1.0 - shiny);
        let golden = golden_p.min(1.0 - shiny - ruined);
        let standard = (1.0 - shiny - ruined - golden).max(0.0);
        Self {
            shiny,
            ruined,
            golden,
            standard,
        }
    }

    /// Map a draw in `[0, 1)` to its band.
    pub fn classify(&self, draw: f64) -> Rarity {
        if draw < self.shiny {
            Rarity::Shiny
        } else if draw < self.shiny + self.ruined {
            Rarity::Ruined
        } else if draw < self.shiny + self.ruined + self.golden {
            Rarity::Golden
        } else {
            Rarity::Standard
        }
    }
}

/// Rarity, item and base points of one loot, before bounty and theft.
#[derive(Clone, Debug, PartialEq)]
pub struct Roll {
    pub rarity: Rarity,
    pub item: String,
    pub is_legendary: bool,
    pub points: u64,
}

/// Resolve one loot for a player holding `luck`.
pub fn resolve<R: LootRng + ?Sized>(
    luck: f64,
    config: &LootConfig,
    pools: &ItemPools,
    rng: &mut R,
) -> Roll {
    let rarity = RarityBands::for_luck(luck, config).classify(rng.unit());
    let (item, is_legendary) = pick_item(rarity, config, pools, rng);

    let mut points = match rarity {
        Rarity::Shiny => config.shiny_points,
        Rarity::Ruined => config.ruined_points,
        Rarity::Golden => config.golden_points,
        Rarity::Standard => standard_points(config, rng),
    };
    if is_legendary {
        points = points.max(config.legendary_points);
    }

    Roll {
        rarity,
        item,
        is_legendary,
        points,
    }
}

fn pick_item<R: LootRng + ?Sized>(
    rarity: Rarity,
    config: &LootConfig,
    pools: &ItemPools,
    rng: &mut R,
) -> (String, bool) {
    if rarity == Rarity::Shiny {
        let pool: Vec<&String> = pools.normal.iter().chain(pools.legendary.iter()).collect();
        return match choose(&pool, rng) {
            Some(item) => ((*item).clone(), pools.is_legendary(item)),
            None => (FALLBACK_ITEMS[0].to_string(), false),
        };
    }

    if !pools.legendary.is_empty() && rng.unit() < config.legendary_chance {
        if let Some(item) = choose(&pools.legendary, rng) {
            return (item.clone(), true);
        }
    }
    match choose(&pools.normal, rng) {
        Some(item) => (item.clone(), false),
        None => {
            let item = choose(&FALLBACK_ITEMS, rng).unwrap_or(&FALLBACK_ITEMS[0]);
            (item.to_string(), false)
        }
    }
}

fn standard_points<R: LootRng + ?Sized>(config: &LootConfig, rng: &mut R) -> u64 {
    let min = config.standard_points_min;
    let max = config.standard_points_max.max(min);
    let span = max - min;
    if span == 0 {
        return min;
    }
    // Spans past usize::MAX are drawn from the largest representable range.
    let choices = usize::try_from(span).unwrap_or(usize::MAX).saturating_add(1);
    min.saturating_add(rng.below(choices) as u64)
}

/// Independent theft check.
///
/// `candidates` are the other ledger users. No draw is made when there are none.
pub fn roll_thief<R: LootRng + ?Sized>(
    config: &LootConfig,
    candidates: &[String],
    rng: &mut R,
) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }
    if rng.unit() >= config.theft_chance {
        return None;
    }
    choose(candidates, rng).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::ScriptedRng;

    fn pools() -> ItemPools {
        ItemPools::new(
            vec!["croissant.png".into(), "donut.png".into()],
            vec!["legendary/crown.png".into()],
        )
    }

    fn assert_sums_to_one(bands: &RarityBands) {
        let sum = bands.shiny + bands.ruined + bands.golden + bands.standard;
        assert!((sum - 1.0).abs() < 1e-9, "bands sum to {sum}");
        assert!(bands.standard >= 0.0);
    }

    #[test]
    fn test_bands_sum_to_one_for_any_luck() {
        let config = LootConfig::default();
        for luck in [0.0, 5.0, 50.0, 150.0, 189.9, 190.0, 500.0, 1_000.0, 5_000.0] {
            assert_sums_to_one(&RarityBands::for_luck(luck, &config));
        }
    }

    #[test]
    fn test_bands_default_luck() {
        let bands = RarityBands::for_luck(0.0, &LootConfig::default());
        assert_eq!(bands.shiny, 0.0001);
        assert_eq!(bands.ruined, 0.05);
        assert_eq!(bands.golden, 0.05);
        assert_eq!(bands.classify(0.00005), Rarity::Shiny);
        assert_eq!(bands.classify(0.03), Rarity::Ruined);
        assert_eq!(bands.classify(0.08), Rarity::Golden);
        assert_eq!(bands.classify(0.99), Rarity::Standard);
    }

    #[test]
    fn test_high_luck_clips_standard() {
        // luck 200: shiny 0.2001, ruined 0.05, golden 1.05 -> clipped.
        let bands = RarityBands::for_luck(200.0, &LootConfig::default());
        assert_eq!(bands.standard, 0.0);
        assert_sums_to_one(&bands);
        assert_eq!(bands.classify(0.999_999), Rarity::Golden);
        assert_eq!(bands.classify(0.2), Rarity::Shiny);
    }

    #[test]
    fn test_standard_roll_at_high_draw() {
        let mut rng = ScriptedRng::with_units([0.99, 0.5]);
        let config = LootConfig::default();
        let roll = resolve(0.0, &config, &pools(), &mut rng);
        assert_eq!(roll.rarity, Rarity::Standard);
        assert!(!roll.is_legendary);
        assert!(
            (config.standard_points_min..=config.standard_points_max).contains(&roll.points)
        );
    }

    #[test]
    fn test_standard_point_range() {
        let config = LootConfig {
            standard_points_min: 2,
            standard_points_max: 4,
            ..LootConfig::default()
        };
        let mut rng = ScriptedRng::with_units([0.99, 0.5]);
        rng.push_index(1).push_index(2);
        let roll = resolve(0.0, &config, &pools(), &mut rng);
        assert_eq!(roll.item, "donut.png");
        assert_eq!(roll.points, 4);
    }

    #[test]
    fn test_full_width_point_range_still_draws() {
        let config = LootConfig {
            standard_points_min: 0,
            standard_points_max: u64::MAX,
            ..LootConfig::default()
        };
        let mut rng = ScriptedRng::with_units([0.99, 0.5]);
        rng.push_index(0).push_index(usize::MAX);
        let roll = resolve(0.0, &config, &pools(), &mut rng);
        assert_eq!(roll.rarity, Rarity::Standard);
        assert!(roll.points >= u64::from(u32::MAX) - 1);
    }

    #[test]
    fn test_shiny_can_be_legendary() {
        let mut rng = ScriptedRng::with_units([0.0]);
        rng.push_index(2);
        let roll = resolve(0.0, &LootConfig::default(), &pools(), &mut rng);
        assert_eq!(roll.rarity, Rarity::Shiny);
        assert_eq!(roll.item, "legendary/crown.png");
        assert!(roll.is_legendary);
        assert_eq!(roll.points, 10);
    }

    #[test]
    fn test_legendary_substitution_raises_points() {
        let mut rng = ScriptedRng::with_units([0.99, 0.0005]);
        let roll = resolve(0.0, &LootConfig::default(), &pools(), &mut rng);
        assert_eq!(roll.rarity, Rarity::Standard);
        assert!(roll.is_legendary);
        assert_eq!(roll.points, 5);

        // Ruined legendary still hits the floor.
        let mut rng = ScriptedRng::with_units([0.03, 0.0005]);
        let roll = resolve(0.0, &LootConfig::default(), &pools(), &mut rng);
        assert_eq!(roll.rarity, Rarity::Ruined);
        assert_eq!(roll.points, 5);
    }

    #[test]
    fn test_no_substitution_draw_without_legendary_pool() {
        let pools = ItemPools::new(vec!["donut.png".into()], Vec::new());
        let mut rng = ScriptedRng::with_units([0.99, 0.0]);
        let roll = resolve(0.0, &LootConfig::default(), &pools, &mut rng);
        assert!(!roll.is_legendary);
        // The second unit was not consumed.
        assert_eq!(rng.pending(), (1, 0));
    }

    #[test]
    fn test_luck_makes_golden_likely() {
        // luck 10: shiny 0.0101, ruined 0.05, golden 0.1.
        let mut rng = ScriptedRng::with_units([0.12, 0.5]);
        let roll = resolve(10.0, &LootConfig::default(), &pools(), &mut rng);
        assert_eq!(roll.rarity, Rarity::Golden);
        assert_eq!(roll.points, 3);
    }

    #[test]
    fn test_roll_thief() {
        let config = LootConfig::default();
        let others = vec!["bob".to_string(), "carol".to_string()];

        let mut rng = ScriptedRng::with_units([0.01]);
        rng.push_index(1);
        assert_eq!(roll_thief(&config, &others, &mut rng), Some("carol".to_string()));

        let mut rng = ScriptedRng::with_units([0.5]);
        assert_eq!(roll_thief(&config, &others, &mut rng), None);

        let mut rng = ScriptedRng::with_units([0.0]);
        assert_eq!(roll_thief(&config, &[], &mut rng), None);
        assert_eq!(rng.pending(), (1, 0));
    }
}
