//! Statistical and property tests.
//!
//! Weighted choice must match configured weights over many draws, and weight
//! normalization must respect the 10000-unit budget for any ramp size.

use proptest::prelude::*;

use wish_engine::core::{normalize_weights, WishRng, MAX_WEIGHT};
use wish_engine::logic::Logic;
use wish_engine::rules::{Rule, StarCounterRule, StarProbabilityRule};

// =============================================================================
// Distribution
// =============================================================================

/// One million seeded draws land within five standard deviations per tier.
#[test]
fn test_star_frequencies_match_weights() {
    const DRAWS: u64 = 1_000_000;
    let weights = [(5u32, 60u32), (4, 510), (3, 9430)];

    let rules: Vec<Rule> = vec![StarProbabilityRule::new(weights.to_vec()).unwrap().into()];
    let mut logic = Logic::new("distribution", rules, 0).unwrap().with_rng(WishRng::new(20_240_601));

    let mut counts = [0u64; 6];
    for _ in 0..DRAWS {
        let star = logic.decide().unwrap().star;
        logic.observe(None);
        counts[star as usize] += 1;
    }

    for (star, weight) in weights {
        let p = f64::from(weight) / f64::from(MAX_WEIGHT);
        let expected = p * DRAWS as f64;
        let sd = (DRAWS as f64 * p * (1.0 - p)).sqrt();
        let observed = counts[star as usize] as f64;
        assert!(
            (observed - expected).abs() < 5.0 * sd,
            "star {}: observed {}, expected {:.0} +- {:.0}",
            star,
            observed,
            expected,
            5.0 * sd
        );
    }
    assert_eq!(counts[0], 0);
}

/// Star counters equal the number of draws since the tier last came up.
#[test]
fn test_counters_track_draws_since_hit() {
    let rules: Vec<Rule> = vec![
        StarCounterRule::new([5, 4]).into(),
        StarProbabilityRule::new(vec![(5, 1000), (4, 3000), (3, 6000)]).unwrap().into(),
    ];
    let mut logic = Logic::new("counters", rules, 9).unwrap();
    let (mut since_five, mut since_four) = (0u32, 0u32);

    for _ in 0..10_000 {
        let star = logic.decide().unwrap().star;
        logic.observe(None);
        since_five = if star == 5 { 0 } else { since_five + 1 };
        since_four = if star == 4 { 0 } else { since_four + 1 };

        let Some(Rule::StarCounter(counter)) = logic.rules().first() else {
            panic!("star counter expected first");
        };
        assert_eq!(counter.count(5), Some(since_five));
        assert_eq!(counter.count(4), Some(since_four));
    }
}

// =============================================================================
// Normalization properties
// =============================================================================

proptest! {
    /// The budget is never exceeded and an earlier tier keeps its raw weight
    /// whenever the budget allows it.
    #[test]
    fn prop_normalize_respects_budget(
        raw in proptest::collection::vec(0u32..30_000, 1..6)
    ) {
        let mut weights: Vec<(u32, u32)> = raw.iter().enumerate().map(|(i, w)| (10 - i as u32, *w)).collect();
        normalize_weights(&mut weights);

        let total: u64 = weights.iter().map(|(_, w)| u64::from(*w)).sum();
        prop_assert!(total <= u64::from(MAX_WEIGHT));

        let mut remaining = MAX_WEIGHT;
        for ((_, effective), raw) in weights.iter().zip(&raw) {
            prop_assert_eq!(*effective, (*raw).min(remaining));
            remaining -= *effective;
        }
    }

    /// A 5-star ramp of any size leaves the table within budget.
    #[test]
    fn prop_ramp_stays_within_budget(counter in 0u32..5_000) {
        use wish_engine::logic::PersistedState;
        use wish_engine::rules::{RuleId, Ramp, StarProbabilityIncreaseRule};

        let rules: Vec<Rule> = vec![
            StarCounterRule::new([5]).into(),
            StarProbabilityIncreaseRule::new(vec![(5, Ramp::new(73, 600))]).into(),
            StarProbabilityRule::new(vec![(5, 60), (4, 510), (3, 9430)]).unwrap().into(),
        ];
        let mut logic = Logic::new("ramp", rules, 1).unwrap();
        let mut state = PersistedState::new();
        state.insert(RuleId::StarCounter, serde_json::json!({ "star_counter": { "5": counter } }));
        logic.load_state(&state).unwrap();
        logic.decide().unwrap();

        let Some(Rule::StarProbability(probability)) = logic.rules().get(2) else {
            panic!("star probability expected third");
        };
        let live = probability.live_weights();
        let total: u32 = live.iter().map(|(_, w)| *w).sum();
        prop_assert!(total <= MAX_WEIGHT);

        let draw = u64::from(counter) + 1;
        let bonus = if draw >= 73 { (draw - 72) * 600 } else { 0 };
        let expected = (60 + bonus).min(u64::from(MAX_WEIGHT));
        prop_assert_eq!(u64::from(live[0].1), expected);
    }
}
