//! Integer weights on a fixed 10000-unit scale.
//!
//! One unit is 0.01%. Integer weights keep probability edits exact and avoid
//! floating-point drift across long simulations.

use super::error::{Result, WishError};
use super::rng::RandomSource;
use super::draw::Star;

/// Size of the probability space.
pub const MAX_WEIGHT: u32 = 10_000;

/// Pick one key with probability `weight / total`.
///
/// Fails with [`WishError::ZeroTotalWeight`] when every weight is zero or the
/// table is empty.
pub fn choose_weighted<'a, K>(rng: &mut dyn RandomSource, entries: &'a [(K, u32)]) -> Result<&'a K> {
    let total: u64 = entries.iter().map(|(_, w)| u64::from(*w)).sum();
    if total == 0 {
        return Err(WishError::ZeroTotalWeight);
    }

    let mut roll = rng.next_below(total);
    for (key, weight) in entries {
        let weight = u64::from(*weight);
        if roll < weight {
            return Ok(key);
        }
        roll -= weight;
    }

    // roll < total guarantees a hit above
    Err(WishError::ZeroTotalWeight)
}

/// Weighted boolean: `true` with weight `weight`, `false` with `MAX_WEIGHT - weight`.
pub fn roll_weight(rng: &mut dyn RandomSource, weight: u32) -> bool {
    rng.next_below(u64::from(MAX_WEIGHT)) < u64::from(weight)
}

/// Clamp-and-subtract normalization in table order.
///
/// Each weight becomes `min(remaining, raw)` and consumes that much of the
/// remaining budget, so the sum never exceeds [`MAX_WEIGHT`] and earlier
/// entries keep their mass.
pub fn normalize_weights(weights: &mut [(Star, u32)]) {
    let mut remaining = MAX_WEIGHT;
    for (_, weight) in weights.iter_mut() {
        let clamped = (*weight).min(remaining);
        remaining -= clamped;
        *weight = clamped;
    }
}

/// Render a weight as a percentage with two decimals (`60` -> `0.60%`).
pub fn weight_to_percent(weight: u32) -> String {
    format!("{}.{:02}%", weight / 100, weight % 100)
}
