//! Featured ("up") boosts and the secondary "fes" boost.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::{choose_weighted, roll_weight, weight_to_percent, PriorityTag, Result, Star};
use crate::logic::RuleScope;

use super::params::{self, Params, StarTable, TypeStarTable};
use super::{DrawRule, RuleId};

/// Rolls the featured tag per tier, with a per-tier featured pity.
///
/// The counter holds how many draws of a tier in a row missed the featured
/// tag. Once it reaches the tier's threshold the next draw of that tier is
/// featured without a roll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpRule {
    probability: StarTable<u32>,
    pity: StarTable<u32>,
    counter: StarTable<u32>,
    forced: StarTable<bool>,
}

#[derive(Default, Serialize, Deserialize)]
struct UpState {
    #[serde(default)]
    up_counter: BTreeMap<String, u32>,
    #[serde(default)]
    is_up_pity: BTreeMap<String, bool>,
}

impl UpRule {
    pub fn new(probability: StarTable<u32>, pity: StarTable<u32>) -> Result<Self> {
        params::check_probabilities(RuleId::Up, "up_probability", &probability)?;
        let counter = probability.iter().map(|(star, _)| (*star, 0)).collect();
        let forced = pity.iter().map(|(star, _)| (*star, false)).collect();
        Ok(Self {
            probability,
            pity,
            counter,
            forced,
        })
    }

    pub fn from_params(value: &Value) -> Result<Self> {
        let params = Params::new(RuleId::Up, value)?;
        let probability = params.star_table("up_probability")?;
        let pity = params.star_table("up_pity")?;
        Self::new(probability, pity)
    }

    /// Does this tier have a featured pity configured?
    #[must_use]
    pub fn has_pity(&self, star: Star) -> bool {
        params::lookup(&self.pity, star).is_some()
    }

    /// Was the featured tag forced by pity in the current draw?
    #[must_use]
    pub fn is_up_pity(&self, star: Star) -> bool {
        params::lookup(&self.forced, star).unwrap_or(false)
    }

    #[must_use]
    pub fn up_counter(&self, star: Star) -> Option<u32> {
        params::lookup(&self.counter, star)
    }
}

impl DrawRule for UpRule {
    fn id(&self) -> RuleId {
        RuleId::Up
    }

    fn decide(&mut self, scope: &mut RuleScope<'_>) -> Result<()> {
        for (_, forced) in self.forced.iter_mut() {
            *forced = false;
        }

        let star = scope.result.star;
        let Some(weight) = params::lookup(&self.probability, star) else {
            return Ok(());
        };
        let Some(counter) = params::lookup_mut(&mut self.counter, star) else {
            return Ok(());
        };

        let pity_reached = params::lookup(&self.pity, star).is_some_and(|threshold| *counter >= threshold);
        if pity_reached {
            debug!(star, misses = *counter, "featured pity reached");
            scope.result.add_tag(PriorityTag::Up);
            *counter = 0;
            if let Some(forced) = params::lookup_mut(&mut self.forced, star) {
                *forced = true;
            }
            return Ok(());
        }

        if roll_weight(scope.rng, weight) {
            scope.result.add_tag(PriorityTag::Up);
        }
        if scope.result.has_tag(PriorityTag::Up) {
            *counter = 0;
        } else {
            *counter = counter.saturating_add(1);
        }
        Ok(())
    }

    fn reset_counters(&mut self) {
        for (_, counter) in self.counter.iter_mut() {
            *counter = 0;
        }
        for (_, forced) in self.forced.iter_mut() {
            *forced = false;
        }
    }

    fn load_state(&mut self, state: &Value) -> Result<()> {
        let state: UpState = params::decode_state(self.id(), state)?;
        params::import_star(&mut self.counter, &state.up_counter);
        params::import_star(&mut self.forced, &state.is_up_pity);
        Ok(())
    }

    fn export_state(&self) -> Option<Value> {
        let is_default = self.counter.iter().all(|(_, c)| *c == 0) && self.forced.iter().all(|(_, f)| !*f);
        let state = UpState {
            up_counter: params::export_star(&self.counter),
            is_up_pity: params::export_star(&self.forced),
        };
        params::encode_state(&state, is_default)
    }

    fn describe(&self, width: usize) -> String {
        let mut lines = vec![self.id().to_string()];
        lines.extend(params::describe_rows(
            "featured probability",
            self.probability.iter().map(|(star, w)| (star.to_string(), weight_to_percent(*w))),
            width,
        ));
        lines.extend(params::describe_rows(
            "featured pity",
            self.pity.iter().map(|(star, t)| (star.to_string(), t.to_string())),
            width,
        ));
        lines.join("\n")
    }
}

/// Chooses the item type of a featured draw.
///
/// The type pity fires when a counter is strictly greater than its threshold,
/// unlike the star pity which fires on reaching it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpTypeRule {
    probability: TypeStarTable<u32>,
    pity: TypeStarTable<u32>,
    counter: TypeStarTable<u32>,
    forced: TypeStarTable<bool>,
}

#[derive(Default, Serialize, Deserialize)]
struct UpTypeState {
    #[serde(default)]
    up_type_counter: BTreeMap<String, BTreeMap<String, u32>>,
    #[serde(default)]
    is_up_type_pity: BTreeMap<String, BTreeMap<String, bool>>,
}

fn zeroed<V: Copy>(table: &TypeStarTable<u32>, value: V) -> TypeStarTable<V> {
    table
        .iter()
        .map(|(star, types)| (*star, types.iter().map(|(t, _)| (t.clone(), value)).collect()))
        .collect()
}

impl UpTypeRule {
    pub fn new(probability: TypeStarTable<u32>, pity: TypeStarTable<u32>) -> Result<Self> {
        for (star, types) in &probability {
            params::check_total(RuleId::UpType, "up_type_probability", Some(*star), types.iter().map(|(_, w)| *w))?;
        }
        Ok(Self {
            counter: zeroed(&pity, 0),
            forced: zeroed(&pity, false),
            probability,
            pity,
        })
    }

    pub fn from_params(value: &Value) -> Result<Self> {
        let params = Params::new(RuleId::UpType, value)?;
        let probability = params.type_star_table("up_type_probability")?;
        let pity = params.type_star_table("up_type_pity")?;
        Self::new(probability, pity)
    }

    #[must_use]
    pub fn up_type_counter(&self, star: Star, item_type: &str) -> Option<u32> {
        params::lookup_ref(&self.counter, star)
            .and_then(|types| types.iter().find(|(t, _)| t == item_type))
            .map(|(_, c)| *c)
    }

    #[must_use]
    pub fn is_up_type_pity(&self, star: Star, item_type: &str) -> bool {
        params::lookup_ref(&self.forced, star)
            .and_then(|types| types.iter().find(|(t, _)| t == item_type))
            .is_some_and(|(_, f)| *f)
    }

    /// Advance the tier's type counters; return the first type past its threshold.
    fn advance_pity(&mut self, star: Star) -> Option<String> {
        let thresholds = params::lookup_ref(&self.pity, star)?;
        let counters = params::lookup_mut(&mut self.counter, star)?;
        for (_, counter) in counters.iter_mut() {
            *counter = counter.saturating_add(1);
        }
        let (item_type, counter) = counters.iter_mut().find(|(item_type, counter)| {
            params::lookup_type(thresholds, item_type).is_some_and(|threshold| *counter > threshold)
        })?;
        *counter = 0;
        let item_type = item_type.clone();
        if let Some((_, forced)) = params::lookup_mut(&mut self.forced, star)
            .and_then(|types| types.iter_mut().find(|(t, _)| *t == item_type))
        {
            *forced = true;
        }
        Some(item_type)
    }
}

impl DrawRule for UpTypeRule {
    fn id(&self) -> RuleId {
        RuleId::UpType
    }

    fn decide(&mut self, scope: &mut RuleScope<'_>) -> Result<()> {
        for (_, types) in self.forced.iter_mut() {
            for (_, forced) in types.iter_mut() {
                *forced = false;
            }
        }

        let star = scope.result.star;
        if !scope.result.has_tag(PriorityTag::Up) || params::lookup_ref(&self.probability, star).is_none() {
            return Ok(());
        }

        if let Some(item_type) = self.advance_pity(star) {
            debug!(star, item_type = item_type.as_str(), "featured type pity reached");
            scope.result.item_type = item_type;
            return Ok(());
        }

        if let Some(types) = params::lookup_ref(&self.probability, star) {
            scope.result.item_type = choose_weighted(scope.rng, types)?.clone();
        }
        Ok(())
    }

    fn reset_counters(&mut self) {
        self.counter = zeroed(&self.pity, 0);
        self.forced = zeroed(&self.pity, false);
    }

    fn load_state(&mut self, state: &Value) -> Result<()> {
        let state: UpTypeState = params::decode_state(self.id(), state)?;
        params::import_type_star(&mut self.counter, &state.up_type_counter);
        params::import_type_star(&mut self.forced, &state.is_up_type_pity);
        Ok(())
    }

    fn export_state(&self) -> Option<Value> {
        let is_default = self.counter.iter().all(|(_, types)| types.iter().all(|(_, c)| *c == 0))
            && self.forced.iter().all(|(_, types)| types.iter().all(|(_, f)| !*f));
        let state = UpTypeState {
            up_type_counter: params::export_type_star(&self.counter),
            is_up_type_pity: params::export_type_star(&self.forced),
        };
        params::encode_state(&state, is_default)
    }

    fn describe(&self, width: usize) -> String {
        let mut lines = vec![self.id().to_string()];
        for (star, types) in &self.probability {
            lines.extend(params::describe_rows(
                &format!("featured type probability at star {}", star),
                types.iter().map(|(t, w)| (t.clone(), weight_to_percent(*w))),
                width,
            ));
        }
        for (star, types) in &self.pity {
            lines.extend(params::describe_rows(
                &format!("featured type pity at star {}", star),
                types.iter().map(|(t, v)| (t.clone(), v.to_string())),
                width,
            ));
        }
        lines.join("\n")
    }
}

/// Secondary boost, rolled only inside featured draws.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FesRule {
    probability: StarTable<u32>,
}

impl FesRule {
    pub fn new(probability: StarTable<u32>) -> Result<Self> {
        params::check_probabilities(RuleId::Fes, "fes_probability", &probability)?;
        Ok(Self { probability })
    }

    pub fn from_params(value: &Value) -> Result<Self> {
        let params = Params::new(RuleId::Fes, value)?;
        Self::new(params.star_table("fes_probability")?)
    }
}

impl DrawRule for FesRule {
    fn id(&self) -> RuleId {
        RuleId::Fes
    }

    fn decide(&mut self, scope: &mut RuleScope<'_>) -> Result<()> {
        if !scope.result.has_tag(PriorityTag::Up) {
            return Ok(());
        }
        let Some(weight) = params::lookup(&self.probability, scope.result.star) else {
            return Ok(());
        };
        if roll_weight(scope.rng, weight) {
            scope.result.add_tag(PriorityTag::Fes);
        }
        Ok(())
    }

    fn describe(&self, width: usize) -> String {
        let mut lines = vec![self.id().to_string()];
        lines.extend(params::describe_rows(
            "fes probability",
            self.probability.iter().map(|(star, w)| (star.to_string(), weight_to_percent(*w))),
            width,
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DrawResult, RandomSource};
    use crate::logic::{Bridge, Peers};
    use serde_json::json;

    /// Always rolls the same value.
    struct Fixed(u64);

    impl RandomSource for Fixed {
        fn next_below(&mut self, bound: u64) -> u64 {
            self.0.min(bound - 1)
        }
    }

    fn decide(rule: &mut impl DrawRule, result: &mut DrawResult, roll: u64) {
        let bridge = Bridge::default();
        let mut rng = Fixed(roll);
        let mut scope = RuleScope {
            result,
            resolved: None,
            rng: &mut rng,
            peers: Peers::none(&bridge),
        };
        rule.decide(&mut scope).unwrap();
    }

    const HIT: u64 = 0;
    const MISS: u64 = 9999;

    #[test]
    fn test_up_roll_and_pity() {
        let mut rule = UpRule::new(vec![(5, 5000)], vec![(5, 1)]).unwrap();

        let mut result = DrawResult::with_star(5);
        decide(&mut rule, &mut result, MISS);
        assert!(!result.has_tag(PriorityTag::Up));
        assert_eq!(rule.up_counter(5), Some(1));

        // pity reached: forced even with a losing roll
        let mut result = DrawResult::with_star(5);
        decide(&mut rule, &mut result, MISS);
        assert!(result.has_tag(PriorityTag::Up));
        assert!(rule.is_up_pity(5));
        assert_eq!(rule.up_counter(5), Some(0));

        let mut result = DrawResult::with_star(5);
        decide(&mut rule, &mut result, HIT);
        assert!(result.has_tag(PriorityTag::Up));
        assert!(!rule.is_up_pity(5));
        assert_eq!(rule.up_counter(5), Some(0));
    }

    #[test]
    fn test_up_ignores_other_stars() {
        let mut rule = UpRule::new(vec![(5, 5000)], vec![(5, 1)]).unwrap();
        let mut result = DrawResult::with_star(3);
        decide(&mut rule, &mut result, HIT);
        assert!(!result.has_tag(PriorityTag::Up));
        assert_eq!(rule.up_counter(5), Some(0));
    }

    #[test]
    fn test_up_counter_resets_when_already_featured() {
        let mut rule = UpRule::new(vec![(5, 5000)], vec![(5, 3)]).unwrap();
        let mut result = DrawResult::with_star(5);
        decide(&mut rule, &mut result, MISS);
        assert_eq!(rule.up_counter(5), Some(1));

        let mut result = DrawResult::with_star(5).with_tag(PriorityTag::Up);
        decide(&mut rule, &mut result, MISS);
        assert_eq!(rule.up_counter(5), Some(0));
    }

    #[test]
    fn test_up_probability_over_scale_rejected() {
        assert!(UpRule::new(vec![(5, 10_001)], vec![]).is_err());
    }

    #[test]
    fn test_up_state_round_trip() {
        let mut rule = UpRule::new(vec![(5, 5000), (4, 5000)], vec![(5, 1), (4, 1)]).unwrap();
        let mut result = DrawResult::with_star(4);
        decide(&mut rule, &mut result, MISS);
        let state = rule.export_state().unwrap();
        assert_eq!(
            state,
            json!({ "up_counter": { "5": 0, "4": 1 }, "is_up_pity": { "5": false, "4": false } })
        );

        let mut fresh = UpRule::new(vec![(5, 5000), (4, 5000)], vec![(5, 1), (4, 1)]).unwrap();
        fresh.load_state(&state).unwrap();
        assert_eq!(fresh, rule);
    }

    #[test]
    fn test_up_type_strict_threshold() {
        let mut rule = UpTypeRule::from_params(&json!({
            "up_type_probability": { "4": { "Role": 10000, "Weapon": 0 } },
            "up_type_pity": { "4": { "Weapon": 2 } }
        }))
        .unwrap();

        // counter 1, 2: not strictly greater than 2
        for expected in [1, 2] {
            let mut result = DrawResult::with_star(4).with_tag(PriorityTag::Up);
            decide(&mut rule, &mut result, MISS);
            assert_eq!(result.item_type, "Role");
            assert_eq!(rule.up_type_counter(4, "Weapon"), Some(expected));
        }

        // counter 3 > 2
        let mut result = DrawResult::with_star(4).with_tag(PriorityTag::Up);
        decide(&mut rule, &mut result, MISS);
        assert_eq!(result.item_type, "Weapon");
        assert!(rule.is_up_type_pity(4, "Weapon"));
        assert_eq!(rule.up_type_counter(4, "Weapon"), Some(0));
    }

    #[test]
    fn test_up_type_requires_up_tag() {
        let mut rule = UpTypeRule::new(vec![(5, vec![("Role".to_string(), 10000)])], vec![]).unwrap();
        let mut result = DrawResult::with_star(5);
        decide(&mut rule, &mut result, HIT);
        assert!(!result.has_type());

        let mut result = DrawResult::with_star(5).with_tag(PriorityTag::Up);
        decide(&mut rule, &mut result, HIT);
        assert_eq!(result.item_type, "Role");
    }

    #[test]
    fn test_fes_only_inside_up() {
        let mut rule = FesRule::new(vec![(3, 10_000)]).unwrap();

        let mut result = DrawResult::with_star(3);
        decide(&mut rule, &mut result, HIT);
        assert!(!result.has_tag(PriorityTag::Fes));

        let mut result = DrawResult::with_star(3).with_tag(PriorityTag::Up);
        decide(&mut rule, &mut result, HIT);
        assert!(result.has_tag(PriorityTag::Fes));
        assert_eq!(result.priority_group(), PriorityTag::Fes);
    }
}
