//! Capture: a second path to the featured tag, plus its pity.
//!
//! Both rules need to run before [`UpRule`](super::UpRule) to matter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::{roll_weight, weight_to_percent, PriorityTag, Result, Star};
use crate::logic::RuleScope;

use super::params::{self, Params, StarTable};
use super::{DrawRule, RuleId};

/// Rolls the featured tag ahead of the regular featured roll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureRule {
    probability: StarTable<u32>,
}

impl CaptureRule {
    pub fn new(probability: StarTable<u32>) -> Result<Self> {
        params::check_probabilities(RuleId::Capture, "capture_probability", &probability)?;
        Ok(Self { probability })
    }

    pub fn from_params(value: &Value) -> Result<Self> {
        let params = Params::new(RuleId::Capture, value)?;
        Self::new(params.star_table("capture_probability")?)
    }
}

impl DrawRule for CaptureRule {
    fn id(&self) -> RuleId {
        RuleId::Capture
    }

    fn decide(&mut self, scope: &mut RuleScope<'_>) -> Result<()> {
        if scope.result.has_tag(PriorityTag::Up) {
            return Ok(());
        }
        let star = scope.result.star;
        let Some(weight) = params::lookup(&self.probability, star) else {
            return Ok(());
        };
        if roll_weight(scope.rng, weight) {
            debug!(star, "captured");
            scope.result.add_tag(PriorityTag::Up);
        }
        Ok(())
    }

    fn describe(&self, width: usize) -> String {
        let mut lines = vec![self.id().to_string()];
        lines.extend(params::describe_rows(
            "capture probability",
            self.probability.iter().map(|(star, w)| (star.to_string(), weight_to_percent(*w))),
            width,
        ));
        lines.join("\n")
    }
}

/// Forces the featured tag after a run of featured draws that each needed
/// the featured pity.
///
/// The counter grows on observe when the draw was featured through
/// [`UpRule`](super::UpRule)'s pity, and drops to zero when it was featured
/// any other way. Without an `UpRule` in the pipeline, or for a tier the
/// `UpRule` has no pity for, the counter never moves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturePityRule {
    pity: StarTable<u32>,
    counter: StarTable<u32>,
    forced: StarTable<bool>,
}

#[derive(Default, Serialize, Deserialize)]
struct CapturePityState {
    #[serde(default)]
    capture_pity_counter: BTreeMap<String, u32>,
    #[serde(default)]
    is_capture_pity: BTreeMap<String, bool>,
}

impl CapturePityRule {
    pub fn new(pity: StarTable<u32>) -> Self {
        Self {
            counter: pity.iter().map(|(star, _)| (*star, 0)).collect(),
            forced: pity.iter().map(|(star, _)| (*star, false)).collect(),
            pity,
        }
    }

    pub fn from_params(value: &Value) -> Result<Self> {
        let params = Params::new(RuleId::CapturePity, value)?;
        Ok(Self::new(params.star_table("capture_pity")?))
    }

    #[must_use]
    pub fn capture_pity_counter(&self, star: Star) -> Option<u32> {
        params::lookup(&self.counter, star)
    }

    #[must_use]
    pub fn is_capture_pity(&self, star: Star) -> bool {
        params::lookup(&self.forced, star).unwrap_or(false)
    }

    fn clear_flags(&mut self) {
        for (_, forced) in self.forced.iter_mut() {
            *forced = false;
        }
    }
}

impl DrawRule for CapturePityRule {
    fn id(&self) -> RuleId {
        RuleId::CapturePity
    }

    fn decide(&mut self, scope: &mut RuleScope<'_>) -> Result<()> {
        self.clear_flags();

        let star = scope.result.star;
        let (Some(threshold), Some(counter)) =
            (params::lookup(&self.pity, star), params::lookup_mut(&mut self.counter, star))
        else {
            return Ok(());
        };
        if *counter >= threshold {
            debug!(star, streak = *counter, "capture pity reached");
            scope.result.add_tag(PriorityTag::Up);
            *counter = 0;
            if let Some(forced) = params::lookup_mut(&mut self.forced, star) {
                *forced = true;
            }
        }
        Ok(())
    }

    fn observe(&mut self, scope: &mut RuleScope<'_>) {
        let star = scope.result.star;
        if !scope.result.has_tag(PriorityTag::Up) {
            return;
        }
        let Some(counter) = params::lookup_mut(&mut self.counter, star) else {
            return;
        };
        let Some(up) = scope.peers.up() else {
            return;
        };
        if !up.has_pity(star) {
            return;
        }
        if up.is_up_pity(star) {
            *counter = counter.saturating_add(1);
        } else {
            *counter = 0;
        }
    }

    fn reset_counters(&mut self) {
        for (_, counter) in self.counter.iter_mut() {
            *counter = 0;
        }
        self.clear_flags();
    }

    fn load_state(&mut self, state: &Value) -> Result<()> {
        let state: CapturePityState = params::decode_state(self.id(), state)?;
        params::import_star(&mut self.counter, &state.capture_pity_counter);
        params::import_star(&mut self.forced, &state.is_capture_pity);
        Ok(())
    }

    fn export_state(&self) -> Option<Value> {
        let is_default = self.counter.iter().all(|(_, c)| *c == 0) && self.forced.iter().all(|(_, f)| !*f);
        let state = CapturePityState {
            capture_pity_counter: params::export_star(&self.counter),
            is_capture_pity: params::export_star(&self.forced),
        };
        params::encode_state(&state, is_default)
    }

    fn describe(&self, width: usize) -> String {
        let mut lines = vec![self.id().to_string()];
        lines.extend(params::describe_rows(
            "capture pity",
            self.pity.iter().map(|(star, t)| (star.to_string(), t.to_string())),
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
    use crate::rules::{Rule, UpRule};
    use serde_json::json;

    struct Fixed(u64);

    impl RandomSource for Fixed {
        fn next_below(&mut self, bound: u64) -> u64 {
            self.0.min(bound - 1)
        }
    }

    #[test]
    fn test_capture_adds_up() {
        let mut rule = CaptureRule::from_params(&json!({ "capture_probability": { "5": 1000 } })).unwrap();
        let bridge = Bridge::default();

        for (roll, expected) in [(999, true), (1000, false)] {
            let mut result = DrawResult::with_star(5);
            let mut rng = Fixed(roll);
            let mut scope = RuleScope {
                result: &mut result,
                resolved: None,
                rng: &mut rng,
                peers: Peers::none(&bridge),
            };
            rule.decide(&mut scope).unwrap();
            assert_eq!(result.has_tag(PriorityTag::Up), expected);
        }
    }

    /// Pipeline of `[CapturePity, Up]` driven by hand with one roll per draw.
    struct Harness {
        rules: Vec<Rule>,
        bridge: Bridge,
    }

    impl Harness {
        fn new() -> Self {
            let rules: Vec<Rule> = vec![
                CapturePityRule::new(vec![(5, 2)]).into(),
                UpRule::new(vec![(5, 5000)], vec![(5, 1)]).unwrap().into(),
            ];
            let bridge = Bridge::build(&rules).unwrap();
            Self { rules, bridge }
        }

        fn draw(&mut self, roll: u64) -> DrawResult {
            let mut result = DrawResult::with_star(5);
            let mut rng = Fixed(roll);
            for position in 0..self.rules.len() {
                let (rule, peers) = Peers::split(&mut self.rules, position, &self.bridge).unwrap();
                let mut scope = RuleScope {
                    result: &mut result,
                    resolved: None,
                    rng: &mut rng,
                    peers,
                };
                rule.decide(&mut scope).unwrap();
            }
            for position in 0..self.rules.len() {
                let (rule, peers) = Peers::split(&mut self.rules, position, &self.bridge).unwrap();
                let mut scope = RuleScope {
                    result: &mut result,
                    resolved: None,
                    rng: &mut rng,
                    peers,
                };
                rule.observe(&mut scope);
            }
            result
        }

        fn capture(&self) -> &CapturePityRule {
            match &self.rules[0] {
                Rule::CapturePity(rule) => rule,
                _ => unreachable!(),
            }
        }
    }

    const LOSE: u64 = 9999;
    const WIN: u64 = 0;

    #[test]
    fn test_streak_of_up_pity_forces_capture() {
        let mut harness = Harness::new();

        // lose, then up pity; twice
        for streak in [1, 2] {
            assert!(!harness.draw(LOSE).has_tag(PriorityTag::Up));
            assert!(harness.draw(LOSE).has_tag(PriorityTag::Up));
            assert_eq!(harness.capture().capture_pity_counter(5), Some(streak));
        }

        // streak reached: featured straight away
        let result = harness.draw(LOSE);
        assert!(result.has_tag(PriorityTag::Up));
        assert!(harness.capture().is_capture_pity(5));
        assert_eq!(harness.capture().capture_pity_counter(5), Some(0));
    }

    #[test]
    fn test_regular_up_breaks_streak() {
        let mut harness = Harness::new();
        harness.draw(LOSE);
        harness.draw(LOSE);
        assert_eq!(harness.capture().capture_pity_counter(5), Some(1));

        assert!(harness.draw(WIN).has_tag(PriorityTag::Up));
        assert_eq!(harness.capture().capture_pity_counter(5), Some(0));
    }

    #[test]
    fn test_state_round_trip() {
        let mut rule = CapturePityRule::new(vec![(5, 2)]);
        rule.load_state(&json!({ "capture_pity_counter": { "5": 1 } })).unwrap();
        let state = rule.export_state().unwrap();
        assert_eq!(state, json!({ "capture_pity_counter": { "5": 1 }, "is_capture_pity": { "5": false } }));
    }
}
