//! Guaranteed track inside featured draws.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::{PriorityTag, Result, Star};
use crate::logic::RuleScope;

use super::params::{self, Params, StarTable};
use super::{DrawRule, RuleId};

/// Forces the appoint tag after enough featured draws missed the appointed item.
///
/// The counter advances on every featured draw of a configured tier and only
/// goes back to zero when the resolved item really belongs to the appoint
/// group. A forced decision alone does not reset it: if the resolver cannot
/// supply an appointed item, the next featured draw forces appoint again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppointRule {
    pity: StarTable<u32>,
    counter: StarTable<u32>,
    forced: StarTable<bool>,
}

#[derive(Default, Serialize, Deserialize)]
struct AppointState {
    #[serde(default)]
    appoint_counter: BTreeMap<String, u32>,
    #[serde(default)]
    is_appoint_pity: BTreeMap<String, bool>,
}

impl AppointRule {
    pub fn new(pity: StarTable<u32>) -> Self {
        Self {
            counter: pity.iter().map(|(star, _)| (*star, 0)).collect(),
            forced: pity.iter().map(|(star, _)| (*star, false)).collect(),
            pity,
        }
    }

    pub fn from_params(value: &Value) -> Result<Self> {
        let params = Params::new(RuleId::Appoint, value)?;
        Ok(Self::new(params.star_table("appoint_pity")?))
    }

    #[must_use]
    pub fn appoint_counter(&self, star: Star) -> Option<u32> {
        params::lookup(&self.counter, star)
    }

    /// Was appoint forced in the current draw?
    #[must_use]
    pub fn is_appoint_pity(&self, star: Star) -> bool {
        params::lookup(&self.forced, star).unwrap_or(false)
    }

    fn clear_flags(&mut self) {
        for (_, forced) in self.forced.iter_mut() {
            *forced = false;
        }
    }
}

impl DrawRule for AppointRule {
    fn id(&self) -> RuleId {
        RuleId::Appoint
    }

    fn decide(&mut self, scope: &mut RuleScope<'_>) -> Result<()> {
        self.clear_flags();

        if !scope.result.has_tag(PriorityTag::Up) {
            return Ok(());
        }
        let star = scope.result.star;
        let (Some(threshold), Some(counter)) =
            (params::lookup(&self.pity, star), params::lookup_mut(&mut self.counter, star))
        else {
            return Ok(());
        };

        if *counter >= threshold {
            debug!(star, misses = *counter, "appoint pity reached");
            scope.result.add_tag(PriorityTag::Appoint);
            if let Some(forced) = params::lookup_mut(&mut self.forced, star) {
                *forced = true;
            }
            return Ok(());
        }
        *counter = counter.saturating_add(1);
        Ok(())
    }

    fn observe(&mut self, scope: &mut RuleScope<'_>) {
        let Some(item) = scope.resolved else {
            return;
        };
        if !item.belongs_to(PriorityTag::Appoint) {
            return;
        }
        if let Some(counter) = params::lookup_mut(&mut self.counter, item.star) {
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
        let state: AppointState = params::decode_state(self.id(), state)?;
        params::import_star(&mut self.counter, &state.appoint_counter);
        params::import_star(&mut self.forced, &state.is_appoint_pity);
        Ok(())
    }

    fn export_state(&self) -> Option<Value> {
        let is_default = self.counter.iter().all(|(_, c)| *c == 0) && self.forced.iter().all(|(_, f)| !*f);
        let state = AppointState {
            appoint_counter: params::export_star(&self.counter),
            is_appoint_pity: params::export_star(&self.forced),
        };
        params::encode_state(&state, is_default)
    }

    fn describe(&self, width: usize) -> String {
        let mut lines = vec![self.id().to_string()];
        lines.extend(params::describe_rows(
            "appoint pity",
            self.pity.iter().map(|(star, t)| (star.to_string(), t.to_string())),
            width,
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DrawResult, RandomSource, ResolvedItem};
    use crate::logic::{Bridge, Peers};
    use serde_json::json;

    struct Zero;

    impl RandomSource for Zero {
        fn next_below(&mut self, _bound: u64) -> u64 {
            0
        }
    }

    fn run(rule: &mut AppointRule, result: &mut DrawResult, resolved: Option<&ResolvedItem>) {
        let bridge = Bridge::default();
        let mut rng = Zero;
        let mut scope = RuleScope {
            result,
            resolved,
            rng: &mut rng,
            peers: Peers::none(&bridge),
        };
        rule.decide(&mut scope).unwrap();
        rule.observe(&mut scope);
    }

    fn featured() -> DrawResult {
        DrawResult::with_star(5).with_tag(PriorityTag::Up)
    }

    #[test]
    fn test_counts_featured_draws_only() {
        let mut rule = AppointRule::new(vec![(5, 2)]);
        run(&mut rule, &mut DrawResult::with_star(5), None);
        assert_eq!(rule.appoint_counter(5), Some(0));

        run(&mut rule, &mut featured(), None);
        assert_eq!(rule.appoint_counter(5), Some(1));
    }

    #[test]
    fn test_forced_until_appointed_item_resolves() {
        let mut rule = AppointRule::new(vec![(5, 1)]);
        run(&mut rule, &mut featured(), None);

        // forced, but the resolver returned a plain featured item
        let plain = ResolvedItem::new("Other", 5, "Weapon", PriorityTag::Up);
        let mut result = featured();
        run(&mut rule, &mut result, Some(&plain));
        assert!(result.has_tag(PriorityTag::Appoint));
        assert!(rule.is_appoint_pity(5));
        assert_eq!(rule.appoint_counter(5), Some(1));

        let mut result = featured();
        let appointed = ResolvedItem::new("Chosen", 5, "Weapon", PriorityTag::Appoint).also_in(PriorityTag::Up);
        run(&mut rule, &mut result, Some(&appointed));
        assert!(result.has_tag(PriorityTag::Appoint));
        assert_eq!(rule.appoint_counter(5), Some(0));
    }

    #[test]
    fn test_state_round_trip() {
        let mut rule = AppointRule::from_params(&json!({ "appoint_pity": { "5": 2 } })).unwrap();
        assert!(rule.export_state().is_none());
        run(&mut rule, &mut featured(), None);

        let state = rule.export_state().unwrap();
        assert_eq!(state, json!({ "appoint_counter": { "5": 1 }, "is_appoint_pity": { "5": false } }));

        let mut fresh = AppointRule::new(vec![(5, 2)]);
        fresh.load_state(&state).unwrap();
        assert_eq!(fresh, rule);
    }
}
