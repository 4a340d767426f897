//! Draws-since-last-hit counters.
//!
//! Counters only do bookkeeping in the observe phase. Pity and ramp rules read
//! and adjust them through the bridge.
//!
//! A counter value is the number of completed draws since the tier (or type)
//! last came up, so the draw being decided is number `counter + 1`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Result, Star};
use crate::logic::RuleScope;

use super::params::{self, Params, TypeStarTable};
use super::{DrawRule, RuleId};

/// One counter per tracked star tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StarCounterRule {
    counters: Vec<(Star, u32)>,
}

#[derive(Default, Serialize, Deserialize)]
struct StarCounterState {
    #[serde(default)]
    star_counter: BTreeMap<String, u32>,
}

impl StarCounterRule {
    /// Track the given tiers, all counters at zero.
    pub fn new(stars: impl IntoIterator<Item = Star>) -> Self {
        let mut counters: Vec<(Star, u32)> = Vec::new();
        for star in stars {
            if !counters.iter().any(|(s, _)| *s == star) {
                counters.push((star, 0));
            }
        }
        Self { counters }
    }

    pub fn from_params(value: &Value) -> Result<Self> {
        let params = Params::new(RuleId::StarCounter, value)?;
        let stars: Vec<Star> = params.value("star_list")?;
        Ok(Self::new(stars))
    }

    /// Counter for a tier, `None` if untracked.
    #[must_use]
    pub fn count(&self, star: Star) -> Option<u32> {
        params::lookup(&self.counters, star)
    }

    /// Tracked tiers in configuration order.
    pub fn stars(&self) -> impl Iterator<Item = Star> + '_ {
        self.counters.iter().map(|(star, _)| *star)
    }

    /// Set a tracked tier's counter. Untracked tiers are ignored.
    pub fn set(&mut self, star: Star, value: u32) {
        if let Some(counter) = params::lookup_mut(&mut self.counters, star) {
            *counter = value;
        }
    }

    /// Zero every tracked tier strictly below `star`.
    pub fn zero_below(&mut self, star: Star) {
        for (tracked, counter) in self.counters.iter_mut() {
            if *tracked < star {
                *counter = 0;
            }
        }
    }

    /// Record one completed draw of `drawn` (0 for a miss).
    pub fn record(&mut self, drawn: Star) {
        for (star, counter) in self.counters.iter_mut() {
            *counter = if *star == drawn { 0 } else { counter.saturating_add(1) };
        }
    }
}

impl DrawRule for StarCounterRule {
    fn id(&self) -> RuleId {
        RuleId::StarCounter
    }

    fn observe(&mut self, scope: &mut RuleScope<'_>) {
        self.record(scope.result.star);
    }

    fn reset_counters(&mut self) {
        for (_, counter) in self.counters.iter_mut() {
            *counter = 0;
        }
    }

    fn load_state(&mut self, state: &Value) -> Result<()> {
        let state: StarCounterState = params::decode_state(self.id(), state)?;
        params::import_star(&mut self.counters, &state.star_counter);
        Ok(())
    }

    fn export_state(&self) -> Option<Value> {
        let state = StarCounterState {
            star_counter: params::export_star(&self.counters),
        };
        params::encode_state(&state, self.counters.iter().all(|(_, c)| *c == 0))
    }

    fn describe(&self, width: usize) -> String {
        let stars: Vec<String> = self.stars().map(|s| s.to_string()).collect();
        [
            self.id().to_string(),
            "- tracked stars:".to_string(),
            format!("{:>width$}", stars.join(", "), width = width),
        ]
        .join("\n")
    }
}

/// One counter per (star tier, item type) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeStarCounterRule {
    counters: TypeStarTable<u32>,
}

#[derive(Default, Serialize, Deserialize)]
struct TypeStarCounterState {
    #[serde(default)]
    type_star_counter: BTreeMap<String, BTreeMap<String, u32>>,
}

impl TypeStarCounterRule {
    /// Track the given types under each tier.
    pub fn new(types_by_star: impl IntoIterator<Item = (Star, Vec<String>)>) -> Self {
        let counters = types_by_star
            .into_iter()
            .map(|(star, types)| (star, types.into_iter().map(|t| (t, 0)).collect()))
            .collect();
        Self { counters }
    }

    pub fn from_params(value: &Value) -> Result<Self> {
        let params = Params::new(RuleId::TypeStarCounter, value)?;
        let table: Vec<(Star, Vec<String>)> = params.star_table("type_star_dict")?;
        Ok(Self::new(table))
    }

    /// Counter for a (tier, type) pair, `None` if untracked.
    #[must_use]
    pub fn count(&self, star: Star, item_type: &str) -> Option<u32> {
        self.counters
            .iter()
            .find(|(s, _)| *s == star)
            .and_then(|(_, types)| types.iter().find(|(t, _)| t == item_type))
            .map(|(_, c)| *c)
    }

    /// Set a tracked pair's counter. Untracked pairs are ignored.
    pub fn set(&mut self, star: Star, item_type: &str, value: u32) {
        if let Some(types) = params::lookup_mut(&mut self.counters, star) {
            if let Some((_, counter)) = types.iter_mut().find(|(t, _)| t == item_type) {
                *counter = value;
            }
        }
    }

    /// Record one completed draw. Tiers other than `drawn` are untouched.
    pub fn record(&mut self, drawn: Star, item_type: &str) {
        let Some(types) = params::lookup_mut(&mut self.counters, drawn) else {
            return;
        };
        for (tracked, counter) in types.iter_mut() {
            *counter = if tracked == item_type { 0 } else { counter.saturating_add(1) };
        }
    }
}

impl DrawRule for TypeStarCounterRule {
    fn id(&self) -> RuleId {
        RuleId::TypeStarCounter
    }

    fn observe(&mut self, scope: &mut RuleScope<'_>) {
        let (star, item_type) = (scope.result.star, scope.result.item_type.as_str());
        self.record(star, item_type);
    }

    fn reset_counters(&mut self) {
        for (_, types) in self.counters.iter_mut() {
            for (_, counter) in types.iter_mut() {
                *counter = 0;
            }
        }
    }

    fn load_state(&mut self, state: &Value) -> Result<()> {
        let state: TypeStarCounterState = params::decode_state(self.id(), state)?;
        params::import_type_star(&mut self.counters, &state.type_star_counter);
        Ok(())
    }

    fn export_state(&self) -> Option<Value> {
        let is_default = self
            .counters
            .iter()
            .all(|(_, types)| types.iter().all(|(_, c)| *c == 0));
        let state = TypeStarCounterState {
            type_star_counter: params::export_type_star(&self.counters),
        };
        params::encode_state(&state, is_default)
    }

    fn describe(&self, width: usize) -> String {
        let mut lines = vec![self.id().to_string()];
        for (star, types) in &self.counters {
            let names: Vec<&str> = types.iter().map(|(t, _)| t.as_str()).collect();
            lines.push(format!("- tracked types at star {}:", star));
            lines.push(format!("{:>width$}", names.join(", "), width = width));
        }
        lines.join("\n")
    }
}
