//! Hard pity on star tier and on item type.
//!
//! Thresholds are scanned in configuration order and the first one reached
//! wins. Pity rules override whatever was decided before them, so they belong
//! ahead of the probability rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::{DrawResult, Result, Star};
use crate::logic::RuleScope;

use super::params::{self, Params, StarTable, TypeStarTable};
use super::{DrawRule, RuleId};

/// Guarantees a tier once its star counter reaches a threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StarPityRule {
    thresholds: StarTable<u32>,
    /// Which tier pity fired this draw.
    triggered: StarTable<bool>,
    reset_lower_pity: bool,
}

#[derive(Default, Serialize, Deserialize)]
struct StarPityState {
    #[serde(default)]
    is_pity: BTreeMap<String, bool>,
}

impl StarPityRule {
    pub fn new(thresholds: StarTable<u32>) -> Result<Self> {
        params::check_thresholds(RuleId::StarPity, "star_pity", &thresholds)?;
        let triggered = thresholds.iter().map(|(star, _)| (*star, false)).collect();
        Ok(Self {
            thresholds,
            triggered,
            reset_lower_pity: false,
        })
    }

    /// Reaching pity on a tier also zeros lower tiers' counters (builder pattern).
    #[must_use]
    pub fn with_reset_lower_pity(mut self, reset: bool) -> Self {
        self.reset_lower_pity = reset;
        self
    }

    pub fn from_params(value: &Value) -> Result<Self> {
        let params = Params::new(RuleId::StarPity, value)?;
        Ok(Self::new(params.star_table("star_pity")?)?.with_reset_lower_pity(params.flag("reset_lower_pity")?))
    }

    /// Did pity decide the tier of the current draw?
    #[must_use]
    pub fn is_pity(&self, star: Star) -> bool {
        params::lookup(&self.triggered, star).unwrap_or(false)
    }

    /// The tier pity fired for in the current draw, if any.
    #[must_use]
    pub fn triggered_star(&self) -> Option<Star> {
        self.triggered.iter().find(|(_, fired)| *fired).map(|(star, _)| *star)
    }

    fn clear_flags(&mut self) {
        for (_, fired) in self.triggered.iter_mut() {
            *fired = false;
        }
    }
}

impl DrawRule for StarPityRule {
    fn id(&self) -> RuleId {
        RuleId::StarPity
    }

    fn decide(&mut self, scope: &mut RuleScope<'_>) -> Result<()> {
        self.clear_flags();

        let Some(counter) = scope.peers.star_counter() else {
            return Ok(());
        };
        for (star, threshold) in &self.thresholds {
            let draw = counter.count(*star).unwrap_or(0).saturating_add(1);
            if draw >= *threshold {
                debug!(star, draw, "star pity reached");
                *scope.result = DrawResult::with_star(*star);
                counter.set(*star, 0);
                if let Some(fired) = params::lookup_mut(&mut self.triggered, *star) {
                    *fired = true;
                }
                return Ok(());
            }
        }
        Ok(())
    }

    fn observe(&mut self, scope: &mut RuleScope<'_>) {
        if !self.reset_lower_pity || self.triggered_star().is_none() {
            return;
        }
        let drawn = scope.result.star;
        if let Some(counter) = scope.peers.star_counter() {
            counter.zero_below(drawn);
        }
    }

    fn reset_counters(&mut self) {
        self.clear_flags();
    }

    fn load_state(&mut self, state: &Value) -> Result<()> {
        let state: StarPityState = params::decode_state(self.id(), state)?;
        params::import_star(&mut self.triggered, &state.is_pity);
        Ok(())
    }

    fn export_state(&self) -> Option<Value> {
        let state = StarPityState {
            is_pity: params::export_star(&self.triggered),
        };
        params::encode_state(&state, self.triggered_star().is_none())
    }

    fn describe(&self, width: usize) -> String {
        let mut lines = vec![self.id().to_string()];
        lines.extend(params::describe_rows(
            "star pity thresholds",
            self.thresholds.iter().map(|(star, t)| (star.to_string(), t.to_string())),
            width,
        ));
        if self.reset_lower_pity {
            lines.push("- pity resets lower stars".to_string());
        }
        lines.join("\n")
    }
}

/// Guarantees an item type within a decided tier.
///
/// Compares the raw type counter against the threshold (no `+ 1`): the type
/// counter is updated after the star is known, unlike the star counter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeStarPityRule {
    thresholds: TypeStarTable<u32>,
    triggered: TypeStarTable<bool>,
}

#[derive(Default, Serialize, Deserialize)]
struct TypeStarPityState {
    #[serde(default)]
    is_pity: BTreeMap<String, BTreeMap<String, bool>>,
}

impl TypeStarPityRule {
    pub fn new(thresholds: TypeStarTable<u32>) -> Self {
        let triggered = thresholds
            .iter()
            .map(|(star, types)| (*star, types.iter().map(|(t, _)| (t.clone(), false)).collect()))
            .collect();
        Self { thresholds, triggered }
    }

    pub fn from_params(value: &Value) -> Result<Self> {
        let params = Params::new(RuleId::TypeStarPity, value)?;
        Ok(Self::new(params.type_star_table("type_pity")?))
    }

    #[must_use]
    pub fn is_pity(&self, star: Star, item_type: &str) -> bool {
        params::lookup_ref(&self.triggered, star)
            .and_then(|types| types.iter().find(|(t, _)| t == item_type))
            .is_some_and(|(_, fired)| *fired)
    }

    fn clear_flags(&mut self) {
        for (_, types) in self.triggered.iter_mut() {
            for (_, fired) in types.iter_mut() {
                *fired = false;
            }
        }
    }

    fn any_triggered(&self) -> bool {
        self.triggered.iter().any(|(_, types)| types.iter().any(|(_, fired)| *fired))
    }
}

impl DrawRule for TypeStarPityRule {
    fn id(&self) -> RuleId {
        RuleId::TypeStarPity
    }

    fn decide(&mut self, scope: &mut RuleScope<'_>) -> Result<()> {
        self.clear_flags();

        let star = scope.result.star;
        if star == 0 {
            return Ok(());
        }
        let Some(thresholds) = params::lookup_ref(&self.thresholds, star) else {
            return Ok(());
        };
        let Some(counter) = scope.peers.type_star_counter() else {
            return Ok(());
        };

        // A type forced earlier counts as this type's pity being spent.
        if scope.result.has_type() {
            counter.set(star, &scope.result.item_type, 0);
            return Ok(());
        }

        for (item_type, threshold) in thresholds {
            if counter.count(star, item_type).unwrap_or(0) >= *threshold {
                debug!(star, item_type = item_type.as_str(), "type pity reached");
                scope.result.item_type = item_type.clone();
                counter.set(star, item_type, 0);
                if let Some((_, fired)) = params::lookup_mut(&mut self.triggered, star)
                    .and_then(|types| types.iter_mut().find(|(t, _)| t == item_type))
                {
                    *fired = true;
                }
                return Ok(());
            }
        }
        Ok(())
    }

    fn reset_counters(&mut self) {
        self.clear_flags();
    }

    fn load_state(&mut self, state: &Value) -> Result<()> {
        let state: TypeStarPityState = params::decode_state(self.id(), state)?;
        params::import_type_star(&mut self.triggered, &state.is_pity);
        Ok(())
    }

    fn export_state(&self) -> Option<Value> {
        let state = TypeStarPityState {
            is_pity: params::export_type_star(&self.triggered),
        };
        params::encode_state(&state, !self.any_triggered())
    }

    fn describe(&self, width: usize) -> String {
        let mut lines = vec![self.id().to_string()];
        for (star, types) in &self.thresholds {
            lines.extend(params::describe_rows(
                &format!("type pity thresholds at star {}", star),
                types.iter().map(|(t, v)| (t.clone(), v.to_string())),
                width,
            ));
        }
        lines.join("\n")
    }
}
