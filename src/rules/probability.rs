//! Base probability tables for star tier and item type.

use serde_json::Value;
use tracing::debug;

use crate::core::{choose_weighted, normalize_weights, weight_to_percent, Result, Star, WishError};
use crate::logic::RuleScope;

use super::params::{self, Params, StarTable, TypeStarTable};
use super::{DrawRule, RuleId};

/// Weighted star choice.
///
/// Keeps a live copy of the base table that ramp rules may raise for the
/// current draw. The live table is restored after every draw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StarProbabilityRule {
    base: StarTable<u32>,
    live: StarTable<u32>,
}

impl StarProbabilityRule {
    pub fn new(weights: StarTable<u32>) -> Result<Self> {
        params::check_probabilities(RuleId::StarProbability, "star_probability", &weights)?;
        params::check_total(RuleId::StarProbability, "star_probability", None, weights.iter().map(|(_, w)| *w))?;
        Ok(Self {
            live: weights.clone(),
            base: weights,
        })
    }

    pub fn from_params(value: &Value) -> Result<Self> {
        let params = Params::new(RuleId::StarProbability, value)?;
        Self::new(params.star_table("star_probability")?)
    }

    /// Configured weights.
    #[must_use]
    pub fn base_weights(&self) -> &[(Star, u32)] {
        &self.base
    }

    /// Weights in effect for the draw being decided.
    #[must_use]
    pub fn live_weights(&self) -> &[(Star, u32)] {
        &self.live
    }

    #[must_use]
    pub fn live_weight(&self, star: Star) -> Option<u32> {
        params::lookup(&self.live, star)
    }

    /// Raise a tier's live weight. Returns `false` if the tier is not in the table.
    pub fn add_weight(&mut self, star: Star, increment: u64) -> bool {
        match params::lookup_mut(&mut self.live, star) {
            Some(weight) => {
                let raised = u64::from(*weight).saturating_add(increment);
                *weight = u32::try_from(raised).unwrap_or(u32::MAX);
                true
            }
            None => false,
        }
    }

    /// Clamp live weights to the 10000-unit budget in table order.
    pub fn normalize(&mut self) {
        normalize_weights(&mut self.live);
    }

    fn restore(&mut self) {
        self.live.clone_from(&self.base);
    }
}

impl DrawRule for StarProbabilityRule {
    fn id(&self) -> RuleId {
        RuleId::StarProbability
    }

    fn decide(&mut self, scope: &mut RuleScope<'_>) -> Result<()> {
        if scope.result.has_star() {
            return Ok(());
        }
        let star = *choose_weighted(scope.rng, &self.live)?;
        debug!(star, live = ?self.live, "star chosen by probability");
        scope.result.star = star;
        Ok(())
    }

    fn observe(&mut self, _scope: &mut RuleScope<'_>) {
        self.restore();
    }

    fn reset_counters(&mut self) {
        self.restore();
    }

    fn describe(&self, width: usize) -> String {
        let mut lines = vec![self.id().to_string()];
        lines.extend(params::describe_rows(
            "base star probability",
            self.base.iter().map(|(star, w)| (star.to_string(), weight_to_percent(*w))),
            width,
        ));
        lines.join("\n")
    }
}

/// Weighted type choice within an already decided star tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeStarProbabilityRule {
    weights: TypeStarTable<u32>,
}

impl TypeStarProbabilityRule {
    pub fn new(weights: TypeStarTable<u32>) -> Result<Self> {
        for (star, types) in &weights {
            if types.is_empty() {
                continue;
            }
            params::check_total(
                RuleId::TypeStarProbability,
                "type_probability",
                Some(*star),
                types.iter().map(|(_, w)| *w),
            )?;
        }
        Ok(Self { weights })
    }

    pub fn from_params(value: &Value) -> Result<Self> {
        let params = Params::new(RuleId::TypeStarProbability, value)?;
        Self::new(params.type_star_table("type_probability")?)
    }
}

impl DrawRule for TypeStarProbabilityRule {
    fn id(&self) -> RuleId {
        RuleId::TypeStarProbability
    }

    fn decide(&mut self, scope: &mut RuleScope<'_>) -> Result<()> {
        if !scope.result.has_star() || scope.result.has_type() {
            return Ok(());
        }
        let Some(types) = params::lookup_ref(&self.weights, scope.result.star) else {
            return Ok(());
        };
        if types.is_empty() {
            return Ok(());
        }
        let item_type = choose_weighted(scope.rng, types).map_err(|_| {
            WishError::invalid(self.id(), "type_probability", format!("no weight for star {}", scope.result.star))
        })?;
        scope.result.item_type = item_type.clone();
        Ok(())
    }

    fn describe(&self, width: usize) -> String {
        let mut lines = vec![self.id().to_string()];
        for (star, types) in &self.weights {
            lines.extend(params::describe_rows(
                &format!("type probability at star {}", star),
                types.iter().map(|(t, w)| (t.clone(), weight_to_percent(*w))),
                width,
            ));
        }
        lines.join("\n")
    }
}
