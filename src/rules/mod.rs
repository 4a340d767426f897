//! Rule units.
//!
//! A rule is one piece of draw mechanic: a counter, a probability table, a
//! pity threshold, a featured boost. Pipelines run rules in configured order;
//! each rule owns its own counters and reaches other rules only through the
//! bridge in [`RuleScope`].
//!
//! ## Phases
//!
//! - `decide`: read and write the shared [`DrawResult`](crate::core::DrawResult)
//! - `observe`: update counters once the concrete item is known
//! - `reset_counters`: zero counters and flags, keep configuration
//! - `load_state` / `export_state`: persisted counter transfer

mod appoint;
mod capture;
mod counter;
mod params;
mod pity;
mod probability;
mod ramp;
mod up;

pub use appoint::AppointRule;
pub use capture::{CapturePityRule, CaptureRule};
pub use counter::{StarCounterRule, TypeStarCounterRule};
pub use pity::{StarPityRule, TypeStarPityRule};
pub use probability::{StarProbabilityRule, TypeStarProbabilityRule};
pub use ramp::{Ramp, StarProbabilityIncreaseRule, StarProbabilityIntervalIncreaseRule};
pub use up::{FesRule, UpRule, UpTypeRule};

use serde_json::Value;

use crate::core::{Result, WishError};
use crate::logic::RuleScope;

/// Stable rule identifier, used as bridge key and state key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleId {
    StarCounter,
    TypeStarCounter,
    StarProbability,
    TypeStarProbability,
    StarPity,
    TypeStarPity,
    Up,
    UpType,
    StarProbabilityIncrease,
    StarProbabilityIntervalIncrease,
    Fes,
    Appoint,
    Capture,
    CapturePity,
}

impl RuleId {
    pub const ALL: [RuleId; 14] = [
        RuleId::StarCounter,
        RuleId::TypeStarCounter,
        RuleId::StarProbability,
        RuleId::TypeStarProbability,
        RuleId::StarPity,
        RuleId::TypeStarPity,
        RuleId::Up,
        RuleId::UpType,
        RuleId::StarProbabilityIncrease,
        RuleId::StarProbabilityIntervalIncrease,
        RuleId::Fes,
        RuleId::Appoint,
        RuleId::Capture,
        RuleId::CapturePity,
    ];

    /// Identifier as written in configuration and persisted state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RuleId::StarCounter => "StarCounterRule",
            RuleId::TypeStarCounter => "TypeStarCounterRule",
            RuleId::StarProbability => "StarProbabilityRule",
            RuleId::TypeStarProbability => "TypeStarProbabilityRule",
            RuleId::StarPity => "StarPityRule",
            RuleId::TypeStarPity => "TypeStarPityRule",
            RuleId::Up => "UpRule",
            RuleId::UpType => "UpTypeRule",
            RuleId::StarProbabilityIncrease => "StarProbabilityIncreaseRule",
            RuleId::StarProbabilityIntervalIncrease => "StarProbabilityIntervalIncreaseRule",
            RuleId::Fes => "FesRule",
            RuleId::Appoint => "AppointRule",
            RuleId::Capture => "CaptureRule",
            RuleId::CapturePity => "CapturePityRule",
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RuleId {
    type Err = WishError;

    fn from_str(s: &str) -> Result<Self> {
        RuleId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| WishError::UnknownRule(s.to_string()))
    }
}

/// Capabilities shared by every rule.
///
/// Phases a rule does not take part in keep the default no-op.
pub trait DrawRule {
    /// Identifier of this rule.
    fn id(&self) -> RuleId;

    /// Contribute to the draw decision.
    fn decide(&mut self, _scope: &mut RuleScope<'_>) -> Result<()> {
        Ok(())
    }

    /// Update counters after the concrete item is known.
    fn observe(&mut self, _scope: &mut RuleScope<'_>) {}

    /// Zero all counters and flags.
    fn reset_counters(&mut self) {}

    /// Restore counters from this rule's persisted sub-mapping.
    fn load_state(&mut self, _state: &Value) -> Result<()> {
        Ok(())
    }

    /// Persisted sub-mapping, or `None` when every counter is at its default.
    fn export_state(&self) -> Option<Value> {
        None
    }

    /// Human-readable summary of the configuration.
    fn describe(&self, width: usize) -> String;
}

/// Any configured rule.
///
/// Closed over the fixed rule set so pipelines clone by value and the bridge
/// can hand out typed views of peer rules.
#[derive(Clone, Debug)]
pub enum Rule {
    StarCounter(StarCounterRule),
    TypeStarCounter(TypeStarCounterRule),
    StarProbability(StarProbabilityRule),
    TypeStarProbability(TypeStarProbabilityRule),
    StarPity(StarPityRule),
    TypeStarPity(TypeStarPityRule),
    Up(UpRule),
    UpType(UpTypeRule),
    StarProbabilityIncrease(StarProbabilityIncreaseRule),
    StarProbabilityIntervalIncrease(StarProbabilityIntervalIncreaseRule),
    Fes(FesRule),
    Appoint(AppointRule),
    Capture(CaptureRule),
    CapturePity(CapturePityRule),
}

macro_rules! dispatch {
    ($rule:expr, $inner:ident => $body:expr) => {
        match $rule {
            Rule::StarCounter($inner) => $body,
            Rule::TypeStarCounter($inner) => $body,
            Rule::StarProbability($inner) => $body,
            Rule::TypeStarProbability($inner) => $body,
            Rule::StarPity($inner) => $body,
            Rule::TypeStarPity($inner) => $body,
            Rule::Up($inner) => $body,
            Rule::UpType($inner) => $body,
            Rule::StarProbabilityIncrease($inner) => $body,
            Rule::StarProbabilityIntervalIncrease($inner) => $body,
            Rule::Fes($inner) => $body,
            Rule::Appoint($inner) => $body,
            Rule::Capture($inner) => $body,
            Rule::CapturePity($inner) => $body,
        }
    };
}

impl Rule {
    /// Build a rule from its identifier and JSON parameters.
    pub fn from_config(id: RuleId, params: &Value) -> Result<Self> {
        Ok(match id {
            RuleId::StarCounter => StarCounterRule::from_params(params)?.into(),
            RuleId::TypeStarCounter => TypeStarCounterRule::from_params(params)?.into(),
            RuleId::StarProbability => StarProbabilityRule::from_params(params)?.into(),
            RuleId::TypeStarProbability => TypeStarProbabilityRule::from_params(params)?.into(),
            RuleId::StarPity => StarPityRule::from_params(params)?.into(),
            RuleId::TypeStarPity => TypeStarPityRule::from_params(params)?.into(),
            RuleId::Up => UpRule::from_params(params)?.into(),
            RuleId::UpType => UpTypeRule::from_params(params)?.into(),
            RuleId::StarProbabilityIncrease => StarProbabilityIncreaseRule::from_params(params)?.into(),
            RuleId::StarProbabilityIntervalIncrease => {
                StarProbabilityIntervalIncreaseRule::from_params(params)?.into()
            }
            RuleId::Fes => FesRule::from_params(params)?.into(),
            RuleId::Appoint => AppointRule::from_params(params)?.into(),
            RuleId::Capture => CaptureRule::from_params(params)?.into(),
            RuleId::CapturePity => CapturePityRule::from_params(params)?.into(),
        })
    }
}

impl DrawRule for Rule {
    fn id(&self) -> RuleId {
        dispatch!(self, rule => rule.id())
    }

    fn decide(&mut self, scope: &mut RuleScope<'_>) -> Result<()> {
        dispatch!(self, rule => rule.decide(scope))
    }

    fn observe(&mut self, scope: &mut RuleScope<'_>) {
        dispatch!(self, rule => rule.observe(scope))
    }

    fn reset_counters(&mut self) {
        dispatch!(self, rule => rule.reset_counters())
    }

    fn load_state(&mut self, state: &Value) -> Result<()> {
        dispatch!(self, rule => rule.load_state(state))
    }

    fn export_state(&self) -> Option<Value> {
        dispatch!(self, rule => rule.export_state())
    }

    fn describe(&self, width: usize) -> String {
        dispatch!(self, rule => rule.describe(width))
    }
}

macro_rules! impl_from_rule {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Rule {
                fn from(rule: $ty) -> Self {
                    Rule::$variant(rule)
                }
            }
        )*
    };
}

impl_from_rule!(
    StarCounter(StarCounterRule),
    TypeStarCounter(TypeStarCounterRule),
    StarProbability(StarProbabilityRule),
    TypeStarProbability(TypeStarProbabilityRule),
    StarPity(StarPityRule),
    TypeStarPity(TypeStarPityRule),
    Up(UpRule),
    UpType(UpTypeRule),
    StarProbabilityIncrease(StarProbabilityIncreaseRule),
    StarProbabilityIntervalIncrease(StarProbabilityIntervalIncreaseRule),
    Fes(FesRule),
    Appoint(AppointRule),
    Capture(CaptureRule),
    CapturePity(CapturePityRule),
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_id_round_trip() {
        for id in RuleId::ALL {
            let parsed: RuleId = id.as_str().parse().unwrap();
            assert_eq!(parsed, id);
        }
    }

    #[test]
    fn test_unknown_rule_id() {
        let err = "LuckyRule".parse::<RuleId>().unwrap_err();
        assert_eq!(err, WishError::UnknownRule("LuckyRule".into()));
    }

    #[test]
    fn test_from_config_dispatches() {
        let rule = Rule::from_config(RuleId::StarCounter, &json!({ "star_list": [5, 4] })).unwrap();
        assert_eq!(rule.id(), RuleId::StarCounter);
        assert!(matches!(rule, Rule::StarCounter(_)));

        let rule = Rule::from_config(RuleId::Fes, &json!({ "fes_probability": { "3": 5000 } })).unwrap();
        assert_eq!(rule.id(), RuleId::Fes);
    }

    #[test]
    fn test_from_config_missing_param() {
        let err = Rule::from_config(RuleId::Up, &json!({ "up_probability": { "5": 5000 } })).unwrap_err();
        assert_eq!(
            err,
            WishError::MissingParameter {
                rule: RuleId::Up,
                param: "up_pity"
            }
        );
    }
}
