//! Pipeline ordering checks.
//!
//! Rules only see what earlier rules decided, so several mechanics silently
//! do nothing when listed in the wrong place. These checks report such
//! pipelines. They never reorder anything.

use std::fmt;

use crate::rules::RuleId;

use super::Bridge;

/// A configuration-order hazard found at pipeline construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderingWarning {
    /// `rule` runs after `anchor` but has to run before it.
    RunsAfter { rule: RuleId, anchor: RuleId },
    /// `rule` runs before `anchor` but has to run after it.
    RunsBefore { rule: RuleId, anchor: RuleId },
    /// `rule` reads `dependency`, which is not in the pipeline.
    MissingDependency { rule: RuleId, dependency: RuleId },
}

impl fmt::Display for OrderingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderingWarning::RunsAfter { rule, anchor } => {
                write!(f, "{} runs after {} and has no effect on its decision", rule, anchor)
            }
            OrderingWarning::RunsBefore { rule, anchor } => {
                write!(f, "{} runs before {} and never sees its outcome", rule, anchor)
            }
            OrderingWarning::MissingDependency { rule, dependency } => {
                write!(f, "{} depends on {}, which is not configured", rule, dependency)
            }
        }
    }
}

/// Rules that must run before the anchor.
const BEFORE: &[(RuleId, RuleId)] = &[
    (RuleId::StarPity, RuleId::StarProbability),
    (RuleId::StarProbabilityIncrease, RuleId::StarProbability),
    (RuleId::StarProbabilityIntervalIncrease, RuleId::StarProbability),
    (RuleId::TypeStarPity, RuleId::TypeStarProbability),
    (RuleId::Capture, RuleId::Up),
    (RuleId::CapturePity, RuleId::Up),
];

/// Rules that must run after the anchor.
const AFTER: &[(RuleId, RuleId)] = &[
    (RuleId::Fes, RuleId::Up),
    (RuleId::Appoint, RuleId::Up),
    (RuleId::UpType, RuleId::Up),
];

/// Peers a rule reads through the bridge.
const DEPENDS: &[(RuleId, RuleId)] = &[
    (RuleId::StarPity, RuleId::StarCounter),
    (RuleId::StarProbabilityIncrease, RuleId::StarCounter),
    (RuleId::StarProbabilityIntervalIncrease, RuleId::StarCounter),
    (RuleId::StarProbabilityIncrease, RuleId::StarProbability),
    (RuleId::StarProbabilityIntervalIncrease, RuleId::StarProbability),
    (RuleId::TypeStarPity, RuleId::TypeStarCounter),
    (RuleId::CapturePity, RuleId::Up),
];

/// Every ordering hazard of a pipeline, in a stable order.
#[must_use]
pub fn check_order(bridge: &Bridge) -> Vec<OrderingWarning> {
    let mut warnings = Vec::new();

    for &(rule, anchor) in BEFORE {
        if let (Some(r), Some(a)) = (bridge.position(rule), bridge.position(anchor)) {
            if r > a {
                warnings.push(OrderingWarning::RunsAfter { rule, anchor });
            }
        }
    }
    for &(rule, anchor) in AFTER {
        if let (Some(r), Some(a)) = (bridge.position(rule), bridge.position(anchor)) {
            if r < a {
                warnings.push(OrderingWarning::RunsBefore { rule, anchor });
            }
        }
    }
    for &(rule, dependency) in DEPENDS {
        if bridge.contains(rule) && !bridge.contains(dependency) {
            warnings.push(OrderingWarning::MissingDependency { rule, dependency });
        }
    }

    warnings
}
