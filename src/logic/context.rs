//! Per-draw scratchpad and the rule bridge.
//!
//! The bridge maps rule identifiers to positions in the pipeline. It is built
//! once when the pipeline is constructed. During a phase, the rule being run
//! is split out of the rule list and the remaining rules are handed to it as
//! [`Peers`], so a rule can read or adjust another rule's counters without
//! shared ownership.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use crate::core::{DrawResult, RandomSource, ResolvedItem, Result, WishError};
use crate::rules::{
    DrawRule, Rule, RuleId, StarCounterRule, StarProbabilityRule, TypeStarCounterRule, UpRule,
};

/// Rule identifier -> pipeline position.
#[derive(Clone, Debug, Default)]
pub struct Bridge {
    positions: FxHashMap<RuleId, usize>,
}

impl Bridge {
    /// Register every rule. Each identifier may appear once.
    pub fn build(rules: &[Rule]) -> Result<Self> {
        let mut positions = FxHashMap::default();
        for (position, rule) in rules.iter().enumerate() {
            if positions.insert(rule.id(), position).is_some() {
                return Err(WishError::DuplicateRule(rule.id()));
            }
        }
        Ok(Self { positions })
    }

    /// Position of a registered rule.
    #[must_use]
    pub fn position(&self, id: RuleId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: RuleId) -> bool {
        self.positions.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Shared state for the draw in progress.
#[derive(Clone, Debug, Default)]
pub struct DrawContext {
    /// Decision being built by the decide phase.
    pub result: DrawResult,
    /// Concrete item, set just before the observe phase.
    pub resolved: Option<ResolvedItem>,
    /// Rule lookup table, fixed after construction.
    pub bridge: Bridge,
}

impl DrawContext {
    pub fn new(bridge: Bridge) -> Self {
        Self {
            result: DrawResult::new(),
            resolved: None,
            bridge,
        }
    }

    /// Clear the per-draw fields. The bridge is kept.
    pub fn clear(&mut self) {
        self.result = DrawResult::new();
        self.resolved = None;
    }
}

/// The other rules of the pipeline, as seen from one rule.
pub struct Peers<'a> {
    position: usize,
    before: &'a mut [Rule],
    after: &'a mut [Rule],
    bridge: &'a Bridge,
}

impl<'a> Peers<'a> {
    /// Split `rules` around `position`.
    pub(crate) fn split(rules: &'a mut [Rule], position: usize, bridge: &'a Bridge) -> Option<(&'a mut Rule, Self)> {
        if position >= rules.len() {
            return None;
        }
        let (before, rest) = rules.split_at_mut(position);
        let (current, after) = rest.split_first_mut()?;
        Some((
            current,
            Self {
                position,
                before,
                after,
                bridge,
            },
        ))
    }

    /// No peers at all. Useful for driving a single rule in isolation.
    pub fn none(bridge: &'a Bridge) -> Self {
        Self {
            position: 0,
            before: &mut [],
            after: &mut [],
            bridge,
        }
    }

    fn get(&self, id: RuleId) -> Option<&Rule> {
        let position = self.bridge.position(id)?;
        match position.cmp(&self.position) {
            Ordering::Less => self.before.get(position),
            Ordering::Greater => self.after.get(position - self.position - 1),
            Ordering::Equal => None,
        }
    }

    fn get_mut(&mut self, id: RuleId) -> Option<&mut Rule> {
        let position = self.bridge.position(id)?;
        match position.cmp(&self.position) {
            Ordering::Less => self.before.get_mut(position),
            Ordering::Greater => self.after.get_mut(position - self.position - 1),
            Ordering::Equal => None,
        }
    }

    pub fn star_counter(&mut self) -> Option<&mut StarCounterRule> {
        match self.get_mut(RuleId::StarCounter)? {
            Rule::StarCounter(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn type_star_counter(&mut self) -> Option<&mut TypeStarCounterRule> {
        match self.get_mut(RuleId::TypeStarCounter)? {
            Rule::TypeStarCounter(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn star_probability(&mut self) -> Option<&mut StarProbabilityRule> {
        match self.get_mut(RuleId::StarProbability)? {
            Rule::StarProbability(rule) => Some(rule),
            _ => None,
        }
    }

    /// Read-only: other rules only inspect the featured pity flags.
    pub fn up(&self) -> Option<&UpRule> {
        match self.get(RuleId::Up)? {
            Rule::Up(rule) => Some(rule),
            _ => None,
        }
    }
}

/// Everything a rule sees while one phase runs.
pub struct RuleScope<'a> {
    pub result: &'a mut DrawResult,
    pub resolved: Option<&'a ResolvedItem>,
    pub rng: &'a mut dyn RandomSource,
    pub peers: Peers<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{FesRule, StarCounterRule};

    fn rules() -> Vec<Rule> {
        vec![
            StarCounterRule::new([5, 4]).into(),
            FesRule::new(vec![(5, 5000)]).unwrap().into(),
            UpRule::new(vec![(5, 5000)], vec![(5, 1)]).unwrap().into(),
        ]
    }

    #[test]
    fn test_bridge_positions() {
        let rules = rules();
        let bridge = Bridge::build(&rules).unwrap();
        assert_eq!(bridge.len(), 3);
        assert_eq!(bridge.position(RuleId::StarCounter), Some(0));
        assert_eq!(bridge.position(RuleId::Up), Some(2));
        assert!(!bridge.contains(RuleId::Appoint));
    }

    #[test]
    fn test_bridge_rejects_duplicates() {
        let mut rules = rules();
        rules.push(StarCounterRule::new([3]).into());
        assert_eq!(
            Bridge::build(&rules).unwrap_err(),
            WishError::DuplicateRule(RuleId::StarCounter)
        );
    }

    #[test]
    fn test_peers_see_both_sides() {
        let mut rules = rules();
        let bridge = Bridge::build(&rules).unwrap();

        let (current, mut peers) = Peers::split(&mut rules, 1, &bridge).unwrap();
        assert_eq!(current.id(), RuleId::Fes);
        assert!(peers.star_counter().is_some());
        assert!(peers.up().is_some());
        assert!(peers.star_probability().is_none());
    }

    #[test]
    fn test_peers_exclude_self() {
        let mut rules = rules();
        let bridge = Bridge::build(&rules).unwrap();

        let (current, mut peers) = Peers::split(&mut rules, 0, &bridge).unwrap();
        assert_eq!(current.id(), RuleId::StarCounter);
        assert!(peers.star_counter().is_none());
    }

    #[test]
    fn test_split_out_of_range() {
        let mut rules = rules();
        let bridge = Bridge::build(&rules).unwrap();
        assert!(Peers::split(&mut rules, 3, &bridge).is_none());
    }

    #[test]
    fn test_context_clear_keeps_bridge() {
        let rules = rules();
        let mut ctx = DrawContext::new(Bridge::build(&rules).unwrap());
        ctx.result = DrawResult::with_star(5);
        ctx.clear();
        assert_eq!(ctx.result, DrawResult::new());
        assert!(ctx.resolved.is_none());
        assert_eq!(ctx.bridge.len(), 3);
    }
}
