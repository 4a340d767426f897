//! Soft-pity ramps on top of [`StarProbabilityRule`].
//!
//! A ramp raises a tier's live weight once its star counter reaches a
//! starting draw number, then renormalizes the live table. Ramps only take
//! effect when they run before the probability rule, since the live table is
//! restored after every draw.

use serde_json::Value;
use tracing::debug;

use crate::core::{weight_to_percent, Result, Star};
use crate::logic::{Peers, RuleScope};

use super::params::{self, Params, StarTable};
use super::{DrawRule, RuleId, StarProbabilityRule};

/// One ramp segment: from draw `start`, add `increment` per draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ramp {
    pub start: u32,
    pub increment: u32,
}

impl Ramp {
    #[must_use]
    pub const fn new(start: u32, increment: u32) -> Self {
        Self { start, increment }
    }

    /// Extra weight at draw number `draw`, or `None` before the start.
    #[must_use]
    pub fn bonus(self, draw: u64) -> Option<u64> {
        let start = u64::from(self.start);
        if draw < start {
            return None;
        }
        Some((draw - start + 1).saturating_mul(u64::from(self.increment)))
    }
}

/// Current draw number for a tier: its star counter plus one.
///
/// `None` when no star counter tracks the tier.
fn draw_number(peers: &mut Peers<'_>, star: Star) -> Option<u64> {
    let count = peers.star_counter()?.count(star)?;
    Some(u64::from(count) + 1)
}

fn apply(probability: &mut StarProbabilityRule, star: Star, bonus: u64) {
    if !probability.add_weight(star, bonus) {
        debug!(star, "ramp targets a star missing from the probability table");
    }
}

/// Single linear ramp per tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StarProbabilityIncreaseRule {
    ramps: StarTable<Ramp>,
}

impl StarProbabilityIncreaseRule {
    pub fn new(ramps: StarTable<Ramp>) -> Self {
        Self { ramps }
    }

    pub fn from_params(value: &Value) -> Result<Self> {
        let params = Params::new(RuleId::StarProbabilityIncrease, value)?;
        let table: StarTable<(u32, u32)> = params.star_table("star_increase")?;
        Ok(Self::new(
            table
                .into_iter()
                .map(|(star, (start, increment))| (star, Ramp::new(start, increment)))
                .collect(),
        ))
    }
}

impl DrawRule for StarProbabilityIncreaseRule {
    fn id(&self) -> RuleId {
        RuleId::StarProbabilityIncrease
    }

    fn decide(&mut self, scope: &mut RuleScope<'_>) -> Result<()> {
        let draws: Vec<Option<u64>> = self
            .ramps
            .iter()
            .map(|(star, _)| draw_number(&mut scope.peers, *star))
            .collect();
        let Some(probability) = scope.peers.star_probability() else {
            return Ok(());
        };
        for ((star, ramp), draw) in self.ramps.iter().zip(draws) {
            if let Some(bonus) = draw.and_then(|draw| ramp.bonus(draw)) {
                apply(probability, *star, bonus);
            }
        }
        probability.normalize();
        Ok(())
    }

    fn describe(&self, width: usize) -> String {
        let mut lines = vec![self.id().to_string()];
        lines.extend(params::describe_rows(
            "ramp start and increment",
            self.ramps
                .iter()
                .map(|(star, r)| (star.to_string(), format!("{} : {}", r.start, weight_to_percent(r.increment)))),
            width,
        ));
        lines.join("\n")
    }
}

/// Piecewise ramp: ordered segments, each adding on top of the previous.
///
/// Evaluation stops at the first segment whose start is not reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StarProbabilityIntervalIncreaseRule {
    segments: StarTable<Vec<Ramp>>,
}

impl StarProbabilityIntervalIncreaseRule {
    pub fn new(segments: StarTable<Vec<Ramp>>) -> Self {
        Self { segments }
    }

    pub fn from_params(value: &Value) -> Result<Self> {
        let params = Params::new(RuleId::StarProbabilityIntervalIncrease, value)?;
        let table: StarTable<Vec<(u32, u32)>> = params.star_table("star_increase")?;
        Ok(Self::new(
            table
                .into_iter()
                .map(|(star, segments)| (star, segments.into_iter().map(|(s, i)| Ramp::new(s, i)).collect()))
                .collect(),
        ))
    }

    /// Total bonus for a tier at draw number `draw`.
    fn bonus(segments: &[Ramp], draw: u64) -> u64 {
        segments
            .iter()
            .map_while(|ramp| ramp.bonus(draw))
            .fold(0u64, u64::saturating_add)
    }
}

impl DrawRule for StarProbabilityIntervalIncreaseRule {
    fn id(&self) -> RuleId {
        RuleId::StarProbabilityIntervalIncrease
    }

    fn decide(&mut self, scope: &mut RuleScope<'_>) -> Result<()> {
        let draws: Vec<Option<u64>> = self
            .segments
            .iter()
            .map(|(star, _)| draw_number(&mut scope.peers, *star))
            .collect();
        let Some(probability) = scope.peers.star_probability() else {
            return Ok(());
        };
        for ((star, segments), draw) in self.segments.iter().zip(draws) {
            let Some(draw) = draw else {
                continue;
            };
            let bonus = Self::bonus(segments, draw);
            if bonus > 0 {
                apply(probability, *star, bonus);
            }
        }
        probability.normalize();
        Ok(())
    }

    fn describe(&self, width: usize) -> String {
        let mut lines = vec![self.id().to_string(), "- ramp segments:".to_string()];
        for (star, segments) in &self.segments {
            lines.push(format!("  - {}:", star));
            for ramp in segments {
                lines.push(format!(
                    "{:>width$}",
                    format!("{} : {}", ramp.start, weight_to_percent(ramp.increment)),
                    width = width
                ));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ramp_bonus() {
        let ramp = Ramp::new(73, 600);
        assert_eq!(ramp.bonus(72), None);
        assert_eq!(ramp.bonus(73), Some(600));
        assert_eq!(ramp.bonus(75), Some(1800));
    }

    #[test]
    fn test_interval_stops_at_first_unmet_segment() {
        let segments = [Ramp::new(10, 100), Ramp::new(20, 1000), Ramp::new(15, 5)];
        assert_eq!(StarProbabilityIntervalIncreaseRule::bonus(&segments, 9), 0);
        assert_eq!(StarProbabilityIntervalIncreaseRule::bonus(&segments, 12), 300);
        // the third segment would match, but the second is unmet
        assert_eq!(StarProbabilityIntervalIncreaseRule::bonus(&segments, 16), 700);
        assert_eq!(StarProbabilityIntervalIncreaseRule::bonus(&segments, 21), 1200 + 2000 + 35);
    }

    #[test]
    fn test_ramp_needs_star_counter() {
        use crate::logic::Logic;
        use crate::rules::{Rule, StarCounterRule};

        let live_five = |rules: Vec<Rule>| {
            let mut logic = Logic::new("ramp", rules, 0).unwrap();
            logic.decide().unwrap();
            match logic.rule(RuleId::StarProbability) {
                Some(Rule::StarProbability(rule)) => rule.live_weight(5),
                _ => None,
            }
        };
        let probability = || StarProbabilityRule::new(vec![(5, 60), (3, 9940)]).unwrap();

        let without = live_five(vec![
            StarProbabilityIncreaseRule::new(vec![(5, Ramp::new(1, 600))]).into(),
            probability().into(),
        ]);
        assert_eq!(without, Some(60));

        let interval = live_five(vec![
            StarProbabilityIntervalIncreaseRule::new(vec![(5, vec![Ramp::new(1, 600)])]).into(),
            probability().into(),
        ]);
        assert_eq!(interval, Some(60));

        let with = live_five(vec![
            StarCounterRule::new([5]).into(),
            StarProbabilityIncreaseRule::new(vec![(5, Ramp::new(1, 600))]).into(),
            probability().into(),
        ]);
        assert_eq!(with, Some(660));
    }

    #[test]
    fn test_from_params() {
        let rule = StarProbabilityIncreaseRule::from_params(&json!({
            "star_increase": { "5": [73, 600], "4": [9, 5100] }
        }))
        .unwrap();
        assert_eq!(rule.ramps, vec![(5, Ramp::new(73, 600)), (4, Ramp::new(9, 5100))]);

        let rule = StarProbabilityIntervalIncreaseRule::from_params(&json!({
            "star_increase": { "5": [[66, 400], [71, 600]] }
        }))
        .unwrap();
        assert_eq!(rule.segments, vec![(5, vec![Ramp::new(66, 400), Ramp::new(71, 600)])]);

        let err = StarProbabilityIncreaseRule::from_params(&json!({ "star_increase": { "5": 73 } })).unwrap_err();
        assert!(err.is_configuration());
    }
}
