//! Rule pipelines.
//!
//! A [`Logic`] owns an ordered list of rules and the shared [`DrawContext`].
//! One draw is two calls:
//!
//! 1. [`Logic::decide`] runs every rule's decide phase and returns the
//!    decided star, type and tags.
//! 2. [`Logic::observe`] hands the concretely resolved item (or `None`) back
//!    so every rule can update its counters.
//!
//! Rule order comes from configuration and is never changed. Order problems
//! are reported as [`OrderingWarning`]s when the pipeline is built.

mod config;
mod context;
mod library;
mod order;
mod state;

pub use config::LogicConfig;
pub use context::{Bridge, DrawContext, Peers, RuleScope};
pub use library::LogicLibrary;
pub use order::{check_order, OrderingWarning};
pub use state::PersistedState;

use tracing::{debug, info, warn};

use crate::core::{DrawResult, RandomSource, ResolvedItem, Result, WishRng};
use crate::rules::{DrawRule, Rule, RuleId};

/// Default width for [`Logic::describe`].
pub const DESCRIBE_WIDTH: usize = 50;

/// An ordered rule pipeline with its draw context and random stream.
///
/// Cloning gives a fully independent pipeline: rules are plain values and
/// the bridge stores positions, not references.
#[derive(Clone, Debug)]
pub struct Logic {
    name: String,
    rules: Vec<Rule>,
    ctx: DrawContext,
    rng: WishRng,
    warnings: Vec<OrderingWarning>,
}

impl Logic {
    /// Build a pipeline from already constructed rules.
    ///
    /// Fails if a rule identifier appears twice.
    pub fn new(name: impl Into<String>, rules: Vec<Rule>, seed: u64) -> Result<Self> {
        let name = name.into();
        let bridge = Bridge::build(&rules)?;
        let warnings = check_order(&bridge);
        for warning in &warnings {
            warn!(logic = name.as_str(), "{}", warning);
        }
        debug!(logic = name.as_str(), rules = rules.len(), "pipeline built");
        Ok(Self {
            name,
            rules,
            ctx: DrawContext::new(bridge),
            rng: WishRng::new(seed),
            warnings,
        })
    }

    /// Build a pipeline from configuration.
    pub fn from_config(config: &LogicConfig, seed: u64) -> Result<Self> {
        Self::new(config.name.clone(), config.build_rules()?, seed)
    }

    /// Replace the random stream (builder pattern).
    #[must_use]
    pub fn with_rng(mut self, rng: WishRng) -> Self {
        self.rng = rng;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// A configured rule by identifier.
    #[must_use]
    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.ctx.bridge.position(id).and_then(|position| self.rules.get(position))
    }

    /// Ordering hazards found when the pipeline was built.
    #[must_use]
    pub fn warnings(&self) -> &[OrderingWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn rng(&self) -> &WishRng {
        &self.rng
    }

    /// The result of the latest decide phase.
    #[must_use]
    pub fn last_result(&self) -> &DrawResult {
        &self.ctx.result
    }

    /// Run the decide phase with the pipeline's own random stream.
    pub fn decide(&mut self) -> Result<DrawResult> {
        Self::run_decide(&mut self.rules, &mut self.ctx, &mut self.rng)?;
        debug!(logic = self.name.as_str(), result = %self.ctx.result, "decided");
        Ok(self.ctx.result.clone())
    }

    /// Run the decide phase with an external random source.
    pub fn decide_with(&mut self, rng: &mut dyn RandomSource) -> Result<DrawResult> {
        Self::run_decide(&mut self.rules, &mut self.ctx, rng)?;
        debug!(logic = self.name.as_str(), result = %self.ctx.result, "decided");
        Ok(self.ctx.result.clone())
    }

    fn run_decide(rules: &mut [Rule], ctx: &mut DrawContext, rng: &mut dyn RandomSource) -> Result<()> {
        ctx.clear();
        let DrawContext { result, resolved, bridge } = ctx;
        for position in 0..rules.len() {
            let Some((rule, peers)) = Peers::split(&mut *rules, position, bridge) else {
                break;
            };
            let mut scope = RuleScope {
                result: &mut *result,
                resolved: resolved.as_ref(),
                rng: &mut *rng,
                peers,
            };
            rule.decide(&mut scope)?;
        }
        Ok(())
    }

    /// Run the observe phase with the concretely resolved item.
    ///
    /// `None` means the resolver had nothing to give; counters still advance.
    pub fn observe(&mut self, resolved: Option<ResolvedItem>) {
        self.ctx.resolved = resolved;
        let DrawContext { result, resolved, bridge } = &mut self.ctx;
        let rng = &mut self.rng;
        for position in 0..self.rules.len() {
            let Some((rule, peers)) = Peers::split(&mut self.rules, position, bridge) else {
                break;
            };
            let mut scope = RuleScope {
                result: &mut *result,
                resolved: resolved.as_ref(),
                rng: &mut *rng,
                peers,
            };
            rule.observe(&mut scope);
        }
    }

    /// Zero every counter and flag. Configuration is kept.
    pub fn reset(&mut self) {
        self.ctx.clear();
        for rule in &mut self.rules {
            rule.reset_counters();
        }
        info!(logic = self.name.as_str(), "counters reset");
    }

    /// Collect the persisted state of every rule with non-default counters.
    #[must_use]
    pub fn export_state(&self) -> PersistedState {
        let mut state = PersistedState::new();
        for rule in &self.rules {
            if let Some(value) = rule.export_state() {
                state.insert(rule.id(), value);
            }
        }
        debug!(logic = self.name.as_str(), entries = state.len(), "state exported");
        state
    }

    /// Restore counters from a persisted state.
    ///
    /// Unknown identifiers are ignored and rules without an entry keep their
    /// counters. If any entry is malformed nothing is changed.
    pub fn load_state(&mut self, state: &PersistedState) -> Result<()> {
        let mut rules = self.rules.clone();
        for rule in &mut rules {
            if let Some(value) = state.get(rule.id()) {
                rule.load_state(value)?;
            }
        }
        self.rules = rules;
        debug!(logic = self.name.as_str(), entries = state.len(), "state loaded");
        Ok(())
    }

    /// Deep copy with a forked random stream.
    pub fn duplicate(&mut self) -> Self {
        let rng = self.rng.fork();
        self.clone().with_rng(rng)
    }

    /// Human-readable summary of every rule.
    #[must_use]
    pub fn describe(&self, width: usize) -> String {
        let mut sections = vec![format!("Logic <{}> {}", self.name, "-".repeat(10))];
        sections.extend(self.rules.iter().map(|rule| rule.describe(width)));
        sections.join("\n")
    }
}
