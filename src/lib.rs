//! # wish-engine
//!
//! A configurable rule-pipeline engine for gacha-style item draws.
//!
//! ## Design Principles
//!
//! 1. **Data-Configured**: A pool's mechanics are an ordered list of rules
//!    read from configuration. Nothing about star tiers or item types is
//!    hardcoded.
//!
//! 2. **Order Is Semantics**: Rules run in configured order and see only
//!    what earlier rules decided. Pipelines are never reordered; hazards are
//!    reported as warnings.
//!
//! 3. **Exact Weights**: Probabilities are integers on a 10000-unit scale.
//!
//! ## Architecture
//!
//! - **Bridge**: Rules reach each other through positions resolved once at
//!   construction, so a pipeline is a plain value and clones deeply.
//!
//! - **Two Phases per Draw**: `decide` builds the star, type and tags;
//!   `observe` updates counters once the concrete item is known.
//!
//! - **Deterministic RNG**: ChaCha8 streams, forkable per pool.
//!
//! ## Modules
//!
//! - `core`: Draw results, priority tags, weights, RNG, errors
//! - `rules`: Counter, probability, ramp, pity, up, fes, appoint and capture rules
//! - `logic`: Pipelines, bridge, configuration, persisted state, templates
//! - `pool`: Draw orchestration against item resolvers and recorders

pub mod core;
pub mod rules;
pub mod logic;
pub mod pool;

// Re-export commonly used types
pub use crate::core::{
    DrawResult, PriorityTag, ResolvedItem, Star,
    RandomSource, WishRng,
    Result, WishError,
    MAX_WEIGHT,
};

pub use crate::rules::{
    DrawRule, Rule, RuleId,
    StarCounterRule, TypeStarCounterRule,
    StarProbabilityRule, TypeStarProbabilityRule,
    StarProbabilityIncreaseRule, StarProbabilityIntervalIncreaseRule, Ramp,
    StarPityRule, TypeStarPityRule,
    UpRule, UpTypeRule, FesRule, AppointRule,
    CaptureRule, CapturePityRule,
};

pub use crate::logic::{
    Logic, LogicConfig, LogicLibrary,
    OrderingWarning, PersistedState,
    DESCRIBE_WIDTH,
};

pub use crate::pool::{CardResolver, Draw, DrawBatch, DrawRecorder, NoRecorder, Pool};
