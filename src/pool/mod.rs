//! Draw pools.
//!
//! A [`Pool`] drives its pipeline against two collaborators:
//!
//! - a [`CardResolver`] that turns a decided (type, star, group) into a
//!   concrete item, or `None` when the bucket is empty
//! - a [`DrawRecorder`] that keeps the history of resolved items
//!
//! One draw is: decide, pick the priority group, resolve, observe, record.
//! A draw with no item still advances every counter and is not recorded.
//! Batches are plain loops of single draws with no rollback.

use tracing::debug;

use crate::core::{DrawResult, PriorityTag, ResolvedItem, Result, Star};
use crate::logic::{Logic, PersistedState};

/// Maps a decided draw onto a concrete item.
pub trait CardResolver {
    /// Pick an item of `item_type` and `star` from `group`.
    ///
    /// `None` is a valid outcome, not an error.
    fn resolve(&mut self, item_type: &str, star: Star, group: PriorityTag) -> Option<ResolvedItem>;
}

/// Receives every resolved item.
pub trait DrawRecorder {
    /// Record one completed draw.
    fn record(&mut self, item: &ResolvedItem, group: PriorityTag);

    /// Forget every record.
    fn clear(&mut self) {}
}

impl DrawRecorder for Vec<ResolvedItem> {
    fn record(&mut self, item: &ResolvedItem, _group: PriorityTag) {
        self.push(item.clone());
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }
}

/// Records nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRecorder;

impl DrawRecorder for NoRecorder {
    fn record(&mut self, _item: &ResolvedItem, _group: PriorityTag) {}
}

/// Outcome of one draw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Draw {
    /// What the pipeline decided.
    pub decision: DrawResult,
    /// The group the item was requested from.
    pub group: PriorityTag,
    /// What the resolver returned.
    pub item: Option<ResolvedItem>,
}

/// Outcome of several consecutive draws.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrawBatch {
    pub draws: Vec<Draw>,
    pub count: usize,
    /// Highest star among resolved items, 0 if none.
    pub max_star: Star,
}

impl DrawBatch {
    fn push(&mut self, draw: Draw) {
        if let Some(item) = &draw.item {
            self.max_star = self.max_star.max(item.star);
        }
        self.draws.push(draw);
        self.count += 1;
    }

    /// Resolved items, skipping empty draws.
    pub fn items(&self) -> impl Iterator<Item = &ResolvedItem> {
        self.draws.iter().filter_map(|draw| draw.item.as_ref())
    }

    #[must_use]
    pub fn first(&self) -> Option<&Draw> {
        self.draws.first()
    }
}

/// A pipeline bound to its item source and history.
#[derive(Debug)]
pub struct Pool<R, D = Vec<ResolvedItem>> {
    name: String,
    logic: Logic,
    resolver: R,
    recorder: D,
}

impl<R: CardResolver, D: DrawRecorder> Pool<R, D> {
    pub fn new(name: impl Into<String>, logic: Logic, resolver: R, recorder: D) -> Self {
        Self {
            name: name.into(),
            logic,
            resolver,
            recorder,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn logic(&self) -> &Logic {
        &self.logic
    }

    #[must_use]
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Mutable access to the item source, e.g. to restock it.
    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    #[must_use]
    pub fn recorder(&self) -> &D {
        &self.recorder
    }

    fn draw(&mut self) -> Result<Draw> {
        let decision = self.logic.decide()?;
        let group = decision.priority_group();
        let item = self.resolver.resolve(&decision.item_type, decision.star, group);
        self.logic.observe(item.clone());
        match &item {
            Some(item) => self.recorder.record(item, group),
            None => debug!(pool = self.name.as_str(), decision = %decision, "no item for draw"),
        }
        Ok(Draw { decision, group, item })
    }

    pub fn draw_one(&mut self) -> Result<DrawBatch> {
        self.draw_count(1)
    }

    pub fn draw_ten(&mut self) -> Result<DrawBatch> {
        self.draw_count(10)
    }

    /// `count` consecutive draws. Draws made before an error stay applied.
    pub fn draw_count(&mut self, count: usize) -> Result<DrawBatch> {
        let mut batch = DrawBatch::default();
        for _ in 0..count {
            batch.push(self.draw()?);
        }
        Ok(batch)
    }

    /// Zero the pipeline's counters, and optionally the history.
    pub fn reset(&mut self, with_records: bool) {
        self.logic.reset();
        if with_records {
            self.recorder.clear();
        }
    }

    #[must_use]
    pub fn logic_state(&self) -> PersistedState {
        self.logic.export_state()
    }

    pub fn set_logic_state(&mut self, state: &PersistedState) -> Result<()> {
        self.logic.load_state(state)
    }

    /// Header line plus the pipeline description.
    #[must_use]
    pub fn describe(&self, width: usize) -> String {
        format!("Pool <{}> {}\n{}", self.name, "-".repeat(30), self.logic.describe(width))
    }
}
