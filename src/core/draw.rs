//! Draw outcomes: the decided triple and the concrete resolved item.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Star tier. `0` means "not decided yet" (or a miss once the pipeline ran).
pub type Star = u32;

/// Priority group a draw is fulfilled from.
///
/// Groups are checked in the order Appoint > Fes > Up > Standard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityTag {
    /// Fallback group, always present.
    Standard,
    /// Featured items.
    Up,
    /// Secondary boost inside featured items.
    Fes,
    /// Guaranteed-track subset of featured items.
    Appoint,
}

impl PriorityTag {
    /// Groups from highest to lowest priority.
    pub const BY_PRIORITY: [PriorityTag; 4] = [
        PriorityTag::Appoint,
        PriorityTag::Fes,
        PriorityTag::Up,
        PriorityTag::Standard,
    ];

    /// Lowercase name used in configuration and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PriorityTag::Standard => "standard",
            PriorityTag::Up => "up",
            PriorityTag::Fes => "fes",
            PriorityTag::Appoint => "appoint",
        }
    }
}

impl std::fmt::Display for PriorityTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of priority tags.
pub type TagSet = SmallVec<[PriorityTag; 4]>;

/// The decision produced by one run of the pipeline.
///
/// Rules mutate it progressively during the decide phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResult {
    /// Decided star tier, `0` while undecided.
    pub star: Star,
    /// Decided item type, empty while undecided.
    pub item_type: String,
    /// Priority tags in insertion order. Always contains `Standard`.
    tags: TagSet,
}

impl Default for DrawResult {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawResult {
    /// An undecided result tagged `Standard`.
    #[must_use]
    pub fn new() -> Self {
        let mut tags = TagSet::new();
        tags.push(PriorityTag::Standard);
        Self {
            star: 0,
            item_type: String::new(),
            tags,
        }
    }

    /// A result with the star already decided.
    #[must_use]
    pub fn with_star(star: Star) -> Self {
        Self {
            star,
            ..Self::new()
        }
    }

    /// Set the item type (builder pattern).
    #[must_use]
    pub fn with_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = item_type.into();
        self
    }

    /// Add a tag (builder pattern).
    #[must_use]
    pub fn with_tag(mut self, tag: PriorityTag) -> Self {
        self.add_tag(tag);
        self
    }

    /// Has a star been decided?
    #[must_use]
    pub fn has_star(&self) -> bool {
        self.star != 0
    }

    /// Has an item type been decided?
    #[must_use]
    pub fn has_type(&self) -> bool {
        !self.item_type.is_empty()
    }

    /// Append a tag if not already present.
    pub fn add_tag(&mut self, tag: PriorityTag) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    #[must_use]
    pub fn has_tag(&self, tag: PriorityTag) -> bool {
        self.tags.contains(&tag)
    }

    #[must_use]
    pub fn tags(&self) -> &[PriorityTag] {
        &self.tags
    }

    /// The group the concrete item should be drawn from.
    #[must_use]
    pub fn priority_group(&self) -> PriorityTag {
        PriorityTag::BY_PRIORITY
            .into_iter()
            .find(|tag| self.has_tag(*tag))
            .unwrap_or(PriorityTag::Standard)
    }
}

impl std::fmt::Display for DrawResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tags: Vec<&str> = self.tags.iter().map(|t| t.as_str()).collect();
        write!(f, "DrawResult({}, '{}', [{}])", self.star, self.item_type, tags.join(", "))
    }
}

/// A concrete item returned by the card-resolution collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedItem {
    pub name: String,
    pub star: Star,
    pub item_type: String,
    /// The group the item was drawn from.
    pub group: PriorityTag,
    /// Every group the item belongs to, including `group`.
    pub tags: TagSet,
}

impl ResolvedItem {
    /// Create an item drawn from `group`.
    pub fn new(name: impl Into<String>, star: Star, item_type: impl Into<String>, group: PriorityTag) -> Self {
        let mut tags = TagSet::new();
        tags.push(group);
        Self {
            name: name.into(),
            star,
            item_type: item_type.into(),
            group,
            tags,
        }
    }

    /// Record membership in another group (builder pattern).
    #[must_use]
    pub fn also_in(mut self, tag: PriorityTag) -> Self {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    #[must_use]
    pub fn belongs_to(&self, tag: PriorityTag) -> bool {
        self.tags.contains(&tag)
    }
}
