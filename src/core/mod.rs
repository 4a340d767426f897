//! Core engine types: draw outcomes, weights, RNG, errors.
//!
//! Everything here is mechanic-agnostic. Rules in `crate::rules` build on
//! these primitives.

pub mod draw;
pub mod error;
pub mod rng;
pub mod weight;

pub use draw::{DrawResult, PriorityTag, ResolvedItem, Star, TagSet};
pub use error::{Result, WishError};
pub use rng::{RandomSource, WishRng};
pub use weight::{choose_weighted, normalize_weights, roll_weight, weight_to_percent, MAX_WEIGHT};
