//! Persisted rule state.
//!
//! A pipeline's counters are saved as one JSON object keyed by rule
//! identifier. Each entry is the rule's own sub-mapping; rules whose
//! counters are all at their defaults are left out.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{Result, WishError};
use crate::rules::RuleId;

/// Rule identifier -> that rule's counter/flag sub-mapping.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedState {
    entries: Map<String, Value>,
}

impl PersistedState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sub-mapping stored for a rule, if any.
    #[must_use]
    pub fn get(&self, id: RuleId) -> Option<&Value> {
        self.entries.get(id.as_str())
    }

    /// Store a rule's sub-mapping, replacing any previous one.
    pub fn insert(&mut self, id: RuleId, state: Value) {
        self.entries.insert(id.as_str().to_string(), state);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over stored identifiers, including ones no rule knows.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The whole state as a JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.entries.clone())
    }

    /// Accept any JSON object. Entries are checked when a pipeline loads them.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            other => Err(WishError::InvalidState {
                rule: "<root>".to_string(),
                reason: format!("expected an object, found {}", other),
            }),
        }
    }

    /// Parse from a JSON string.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| WishError::InvalidState {
            rule: "<root>".to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(value)
    }
}
