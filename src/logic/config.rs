//! Pipeline configuration.
//!
//! A pipeline is a name plus an ordered list of rules with their parameters.
//! Two JSON shapes are accepted for `rules`:
//!
//! ```json
//! { "name": "standard", "rules": { "StarCounterRule": { "star_list": [5, 4] } } }
//! { "name": "standard", "rules": [["StarCounterRule", { "star_list": [5, 4] }]] }
//! ```
//!
//! Object keys keep their order, and that order is the execution order.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::core::{Result, WishError};
use crate::rules::{Rule, RuleId};

/// Configuration of one pipeline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogicConfig {
    /// Pipeline name, used for templates and log output.
    pub name: String,

    /// Rules in execution order.
    pub rules: Vec<(RuleId, Value)>,
}

impl LogicConfig {
    /// Create an empty configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Append a rule (builder pattern).
    #[must_use]
    pub fn with_rule(mut self, id: RuleId, params: Value) -> Self {
        self.rules.push((id, params));
        self
    }

    /// Parse from a JSON value.
    pub fn from_json(value: &Value) -> Result<Self> {
        let raw: RawConfig =
            serde_json::from_value(value.clone()).map_err(|e| WishError::InvalidConfig(e.to_string()))?;
        raw.try_into()
    }

    /// Parse from a JSON string.
    pub fn parse(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(text).map_err(|e| WishError::InvalidConfig(e.to_string()))?;
        raw.try_into()
    }

    /// Parse a list of configurations, e.g. the contents of a pipeline file.
    pub fn parse_many(text: &str) -> Result<Vec<Self>> {
        let raw: Vec<RawConfig> = serde_json::from_str(text).map_err(|e| WishError::InvalidConfig(e.to_string()))?;
        raw.into_iter().map(Self::try_from).collect()
    }

    /// Build every rule, in order.
    pub fn build_rules(&self) -> Result<Vec<Rule>> {
        self.rules
            .iter()
            .map(|(id, params)| Rule::from_config(*id, params))
            .collect()
    }

    /// The ordered-object form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let rules: Map<String, Value> = self
            .rules
            .iter()
            .map(|(id, params)| (id.as_str().to_string(), params.clone()))
            .collect();
        let mut root = Map::new();
        root.insert("name".to_string(), Value::String(self.name.clone()));
        root.insert("rules".to_string(), Value::Object(rules));
        Value::Object(root)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRules {
    Ordered(Map<String, Value>),
    Pairs(Vec<(String, Value)>),
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    name: String,
    rules: RawRules,
}

impl TryFrom<RawConfig> for LogicConfig {
    type Error = WishError;

    fn try_from(raw: RawConfig) -> Result<Self> {
        let pairs: Vec<(String, Value)> = match raw.rules {
            RawRules::Ordered(map) => map.into_iter().collect(),
            RawRules::Pairs(pairs) => pairs,
        };
        let rules = pairs
            .into_iter()
            .map(|(id, params)| -> Result<(RuleId, Value)> { Ok((id.parse()?, params)) })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { name: raw.name, rules })
    }
}

impl Serialize for LogicConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LogicConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = RawConfig::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}
