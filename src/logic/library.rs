//! Named pipeline templates.
//!
//! Pools are usually created from a handful of shared pipelines. The library
//! builds each configured pipeline once and hands out independent copies.
//! A pipeline whose configuration fails is skipped and reported; the others
//! still load.

use rustc_hash::FxHashMap;
use tracing::{error, info};

use crate::core::{Result, WishError, WishRng};

use super::{Logic, LogicConfig};

/// Successfully built templates plus the failures met while loading.
#[derive(Clone, Debug)]
pub struct LogicLibrary {
    rng: WishRng,
    templates: FxHashMap<String, Logic>,
    /// Template names in load order.
    order: Vec<String>,
    failures: Vec<(String, WishError)>,
}

impl LogicLibrary {
    /// Create an empty library. Every pipeline's stream derives from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: WishRng::new(seed),
            templates: FxHashMap::default(),
            order: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Build a library from many configurations, skipping failing ones.
    pub fn load(configs: impl IntoIterator<Item = LogicConfig>, seed: u64) -> Self {
        let mut library = Self::new(seed);
        for config in configs {
            if library.add(&config).is_err() {
                continue;
            }
        }
        info!(
            loaded = library.order.len(),
            failed = library.failures.len(),
            "pipeline library loaded"
        );
        library
    }

    /// Parse a JSON list of configurations and load them.
    ///
    /// Only a malformed document is an error; bad pipelines are skipped.
    pub fn from_json_str(text: &str, seed: u64) -> Result<Self> {
        Ok(Self::load(LogicConfig::parse_many(text)?, seed))
    }

    /// Build and register one template. A later template replaces an earlier
    /// one of the same name.
    pub fn add(&mut self, config: &LogicConfig) -> Result<()> {
        match Logic::from_config(config, self.rng.seed()) {
            Ok(logic) => {
                let logic = logic.with_rng(self.rng.for_context(&config.name));
                if self.templates.insert(config.name.clone(), logic).is_none() {
                    self.order.push(config.name.clone());
                }
                Ok(())
            }
            Err(err) => {
                error!(logic = config.name.as_str(), error = %err, "skipping pipeline");
                self.failures.push((config.name.clone(), err.clone()));
                Err(err)
            }
        }
    }

    /// Template names in load order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Logic> {
        self.templates.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Pipelines that failed to build, with the reason.
    #[must_use]
    pub fn failures(&self) -> &[(String, WishError)] {
        &self.failures
    }

    /// Independent copy of a template for one pool.
    ///
    /// The copy's random stream is derived from the pool name, so the same
    /// pool always replays the same draws for the same library seed.
    #[must_use]
    pub fn instantiate(&self, name: &str, pool: &str) -> Option<Logic> {
        let template = self.templates.get(name)?;
        let rng = self.rng.for_context(&format!("{}/{}", name, pool));
        Some(template.clone().with_rng(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn configs() -> Vec<LogicConfig> {
        vec![
            LogicConfig::from_json(&json!({
                "name": "standard",
                "rules": {
                    "StarCounterRule": { "star_list": [5, 4] },
                    "StarProbabilityRule": { "star_probability": { "5": 60, "4": 510, "3": 9430 } }
                }
            }))
            .unwrap(),
            LogicConfig::from_json(&json!({
                "name": "broken",
                "rules": { "StarPityRule": {} }
            }))
            .unwrap(),
            LogicConfig::from_json(&json!({ "name": "empty", "rules": {} })).unwrap(),
        ]
    }

    #[test]
    fn test_failing_pipeline_is_skipped() {
        let library = LogicLibrary::load(configs(), 1);
        assert_eq!(library.names().collect::<Vec<_>>(), vec!["standard", "empty"]);
        assert!(!library.contains("broken"));
        assert_eq!(library.failures().len(), 1);
        assert_eq!(library.failures()[0].0, "broken");
        assert!(library.failures()[0].1.is_configuration());
    }

    #[test]
    fn test_instances_are_independent() {
        let library = LogicLibrary::load(configs(), 1);
        let mut a = library.instantiate("standard", "pool-a").unwrap();
        let mut b = library.instantiate("standard", "pool-a").unwrap();
        let mut c = library.instantiate("standard", "pool-b").unwrap();

        let draws = |logic: &mut Logic| -> Vec<u32> {
            (0..200)
                .map(|_| {
                    let star = logic.decide().unwrap().star;
                    logic.observe(None);
                    star
                })
                .collect()
        };
        let (da, db, dc) = (draws(&mut a), draws(&mut b), draws(&mut c));
        assert_eq!(da, db);
        assert_ne!(da, dc);
        assert!(library.get("standard").unwrap().export_state().is_empty());
    }

    #[test]
    fn test_unknown_template() {
        let library = LogicLibrary::load(configs(), 1);
        assert!(library.instantiate("missing", "pool").is_none());
    }

    #[test]
    fn test_malformed_document() {
        assert!(LogicLibrary::from_json_str("{ not json", 0).is_err());
        let library = LogicLibrary::from_json_str(r#"[{ "name": "x", "rules": [] }]"#, 0).unwrap();
        assert_eq!(library.len(), 1);
    }
}
