//! Parameter parsing and persisted-state helpers shared by rules.
//!
//! Configuration maps are keyed by star tier as strings (`"5"`), and by item
//! type within a tier. Map order is preserved: it is semantically significant
//! for pity tie-breaks and weight normalization.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::{Result, Star, WishError, MAX_WEIGHT};

use super::RuleId;

/// Star-keyed table in configuration order.
pub type StarTable<V> = Vec<(Star, V)>;

/// Star -> type -> value table in configuration order.
pub type TypeStarTable<V> = Vec<(Star, Vec<(String, V)>)>;

/// Borrowed view of one rule's parameter object.
pub(crate) struct Params<'a> {
    rule: RuleId,
    map: &'a Map<String, Value>,
}

impl<'a> Params<'a> {
    pub(crate) fn new(rule: RuleId, value: &'a Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self { rule, map }),
            _ => Err(WishError::InvalidConfig(format!(
                "parameters for {} must be an object",
                rule
            ))),
        }
    }

    fn required(&self, key: &'static str) -> Result<&'a Value> {
        self.map.get(key).ok_or(WishError::MissingParameter {
            rule: self.rule,
            param: key,
        })
    }

    fn object(&self, key: &'static str, value: &'a Value) -> Result<&'a Map<String, Value>> {
        value
            .as_object()
            .ok_or_else(|| WishError::invalid(self.rule, key, "expected an object"))
    }

    fn star(&self, key: &'static str, raw: &str) -> Result<Star> {
        raw.trim()
            .parse::<Star>()
            .map_err(|_| WishError::invalid(self.rule, key, format!("`{}` is not a star tier", raw)))
    }

    fn decode<V: DeserializeOwned>(&self, key: &'static str, value: &Value) -> Result<V> {
        serde_json::from_value(value.clone()).map_err(|e| WishError::invalid(self.rule, key, e.to_string()))
    }

    /// `{ "5": v, "4": v }`
    pub(crate) fn star_table<V: DeserializeOwned>(&self, key: &'static str) -> Result<StarTable<V>> {
        let map = self.object(key, self.required(key)?)?;
        map.iter()
            .map(|(star, value)| -> Result<(Star, V)> { Ok((self.star(key, star)?, self.decode(key, value)?)) })
            .collect()
    }

    /// `{ "5": { "Role": v }, ... }`
    pub(crate) fn type_star_table<V: DeserializeOwned>(&self, key: &'static str) -> Result<TypeStarTable<V>> {
        let map = self.object(key, self.required(key)?)?;
        map.iter()
            .map(|(star, types)| -> Result<(Star, Vec<(String, V)>)> {
                let types = self
                    .object(key, types)?
                    .iter()
                    .map(|(item_type, value)| -> Result<(String, V)> { Ok((item_type.clone(), self.decode(key, value)?)) })
                    .collect::<Result<Vec<_>>>()?;
                Ok((self.star(key, star)?, types))
            })
            .collect()
    }

    /// Any required value decoded with serde.
    pub(crate) fn value<V: DeserializeOwned>(&self, key: &'static str) -> Result<V> {
        self.decode(key, self.required(key)?)
    }

    /// Optional boolean flag, `false` when absent.
    pub(crate) fn flag(&self, key: &'static str) -> Result<bool> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(false),
            Some(value) => self.decode(key, value),
        }
    }
}

/// Probability weights must fit the 10000-unit scale.
pub(crate) fn check_probabilities(rule: RuleId, key: &'static str, table: &[(Star, u32)]) -> Result<()> {
    for (star, weight) in table {
        if *weight > MAX_WEIGHT {
            return Err(WishError::invalid(
                rule,
                key,
                format!("weight {} for star {} exceeds {}", weight, star, MAX_WEIGHT),
            ));
        }
    }
    Ok(())
}

/// Weighted-choice tables must be able to pick something.
pub(crate) fn check_total(rule: RuleId, key: &'static str, star: Option<Star>, weights: impl Iterator<Item = u32>) -> Result<()> {
    if weights.map(u64::from).sum::<u64>() == 0 {
        let reason = match star {
            Some(star) => format!("weights for star {} sum to zero", star),
            None => "weights sum to zero".to_string(),
        };
        return Err(WishError::invalid(rule, key, reason));
    }
    Ok(())
}

/// Thresholds count draws and must be at least one.
pub(crate) fn check_thresholds(rule: RuleId, key: &'static str, table: &[(Star, u32)]) -> Result<()> {
    match table.iter().find(|(_, threshold)| *threshold == 0) {
        Some((star, _)) => Err(WishError::invalid(rule, key, format!("threshold for star {} must be at least 1", star))),
        None => Ok(()),
    }
}

/// Star-keyed state map: `{ "5": v }`.
pub(crate) fn export_star<V: Copy>(table: &[(Star, V)]) -> BTreeMap<String, V> {
    table.iter().map(|(star, v)| (star.to_string(), *v)).collect()
}

/// Star -> type state map: `{ "5": { "Role": v } }`.
pub(crate) fn export_type_star<V: Copy>(table: &[(Star, Vec<(String, V)>)]) -> BTreeMap<String, BTreeMap<String, V>> {
    table
        .iter()
        .map(|(star, types)| (star.to_string(), types.iter().map(|(t, v)| (t.clone(), *v)).collect()))
        .collect()
}

/// Overwrite tracked entries present in `saved`; others keep their value.
pub(crate) fn import_star<V: Copy>(table: &mut [(Star, V)], saved: &BTreeMap<String, V>) {
    for (star, value) in table.iter_mut() {
        if let Some(saved) = saved.get(&star.to_string()) {
            *value = *saved;
        }
    }
}

pub(crate) fn import_type_star<V: Copy>(
    table: &mut [(Star, Vec<(String, V)>)],
    saved: &BTreeMap<String, BTreeMap<String, V>>,
) {
    for (star, types) in table.iter_mut() {
        let Some(saved) = saved.get(&star.to_string()) else {
            continue;
        };
        for (item_type, value) in types.iter_mut() {
            if let Some(saved) = saved.get(item_type.as_str()) {
                *value = *saved;
            }
        }
    }
}

/// Decode a rule's state sub-mapping into its typed form.
pub(crate) fn decode_state<S: DeserializeOwned>(rule: RuleId, state: &Value) -> Result<S> {
    serde_json::from_value(state.clone()).map_err(|e| WishError::InvalidState {
        rule: rule.to_string(),
        reason: e.to_string(),
    })
}

/// Encode a rule's typed state, or `None` when it is at its default.
pub(crate) fn encode_state<S: Serialize>(state: &S, is_default: bool) -> Option<Value> {
    if is_default {
        return None;
    }
    serde_json::to_value(state).ok()
}

/// Lookup in a star-keyed table.
pub(crate) fn lookup<V: Copy>(table: &[(Star, V)], star: Star) -> Option<V> {
    table.iter().find(|(s, _)| *s == star).map(|(_, v)| *v)
}

pub(crate) fn lookup_ref<V>(table: &[(Star, V)], star: Star) -> Option<&V> {
    table.iter().find(|(s, _)| *s == star).map(|(_, v)| v)
}

pub(crate) fn lookup_mut<V>(table: &mut [(Star, V)], star: Star) -> Option<&mut V> {
    table.iter_mut().find(|(s, _)| *s == star).map(|(_, v)| v)
}

/// Lookup of one item type within a tier.
pub(crate) fn lookup_type<V: Copy>(types: &[(String, V)], item_type: &str) -> Option<V> {
    types.iter().find(|(t, _)| t == item_type).map(|(_, v)| *v)
}

/// Render `- label:` followed by right-aligned rows.
pub(crate) fn describe_rows(label: &str, rows: impl Iterator<Item = (String, String)>, width: usize) -> Vec<String> {
    let mut lines = vec![format!("- {}:", label)];
    for (key, value) in rows {
        let head = format!("  - {}:", key);
        let pad = width.saturating_sub(head.chars().count());
        lines.push(format!("{}{:>pad$}", head, value, pad = pad));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_star_table_keeps_order() {
        let value = json!({ "star_pity": { "5": 90, "4": 10 } });
        let params = Params::new(RuleId::StarPity, &value).unwrap();
        let table: StarTable<u32> = params.star_table("star_pity").unwrap();
        assert_eq!(table, vec![(5, 90), (4, 10)]);
    }

    #[test]
    fn test_type_star_table() {
        let value = json!({ "type_pity": { "4": { "Role": 10, "Weapon": 20 } } });
        let params = Params::new(RuleId::TypeStarPity, &value).unwrap();
        let table: TypeStarTable<u32> = params.type_star_table("type_pity").unwrap();
        assert_eq!(table, vec![(4, vec![("Role".to_string(), 10), ("Weapon".to_string(), 20)])]);
    }

    #[test]
    fn test_bad_star_key() {
        let value = json!({ "star_pity": { "five": 90 } });
        let params = Params::new(RuleId::StarPity, &value).unwrap();
        let err = params.star_table::<u32>("star_pity").unwrap_err();
        assert!(matches!(err, WishError::InvalidParameter { param: "star_pity", .. }));
    }

    #[test]
    fn test_params_must_be_object() {
        assert!(Params::new(RuleId::Fes, &json!([1, 2])).is_err());
    }

    #[test]
    fn test_flag_defaults_false() {
        let value = json!({});
        let params = Params::new(RuleId::StarPity, &value).unwrap();
        assert!(!params.flag("reset_lower_pity").unwrap());
    }

    #[test]
    fn test_import_keeps_missing_entries() {
        let mut table = vec![(5, 3u32), (4, 7)];
        let saved: BTreeMap<String, u32> = [("5".to_string(), 40), ("3".to_string(), 1)].into_iter().collect();
        import_star(&mut table, &saved);
        assert_eq!(table, vec![(5, 40), (4, 7)]);
    }

    #[test]
    fn test_checks() {
        assert!(check_probabilities(RuleId::Up, "up_probability", &[(5, 10_001)]).is_err());
        assert!(check_probabilities(RuleId::Up, "up_probability", &[(5, 10_000)]).is_ok());
        assert!(check_total(RuleId::StarProbability, "star_probability", None, [0, 0].into_iter()).is_err());
        assert!(check_thresholds(RuleId::StarPity, "star_pity", &[(5, 0)]).is_err());
    }
}
