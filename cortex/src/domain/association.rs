// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Learned keyword -> module associations
//!
//! Each weight lives in [0.0, 1.0]. A pair that was never reinforced has an
//! implicit weight of 0.0. Ordered maps keep iteration deterministic so that
//! analysis over the table is reproducible.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::module::ModuleId;

pub const MIN_WEIGHT: f64 = 0.0;
pub const MAX_WEIGHT: f64 = 1.0;

/// Outcome of a single weight adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightChange {
    pub keyword: String,
    pub module_id: ModuleId,
    pub old_weight: f64,
    pub new_weight: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssociationTable {
    weights: BTreeMap<String, BTreeMap<ModuleId, f64>>,
}

impl AssociationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weight(&self, keyword: &str, module_id: &ModuleId) -> f64 {
        self.weights
            .get(keyword)
            .and_then(|modules| modules.get(module_id))
            .copied()
            .unwrap_or(MIN_WEIGHT)
    }

    /// Increase weight (success reinforcement), capped at 1.0
    pub fn reinforce(&mut self, keyword: &str, module_id: &ModuleId, amount: f64) -> WeightChange {
        self.adjust(keyword, module_id, |w| (w + amount).min(MAX_WEIGHT))
    }

    /// Decrease weight (failure penalty), floored at 0.0
    pub fn weaken(&mut self, keyword: &str, module_id: &ModuleId, amount: f64) -> WeightChange {
        self.adjust(keyword, module_id, |w| (w - amount).max(MIN_WEIGHT))
    }

    fn adjust(&mut self, keyword: &str, module_id: &ModuleId, f: impl Fn(f64) -> f64) -> WeightChange {
        let entry = self
            .weights
            .entry(keyword.to_string())
            .or_default()
            .entry(module_id.clone())
            .or_insert(MIN_WEIGHT);
        let old_weight = *entry;
        *entry = f(old_weight).clamp(MIN_WEIGHT, MAX_WEIGHT);

        WeightChange {
            keyword: keyword.to_string(),
            module_id: module_id.clone(),
            old_weight,
            new_weight: *entry,
        }
    }

    /// Modules associated with `keyword` at or above `min_weight`, in id order
    pub fn modules_for(&self, keyword: &str, min_weight: f64) -> Vec<(ModuleId, f64)> {
        self.weights
            .get(keyword)
            .map(|modules| {
                modules
                    .iter()
                    .filter(|(_, weight)| **weight >= min_weight)
                    .map(|(id, weight)| (id.clone(), *weight))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Keyword -> modules at or above `min_weight`, omitting empty keywords
    pub fn associations(&self, min_weight: f64) -> BTreeMap<String, Vec<ModuleId>> {
        self.weights
            .keys()
            .filter_map(|keyword| {
                let modules: Vec<_> = self
                    .modules_for(keyword, min_weight)
                    .into_iter()
                    .map(|(id, _)| id)
                    .collect();
                (!modules.is_empty()).then(|| (keyword.clone(), modules))
            })
            .collect()
    }

    /// Number of (keyword, module) pairs with a positive weight
    pub fn learned_pairs(&self) -> usize {
        self.weights
            .values()
            .flat_map(|modules| modules.values())
            .filter(|weight| **weight > MIN_WEIGHT)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_pair_has_zero_weight() {
        let table = AssociationTable::new();
        assert_eq!(table.weight("python", &ModuleId::from("python_expertise")), 0.0);
    }

    #[test]
    fn test_reinforce_caps_at_one() {
        let mut table = AssociationTable::new();
        let id = ModuleId::from("debugging_tools");

        let change = table.reinforce("python", &id, 0.4);
        assert_eq!(change.old_weight, 0.0);
        assert_eq!(change.new_weight, 0.4);

        table.reinforce("python", &id, 0.4);
        let change = table.reinforce("python", &id, 0.4);
        assert_eq!(change.new_weight, 1.0);
        assert_eq!(table.weight("python", &id), 1.0);
    }

    #[test]
    fn test_weaken_floors_at_zero() {
        let mut table = AssociationTable::new();
        let id = ModuleId::from("debugging_tools");

        table.reinforce("python", &id, 0.15);
        let change = table.weaken("python", &id, 0.1);
        assert!(change.new_weight < change.old_weight);

        let change = table.weaken("python", &id, 0.1);
        assert_eq!(change.new_weight, 0.0);
        assert_eq!(table.learned_pairs(), 0);
    }

    #[test]
    fn test_modules_for_threshold() {
        let mut table = AssociationTable::new();
        table.reinforce("web", &ModuleId::from("html_css"), 0.5);
        table.reinforce("web", &ModuleId::from("javascript_expertise"), 0.1);

        let modules = table.modules_for("web", 0.25);
        assert_eq!(modules, vec![(ModuleId::from("html_css"), 0.5)]);

        let associations = table.associations(0.25);
        assert_eq!(associations.len(), 1);
        assert_eq!(associations["web"], vec![ModuleId::from("html_css")]);
        assert_eq!(table.learned_pairs(), 2);
    }
}
