// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Dependency graph between loaded modules
//!
//! Edges point from a dependent to the module it relies on. Edges only ever
//! connect modules in `loaded` status; the graph is pruned whenever a module
//! leaves that status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::errors::CortexError;
use super::module::{Module, ModuleId};

/// Directed edge: `dependent` relies on `depends_on` remaining loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub dependent: ModuleId,
    pub depends_on: ModuleId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<(ModuleId, ModuleId), DependencyEdge>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `dependent -> depends_on`. Both modules must be loaded.
    /// Returns false if the edge already existed.
    pub fn add_edge(&mut self, dependent: &Module, depends_on: &Module) -> Result<bool, CortexError> {
        let invalid = |reason: &str| CortexError::InvalidEdge {
            dependent: dependent.id.clone(),
            depends_on: depends_on.id.clone(),
            reason: reason.to_string(),
        };

        if dependent.id == depends_on.id {
            return Err(invalid("a module cannot depend on itself"));
        }
        if !dependent.is_loaded() {
            return Err(invalid("dependent is not loaded"));
        }
        if !depends_on.is_loaded() {
            return Err(invalid("dependency is not loaded"));
        }

        let key = (dependent.id.clone(), depends_on.id.clone());
        if self.edges.contains_key(&key) {
            return Ok(false);
        }
        self.edges.insert(
            key,
            DependencyEdge {
                dependent: dependent.id.clone(),
                depends_on: depends_on.id.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(true)
    }

    pub fn has_dependents(&self, id: &ModuleId) -> bool {
        self.edges.values().any(|edge| &edge.depends_on == id)
    }

    /// Modules that depend on `id`, in id order
    pub fn dependents_of(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.edges
            .values()
            .filter(|edge| &edge.depends_on == id)
            .map(|edge| edge.dependent.clone())
            .collect()
    }

    /// Modules that `id` depends on, in id order
    pub fn dependencies_of(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.edges
            .values()
            .filter(|edge| &edge.dependent == id)
            .map(|edge| edge.depends_on.clone())
            .collect()
    }

    /// Drop every edge touching `id` (either endpoint). Returns the removed edges.
    pub fn remove_all_edges_for(&mut self, id: &ModuleId) -> Vec<DependencyEdge> {
        let keys: Vec<_> = self
            .edges
            .keys()
            .filter(|(dependent, depends_on)| dependent == id || depends_on == id)
            .cloned()
            .collect();

        keys.into_iter()
            .filter_map(|key| self.edges.remove(&key))
            .collect()
    }

    pub fn contains(&self, dependent: &ModuleId, depends_on: &ModuleId) -> bool {
        self.edges
            .contains_key(&(dependent.clone(), depends_on.clone()))
    }

    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.values()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
