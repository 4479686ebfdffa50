// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Memory budget allocator
//!
//! Every mutation here is plan-then-commit: the plan is computed against the
//! current state and only applied once it is known to succeed, so a failed
//! reservation leaves registry, budget and graph untouched. Callers must hold
//! the single state lock across the whole call.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::domain::budget::MemoryBudget;
use crate::domain::dependency::{DependencyEdge, DependencyGraph};
use crate::domain::errors::CortexError;
use crate::domain::module::{Module, ModuleId, ModuleStatus, Priority};

use super::registry::ModuleRegistry;

/// Outcome of a successful load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub module_id: ModuleId,

    /// Modules that moved to `loaded`, dependencies first
    pub loaded: Vec<ModuleId>,

    /// Modules evicted to make room
    pub evicted: Vec<ModuleId>,

    /// True when the module was already loaded and nothing changed
    pub already_loaded: bool,
}

/// Outcome of a successful unload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseReport {
    pub module_id: ModuleId,
    pub size_tokens: u64,
    pub forced: bool,
    pub dropped_edges: Vec<DependencyEdge>,
}

/// Outcome of an optimization pass. Freeing less than requested is not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeReport {
    pub target_free: u64,
    pub freed_tokens: u64,
    pub evicted: Vec<ModuleId>,
    pub free_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct MemoryAllocator {
    budget: MemoryBudget,

    /// Logical clock stamping loads and uses; drives LRU ordering
    clock: u64,
}

impl MemoryAllocator {
    pub fn new(limit_tokens: u64) -> Self {
        Self {
            budget: MemoryBudget::new(limit_tokens),
            clock: 0,
        }
    }

    pub fn budget(&self) -> &MemoryBudget {
        &self.budget
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Load `id` together with any of its declared dependencies that are not
    /// loaded yet, evicting loaded modules (lowest priority first) if needed.
    pub fn reserve(
        &mut self,
        registry: &mut ModuleRegistry,
        graph: &mut DependencyGraph,
        id: &ModuleId,
        priority: Priority,
    ) -> Result<LoadReport, CortexError> {
        self.reserve_pinned(registry, graph, id, priority, &HashSet::new())
    }

    /// As `reserve`, but never evicts any module in `pinned`
    pub fn reserve_pinned(
        &mut self,
        registry: &mut ModuleRegistry,
        graph: &mut DependencyGraph,
        id: &ModuleId,
        priority: Priority,
        pinned: &HashSet<ModuleId>,
    ) -> Result<LoadReport, CortexError> {
        if registry.get(id)?.is_loaded() {
            debug!(module_id = %id, "Module already loaded");
            return Ok(LoadReport {
                module_id: id.clone(),
                loaded: vec![],
                evicted: vec![],
                already_loaded: true,
            });
        }

        let closure = registry.resolve_load_order(id)?;
        let to_load: Vec<ModuleId> = closure
            .iter()
            .filter(|m| registry.get(m).is_ok_and(|m| !m.is_loaded()))
            .cloned()
            .collect();

        let mut required: u64 = 0;
        for module_id in &to_load {
            required = required.saturating_add(registry.get(module_id)?.size_tokens);
        }

        let protected: HashSet<&ModuleId> = closure.iter().chain(pinned.iter()).collect();
        let eligible = |m: &Module| !protected.contains(&m.id);

        let Some(evicted) = self.plan_eviction(registry, graph, required, eligible) else {
            let evictable: u64 = self
                .eviction_candidates(registry, graph, eligible)
                .iter()
                .map(|m| m.size_tokens)
                .sum();
            return Err(CortexError::InsufficientMemory {
                id: id.clone(),
                required,
                available: self.budget.free().saturating_add(evictable),
                limit: self.budget.limit(),
            });
        };

        // Commit
        for victim in &evicted {
            self.evict(registry, graph, victim)?;
        }

        if !self.budget.try_reserve(required) {
            return Err(CortexError::InsufficientMemory {
                id: id.clone(),
                required,
                available: self.budget.free(),
                limit: self.budget.limit(),
            });
        }

        for module_id in &to_load {
            let seq = self.tick();
            let module = registry.get_mut(module_id)?;
            module.transition(ModuleStatus::Loading)?;
            module.mark_loaded(priority, seq)?;
        }

        for module_id in &to_load {
            let dependencies = registry.get(module_id)?.dependencies.clone();
            for dependency in &dependencies {
                graph.add_edge(registry.get(module_id)?, registry.get(dependency)?)?;
            }
        }

        info!(
            module_id = %id,
            priority = priority.as_str(),
            loaded = to_load.len(),
            evicted = evicted.len(),
            used_tokens = self.budget.used(),
            "Module loaded"
        );

        Ok(LoadReport {
            module_id: id.clone(),
            loaded: to_load,
            evicted,
            already_loaded: false,
        })
    }

    /// Unload `id`. Modules with dependents are only unloaded when forced,
    /// in which case the offending edges are dropped.
    pub fn release(
        &mut self,
        registry: &mut ModuleRegistry,
        graph: &mut DependencyGraph,
        id: &ModuleId,
        force: bool,
    ) -> Result<ReleaseReport, CortexError> {
        let module = registry.get(id)?;
        if !module.is_loaded() {
            return Err(CortexError::InvalidTransition {
                id: id.clone(),
                from: module.status,
                to: ModuleStatus::Available,
            });
        }

        let dependents = graph.dependents_of(id);
        if !dependents.is_empty() && !force {
            return Err(CortexError::HasDependents {
                id: id.clone(),
                dependents,
            });
        }

        let size_tokens = module.size_tokens;
        registry.get_mut(id)?.mark_available()?;
        let dropped_edges = graph.remove_all_edges_for(id);
        self.budget.release(size_tokens);

        info!(
            module_id = %id,
            forced = force,
            dropped_edges = dropped_edges.len(),
            used_tokens = self.budget.used(),
            "Module unloaded"
        );

        Ok(ReleaseReport {
            module_id: id.clone(),
            size_tokens,
            forced: force,
            dropped_edges,
        })
    }

    /// Evict dependent-free modules, lowest priority and least recently used
    /// first, until `target_free` tokens are free or no candidate remains.
    pub fn optimize(
        &mut self,
        registry: &mut ModuleRegistry,
        graph: &mut DependencyGraph,
        target_free: u64,
    ) -> Result<OptimizeReport, CortexError> {
        let free_before = self.budget.free();
        let mut evicted = Vec::new();

        if free_before < target_free {
            let candidates: Vec<(ModuleId, u64)> = self
                .eviction_candidates(registry, graph, |_| true)
                .into_iter()
                .map(|m| (m.id.clone(), m.size_tokens))
                .collect();

            for (module_id, _) in candidates {
                if self.budget.free() >= target_free {
                    break;
                }
                self.evict(registry, graph, &module_id)?;
                evicted.push(module_id);
            }
        }

        let freed_tokens = self.budget.free() - free_before;
        info!(
            target_free,
            freed_tokens,
            evicted = evicted.len(),
            free_tokens = self.budget.free(),
            "Memory optimization pass complete"
        );

        Ok(OptimizeReport {
            target_free,
            freed_tokens,
            evicted,
            free_tokens: self.budget.free(),
        })
    }

    /// Mark a loaded module as recently used
    pub fn touch(&mut self, registry: &mut ModuleRegistry, id: &ModuleId) -> Result<(), CortexError> {
        let seq = self.tick();
        registry.get_mut(id)?.record_usage(seq);
        Ok(())
    }

    /// Loaded, dependent-free modules accepted by `eligible`, in eviction order
    fn eviction_candidates<'a>(
        &self,
        registry: &'a ModuleRegistry,
        graph: &DependencyGraph,
        eligible: impl Fn(&Module) -> bool,
    ) -> Vec<&'a Module> {
        let mut candidates: Vec<&Module> = registry
            .loaded()
            .filter(|m| !graph.has_dependents(&m.id))
            .filter(|m| eligible(m))
            .collect();
        candidates.sort_by_key(|m| (m.priority.unwrap_or_default(), m.last_used_seq, m.load_seq));
        candidates
    }

    /// Smallest eviction prefix that makes room for `required` tokens.
    /// None if even evicting every candidate is not enough.
    fn plan_eviction(
        &self,
        registry: &ModuleRegistry,
        graph: &DependencyGraph,
        required: u64,
        eligible: impl Fn(&Module) -> bool,
    ) -> Option<Vec<ModuleId>> {
        if required > self.budget.limit() {
            return None;
        }

        let mut free = self.budget.free();
        let mut plan = Vec::new();
        for candidate in self.eviction_candidates(registry, graph, eligible) {
            if free >= required {
                break;
            }
            free += candidate.size_tokens;
            plan.push(candidate.id.clone());
        }

        (free >= required).then_some(plan)
    }

    fn evict(
        &mut self,
        registry: &mut ModuleRegistry,
        graph: &mut DependencyGraph,
        id: &ModuleId,
    ) -> Result<(), CortexError> {
        let module = registry.get_mut(id)?;
        let size_tokens = module.size_tokens;
        module.mark_available()?;
        graph.remove_all_edges_for(id);
        self.budget.release(size_tokens);

        debug!(module_id = %id, size_tokens, "Module evicted");
        Ok(())
    }
}
