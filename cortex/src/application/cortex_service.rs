// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # CortexService - Module Memory Manager
//!
//! Application service owning every piece of mutable state: registry,
//! dependency graph, budget allocator, association table, pushed context,
//! learner counters and the identity overlay.
//!
//! ## Serialization
//!
//! All of it sits behind one `parking_lot::RwLock`. Mutating operations hold
//! the write lock for their whole plan-then-commit step, so a reader can never
//! see `used` updated while a module's status is stale (or the reverse).
//! Read-only views take the read lock and copy out a consistent snapshot.
//!
//! ## Events
//!
//! Each mutation publishes its `CortexEvent`s after committing but before
//! releasing the write lock, so the bus carries events in commit order.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

use crate::domain::association::AssociationTable;
use crate::domain::config::CortexConfig;
use crate::domain::context::{ContextAnalysis, ContextState};
use crate::domain::dependency::{DependencyEdge, DependencyGraph};
use crate::domain::errors::CortexError;
use crate::domain::events::{CortexEvent, EvictionReason};
use crate::domain::module::{Module, ModuleId, ModuleType, Priority, StatusFilter};
use crate::infrastructure::event_bus::{EventBus, EventReceiver, ModuleEventReceiver};

use super::allocator::{LoadReport, MemoryAllocator, OptimizeReport, ReleaseReport};
use super::analyzer::ContextAnalyzer;
use super::identity_manager::{IdentityManager, IdentitySnapshot};
use super::learner::{FeedbackLearner, FeedbackOutcome, InteractionRecord, LearningMetrics};
use super::registry::ModuleRegistry;

/// Per-module line of the memory usage report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedModuleUsage {
    pub id: ModuleId,
    pub name: String,
    pub size_tokens: u64,
    pub priority: Priority,
    pub loaded_at: Option<DateTime<Utc>>,
    pub usage_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub used_tokens: u64,
    pub limit_tokens: u64,
    pub free_tokens: u64,
    pub usage_percentage: f64,
    pub modules: Vec<LoadedModuleUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleCatalog {
    pub total_modules: usize,
    pub loaded_modules: usize,
    pub counts_by_type: BTreeMap<String, usize>,
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentState {
    pub memory: MemoryUsage,
    pub loaded_modules: Vec<ModuleId>,
    pub dependencies: Vec<DependencyEdge>,
    pub identity: IdentitySnapshot,
    pub context: ContextState,
}

/// Everything guarded by the service lock
#[derive(Debug)]
pub struct CortexState {
    registry: ModuleRegistry,
    graph: DependencyGraph,
    allocator: MemoryAllocator,
    associations: AssociationTable,
    context: ContextState,
    learner: FeedbackLearner,
    identities: IdentityManager,
}

impl CortexState {
    fn memory_usage(&self) -> MemoryUsage {
        let budget = self.allocator.budget();
        MemoryUsage {
            used_tokens: budget.used(),
            limit_tokens: budget.limit(),
            free_tokens: budget.free(),
            usage_percentage: budget.usage_percentage(),
            modules: self
                .registry
                .loaded()
                .map(|m| LoadedModuleUsage {
                    id: m.id.clone(),
                    name: m.name.clone(),
                    size_tokens: m.size_tokens,
                    priority: m.priority.unwrap_or_default(),
                    loaded_at: m.loaded_at,
                    usage_count: m.usage_count,
                })
                .collect(),
        }
    }

    fn load(
        &mut self,
        id: &ModuleId,
        priority: Priority,
        pinned: &HashSet<ModuleId>,
        events: &mut Vec<CortexEvent>,
    ) -> Result<LoadReport, CortexError> {
        // Sizes of would-be victims, captured before they are evicted
        let sizes: BTreeMap<ModuleId, u64> = self
            .registry
            .loaded()
            .map(|m| (m.id.clone(), m.size_tokens))
            .collect();

        let report = self.allocator.reserve_pinned(
            &mut self.registry,
            &mut self.graph,
            id,
            priority,
            pinned,
        )?;

        let now = Utc::now();
        for victim in &report.evicted {
            events.push(CortexEvent::ModuleEvicted {
                module_id: victim.clone(),
                size_tokens: sizes.get(victim).copied().unwrap_or_default(),
                reason: EvictionReason::Admission,
                timestamp: now,
            });
        }
        for loaded in &report.loaded {
            let module = self.registry.get(loaded)?;
            events.push(CortexEvent::ModuleLoaded {
                module_id: loaded.clone(),
                size_tokens: module.size_tokens,
                priority,
                used_tokens: self.allocator.budget().used(),
                timestamp: now,
            });
            for dependency in self.graph.dependencies_of(loaded) {
                events.push(CortexEvent::DependencyAdded {
                    dependent: loaded.clone(),
                    depends_on: dependency,
                    timestamp: now,
                });
            }
        }

        Ok(report)
    }
}

pub struct CortexService {
    state: RwLock<CortexState>,
    analyzer: ContextAnalyzer,
    event_bus: EventBus,
    buffer_tokens: u64,
}

impl CortexService {
    /// Build the service from configuration: register the catalog, activate
    /// the default identity, then preload modules in order.
    pub fn from_config(config: &CortexConfig) -> Result<Self, CortexError> {
        Self::with_event_bus(config, EventBus::with_default_capacity())
    }

    pub fn with_event_bus(config: &CortexConfig, event_bus: EventBus) -> Result<Self, CortexError> {
        let spec = &config.spec;
        let registry = ModuleRegistry::from_manifests(spec.modules.iter().cloned())?;

        let mut identities = IdentityManager::new(spec.identities.clone(), spec.personas.clone());
        if let Some(identity) = &spec.default_identity {
            identities.load_identity(identity)?;
        }

        let service = Self {
            state: RwLock::new(CortexState {
                registry,
                graph: DependencyGraph::new(),
                allocator: MemoryAllocator::new(spec.memory.limit_tokens),
                associations: AssociationTable::new(),
                context: ContextState::default(),
                learner: FeedbackLearner::new(spec.learning.learning_rate),
                identities,
            }),
            analyzer: ContextAnalyzer::new(spec.learning.min_suggestion_weight),
            event_bus,
            buffer_tokens: spec.memory.buffer_tokens,
        };

        for id in &spec.preload {
            service.load_module(id, None)?;
        }

        info!(
            modules = spec.modules.len(),
            limit_tokens = spec.memory.limit_tokens,
            preloaded = spec.preload.len(),
            "Cortex service initialized"
        );
        Ok(service)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    /// Events concerning one module only
    pub fn subscribe_module(&self, id: &ModuleId) -> ModuleEventReceiver {
        self.event_bus.subscribe_module(id.clone())
    }

    pub fn buffer_tokens(&self) -> u64 {
        self.buffer_tokens
    }

    // ========================================================================
    // Module cache
    // ========================================================================

    /// Load a module (and any unloaded dependencies). Loading an already
    /// loaded module succeeds without changing anything.
    pub fn load_module(&self, id: &ModuleId, priority: Option<Priority>) -> Result<LoadReport, CortexError> {
        let mut events = Vec::new();
        let result = {
            let mut state = self.state.write();
            let result = state.load(id, priority.unwrap_or_default(), &HashSet::new(), &mut events);
            self.event_bus.publish_all(events);
            result
        };

        if let Err(e) = &result {
            warn!(module_id = %id, error = %e, "Module load failed");
        }
        result
    }

    /// Admit several loads competing for space: higher priority first, equal
    /// priorities in request order. A later request never evicts a module
    /// loaded earlier in the same batch.
    pub fn load_modules(
        &self,
        requests: Vec<(ModuleId, Option<Priority>)>,
    ) -> Vec<(ModuleId, Result<LoadReport, CortexError>)> {
        let mut ordered: Vec<(ModuleId, Priority)> = requests
            .into_iter()
            .map(|(id, priority)| (id, priority.unwrap_or_default()))
            .collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1));

        let mut events = Vec::new();
        let mut outcomes = Vec::with_capacity(ordered.len());
        {
            let mut state = self.state.write();
            let mut pinned = HashSet::new();
            for (id, priority) in ordered {
                let result = state.load(&id, priority, &pinned, &mut events);
                if let Ok(report) = &result {
                    pinned.extend(report.loaded.iter().cloned());
                    pinned.insert(id.clone());
                }
                outcomes.push((id, result));
            }
            self.event_bus.publish_all(events);
        }

        outcomes
    }

    pub fn unload_module(&self, id: &ModuleId, force: bool) -> Result<ReleaseReport, CortexError> {
        let mut state = self.state.write();
        let state = &mut *state;
        let report = state
            .allocator
            .release(&mut state.registry, &mut state.graph, id, force)?;

        self.event_bus.publish(CortexEvent::ModuleUnloaded {
            module_id: report.module_id.clone(),
            size_tokens: report.size_tokens,
            forced: report.forced,
            dropped_edges: report.dropped_edges.len(),
            timestamp: Utc::now(),
        });
        Ok(report)
    }

    pub fn get_module(&self, id: &ModuleId) -> Result<Module, CortexError> {
        self.state.read().registry.get(id).cloned()
    }

    /// Modules matching the filters, in catalog order
    pub fn list_modules(&self, filter: StatusFilter, module_type: Option<ModuleType>) -> Vec<Module> {
        self.state
            .read()
            .registry
            .list(filter, module_type)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Record that `dependent` relies on `depends_on`. Both must be loaded.
    /// Returns false when the edge already existed.
    pub fn add_dependency(&self, dependent: &ModuleId, depends_on: &ModuleId) -> Result<bool, CortexError> {
        let mut state = self.state.write();
        let state = &mut *state;
        let from = state.registry.get(dependent)?;
        let to = state.registry.get(depends_on)?;
        let added = state.graph.add_edge(from, to)?;

        if added {
            info!(dependent = %dependent, depends_on = %depends_on, "Dependency added");
            self.event_bus.publish(CortexEvent::DependencyAdded {
                dependent: dependent.clone(),
                depends_on: depends_on.clone(),
                timestamp: Utc::now(),
            });
        }
        Ok(added)
    }

    pub fn get_memory_usage(&self) -> MemoryUsage {
        self.state.read().memory_usage()
    }

    /// Free at least `target_free` tokens (default: the configured buffer) by
    /// evicting dependent-free modules. Freeing less is reported, not an error.
    pub fn optimize_memory(&self, target_free: Option<u64>) -> Result<OptimizeReport, CortexError> {
        let target_free = target_free.unwrap_or(self.buffer_tokens);

        let mut state = self.state.write();
        let state = &mut *state;
        let sizes: BTreeMap<ModuleId, u64> = state
            .registry
            .loaded()
            .map(|m| (m.id.clone(), m.size_tokens))
            .collect();
        let report = state
            .allocator
            .optimize(&mut state.registry, &mut state.graph, target_free)?;

        let now = Utc::now();
        let mut events: Vec<CortexEvent> = report
            .evicted
            .iter()
            .map(|id| CortexEvent::ModuleEvicted {
                module_id: id.clone(),
                size_tokens: sizes.get(id).copied().unwrap_or_default(),
                reason: EvictionReason::Optimization,
                timestamp: now,
            })
            .collect();
        events.push(CortexEvent::MemoryOptimized {
            target_free,
            freed_tokens: report.freed_tokens,
            modules_evicted: report.evicted.len(),
            timestamp: now,
        });
        self.event_bus.publish_all(events);

        Ok(report)
    }

    // ========================================================================
    // Context & learning
    // ========================================================================

    /// Replace the active context wholesale
    pub fn push_context(
        &self,
        domain: Option<String>,
        keywords: Option<Vec<String>>,
        intent: Option<String>,
    ) -> ContextState {
        let context = ContextState::new(domain, keywords, intent);
        let mut state = self.state.write();
        state.context = context.clone();

        debug!(
            domain = ?context.domain,
            keywords = context.keywords().len(),
            intent = ?context.intent,
            "Context pushed"
        );
        self.event_bus.publish(CortexEvent::ContextPushed {
            domain: context.domain.clone(),
            keywords: context.keywords().to_vec(),
            intent: context.intent.clone(),
            timestamp: context.pushed_at.unwrap_or_else(Utc::now),
        });
        drop(state);
        context
    }

    pub fn current_context(&self) -> ContextState {
        self.state.read().context.clone()
    }

    pub fn analyze_context(&self, text: &str) -> ContextAnalysis {
        let state = self.state.read();
        self.analyzer.analyze(text, &state.registry, &state.associations)
    }

    /// Apply outcome feedback to the association table using the active
    /// context's keywords. Helpful modules also count as used.
    pub fn provide_feedback(&self, record: InteractionRecord) -> FeedbackOutcome {
        let mut guard = self.state.write();
        let outcome = {
            let state = &mut *guard;
            let registry = &state.registry;
            let outcome = state.learner.record_feedback(
                &mut state.associations,
                &state.context,
                &record,
                |id| registry.contains(id),
            );

            let mut helpful: Vec<&ModuleId> = Vec::new();
            for id in &record.helpful_modules {
                if state.registry.contains(id) && !helpful.contains(&id) {
                    helpful.push(id);
                }
            }
            for id in helpful {
                if let Err(e) = state.allocator.touch(&mut state.registry, id) {
                    warn!(module_id = %id, error = %e, "Failed to record module usage");
                }
            }
            outcome
        };

        info!(
            interaction_id = %outcome.interaction_id,
            success = outcome.success,
            adjusted_pairs = outcome.changes.len(),
            "Feedback recorded"
        );

        let now = Utc::now();
        let mut events = vec![CortexEvent::FeedbackRecorded {
            interaction_id: outcome.interaction_id.clone(),
            success: outcome.success,
            adjusted_pairs: outcome.changes.len(),
            timestamp: now,
        }];
        events.extend(outcome.changes.iter().map(|change| CortexEvent::AssociationAdjusted {
            keyword: change.keyword.clone(),
            module_id: change.module_id.clone(),
            old_weight: change.old_weight,
            new_weight: change.new_weight,
            timestamp: now,
        }));
        self.event_bus.publish_all(events);
        drop(guard);

        outcome
    }

    pub fn association_weight(&self, keyword: &str, module_id: &ModuleId) -> f64 {
        self.state.read().associations.weight(keyword, module_id)
    }

    pub fn learning_metrics(&self) -> LearningMetrics {
        let state = self.state.read();
        state
            .learner
            .metrics(&state.associations, self.analyzer.min_suggestion_weight())
    }

    // ========================================================================
    // Identity overlay
    // ========================================================================

    pub fn load_identity(&self, identity_id: &str) -> Result<(), CortexError> {
        let mut state = self.state.write();
        state.identities.load_identity(identity_id)?;
        self.event_bus.publish(CortexEvent::IdentityLoaded {
            identity_id: identity_id.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    pub fn apply_persona(&self, persona_id: &str) -> Result<(), CortexError> {
        let mut state = self.state.write();
        let identity_id = state.identities.apply_persona(persona_id)?;
        self.event_bus.publish(CortexEvent::PersonaApplied {
            identity_id,
            persona_id: persona_id.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    pub fn identity(&self) -> IdentitySnapshot {
        self.state.read().identities.snapshot()
    }

    // ========================================================================
    // Aggregate views
    // ========================================================================

    pub fn module_catalog(&self) -> ModuleCatalog {
        let state = self.state.read();
        let mut counts_by_type: BTreeMap<String, usize> = ModuleType::ALL
            .iter()
            .map(|t| (t.as_str().to_string(), 0))
            .collect();
        for module in state.registry.iter() {
            *counts_by_type
                .entry(module.module_type.as_str().to_string())
                .or_default() += 1;
        }

        ModuleCatalog {
            total_modules: state.registry.len(),
            loaded_modules: state.registry.loaded().count(),
            counts_by_type,
            modules: state.registry.iter().cloned().collect(),
        }
    }

    pub fn current_state(&self) -> CurrentState {
        let state = self.state.read();
        CurrentState {
            memory: state.memory_usage(),
            loaded_modules: state.registry.loaded().map(|m| m.id.clone()).collect(),
            dependencies: state.graph.edges().cloned().collect(),
            identity: state.identities.snapshot(),
            context: state.context.clone(),
        }
    }
}
