// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod allocator;
pub mod analyzer;
pub mod cortex_service;
pub mod identity_manager;
pub mod learner;
pub mod memory_optimizer;
pub mod registry;

pub use allocator::{LoadReport, MemoryAllocator, OptimizeReport, ReleaseReport};
pub use analyzer::{detect_domain, detect_intent, extract_keywords, ContextAnalyzer};
pub use cortex_service::{CortexService, CurrentState, LoadedModuleUsage, MemoryUsage, ModuleCatalog};
pub use identity_manager::{IdentityManager, IdentitySnapshot};
pub use learner::{FeedbackLearner, FeedbackOutcome, InteractionRecord, LearningMetrics};
pub use memory_optimizer::{MemoryMaintenance, MemoryOptimizer, MemoryOptimizerConfig};
pub use registry::ModuleRegistry;
