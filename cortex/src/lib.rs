// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cortex
//!
//! Budget-constrained cache of cognitive modules with dependency-aware
//! eviction, context-driven suggestions and feedback-weighted learning.
//!
//! # Architecture
//!
//! - **Layer:** Learning & Memory Layer
//! - **Purpose:** Module registry, allocator, dependency graph, analyzer, learner

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use application::CortexService;
pub use domain::*;
pub use infrastructure::*;
