// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Value objects, aggregates and invariants of the module memory manager.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Modules, budget, dependency graph, context, associations, identity overlay

pub mod association;
pub mod budget;
pub mod catalog;
pub mod config;
pub mod context;
pub mod dependency;
pub mod errors;
pub mod events;
pub mod identity;
pub mod module;

pub use association::*;
pub use budget::*;
pub use config::CortexConfig;
pub use context::*;
pub use dependency::*;
pub use errors::*;
pub use events::*;
pub use identity::*;
pub use module::*;
