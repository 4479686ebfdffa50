// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain errors for the Cortex bounded context
//!
//! Every variant is a local, recoverable condition. The presentation layer
//! turns them into user-visible messages; nothing in the core aborts on them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::module::{ModuleId, ModuleStatus};

/// What kind of entity a `NotFound` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Module,
    Identity,
    Persona,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Module => write!(f, "Module"),
            Self::Identity => write!(f, "Identity"),
            Self::Persona => write!(f, "Persona"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CortexError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Invalid state transition for module {id} from {from:?} to {to:?}")]
    InvalidTransition {
        id: ModuleId,
        from: ModuleStatus,
        to: ModuleStatus,
    },

    #[error("Invalid dependency edge {dependent} -> {depends_on}: {reason}")]
    InvalidEdge {
        dependent: ModuleId,
        depends_on: ModuleId,
        reason: String,
    },

    #[error("Module {id} has dependents ({}). Use force=true to unload anyway.", join_ids(.dependents, ", "))]
    HasDependents {
        id: ModuleId,
        dependents: Vec<ModuleId>,
    },

    #[error("Insufficient memory to load {id}: {required} tokens required, {available} of {limit} available after eviction")]
    InsufficientMemory {
        id: ModuleId,
        required: u64,
        available: u64,
        limit: u64,
    },

    #[error("Circular dependency detected: {}", join_ids(.chain, " -> "))]
    CircularDependency { chain: Vec<ModuleId> },

    #[error("No identity loaded; load an identity before applying a persona")]
    NoActiveIdentity,

    #[error("Invalid module manifest: {0}")]
    InvalidManifest(String),
}

impl CortexError {
    pub fn module_not_found(id: &ModuleId) -> Self {
        Self::NotFound {
            kind: EntityKind::Module,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable tag for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InvalidEdge { .. } => "invalid_edge",
            Self::HasDependents { .. } => "has_dependents",
            Self::InsufficientMemory { .. } => "insufficient_memory",
            Self::CircularDependency { .. } => "circular_dependency",
            Self::NoActiveIdentity => "no_active_identity",
            Self::InvalidManifest(_) => "invalid_manifest",
        }
    }
}

fn join_ids(ids: &[ModuleId], separator: &str) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}
