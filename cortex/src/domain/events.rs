// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the Cortex bounded context
//!
//! Published after a state change has committed. Events are for observers
//! only; every operation already returns its result to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::module::{ModuleId, Priority};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CortexEvent {
    // Module cache events

    /// A module finished loading and its tokens are reserved
    ModuleLoaded {
        module_id: ModuleId,
        size_tokens: u64,
        priority: Priority,
        used_tokens: u64,
        timestamp: DateTime<Utc>,
    },

    /// A module was unloaded on request
    ModuleUnloaded {
        module_id: ModuleId,
        size_tokens: u64,
        forced: bool,
        dropped_edges: usize,
        timestamp: DateTime<Utc>,
    },

    /// A module was evicted to make room or during optimization
    ModuleEvicted {
        module_id: ModuleId,
        size_tokens: u64,
        reason: EvictionReason,
        timestamp: DateTime<Utc>,
    },

    /// An optimization pass completed
    MemoryOptimized {
        target_free: u64,
        freed_tokens: u64,
        modules_evicted: usize,
        timestamp: DateTime<Utc>,
    },

    /// A dependency edge was registered
    DependencyAdded {
        dependent: ModuleId,
        depends_on: ModuleId,
        timestamp: DateTime<Utc>,
    },

    // Context & learning events

    /// A new context replaced the previous one
    ContextPushed {
        domain: Option<String>,
        keywords: Vec<String>,
        intent: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Outcome feedback was consumed by the learner
    FeedbackRecorded {
        interaction_id: String,
        success: bool,
        adjusted_pairs: usize,
        timestamp: DateTime<Utc>,
    },

    /// A keyword -> module association weight moved
    AssociationAdjusted {
        keyword: String,
        module_id: ModuleId,
        old_weight: f64,
        new_weight: f64,
        timestamp: DateTime<Utc>,
    },

    // Identity overlay events

    IdentityLoaded {
        identity_id: String,
        timestamp: DateTime<Utc>,
    },

    PersonaApplied {
        identity_id: String,
        persona_id: String,
        timestamp: DateTime<Utc>,
    },
}

/// Why a module was evicted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionReason {
    /// Freed space for an incoming reservation
    Admission,
    /// Explicit or background optimization pass
    Optimization,
}

impl CortexEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            CortexEvent::ModuleLoaded { timestamp, .. } => *timestamp,
            CortexEvent::ModuleUnloaded { timestamp, .. } => *timestamp,
            CortexEvent::ModuleEvicted { timestamp, .. } => *timestamp,
            CortexEvent::MemoryOptimized { timestamp, .. } => *timestamp,
            CortexEvent::DependencyAdded { timestamp, .. } => *timestamp,
            CortexEvent::ContextPushed { timestamp, .. } => *timestamp,
            CortexEvent::FeedbackRecorded { timestamp, .. } => *timestamp,
            CortexEvent::AssociationAdjusted { timestamp, .. } => *timestamp,
            CortexEvent::IdentityLoaded { timestamp, .. } => *timestamp,
            CortexEvent::PersonaApplied { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            CortexEvent::ModuleLoaded { .. } => "module_loaded",
            CortexEvent::ModuleUnloaded { .. } => "module_unloaded",
            CortexEvent::ModuleEvicted { .. } => "module_evicted",
            CortexEvent::MemoryOptimized { .. } => "memory_optimized",
            CortexEvent::DependencyAdded { .. } => "dependency_added",
            CortexEvent::ContextPushed { .. } => "context_pushed",
            CortexEvent::FeedbackRecorded { .. } => "feedback_recorded",
            CortexEvent::AssociationAdjusted { .. } => "association_adjusted",
            CortexEvent::IdentityLoaded { .. } => "identity_loaded",
            CortexEvent::PersonaApplied { .. } => "persona_applied",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = CortexEvent::ModuleEvicted {
            module_id: ModuleId::from("python_expertise"),
            size_tokens: 50_000,
            reason: EvictionReason::Admission,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"module_evicted\""));
        assert!(json.contains("\"reason\":\"admission\""));

        let deserialized: CortexEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event.event_type(), deserialized.event_type());
    }

    #[test]
    fn test_feedback_event_type() {
        let event = CortexEvent::FeedbackRecorded {
            interaction_id: "int-1".to_string(),
            success: true,
            adjusted_pairs: 2,
            timestamp: Utc::now(),
        };

        assert_eq!(event.event_type(), "feedback_recorded");
    }
}
