// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Cortex Events
//
// Provides in-memory event streaming using tokio broadcast channels.
// Observers (the CLI's serve loop, tests) subscribe; publishers never block
// and never fail when nobody is listening.

use crate::domain::events::CortexEvent;
use crate::domain::module::ModuleId;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Event bus for publishing and subscribing to cortex events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<CortexEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish an event to all subscribers, returning how many received it
    pub fn publish(&self, event: CortexEvent) -> usize {
        debug!(event_type = event.event_type(), "Publishing event");

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
        receiver_count
    }

    /// Publish a batch in order
    pub fn publish_all(&self, events: impl IntoIterator<Item = CortexEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Subscribe to all cortex events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe and filter for events about a single module
    pub fn subscribe_module(&self, module_id: ModuleId) -> ModuleEventReceiver {
        ModuleEventReceiver {
            receiver: self.sender.subscribe(),
            module_id,
        }
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all cortex events
pub struct EventReceiver {
    receiver: broadcast::Receiver<CortexEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<CortexEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<CortexEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for events concerning one module (filtered)
pub struct ModuleEventReceiver {
    receiver: broadcast::Receiver<CortexEvent>,
    module_id: ModuleId,
}

impl ModuleEventReceiver {
    /// Receive the next event for the module, skipping everything else
    pub async fn recv(&mut self) -> Result<CortexEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if self.matches_module(&event) {
                return Ok(event);
            }
        }
    }

    fn matches_module(&self, event: &CortexEvent) -> bool {
        match event {
            CortexEvent::ModuleLoaded { module_id, .. } => module_id == &self.module_id,
            CortexEvent::ModuleUnloaded { module_id, .. } => module_id == &self.module_id,
            CortexEvent::ModuleEvicted { module_id, .. } => module_id == &self.module_id,
            CortexEvent::AssociationAdjusted { module_id, .. } => module_id == &self.module_id,
            CortexEvent::DependencyAdded {
                dependent,
                depends_on,
                ..
            } => dependent == &self.module_id || depends_on == &self.module_id,
            CortexEvent::MemoryOptimized { .. }
            | CortexEvent::ContextPushed { .. }
            | CortexEvent::FeedbackRecorded { .. }
            | CortexEvent::IdentityLoaded { .. }
            | CortexEvent::PersonaApplied { .. } => false,
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::EvictionReason;
    use crate::domain::module::Priority;
    use chrono::Utc;

    fn loaded(id: &str) -> CortexEvent {
        CortexEvent::ModuleLoaded {
            module_id: ModuleId::from(id),
            size_tokens: 100,
            priority: Priority::Normal,
            used_tokens: 100,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        assert_eq!(event_bus.publish(loaded("python_expertise")), 1);

        match receiver.recv().await.unwrap() {
            CortexEvent::ModuleLoaded { module_id, .. } => {
                assert_eq!(module_id, ModuleId::from("python_expertise"));
            }
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let event_bus = EventBus::new(10);
        assert_eq!(event_bus.publish(loaded("html_css")), 0);
    }

    #[tokio::test]
    async fn test_module_event_filtering() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_module(ModuleId::from("debugging_tools"));

        event_bus.publish(loaded("python_expertise"));
        event_bus.publish(CortexEvent::ModuleEvicted {
            module_id: ModuleId::from("debugging_tools"),
            size_tokens: 20_000,
            reason: EvictionReason::Optimization,
            timestamp: Utc::now(),
        });

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event_type(), "module_evicted");
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.publish(loaded("first")), 2);
        event_bus.publish_all(vec![loaded("a"), loaded("b")]);

        assert_eq!(receiver1.recv().await.unwrap().event_type(), "module_loaded");
        assert_eq!(receiver2.recv().await.unwrap().event_type(), "module_loaded");
        assert!(receiver1.try_recv().is_ok());
        assert!(receiver1.try_recv().is_ok());
        assert!(matches!(receiver1.try_recv(), Err(EventBusError::Empty)));
    }
}
