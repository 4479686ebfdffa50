// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Memory Optimizer - Background task keeping budget headroom
//!
//! Periodically checks free tokens and, when they drop below the configured
//! buffer, runs an optimization pass to get back to the buffer.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Keeps `buffer_tokens` free between explicit loads

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::config::OptimizerConfig;

use super::allocator::OptimizeReport;
use super::cortex_service::CortexService;

/// What the optimizer needs from the cortex
pub trait MemoryMaintenance: Send + Sync {
    fn free_tokens(&self) -> u64;
    fn buffer_tokens(&self) -> u64;
    fn optimize(&self, target_free: u64) -> Result<OptimizeReport>;
}

impl MemoryMaintenance for CortexService {
    fn free_tokens(&self) -> u64 {
        self.get_memory_usage().free_tokens
    }

    fn buffer_tokens(&self) -> u64 {
        CortexService::buffer_tokens(self)
    }

    fn optimize(&self, target_free: u64) -> Result<OptimizeReport> {
        Ok(self.optimize_memory(Some(target_free))?)
    }
}

/// Configuration for the memory optimizer
#[derive(Debug, Clone)]
pub struct MemoryOptimizerConfig {
    /// How often to check headroom (in seconds)
    pub interval_seconds: u64,

    /// Whether the background task runs at all
    pub enabled: bool,
}

impl Default for MemoryOptimizerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            enabled: true,
        }
    }
}

impl From<&OptimizerConfig> for MemoryOptimizerConfig {
    fn from(config: &OptimizerConfig) -> Self {
        Self {
            interval_seconds: config.interval_seconds,
            enabled: config.enabled,
        }
    }
}

pub struct MemoryOptimizer {
    cortex: Arc<dyn MemoryMaintenance>,
    config: MemoryOptimizerConfig,
    shutdown_token: CancellationToken,
}

impl MemoryOptimizer {
    pub fn new(cortex: Arc<dyn MemoryMaintenance>, config: MemoryOptimizerConfig) -> Self {
        Self {
            cortex,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Start the optimizer background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        if !self.config.enabled {
            info!("Memory optimizer is disabled");
            return;
        }

        info!(
            interval_seconds = self.config.interval_seconds,
            buffer_tokens = self.cortex.buffer_tokens(),
            "Starting memory optimizer background task"
        );

        let mut tick = interval(Duration::from_secs(self.config.interval_seconds.max(1)));

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    match self.optimize_cycle() {
                        Ok(Some(report)) => {
                            info!(
                                freed_tokens = report.freed_tokens,
                                evicted = report.evicted.len(),
                                "Memory optimizer reclaimed headroom"
                            );
                        }
                        Ok(None) => debug!("Memory headroom sufficient"),
                        Err(e) => warn!("Memory optimizer cycle failed: {}", e),
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping memory optimizer");
                    break;
                }
            }
        }

        info!("Memory optimizer background task stopped");
    }

    /// One check: optimize back to the buffer only if free space fell below it
    pub fn optimize_cycle(&self) -> Result<Option<OptimizeReport>> {
        let buffer = self.cortex.buffer_tokens();
        let free = self.cortex.free_tokens();
        if free >= buffer {
            return Ok(None);
        }

        debug!(free_tokens = free, buffer_tokens = buffer, "Free memory below buffer");
        self.cortex.optimize(buffer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::CortexConfig;
    use crate::domain::module::ModuleId;
    use parking_lot::Mutex;

    struct MockCortex {
        free: u64,
        buffer: u64,
        calls: Mutex<Vec<u64>>,
    }

    impl MemoryMaintenance for MockCortex {
        fn free_tokens(&self) -> u64 {
            self.free
        }

        fn buffer_tokens(&self) -> u64 {
            self.buffer
        }

        fn optimize(&self, target_free: u64) -> Result<OptimizeReport> {
            self.calls.lock().push(target_free);
            Ok(OptimizeReport {
                target_free,
                freed_tokens: target_free - self.free,
                evicted: vec![],
                free_tokens: target_free,
            })
        }
    }

    fn mock(free: u64, buffer: u64) -> Arc<MockCortex> {
        Arc::new(MockCortex {
            free,
            buffer,
            calls: Mutex::new(vec![]),
        })
    }

    #[test]
    fn test_optimizer_configuration() {
        let config = MemoryOptimizerConfig::default();
        assert_eq!(config.interval_seconds, 60);
        assert!(config.enabled);
    }

    #[test]
    fn test_cycle_skips_when_headroom_sufficient() {
        let cortex = mock(10_000, 5_000);
        let optimizer = MemoryOptimizer::new(cortex.clone(), MemoryOptimizerConfig::default());

        assert!(optimizer.optimize_cycle().unwrap().is_none());
        assert!(cortex.calls.lock().is_empty());
    }

    #[test]
    fn test_cycle_optimizes_to_buffer() {
        let cortex = mock(1_000, 5_000);
        let optimizer = MemoryOptimizer::new(cortex.clone(), MemoryOptimizerConfig::default());

        let report = optimizer.optimize_cycle().unwrap().unwrap();
        assert_eq!(report.freed_tokens, 4_000);
        assert_eq!(*cortex.calls.lock(), vec![5_000]);
    }

    #[test]
    fn test_cycle_against_service() {
        let mut config = CortexConfig::default();
        config.spec.preload = vec![
            ModuleId::from("python_expertise"),
            ModuleId::from("javascript_expertise"),
            ModuleId::from("core_identity"),
        ];
        let service = Arc::new(CortexService::from_config(&config).unwrap());
        assert_eq!(service.get_memory_usage().free_tokens, 0);

        let optimizer = MemoryOptimizer::new(service.clone(), MemoryOptimizerConfig::from(&config.spec.optimizer));
        let report = optimizer.optimize_cycle().unwrap().unwrap();

        assert_eq!(report.evicted, vec![ModuleId::from("python_expertise")]);
        assert!(service.get_memory_usage().free_tokens >= 5_000);
    }

    #[tokio::test]
    async fn test_optimizer_disabled() {
        let config = MemoryOptimizerConfig {
            enabled: false,
            ..Default::default()
        };
        let cortex = mock(0, 5_000);
        let optimizer = Arc::new(MemoryOptimizer::new(cortex.clone(), config));

        let handle = optimizer.start();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(cortex.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_optimizer_shutdown() {
        let cortex = mock(0, 5_000);
        let optimizer = Arc::new(MemoryOptimizer::new(cortex.clone(), MemoryOptimizerConfig::default()));
        let token = optimizer.shutdown_token();

        let handle = optimizer.start();
        // first interval tick fires immediately
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*cortex.calls.lock(), vec![5_000]);
    }
}
