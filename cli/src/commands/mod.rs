// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Cortex CLI

pub mod call;
pub mod config;
pub mod serve;

pub use self::config::ConfigCommand;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use cortex_core::application::CortexService;
use cortex_core::domain::config::CortexConfig;

/// Load, validate and build the service every command runs against
pub fn build_service(config_path: Option<PathBuf>) -> Result<(CortexConfig, Arc<CortexService>)> {
    let config = CortexConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let service = CortexService::from_config(&config).context("Failed to initialize cortex")?;
    Ok((config, Arc::new(service)))
}
