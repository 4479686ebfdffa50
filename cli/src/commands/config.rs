// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use cortex_core::domain::config::CortexConfig;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate a configuration file holding the built-in defaults
    Generate {
        /// Output path (default: ./cortex-config.yaml)
        #[arg(short, long, default_value = "./cortex-config.yaml")]
        output: PathBuf,
    },
}

pub fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output } => generate(&output),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = CortexConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. CORTEX_CONFIG_PATH: {}",
            std::env::var("CORTEX_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./cortex-config.yaml");
        println!("  4. ~/.cortex/config.yaml");
        println!("  5. /etc/cortex/config.yaml");
        println!();
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Memory:".bold());
    println!("  Limit: {} tokens", spec.memory.limit_tokens);
    println!("  Buffer: {} tokens", spec.memory.buffer_tokens);
    println!();

    println!("{}", "Learning:".bold());
    println!("  Learning rate: {}", spec.learning.learning_rate);
    println!("  Min suggestion weight: {}", spec.learning.min_suggestion_weight);
    println!();

    println!("{}", "Optimizer:".bold());
    println!("  Enabled: {}", spec.optimizer.enabled);
    println!("  Interval: {}s", spec.optimizer.interval_seconds);
    println!();

    println!("{}", "Modules:".bold());
    for module in &spec.modules {
        println!(
            "  {} ({}, {} tokens)",
            module.id.as_str().bold(),
            module.module_type.as_str(),
            module.size_tokens
        );
        if !module.dependencies.is_empty() {
            let deps: Vec<&str> = module.dependencies.iter().map(|d| d.as_str()).collect();
            println!("    Depends on: {}", deps.join(", "));
        }
    }
    println!();

    println!("{}", "Identities:".bold());
    for identity in &spec.identities {
        println!("  - {}", identity.id);
    }
    println!(
        "  Default: {}",
        spec.default_identity.as_deref().unwrap_or("(none)")
    );
    println!();

    if !spec.preload.is_empty() {
        let preload: Vec<&str> = spec.preload.iter().map(|id| id.as_str()).collect();
        println!("{}", "Preload:".bold());
        println!("  {}", preload.join(", "));
        println!();
    }

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = CortexConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: &Path) -> Result<()> {
    CortexConfig::default()
        .to_yaml_file(output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cortex-config.yaml");

        generate(&path).unwrap();
        let config = CortexConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.spec.modules.len(), CortexConfig::default().spec.modules.len());

        validate(Some(path)).unwrap();
    }

    #[test]
    fn test_validate_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate(Some(dir.path().join("absent.yaml"))).is_err());
    }
}
