// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Cortex Configuration Types
//
// Defines the configuration schema for a Cortex host, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Memory budget and optimizer headroom
// - Learning-rate and suggestion threshold for the feedback learner
// - Module, identity and persona catalogs

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::catalog::{builtin_identities, builtin_modules, builtin_personas};
use super::identity::{IdentityProfile, PersonaProfile};
use super::module::{ModuleId, ModuleManifest};

pub const API_VERSION: &str = "cortex/v1";
pub const KIND: &str = "CortexConfig";

/// Top-level Kubernetes-style cortex configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CortexConfig {
    /// API version (must be "cortex/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "CortexConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: CortexConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CortexConfigSpec {
    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub learning: LearningConfig,

    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Module catalog, in catalog order
    #[serde(default = "builtin_modules")]
    pub modules: Vec<ModuleManifest>,

    #[serde(default = "builtin_identities")]
    pub identities: Vec<IdentityProfile>,

    #[serde(default = "builtin_personas")]
    pub personas: Vec<PersonaProfile>,

    /// Identity loaded at startup
    #[serde(default = "default_identity")]
    pub default_identity: Option<String>,

    /// Modules loaded at startup, in order
    #[serde(default)]
    pub preload: Vec<ModuleId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Global token capacity
    #[serde(default = "default_limit_tokens")]
    pub limit_tokens: u64,

    /// Headroom the optimizer tries to keep free
    #[serde(default = "default_buffer_tokens")]
    pub buffer_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Step applied to an association weight per feedback
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Learned associations below this weight are not suggested
    #[serde(default = "default_min_suggestion_weight")]
    pub min_suggestion_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

fn default_true() -> bool {
    true
}

fn default_limit_tokens() -> u64 {
    100_000
}

fn default_buffer_tokens() -> u64 {
    5_000
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_min_suggestion_weight() -> f64 {
    0.25
}

fn default_interval_seconds() -> u64 {
    60
}

fn default_identity() -> Option<String> {
    Some("assistant".to_string())
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            limit_tokens: default_limit_tokens(),
            buffer_tokens: default_buffer_tokens(),
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            min_suggestion_weight: default_min_suggestion_weight(),
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: default_interval_seconds(),
        }
    }
}

impl Default for CortexConfigSpec {
    fn default() -> Self {
        Self {
            memory: MemoryConfig::default(),
            learning: LearningConfig::default(),
            optimizer: OptimizerConfig::default(),
            modules: builtin_modules(),
            identities: builtin_identities(),
            personas: builtin_personas(),
            default_identity: default_identity(),
            preload: vec![],
        }
    }
}

impl Default for CortexConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "cortex".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: CortexConfigSpec::default(),
        }
    }
}

impl CortexConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. CORTEX_CONFIG_PATH environment variable
    /// 2. ./cortex-config.yaml (working directory)
    /// 3. ~/.cortex/config.yaml (user home)
    /// 4. /etc/cortex/config.yaml (system, Unix) or C:\ProgramData\Cortex\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CORTEX_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./cortex-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".cortex").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/cortex/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Cortex\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load from an explicit path (must exist), else discovery, else defaults.
    /// Environment overrides are applied in every case.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using built-in defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("CORTEX_MEMORY_LIMIT_TOKENS") {
            match val.parse::<u64>() {
                Ok(limit) => {
                    tracing::info!("Environment override: CORTEX_MEMORY_LIMIT_TOKENS={}", limit);
                    self.spec.memory.limit_tokens = limit;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for CORTEX_MEMORY_LIMIT_TOKENS: '{}'. Expected an integer. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("CORTEX_MEMORY_BUFFER_TOKENS") {
            match val.parse::<u64>() {
                Ok(buffer) => {
                    tracing::info!("Environment override: CORTEX_MEMORY_BUFFER_TOKENS={}", buffer);
                    self.spec.memory.buffer_tokens = buffer;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for CORTEX_MEMORY_BUFFER_TOKENS: '{}'. Expected an integer. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("CORTEX_LEARNING_RATE") {
            match val.parse::<f64>() {
                Ok(rate) => {
                    tracing::info!("Environment override: CORTEX_LEARNING_RATE={}", rate);
                    self.spec.learning.learning_rate = rate;
                }
                Err(_) => tracing::warn!(
                    "Invalid value for CORTEX_LEARNING_RATE: '{}'. Expected a number. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("CORTEX_OPTIMIZER_ENABLED") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => {
                    tracing::info!("Environment override: CORTEX_OPTIMIZER_ENABLED=true");
                    self.spec.optimizer.enabled = true;
                }
                "false" | "0" | "no" | "off" => {
                    tracing::info!("Environment override: CORTEX_OPTIMIZER_ENABLED=false");
                    self.spec.optimizer.enabled = false;
                }
                _ => tracing::warn!(
                    "Invalid value for CORTEX_OPTIMIZER_ENABLED: '{}'. Expected true/false. Ignoring.",
                    val
                ),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!("Invalid apiVersion: '{}'. Must be '{}'", self.api_version, API_VERSION);
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let spec = &self.spec;

        if spec.memory.limit_tokens == 0 {
            anyhow::bail!("spec.memory.limit_tokens must be greater than zero");
        }
        if spec.memory.buffer_tokens >= spec.memory.limit_tokens {
            anyhow::bail!(
                "spec.memory.buffer_tokens ({}) must be smaller than limit_tokens ({})",
                spec.memory.buffer_tokens,
                spec.memory.limit_tokens
            );
        }

        let rate = spec.learning.learning_rate;
        if !(rate > 0.0 && rate <= 1.0) {
            anyhow::bail!("spec.learning.learning_rate must be in (0, 1], got {}", rate);
        }
        let threshold = spec.learning.min_suggestion_weight;
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("spec.learning.min_suggestion_weight must be in [0, 1], got {}", threshold);
        }

        if spec.optimizer.interval_seconds == 0 {
            anyhow::bail!("spec.optimizer.interval_seconds must be greater than zero");
        }

        let mut module_ids = HashSet::new();
        for module in &spec.modules {
            if module.id.as_str().is_empty() {
                anyhow::bail!("Module id cannot be empty");
            }
            if !module_ids.insert(module.id.clone()) {
                anyhow::bail!("Duplicate module id: {}", module.id);
            }
            if module.size_tokens == 0 {
                anyhow::bail!("Module {} must have a size greater than zero", module.id);
            }
        }
        for module in &spec.modules {
            for dependency in &module.dependencies {
                if !module_ids.contains(dependency) {
                    anyhow::bail!("Module {} depends on unknown module {}", module.id, dependency);
                }
            }
        }

        let mut identity_ids = HashSet::new();
        for identity in &spec.identities {
            if !identity_ids.insert(identity.id.as_str()) {
                anyhow::bail!("Duplicate identity id: {}", identity.id);
            }
        }
        let mut persona_ids = HashSet::new();
        for persona in &spec.personas {
            if !persona_ids.insert(persona.id.as_str()) {
                anyhow::bail!("Duplicate persona id: {}", persona.id);
            }
        }

        if let Some(identity) = &spec.default_identity {
            if !identity_ids.contains(identity.as_str()) {
                anyhow::bail!("Default identity '{}' not found in identities", identity);
            }
        }

        for id in &spec.preload {
            if !module_ids.contains(id) {
                anyhow::bail!("Preload module '{}' not found in modules", id);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::module::ModuleType;

    #[test]
    fn test_default_config() {
        let config = CortexConfig::default();
        assert_eq!(config.api_version, API_VERSION);
        assert_eq!(config.kind, KIND);
        assert_eq!(config.spec.memory.limit_tokens, 100_000);
        assert_eq!(config.spec.memory.buffer_tokens, 5_000);
        assert_eq!(config.spec.modules.len(), 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = r#"
apiVersion: cortex/v1
kind: CortexConfig
metadata:
  name: test-host
spec:
  memory:
    limit_tokens: 20000
"#;
        let config = CortexConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.spec.memory.limit_tokens, 20_000);
        assert_eq!(config.spec.memory.buffer_tokens, 5_000);
        assert_eq!(config.spec.learning.learning_rate, 0.1);
        assert_eq!(config.spec.modules[0].id, ModuleId::from("python_expertise"));
        assert_eq!(config.spec.default_identity.as_deref(), Some("assistant"));
    }

    #[test]
    fn test_custom_modules_yaml() {
        let yaml = r#"
apiVersion: cortex/v1
kind: CortexConfig
metadata:
  name: test-host
spec:
  modules:
    - id: rust_expertise
      type: knowledge
      name: Rust
      size_tokens: 30000
      triggers: [rust, cargo]
    - id: borrow_checker
      type: capability
      name: Borrow Checker Help
      size_tokens: 8000
      dependencies: [rust_expertise]
"#;
        let config = CortexConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.spec.modules.len(), 2);
        assert_eq!(config.spec.modules[0].module_type, ModuleType::Knowledge);
        assert_eq!(config.spec.modules[1].version, "1.0.0");
        assert_eq!(config.spec.modules[1].dependencies, vec![ModuleId::from("rust_expertise")]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cortex-config.yaml");

        let mut config = CortexConfig::default();
        config.metadata.name = "roundtrip".to_string();
        config.spec.preload = vec![ModuleId::from("core_identity")];
        config.to_yaml_file(&path).unwrap();

        let loaded = CortexConfig::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.metadata.name, "roundtrip");
        assert_eq!(loaded.spec.preload, vec![ModuleId::from("core_identity")]);
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = CortexConfig::load_or_default(Some(dir.path().join("missing.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = CortexConfig::default();
        config.apply_overrides(|key| match key {
            "CORTEX_MEMORY_LIMIT_TOKENS" => Some("250000".to_string()),
            "CORTEX_LEARNING_RATE" => Some("not-a-number".to_string()),
            "CORTEX_OPTIMIZER_ENABLED" => Some("off".to_string()),
            _ => None,
        });

        assert_eq!(config.spec.memory.limit_tokens, 250_000);
        assert_eq!(config.spec.learning.learning_rate, 0.1);
        assert!(!config.spec.optimizer.enabled);
    }

    #[test]
    fn test_validation() {
        let mut config = CortexConfig::default();
        assert!(config.validate().is_ok());

        config.api_version = "wrong/v1".to_string();
        assert!(config.validate().is_err());
        config.api_version = API_VERSION.to_string();

        config.spec.memory.buffer_tokens = config.spec.memory.limit_tokens;
        assert!(config.validate().is_err());
        config.spec.memory.buffer_tokens = 5_000;

        config.spec.learning.learning_rate = 0.0;
        assert!(config.validate().is_err());
        config.spec.learning.learning_rate = 0.1;

        config.spec.modules[4].dependencies = vec![ModuleId::from("missing")];
        assert!(config.validate().is_err());
        config.spec.modules[4].dependencies = vec![];

        let duplicate = config.spec.modules[0].clone();
        config.spec.modules.push(duplicate);
        assert!(config.validate().is_err());
        config.spec.modules.pop();

        config.spec.default_identity = Some("nobody".to_string());
        assert!(config.validate().is_err());
        config.spec.default_identity = None;

        config.spec.preload = vec![ModuleId::from("missing")];
        assert!(config.validate().is_err());
    }
}
