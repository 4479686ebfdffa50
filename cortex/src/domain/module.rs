// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::CortexError;

// ============================================================================
// Value Objects
// ============================================================================

/// Unique, human-readable identifier for a cognitive module
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(pub String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ModuleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of content a module carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    Knowledge,
    Capability,
    Identity,
    Memory,
}

impl ModuleType {
    pub const ALL: [ModuleType; 4] = [
        ModuleType::Knowledge,
        ModuleType::Capability,
        ModuleType::Identity,
        ModuleType::Memory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Knowledge => "knowledge",
            Self::Capability => "capability",
            Self::Identity => "identity",
            Self::Memory => "memory",
        }
    }
}

/// Module status lifecycle
///
/// `available -> loading -> loaded`, and `loaded -> available` on unload.
/// `Loading` only exists inside a single load commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    Available,
    Loading,
    Loaded,
}

impl ModuleStatus {
    pub fn can_transition_to(&self, to: ModuleStatus) -> bool {
        matches!(
            (self, to),
            (Self::Available, Self::Loading)
                | (Self::Loading, Self::Loaded)
                | (Self::Loaded, Self::Available)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
        }
    }
}

/// Load priority. Biases admission order (higher first) and eviction
/// order (lower first).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

/// Status filter accepted by `list`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Loaded,
    Available,
}

impl StatusFilter {
    pub fn matches(&self, status: ModuleStatus) -> bool {
        match self {
            Self::All => true,
            Self::Loaded => status == ModuleStatus::Loaded,
            Self::Available => status == ModuleStatus::Available,
        }
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// Declarative description of a module, as found in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub id: ModuleId,

    #[serde(rename = "type")]
    pub module_type: ModuleType,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub size_tokens: u64,

    #[serde(default = "default_version")]
    pub version: String,

    /// Keywords that make the analyzer suggest this module
    #[serde(default)]
    pub triggers: Vec<String>,

    /// Modules that must stay loaded while this one is loaded
    #[serde(default)]
    pub dependencies: Vec<ModuleId>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

// ============================================================================
// Aggregate Root: Module
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,

    #[serde(rename = "type")]
    pub module_type: ModuleType,

    pub name: String,
    pub description: String,
    pub size_tokens: u64,
    pub version: String,
    pub triggers: Vec<String>,
    pub dependencies: Vec<ModuleId>,
    pub status: ModuleStatus,

    /// Priority the module was loaded with (None while not loaded)
    pub priority: Option<Priority>,

    pub loaded_at: Option<DateTime<Utc>>,

    /// Allocator clock value at load time
    #[serde(skip)]
    pub load_seq: u64,

    /// Allocator clock value at last use (load or helpful feedback)
    #[serde(skip)]
    pub last_used_seq: u64,

    pub usage_count: u64,
}

impl Module {
    pub fn from_manifest(manifest: ModuleManifest) -> Result<Self, CortexError> {
        if manifest.size_tokens == 0 {
            return Err(CortexError::InvalidManifest(format!(
                "module {} must have a size greater than zero",
                manifest.id
            )));
        }

        Ok(Self {
            id: manifest.id,
            module_type: manifest.module_type,
            name: manifest.name,
            description: manifest.description,
            size_tokens: manifest.size_tokens,
            version: manifest.version,
            triggers: manifest
                .triggers
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect(),
            dependencies: manifest.dependencies,
            status: ModuleStatus::Available,
            priority: None,
            loaded_at: None,
            load_seq: 0,
            last_used_seq: 0,
            usage_count: 0,
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.status == ModuleStatus::Loaded
    }

    // ========================================================================
    // Aggregate Commands (State Mutations)
    // ========================================================================

    pub fn transition(&mut self, to: ModuleStatus) -> Result<(), CortexError> {
        if !self.status.can_transition_to(to) {
            return Err(CortexError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Complete a load: `loading -> loaded` and stamp bookkeeping
    pub fn mark_loaded(&mut self, priority: Priority, seq: u64) -> Result<(), CortexError> {
        self.transition(ModuleStatus::Loaded)?;
        self.priority = Some(priority);
        self.loaded_at = Some(Utc::now());
        self.load_seq = seq;
        self.last_used_seq = seq;
        self.usage_count += 1;
        Ok(())
    }

    /// `loaded -> available`, clearing load bookkeeping
    pub fn mark_available(&mut self) -> Result<(), CortexError> {
        self.transition(ModuleStatus::Available)?;
        self.priority = None;
        self.loaded_at = None;
        Ok(())
    }

    pub fn record_usage(&mut self, seq: u64) {
        self.last_used_seq = seq;
        self.usage_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(id: &str, size: u64) -> ModuleManifest {
        ModuleManifest {
            id: ModuleId::from(id),
            module_type: ModuleType::Knowledge,
            name: id.to_string(),
            description: String::new(),
            size_tokens: size,
            version: default_version(),
            triggers: vec!["Python".to_string()],
            dependencies: vec![],
        }
    }

    #[test]
    fn test_module_from_manifest() {
        let module = Module::from_manifest(manifest("python_expertise", 50_000)).unwrap();
        assert_eq!(module.status, ModuleStatus::Available);
        assert_eq!(module.triggers, vec!["python".to_string()]);
        assert!(module.priority.is_none());
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = Module::from_manifest(manifest("empty", 0)).unwrap_err();
        assert!(matches!(err, CortexError::InvalidManifest(_)));
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut module = Module::from_manifest(manifest("m", 10)).unwrap();

        module.transition(ModuleStatus::Loading).unwrap();
        module.mark_loaded(Priority::High, 7).unwrap();
        assert!(module.is_loaded());
        assert_eq!(module.priority, Some(Priority::High));
        assert_eq!(module.load_seq, 7);
        assert!(module.loaded_at.is_some());

        module.mark_available().unwrap();
        assert_eq!(module.status, ModuleStatus::Available);
        assert!(module.priority.is_none());
        assert!(module.loaded_at.is_none());
    }

    #[test]
    fn test_illegal_transitions() {
        let mut module = Module::from_manifest(manifest("m", 10)).unwrap();

        // available -> loaded skips the loading step
        let err = module.transition(ModuleStatus::Loaded).unwrap_err();
        assert!(matches!(
            err,
            CortexError::InvalidTransition {
                from: ModuleStatus::Available,
                to: ModuleStatus::Loaded,
                ..
            }
        ));

        // unloading something that is not loaded
        assert!(module.mark_available().is_err());
        assert_eq!(module.status, ModuleStatus::Available);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Normal);
        assert!(Priority::Normal < Priority::High);
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn test_status_filter() {
        assert!(StatusFilter::All.matches(ModuleStatus::Loaded));
        assert!(StatusFilter::Loaded.matches(ModuleStatus::Loaded));
        assert!(!StatusFilter::Loaded.matches(ModuleStatus::Available));
        assert!(StatusFilter::Available.matches(ModuleStatus::Available));
    }
}
