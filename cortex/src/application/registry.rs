// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Module registry
//!
//! Owns every known module. Iteration follows catalog (insertion) order, which
//! is also the order `list` reports and the analyzer evaluates trigger rules in.

use std::collections::{HashMap, HashSet};

use crate::domain::errors::CortexError;
use crate::domain::module::{Module, ModuleId, ModuleManifest, ModuleStatus, ModuleType, StatusFilter};

#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<Module>,
    index: HashMap<ModuleId, usize>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from manifests, keeping their order
    pub fn from_manifests(manifests: impl IntoIterator<Item = ModuleManifest>) -> Result<Self, CortexError> {
        let mut registry = Self::new();
        for manifest in manifests {
            registry.register(Module::from_manifest(manifest)?)?;
        }
        Ok(registry)
    }

    /// Append a module to the catalog. Ids must be unique.
    pub fn register(&mut self, module: Module) -> Result<(), CortexError> {
        if self.index.contains_key(&module.id) {
            return Err(CortexError::InvalidManifest(format!(
                "duplicate module id {}",
                module.id
            )));
        }
        self.index.insert(module.id.clone(), self.modules.len());
        self.modules.push(module);
        Ok(())
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &ModuleId) -> Result<&Module, CortexError> {
        self.index
            .get(id)
            .map(|&i| &self.modules[i])
            .ok_or_else(|| CortexError::module_not_found(id))
    }

    pub fn get_mut(&mut self, id: &ModuleId) -> Result<&mut Module, CortexError> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.modules[i]),
            None => Err(CortexError::module_not_found(id)),
        }
    }

    /// Modules matching both filters, in catalog order
    pub fn list(&self, filter: StatusFilter, module_type: Option<ModuleType>) -> Vec<&Module> {
        self.modules
            .iter()
            .filter(|m| filter.matches(m.status))
            .filter(|m| module_type.is_none_or(|t| m.module_type == t))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    pub fn loaded(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().filter(|m| m.is_loaded())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Move a module along one legal lifecycle edge
    pub fn transition(&mut self, id: &ModuleId, to: ModuleStatus) -> Result<(), CortexError> {
        self.get_mut(id)?.transition(to)
    }

    /// Declared dependency closure of `id`, dependencies before dependents,
    /// ending with `id` itself.
    pub fn resolve_load_order(&self, id: &ModuleId) -> Result<Vec<ModuleId>, CortexError> {
        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut path = Vec::new();
        self.visit(id, &mut path, &mut done, &mut order)?;
        Ok(order)
    }

    fn visit(
        &self,
        id: &ModuleId,
        path: &mut Vec<ModuleId>,
        done: &mut HashSet<ModuleId>,
        order: &mut Vec<ModuleId>,
    ) -> Result<(), CortexError> {
        if done.contains(id) {
            return Ok(());
        }
        if let Some(start) = path.iter().position(|p| p == id) {
            let mut chain = path[start..].to_vec();
            chain.push(id.clone());
            return Err(CortexError::CircularDependency { chain });
        }

        let module = self.get(id)?;
        path.push(id.clone());
        for dependency in &module.dependencies {
            self.visit(dependency, path, done, order)?;
        }
        path.pop();

        done.insert(id.clone());
        order.push(id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::builtin_modules;

    fn manifest(id: &str, dependencies: &[&str]) -> ModuleManifest {
        ModuleManifest {
            id: ModuleId::from(id),
            module_type: ModuleType::Knowledge,
            name: id.to_string(),
            description: String::new(),
            size_tokens: 1_000,
            version: "1.0.0".to_string(),
            triggers: vec![],
            dependencies: dependencies.iter().map(|d| ModuleId::from(*d)).collect(),
        }
    }

    #[test]
    fn test_list_preserves_catalog_order() {
        let registry = ModuleRegistry::from_manifests(builtin_modules()).unwrap();
        let ids: Vec<_> = registry
            .list(StatusFilter::All, None)
            .iter()
            .map(|m| m.id.as_str().to_string())
            .collect();
        assert_eq!(ids[0], "python_expertise");
        assert_eq!(ids[7], "conversation_memory");
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn test_list_filters() {
        let mut registry = ModuleRegistry::from_manifests(builtin_modules()).unwrap();
        let id = ModuleId::from("html_css");
        registry.transition(&id, ModuleStatus::Loading).unwrap();
        registry.transition(&id, ModuleStatus::Loaded).unwrap();

        let loaded = registry.list(StatusFilter::Loaded, None);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, id);

        assert_eq!(registry.list(StatusFilter::Available, None).len(), 7);
        assert_eq!(registry.list(StatusFilter::All, Some(ModuleType::Identity)).len(), 2);
        assert!(registry
            .list(StatusFilter::Loaded, Some(ModuleType::Memory))
            .is_empty());
    }

    #[test]
    fn test_get_unknown_module() {
        let registry = ModuleRegistry::from_manifests(builtin_modules()).unwrap();
        let err = registry.get(&ModuleId::from("ghost")).unwrap_err();
        assert!(matches!(err, CortexError::NotFound { .. }));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let result = ModuleRegistry::from_manifests(vec![manifest("a", &[]), manifest("a", &[])]);
        assert!(matches!(result, Err(CortexError::InvalidManifest(_))));
    }

    #[test]
    fn test_transition_rejects_illegal_edge() {
        let mut registry = ModuleRegistry::from_manifests(vec![manifest("a", &[])]).unwrap();
        let err = registry
            .transition(&ModuleId::from("a"), ModuleStatus::Available)
            .unwrap_err();
        assert!(matches!(err, CortexError::InvalidTransition { .. }));
    }

    #[test]
    fn test_resolve_load_order() {
        let registry = ModuleRegistry::from_manifests(vec![
            manifest("app", &["lib", "util"]),
            manifest("lib", &["util"]),
            manifest("util", &[]),
        ])
        .unwrap();

        let order = registry.resolve_load_order(&ModuleId::from("app")).unwrap();
        assert_eq!(
            order,
            vec![ModuleId::from("util"), ModuleId::from("lib"), ModuleId::from("app")]
        );
    }

    #[test]
    fn test_circular_dependency_detected() {
        let registry = ModuleRegistry::from_manifests(vec![
            manifest("a", &["b"]),
            manifest("b", &["c"]),
            manifest("c", &["a"]),
        ])
        .unwrap();

        let err = registry.resolve_load_order(&ModuleId::from("a")).unwrap_err();
        match err {
            CortexError::CircularDependency { chain } => {
                assert_eq!(chain.first(), chain.last());
                assert_eq!(chain.len(), 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_dependency_is_not_found() {
        let registry = ModuleRegistry::from_manifests(vec![manifest("a", &["missing"])]).unwrap();
        let err = registry.resolve_load_order(&ModuleId::from("a")).unwrap_err();
        assert!(matches!(err, CortexError::NotFound { .. }));
    }
}
