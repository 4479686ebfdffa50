// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Built-in module, identity and persona catalogs
//!
//! Used when configuration does not supply its own. Order matters: it is the
//! registry's catalog order and the precedence order of trigger rules.

use std::collections::BTreeMap;

use super::identity::{IdentityProfile, PersonaProfile};
use super::module::{ModuleId, ModuleManifest, ModuleType};

fn module(
    id: &str,
    module_type: ModuleType,
    name: &str,
    description: &str,
    size_tokens: u64,
    triggers: &[&str],
    dependencies: &[&str],
) -> ModuleManifest {
    ModuleManifest {
        id: ModuleId::from(id),
        module_type,
        name: name.to_string(),
        description: description.to_string(),
        size_tokens,
        version: "1.0.0".to_string(),
        triggers: triggers.iter().map(|t| t.to_string()).collect(),
        dependencies: dependencies.iter().map(|d| ModuleId::from(*d)).collect(),
    }
}

pub fn builtin_modules() -> Vec<ModuleManifest> {
    vec![
        module(
            "python_expertise",
            ModuleType::Knowledge,
            "Python Programming",
            "Comprehensive Python knowledge",
            50_000,
            &["python"],
            &[],
        ),
        module(
            "javascript_expertise",
            ModuleType::Knowledge,
            "JavaScript Programming",
            "JavaScript and web development",
            45_000,
            &["javascript", "web"],
            &[],
        ),
        module(
            "debugging_tools",
            ModuleType::Capability,
            "Debugging Tools",
            "Code debugging capabilities",
            20_000,
            &["debug"],
            &[],
        ),
        module(
            "creative_writer",
            ModuleType::Identity,
            "Creative Writer",
            "Creative writing persona",
            15_000,
            &["write", "story"],
            &[],
        ),
        module(
            "testing_frameworks",
            ModuleType::Capability,
            "Testing Frameworks",
            "Unit and integration testing practices",
            18_000,
            &["test"],
            &["python_expertise"],
        ),
        module(
            "html_css",
            ModuleType::Knowledge,
            "HTML & CSS",
            "Markup and styling for the web",
            12_000,
            &["html", "css"],
            &[],
        ),
        module(
            "core_identity",
            ModuleType::Identity,
            "Core Identity",
            "Baseline identity and values",
            5_000,
            &[],
            &[],
        ),
        module(
            "conversation_memory",
            ModuleType::Memory,
            "Conversation Memory",
            "Recent conversation history",
            10_000,
            &["remember", "earlier"],
            &[],
        ),
    ]
}

fn traits(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

pub fn builtin_identities() -> Vec<IdentityProfile> {
    vec![
        IdentityProfile {
            id: "assistant".to_string(),
            description: "General purpose helpful assistant".to_string(),
            traits: traits(&[("helpfulness", 0.8), ("formality", 0.5)]),
        },
        IdentityProfile {
            id: "developer".to_string(),
            description: "Technical, precise software engineer".to_string(),
            traits: traits(&[("technical", 0.9), ("precision", 0.8), ("formality", 0.4)]),
        },
        IdentityProfile {
            id: "teacher".to_string(),
            description: "Patient explainer".to_string(),
            traits: traits(&[("patience", 0.9), ("clarity", 0.8), ("formality", 0.6)]),
        },
    ]
}

pub fn builtin_personas() -> Vec<PersonaProfile> {
    vec![
        PersonaProfile {
            id: "professional".to_string(),
            description: "Formal and concise".to_string(),
            modifiers: traits(&[("formality", 0.2)]),
        },
        PersonaProfile {
            id: "casual".to_string(),
            description: "Relaxed and conversational".to_string(),
            modifiers: traits(&[("formality", -0.3), ("humor", 0.4)]),
        },
        PersonaProfile {
            id: "creative_writer".to_string(),
            description: "Expressive storyteller".to_string(),
            modifiers: traits(&[("creativity", 0.6), ("formality", -0.1)]),
        },
    ]
}
