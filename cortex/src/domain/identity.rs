// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Identity and persona overlay
//!
//! Orthogonal to the module cache: no budget, no dependency tracking. An
//! identity is `unset -> loaded` and can be replaced at will; a persona layers
//! trait modifiers on top of whichever identity is current.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub id: String,

    #[serde(default)]
    pub description: String,

    /// Trait name -> strength in [0, 1]
    #[serde(default)]
    pub traits: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaProfile {
    pub id: String,

    #[serde(default)]
    pub description: String,

    /// Trait name -> signed adjustment applied over the identity
    #[serde(default)]
    pub modifiers: BTreeMap<String, f64>,
}

/// Current identity and persona selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityState {
    pub identity: Option<String>,
    pub persona: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl IdentityState {
    /// Switching identity drops any applied persona
    pub fn set_identity(&mut self, identity_id: &str) {
        self.identity = Some(identity_id.to_string());
        self.persona = None;
        self.updated_at = Some(Utc::now());
    }

    pub fn set_persona(&mut self, persona_id: &str) {
        self.persona = Some(persona_id.to_string());
        self.updated_at = Some(Utc::now());
    }
}

/// Identity traits with the persona's modifiers applied, clamped to [0, 1]
pub fn effective_traits(
    identity: &IdentityProfile,
    persona: Option<&PersonaProfile>,
) -> BTreeMap<String, f64> {
    let mut traits = identity.traits.clone();
    if let Some(persona) = persona {
        for (name, modifier) in &persona.modifiers {
            let value = traits.entry(name.clone()).or_insert(0.0);
            *value += modifier;
        }
    }
    for value in traits.values_mut() {
        *value = value.clamp(0.0, 1.0);
    }
    traits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assistant() -> IdentityProfile {
        IdentityProfile {
            id: "assistant".to_string(),
            description: String::new(),
            traits: BTreeMap::from([
                ("helpfulness".to_string(), 0.8),
                ("formality".to_string(), 0.5),
            ]),
        }
    }

    #[test]
    fn test_persona_modifies_traits() {
        let persona = PersonaProfile {
            id: "professional".to_string(),
            description: String::new(),
            modifiers: BTreeMap::from([("formality".to_string(), 0.2)]),
        };

        let traits = effective_traits(&assistant(), Some(&persona));
        assert!((traits["formality"] - 0.7).abs() < 1e-9);
        assert_eq!(traits["helpfulness"], 0.8);
    }

    #[test]
    fn test_traits_are_clamped() {
        let persona = PersonaProfile {
            id: "casual".to_string(),
            description: String::new(),
            modifiers: BTreeMap::from([
                ("formality".to_string(), -0.9),
                ("helpfulness".to_string(), 0.5),
                ("humor".to_string(), 0.3),
            ]),
        };

        let traits = effective_traits(&assistant(), Some(&persona));
        assert_eq!(traits["formality"], 0.0);
        assert_eq!(traits["helpfulness"], 1.0);
        assert_eq!(traits["humor"], 0.3);
    }

    #[test]
    fn test_switching_identity_clears_persona() {
        let mut state = IdentityState::default();
        state.set_identity("assistant");
        state.set_persona("casual");
        assert_eq!(state.persona.as_deref(), Some("casual"));

        state.set_identity("developer");
        assert_eq!(state.identity.as_deref(), Some("developer"));
        assert!(state.persona.is_none());
    }
}
