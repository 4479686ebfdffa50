// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Identity and persona overlay management
//!
//! Same validate-then-set pattern as module loading, without any budget or
//! dependency bookkeeping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::domain::errors::{CortexError, EntityKind};
use crate::domain::identity::{effective_traits, IdentityProfile, IdentityState, PersonaProfile};

/// Current overlay with resolved traits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    pub identity: Option<String>,
    pub persona: Option<String>,
    pub traits: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default)]
pub struct IdentityManager {
    identities: Vec<IdentityProfile>,
    personas: Vec<PersonaProfile>,
    state: IdentityState,
}

impl IdentityManager {
    pub fn new(identities: Vec<IdentityProfile>, personas: Vec<PersonaProfile>) -> Self {
        Self {
            identities,
            personas,
            state: IdentityState::default(),
        }
    }

    pub fn identities(&self) -> &[IdentityProfile] {
        &self.identities
    }

    pub fn personas(&self) -> &[PersonaProfile] {
        &self.personas
    }

    pub fn state(&self) -> &IdentityState {
        &self.state
    }

    fn identity(&self, id: &str) -> Option<&IdentityProfile> {
        self.identities.iter().find(|i| i.id == id)
    }

    fn persona(&self, id: &str) -> Option<&PersonaProfile> {
        self.personas.iter().find(|p| p.id == id)
    }

    /// Replace the active identity. Any applied persona is cleared.
    pub fn load_identity(&mut self, identity_id: &str) -> Result<(), CortexError> {
        if self.identity(identity_id).is_none() {
            return Err(CortexError::NotFound {
                kind: EntityKind::Identity,
                id: identity_id.to_string(),
            });
        }

        self.state.set_identity(identity_id);
        info!(identity_id, "Identity loaded");
        Ok(())
    }

    /// Layer a persona over the active identity
    pub fn apply_persona(&mut self, persona_id: &str) -> Result<String, CortexError> {
        if self.persona(persona_id).is_none() {
            return Err(CortexError::NotFound {
                kind: EntityKind::Persona,
                id: persona_id.to_string(),
            });
        }
        let identity_id = self
            .state
            .identity
            .clone()
            .ok_or(CortexError::NoActiveIdentity)?;

        self.state.set_persona(persona_id);
        info!(identity_id = %identity_id, persona_id, "Persona applied");
        Ok(identity_id)
    }

    pub fn snapshot(&self) -> IdentitySnapshot {
        let traits = self
            .state
            .identity
            .as_deref()
            .and_then(|id| self.identity(id))
            .map(|identity| {
                let persona = self.state.persona.as_deref().and_then(|id| self.persona(id));
                effective_traits(identity, persona)
            })
            .unwrap_or_default();

        IdentitySnapshot {
            identity: self.state.identity.clone(),
            persona: self.state.persona.clone(),
            traits,
        }
    }
}
